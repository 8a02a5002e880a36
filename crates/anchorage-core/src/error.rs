use thiserror::Error;

use crate::geospatial::RequestKind;

/// Failure reported by the native AR SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdkError {
    #[error("the tracking subsystem is not tracking")]
    NotTracking,

    #[error("invalid argument passed to {0}")]
    InvalidArgument(&'static str),

    #[error("{0} is unavailable")]
    Unavailable(&'static str),

    #[error("image rejected by the augmented image database")]
    ImageInsufficientQuality,

    #[error("{call} failed with status {status}")]
    Status { call: &'static str, status: i32 },
}

/// Errors surfaced to the host engine.
///
/// Conditions that only mean "not ready yet" (tracking lost, a future still
/// pending, Earth not tracking) are never reported through this type.
#[derive(Debug, Error)]
pub enum XrError {
    #[error("failed to create AR session: {0}")]
    SessionCreate(#[source] SdkError),

    #[error("failed to configure AR session: {0}")]
    SessionConfigure(#[source] SdkError),

    #[error("failed to resume AR session: {0}")]
    SessionResume(#[source] SdkError),

    #[error("failed to enable the augmented image database: {0}")]
    ImageDatabase(#[source] SdkError),

    #[error("{0} is not supported on current platform")]
    NotSupported(&'static str),

    #[error("tried to get non-existent {kind} {id}")]
    NotFound { kind: &'static str, id: u64 },

    #[error("a {kind} request for anchor '{name}' is already pending")]
    RequestPending { kind: RequestKind, name: String },

    #[error("no anchor named '{0}'")]
    UnknownAnchor(String),

    #[error(transparent)]
    Sdk(#[from] SdkError),
}

pub type Result<T> = std::result::Result<T, XrError>;
