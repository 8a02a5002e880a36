use std::collections::HashMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, XrError};
use crate::sdk::{
    AnchorHandle, ArSdk, CloudAnchorState, FutureHandle, FutureState, TerrainAnchorState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    TerrainResolve,
    CloudHost,
    CloudResolve,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::TerrainResolve => write!(f, "terrain resolve"),
            RequestKind::CloudHost => write!(f, "cloud host"),
            RequestKind::CloudResolve => write!(f, "cloud resolve"),
        }
    }
}

/// Why a finished request produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    Terrain(TerrainAnchorState),
    Cloud(CloudAnchorState),
    Cancelled,
    /// The SDK reported success but handed back no result.
    Empty,
}

/// Cooperative view of a native future, advanced only by polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Pending,
    Ready(T),
    Failed(FailureReason),
}

/// Futures of one request kind, keyed by anchor name.
#[derive(Debug)]
pub struct PendingFutures {
    kind: RequestKind,
    futures: HashMap<String, FutureHandle>,
}

impl PendingFutures {
    pub fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            futures: HashMap::new(),
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn contains(&self, name: &str) -> bool {
        self.futures.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.futures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }

    /// Fails when a request of this kind is already in flight for `name`.
    pub fn ensure_vacant(&self, name: &str) -> Result<(), XrError> {
        if self.contains(name) {
            return Err(XrError::RequestPending {
                kind: self.kind,
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    /// Issues a request through `issue` and stores the returned future.
    /// Nothing is issued when a request for `name` is already in flight.
    pub fn request<S, F>(&mut self, sdk: &mut S, name: &str, issue: F) -> Result<(), XrError>
    where
        S: ArSdk,
        F: FnOnce(&mut S) -> Result<FutureHandle, SdkError>,
    {
        self.ensure_vacant(name)?;
        let future = issue(sdk)?;
        self.futures.insert(name.to_owned(), future);
        debug!(target: "anchorage_core::geospatial", "{} requested for '{name}'", self.kind);
        Ok(())
    }

    /// Polls the future stored under `name`. Returns `None` when there is none.
    ///
    /// A future that is no longer pending is released and forgotten on this
    /// call, whatever its outcome; `extract` turns a done future into a value
    /// and must release any anchor it does not return.
    pub fn poll<S, T, F>(&mut self, sdk: &mut S, name: &str, extract: F) -> Option<Resolution<T>>
    where
        S: ArSdk,
        F: FnOnce(&mut S, FutureHandle) -> Resolution<T>,
    {
        let future = *self.futures.get(name)?;
        let resolution = match sdk.future_state(future) {
            FutureState::Pending => return Some(Resolution::Pending),
            FutureState::Done => extract(sdk, future),
            FutureState::Cancelled => Resolution::Failed(FailureReason::Cancelled),
        };

        sdk.release_future(future);
        self.futures.remove(name);
        debug!(target: "anchorage_core::geospatial", "{} for '{name}' finished", self.kind);
        Some(resolution)
    }

    /// Releases and forgets the future under `name`.
    pub fn abandon<S: ArSdk>(&mut self, sdk: &mut S, name: &str) -> bool {
        match self.futures.remove(name) {
            Some(future) => {
                sdk.release_future(future);
                true
            }
            None => false,
        }
    }

    pub fn clear<S: ArSdk>(&mut self, sdk: &mut S) {
        for (_, future) in self.futures.drain() {
            sdk.release_future(future);
        }
    }
}

pub(crate) fn terrain_anchor<S: ArSdk>(sdk: &mut S, future: FutureHandle) -> Resolution<AnchorHandle> {
    let result = sdk.acquire_terrain_result(future);
    match (result.state, result.anchor) {
        (TerrainAnchorState::Success, Some(anchor)) => Resolution::Ready(anchor),
        (state, anchor) => {
            if let Some(anchor) = anchor {
                sdk.release_anchor(anchor);
            }
            Resolution::Failed(match state {
                TerrainAnchorState::Success => FailureReason::Empty,
                state => FailureReason::Terrain(state),
            })
        }
    }
}

pub(crate) fn resolved_cloud_anchor<S: ArSdk>(
    sdk: &mut S,
    future: FutureHandle,
) -> Resolution<AnchorHandle> {
    let result = sdk.acquire_resolved_cloud_anchor(future);
    match (result.state, result.anchor) {
        (CloudAnchorState::Success, Some(anchor)) => Resolution::Ready(anchor),
        (state, anchor) => {
            if let Some(anchor) = anchor {
                sdk.release_anchor(anchor);
            }
            Resolution::Failed(match state {
                CloudAnchorState::Success => FailureReason::Empty,
                state => FailureReason::Cloud(state),
            })
        }
    }
}

pub(crate) fn hosted_cloud_anchor_id<S: ArSdk>(sdk: &mut S, future: FutureHandle) -> Resolution<String> {
    let result = sdk.acquire_hosted_cloud_anchor_id(future);
    match (result.state, result.cloud_anchor_id) {
        (CloudAnchorState::Success, Some(id)) => Resolution::Ready(id),
        (CloudAnchorState::Success, None) => Resolution::Failed(FailureReason::Empty),
        (state, _) => Resolution::Failed(FailureReason::Cloud(state)),
    }
}
