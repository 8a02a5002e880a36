//! Tracking-state synchronization and anchor lifecycle on top of a native AR
//! SDK: stable identities for planes, images and feature points, per-frame
//! diffs, spatial anchors, and polled geospatial/cloud anchor requests.

pub mod anchor;
pub mod availability;
pub mod config;
pub mod error;
pub mod frame;
pub mod geospatial;
pub mod hit;
pub mod identity;
pub mod images;
pub mod math;
pub mod plane;
pub mod points;
pub mod render;
pub mod sdk;
pub mod session;

pub use anchor::{Anchor, AnchorManager};
pub use config::SessionConfig;
pub use error::{Result, SdkError, XrError};
pub use frame::Frame;
pub use geospatial::{AnchorStatus, HostStatus};
pub use hit::{HitResult, HitTestTrackableType};
pub use identity::StableId;
pub use sdk::ArSdk;
pub use session::Session;
