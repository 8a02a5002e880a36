use std::collections::HashMap;

use log::{debug, info};

use crate::error::SdkError;
use crate::math::{Pose, pose_from_raw, pose_to_raw};
use crate::sdk::{AnchorHandle, ArSdk, TrackableHandle, TrackingState};

/// Host-facing view of a native anchor.
///
/// The native handle is owned by the [`AnchorManager`] that produced this
/// value. Once the anchor is deleted the handle is cleared and the anchor is
/// invalid for good. Not `Clone`: one value per owned handle.
#[derive(Debug, PartialEq)]
pub struct Anchor {
    pose: Pose,
    native: Option<AnchorHandle>,
    valid: bool,
}

impl Anchor {
    fn tracking(pose: Pose, native: AnchorHandle) -> Self {
        Self {
            pose,
            native: Some(native),
            valid: true,
        }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn native_handle(&self) -> Option<AnchorHandle> {
        self.native
    }
}

/// Which owned anchors a cleanup pass releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    All,
    One(AnchorHandle),
}

/// Owns every native anchor handle the session hands out.
///
/// Local anchors live in an unordered owned set. Anchors created by the
/// geospatial layer are addressed by an application supplied name instead.
#[derive(Debug, Default)]
pub struct AnchorManager {
    owned: Vec<AnchorHandle>,
    named: HashMap<String, AnchorHandle>,
}

impl AnchorManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an anchor at `pose`, attached to `trackable` when given and to
    /// the session otherwise.
    pub fn create<S: ArSdk>(
        &mut self,
        sdk: &mut S,
        pose: &Pose,
        trackable: Option<TrackableHandle>,
    ) -> Result<Anchor, SdkError> {
        let native = sdk.acquire_new_anchor(&pose_to_raw(pose), trackable)?;
        self.owned.push(native);
        debug!(target: "anchorage_core::anchor", "created anchor {native:?}");
        Ok(Anchor::tracking(*pose, native))
    }

    /// Takes ownership of an anchor handle acquired elsewhere.
    ///
    /// A handle stored under a name moves to the owned set and the name is
    /// dropped, so the reference stays held exactly once.
    pub fn declare<S: ArSdk>(&mut self, sdk: &mut S, native: AnchorHandle) -> Anchor {
        let name = self
            .named
            .iter()
            .find(|(_, held)| **held == native)
            .map(|(name, _)| name.clone());
        if let Some(name) = name {
            self.named.remove(&name);
            debug!(target: "anchorage_core::anchor", "anchor '{name}' declared, name dropped");
        }
        if !self.owned.contains(&native) {
            self.owned.push(native);
        }
        Anchor::tracking(pose_from_raw(&sdk.anchor_pose(native)), native)
    }

    /// Refreshes pose and validity. An anchor whose handle is no longer
    /// owned here turns invalid without touching the SDK.
    pub fn update<S: ArSdk>(&self, sdk: &S, anchor: &mut Anchor) {
        let Some(native) = anchor.native.filter(|native| self.owned.contains(native)) else {
            anchor.native = None;
            anchor.valid = false;
            return;
        };

        match sdk.anchor_tracking_state(native) {
            TrackingState::Tracking => anchor.pose = pose_from_raw(&sdk.anchor_pose(native)),
            TrackingState::Paused => {}
            TrackingState::Stopped => anchor.valid = false,
        }
    }

    /// Detaches and releases the anchor. Safe to call more than once.
    pub fn delete<S: ArSdk>(&mut self, sdk: &mut S, anchor: &mut Anchor) {
        let Some(native) = anchor.native.take() else {
            return;
        };
        anchor.valid = false;

        if self.owned.contains(&native) {
            sdk.detach_anchor(native);
            self.cleanup(sdk, Cleanup::One(native));
        }
    }

    pub fn cleanup<S: ArSdk>(&mut self, sdk: &mut S, target: Cleanup) {
        match target {
            Cleanup::All => {
                for native in self.owned.drain(..) {
                    sdk.release_anchor(native);
                }
                for (name, native) in self.named.drain() {
                    debug!(target: "anchorage_core::anchor", "releasing anchor '{name}'");
                    sdk.release_anchor(native);
                }
            }
            Cleanup::One(native) => {
                self.owned.retain(|owned| {
                    if *owned == native {
                        sdk.release_anchor(native);
                        false
                    } else {
                        true
                    }
                });
            }
        }
    }

    pub fn owns(&self, native: AnchorHandle) -> bool {
        self.owned.contains(&native)
    }

    pub fn owned_count(&self) -> usize {
        self.owned.len()
    }

    pub fn named(&self, name: &str) -> Option<AnchorHandle> {
        self.named.get(name).copied()
    }

    pub fn named_count(&self) -> usize {
        self.named.len()
    }

    /// Stores `native` under `name`, detaching and releasing any anchor that
    /// held the name before.
    pub fn adopt_named<S: ArSdk>(&mut self, sdk: &mut S, name: &str, native: AnchorHandle) {
        if let Some(previous) = self.named.insert(name.to_owned(), native) {
            if previous != native {
                sdk.detach_anchor(previous);
                sdk.release_anchor(previous);
            }
        }
        info!(target: "anchorage_core::anchor", "anchor '{name}' placed");
    }

    pub fn remove_named<S: ArSdk>(&mut self, sdk: &mut S, name: &str) -> bool {
        match self.named.remove(name) {
            Some(native) => {
                sdk.detach_anchor(native);
                sdk.release_anchor(native);
                info!(target: "anchorage_core::anchor", "anchor '{name}' removed");
                true
            }
            None => false,
        }
    }
}
