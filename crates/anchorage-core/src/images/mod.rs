pub mod luminance;

use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, XrError};
use crate::identity::{IdentityRegistry, StableId};
use crate::math::{Pose, pose_from_raw};
use crate::sdk::{ArSdk, ImageTrackingMethod, TrackableHandle, TrackableKind};

pub use luminance::{LuminanceError, to_luminance};

/// A reference image to register with the tracking database.
#[derive(Debug, Clone, Copy)]
pub struct ImageTrackingRequest<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes per pixel as reported by the host. Informational; the layout is
    /// derived from `stride / width`.
    pub depth: u32,
    /// Bytes per row.
    pub stride: u32,
    /// Physical width in metres, or zero when unknown.
    pub measured_width_m: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageTrackingScore {
    Untrackable,
    Trackable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageTrackingState {
    Untracked,
    Tracked,
    Emulated,
}

impl From<ImageTrackingMethod> for ImageTrackingState {
    fn from(method: ImageTrackingMethod) -> Self {
        match method {
            ImageTrackingMethod::FullTracking => ImageTrackingState::Tracked,
            ImageTrackingMethod::LastKnownPose => ImageTrackingState::Emulated,
            ImageTrackingMethod::NotTracking => ImageTrackingState::Untracked,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageTrackingResult {
    pub id: StableId,
    pub pose: Pose,
    /// Position of the source image in the request batch.
    pub image_index: i32,
    pub tracking_state: ImageTrackingState,
    pub measured_width_m: f32,
}

/// Tracks recognised reference images across updates.
///
/// Images are never removed: their state degrades instead. The registry keeps
/// the first native reference it saw for each image until `clear`.
#[derive(Debug, Default)]
pub struct ImageTrackingRegistry {
    identities: IdentityRegistry<TrackableHandle>,
    results: HashMap<StableId, ImageTrackingResult>,
    scores: Option<Vec<ImageTrackingScore>>,
}

impl ImageTrackingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `requests` with a fresh native database and returns one
    /// score per request, in request order.
    pub fn create_database<S: ArSdk>(
        &mut self,
        sdk: &mut S,
        requests: &[ImageTrackingRequest<'_>],
    ) -> Result<Vec<ImageTrackingScore>> {
        sdk.create_image_database().map_err(XrError::ImageDatabase)?;

        let scores: Vec<_> = requests
            .iter()
            .enumerate()
            .map(|(index, request)| register_image(sdk, index, request))
            .collect();

        let trackable = scores
            .iter()
            .filter(|score| **score == ImageTrackingScore::Trackable)
            .count();
        if trackable > 0 {
            sdk.enable_image_database().map_err(XrError::ImageDatabase)?;
        }
        info!(
            target: "anchorage_core::images",
            "image database created: {trackable}/{} trackable",
            requests.len()
        );

        self.scores = Some(scores.clone());
        Ok(scores)
    }

    /// Scores from the last successful `create_database`.
    pub fn scores(&self) -> Option<&[ImageTrackingScore]> {
        self.scores.as_deref()
    }

    pub fn result(&self, id: StableId) -> Option<&ImageTrackingResult> {
        self.results.get(&id)
    }

    pub fn results(&self) -> impl Iterator<Item = &ImageTrackingResult> {
        self.results.values()
    }

    pub fn update<S: ArSdk>(&mut self, sdk: &mut S) -> Vec<StableId> {
        let mut updated = Vec::new();
        for handle in sdk.acquire_updated_trackables(TrackableKind::AugmentedImage) {
            let pose = pose_from_raw(&sdk.image_center_pose(handle));
            let tracking_state = ImageTrackingState::from(sdk.image_tracking_method(handle));
            let measured_width_m = sdk.image_extent_x(handle);

            let (id, is_new) = self.identities.resolve(handle);
            if is_new {
                self.results.insert(
                    id,
                    ImageTrackingResult {
                        id,
                        pose,
                        image_index: sdk.image_index(handle),
                        tracking_state,
                        measured_width_m,
                    },
                );
            } else {
                sdk.release_trackable(handle);
                if let Some(result) = self.results.get_mut(&id) {
                    result.pose = pose;
                    result.tracking_state = tracking_state;
                    result.measured_width_m = measured_width_m;
                }
            }
            updated.push(id);
        }

        if !updated.is_empty() {
            debug!(target: "anchorage_core::images", "images updated={}", updated.len());
        }
        updated
    }

    /// Releases every retained native reference and forgets the scores.
    pub fn clear<S: ArSdk>(&mut self, sdk: &mut S) {
        for (handle, _) in self.identities.drain() {
            sdk.release_trackable(handle);
        }
        self.results.clear();
        self.scores = None;
    }
}

fn register_image<S: ArSdk>(
    sdk: &mut S,
    index: usize,
    request: &ImageTrackingRequest<'_>,
) -> ImageTrackingScore {
    let gray = match to_luminance(request) {
        Ok(gray) => gray,
        Err(err) => {
            warn!(target: "anchorage_core::images", "image {index} skipped: {err}");
            return ImageTrackingScore::Untrackable;
        }
    };

    let physical_width = (request.measured_width_m > 0.0).then_some(request.measured_width_m);
    match sdk.add_database_image(gray.as_raw(), gray.width(), gray.height(), physical_width) {
        Ok(_) => ImageTrackingScore::Trackable,
        Err(err) => {
            warn!(target: "anchorage_core::images", "image {index} rejected: {err}");
            ImageTrackingScore::Untrackable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_method_maps_to_state() {
        assert_eq!(
            ImageTrackingState::from(ImageTrackingMethod::FullTracking),
            ImageTrackingState::Tracked
        );
        assert_eq!(
            ImageTrackingState::from(ImageTrackingMethod::LastKnownPose),
            ImageTrackingState::Emulated
        );
        assert_eq!(
            ImageTrackingState::from(ImageTrackingMethod::NotTracking),
            ImageTrackingState::Untracked
        );
    }
}
