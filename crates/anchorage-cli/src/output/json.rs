use anchorage_core::StableId;
use anchorage_core::images::ImageTrackingScore;
use serde::{Deserialize, Serialize};

/// Complete replay output in JSON format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub scenario: String,
    pub image_scores: Vec<ImageTrackingScore>,
    pub frames: Vec<FrameReport>,
    pub summary: Summary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame: usize,
    pub timestamp_ns: i64,
    pub tracking: bool,
    pub should_end_session: bool,
    pub updated_planes: Vec<StableId>,
    pub removed_planes: Vec<StableId>,
    pub updated_images: Vec<StableId>,
    pub feature_points: usize,
    pub actions: Vec<ActionOutcome>,
    /// Set when the frame could not be produced
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_frames: usize,
    pub failed_frames: usize,
    pub planes_seen: usize,
    pub named_anchors: usize,
    pub references_acquired: u64,
    /// References still held after the session was dropped
    pub references_leaked: u32,
    pub invalid_releases: usize,
}

impl Summary {
    pub fn is_clean(&self) -> bool {
        self.references_leaked == 0 && self.invalid_releases == 0
    }
}
