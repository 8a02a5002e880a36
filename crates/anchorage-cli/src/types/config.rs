use std::path::Path;

use anchorage_core::SessionConfig;
use anchorage_core::hit::HitTestTrackableType;
use anchorage_core::math::{EusQuaternion, GeodeticCoordinate};
use anchorage_providers::WorldEvent;
use serde::{Deserialize, Serialize};

use crate::errors::{ReplayError, Result};

/// A scripted session: world changes and host calls, frame by frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScenario {
    pub name: String,
    /// Session configuration used for the replay
    #[serde(default)]
    pub session: SessionConfig,
    /// Grayscale reference images registered before the first frame
    #[serde(default)]
    pub reference_images: Vec<ReferenceImage>,
    pub frames: Vec<ScenarioFrame>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub width: u32,
    pub height: u32,
    /// Row-major 8-bit luminance
    pub pixels: Vec<u8>,
    #[serde(default)]
    pub measured_width_m: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioFrame {
    /// Applied to the simulated world before the frame is taken
    #[serde(default)]
    pub world: Vec<WorldEvent>,
    #[serde(default)]
    pub actions: Vec<SessionAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    Point,
    Plane,
    Mesh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionAction {
    Pause,
    Resume,
    RequestEnd,
    SetPlaneDetection {
        enabled: bool,
    },
    SetFeaturePoints {
        enabled: bool,
    },
    HitTest {
        types: Vec<HitKind>,
    },
    /// Anchors the nearest hit of the given kinds
    AnchorHit {
        types: Vec<HitKind>,
    },
    AddEarthAnchor {
        name: String,
        coordinate: GeodeticCoordinate,
        #[serde(default = "identity_eus")]
        eus: EusQuaternion,
    },
    AddTerrainAnchor {
        name: String,
        coordinate: GeodeticCoordinate,
        #[serde(default = "identity_eus")]
        eus: EusQuaternion,
    },
    HostCloudAnchor {
        name: String,
        #[serde(default = "default_ttl_days")]
        ttl_days: u32,
    },
    ResolveCloudAnchor {
        name: String,
        cloud_anchor_id: String,
    },
    HitTestAnchor {
        name: String,
        x: f32,
        y: f32,
    },
    QueryAnchor {
        name: String,
    },
    QueryHostStatus {
        name: String,
    },
    RemoveEarthAnchor {
        name: String,
    },
}

fn identity_eus() -> EusQuaternion {
    [0.0, 0.0, 0.0, 1.0]
}

fn default_ttl_days() -> u32 {
    1
}

impl SessionAction {
    /// Actions that act on the session itself and run before the frame.
    pub fn is_session_level(&self) -> bool {
        matches!(
            self,
            SessionAction::Pause
                | SessionAction::Resume
                | SessionAction::RequestEnd
                | SessionAction::SetPlaneDetection { .. }
                | SessionAction::SetFeaturePoints { .. }
        )
    }
}

pub fn hit_types(kinds: &[HitKind]) -> HitTestTrackableType {
    kinds
        .iter()
        .fold(HitTestTrackableType::NONE, |types, kind| {
            types
                | match kind {
                    HitKind::Point => HitTestTrackableType::POINT,
                    HitKind::Plane => HitTestTrackableType::PLANE,
                    HitKind::Mesh => HitTestTrackableType::MESH,
                }
        })
}

impl ReplayScenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReplayError::ScenarioNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let scenario: ReplayScenario = serde_yaml::from_str(contents)?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(ReplayError::InvalidScenario(format!(
                "scenario '{}' has no frames",
                self.name
            )));
        }
        for (index, image) in self.reference_images.iter().enumerate() {
            let expected = image.width as usize * image.height as usize;
            if image.pixels.len() != expected {
                return Err(ReplayError::InvalidScenario(format!(
                    "reference image {index} has {} pixels, expected {expected}",
                    image.pixels.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_scenario() {
        let yaml = r#"
name: minimal
frames:
  - actions:
      - action: hit_test
        types: [plane, point]
  - {}
"#;
        let scenario = ReplayScenario::from_yaml(yaml).expect("valid scenario");
        assert_eq!(scenario.frames.len(), 2);
        assert!(!scenario.session.plane_detection);
        assert_eq!(
            scenario.frames[0].actions[0],
            SessionAction::HitTest {
                types: vec![HitKind::Plane, HitKind::Point]
            }
        );
    }

    #[test]
    fn rejects_empty_and_malformed_scenarios() {
        assert!(matches!(
            ReplayScenario::from_yaml("name: empty\nframes: []\n"),
            Err(ReplayError::InvalidScenario(_))
        ));

        let yaml = r#"
name: bad-image
reference_images:
  - { width: 2, height: 2, pixels: [1, 2, 3] }
frames: [{}]
"#;
        assert!(matches!(
            ReplayScenario::from_yaml(yaml),
            Err(ReplayError::InvalidScenario(_))
        ));
    }

    #[test]
    fn hit_kinds_combine() {
        let types = hit_types(&[HitKind::Plane, HitKind::Mesh]);
        assert!(types.contains(HitTestTrackableType::PLANE));
        assert!(!types.contains(HitTestTrackableType::POINT));
        assert!(hit_types(&[]).is_empty());
    }
}
