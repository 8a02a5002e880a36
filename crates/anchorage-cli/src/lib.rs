pub mod errors;
pub mod output;
pub mod types;

use std::collections::BTreeSet;

use anchorage_core::frame::Frame;
use anchorage_core::images::ImageTrackingRequest;
use anchorage_core::math::Ray;
use anchorage_core::session::{LifecycleEvent, Session};
use anchorage_providers::{
    HeadlessCompositor, ObjectKind, ScriptedWorld, SimulatedSdk,
};
use log::{debug, info, warn};

use crate::errors::Result;
use crate::output::{ActionOutcome, FrameReport, ReplayReport, Summary};
use crate::types::{ReplayScenario, SessionAction, hit_types};

type ReplaySession = Session<SimulatedSdk, HeadlessCompositor>;
type ReplayFrame<'s> = Frame<'s, SimulatedSdk, HeadlessCompositor>;

const SURFACE_WIDTH: u32 = 1080;
const SURFACE_HEIGHT: u32 = 1920;

/// Runs a scripted scenario through a session backed by the simulated SDK
pub struct ScenarioRunner {
    scenario: ReplayScenario,
}

impl ScenarioRunner {
    pub fn new(scenario: ReplayScenario) -> Self {
        Self { scenario }
    }

    pub fn run(&self) -> Result<ReplayReport> {
        info!("Replaying scenario: {}", self.scenario.name);

        let sdk = SimulatedSdk::new();
        let mut world = ScriptedWorld::new(sdk.world());
        let mut session = Session::new(
            sdk,
            HeadlessCompositor::with_size(SURFACE_WIDTH, SURFACE_HEIGHT),
            self.scenario.session.clone(),
        );

        let image_scores = self.register_images(&mut session)?;

        let mut frames = Vec::with_capacity(self.scenario.frames.len());
        let mut planes_seen = BTreeSet::new();
        for (index, scripted) in self.scenario.frames.iter().enumerate() {
            for event in &scripted.world {
                world.apply(event);
            }

            let mut report = FrameReport {
                frame: index,
                ..FrameReport::default()
            };
            for action in scripted.actions.iter().filter(|a| a.is_session_level()) {
                report.actions.push(apply_session_action(&mut session, action));
            }

            match session.next_frame() {
                Ok(mut frame) => {
                    report.timestamp_ns = frame.timestamp_ns();
                    report.tracking = frame.is_tracking();
                    report.should_end_session = frame.should_end_session();
                    report.updated_planes = frame.updated_planes().to_vec();
                    report.removed_planes = frame.removed_planes().to_vec();
                    report.updated_images = frame.updated_image_tracking_results().to_vec();
                    report.feature_points = frame.feature_points().len();
                    planes_seen.extend(frame.updated_planes().iter().copied());

                    for action in scripted.actions.iter().filter(|a| !a.is_session_level()) {
                        report.actions.push(apply_frame_action(&mut frame, action));
                    }
                }
                Err(err) => {
                    warn!("Frame {index} failed: {err}");
                    report.error = Some(err.to_string());
                }
            }

            debug!(
                "Frame {}: planes +{} -{}, images {}, points {}",
                index,
                report.updated_planes.len(),
                report.removed_planes.len(),
                report.updated_images.len(),
                report.feature_points
            );
            frames.push(report);
        }

        let named_anchors = session.anchors().named_count();
        drop(session);

        let ledger = world.world().ledger();
        let summary = Summary {
            total_frames: frames.len(),
            failed_frames: frames.iter().filter(|f| f.error.is_some()).count(),
            planes_seen: planes_seen.len(),
            named_anchors,
            references_acquired: ledger.acquired_total(),
            references_leaked: [
                ObjectKind::Trackable,
                ObjectKind::Anchor,
                ObjectKind::Future,
                ObjectKind::PointCloud,
            ]
            .into_iter()
            .map(|kind| ledger.outstanding(kind))
            .sum(),
            invalid_releases: ledger.violations().len(),
        };
        for violation in ledger.violations() {
            warn!("Reference misuse: {violation}");
        }
        info!(
            "Replayed {} frames ({} failed), {} references acquired, {} leaked",
            summary.total_frames,
            summary.failed_frames,
            summary.references_acquired,
            summary.references_leaked
        );

        Ok(ReplayReport {
            scenario: self.scenario.name.clone(),
            image_scores,
            frames,
            summary,
        })
    }

    fn register_images(
        &self,
        session: &mut ReplaySession,
    ) -> Result<Vec<anchorage_core::images::ImageTrackingScore>> {
        if self.scenario.reference_images.is_empty() {
            return Ok(Vec::new());
        }
        let requests: Vec<_> = self
            .scenario
            .reference_images
            .iter()
            .map(|image| ImageTrackingRequest {
                data: &image.pixels,
                width: image.width,
                height: image.height,
                depth: 1,
                stride: image.width,
                measured_width_m: image.measured_width_m,
            })
            .collect();
        Ok(session.create_augmented_image_database(&requests)?)
    }
}

fn outcome(action: &SessionAction, outcome: impl Into<String>) -> ActionOutcome {
    ActionOutcome {
        action: format!("{action:?}"),
        outcome: outcome.into(),
    }
}

fn apply_session_action(session: &mut ReplaySession, action: &SessionAction) -> ActionOutcome {
    match action {
        SessionAction::Pause => session.handle_lifecycle(LifecycleEvent::Pause),
        SessionAction::Resume => session.handle_lifecycle(LifecycleEvent::Resume),
        SessionAction::RequestEnd => session.request_end(),
        SessionAction::SetPlaneDetection { enabled } => {
            session.set_plane_detection_enabled(*enabled)
        }
        SessionAction::SetFeaturePoints { enabled } => {
            let applied = session.try_set_feature_point_cloud_enabled(*enabled);
            return outcome(action, format!("applied={applied}"));
        }
        _ => return outcome(action, "skipped: not a session action"),
    }
    outcome(action, "ok")
}

fn apply_frame_action(frame: &mut ReplayFrame<'_>, action: &SessionAction) -> ActionOutcome {
    let result = match action {
        SessionAction::HitTest { types } => {
            let hits = frame.hit_test(&Ray::default(), hit_types(types));
            Ok(format!("{} hits", hits.len()))
        }
        SessionAction::AnchorHit { types } => {
            let hits = frame.hit_test(&Ray::default(), hit_types(types));
            match hits.first() {
                Some(hit) => frame
                    .create_anchor(&hit.pose, Some(hit.trackable))
                    .map(|_| format!("anchored on {:?}", hit.kind)),
                None => Ok("no hit".to_owned()),
            }
        }
        SessionAction::AddEarthAnchor {
            name,
            coordinate,
            eus,
        } => frame
            .geospatial()
            .add_earth_anchor(name, coordinate, eus)
            .map(|placed| format!("placed={placed}")),
        SessionAction::AddTerrainAnchor {
            name,
            coordinate,
            eus,
        } => frame
            .geospatial()
            .add_terrain_anchor(name, coordinate, eus)
            .map(|requested| format!("requested={requested}")),
        SessionAction::HostCloudAnchor { name, ttl_days } => frame
            .geospatial()
            .host_cloud_anchor(name, *ttl_days)
            .map(|requested| format!("requested={requested}")),
        SessionAction::ResolveCloudAnchor {
            name,
            cloud_anchor_id,
        } => frame
            .geospatial()
            .resolve_cloud_anchor(name, cloud_anchor_id)
            .map(|()| "requested".to_owned()),
        SessionAction::HitTestAnchor { name, x, y } => frame
            .geospatial()
            .hit_test_anchor(name, *x, *y)
            .map(|placed| format!("placed={placed}")),
        SessionAction::QueryAnchor { name } => {
            let status = frame.geospatial().earth_anchor_pose(name);
            Ok(format!("{:?}", status.map(|pose| pose.anchor.translation.vector)))
        }
        SessionAction::QueryHostStatus { name } => {
            Ok(format!("{:?}", frame.geospatial().cloud_anchor_host_status(name)))
        }
        SessionAction::RemoveEarthAnchor { name } => {
            Ok(format!("removed={}", frame.geospatial().remove_earth_anchor(name)))
        }
        SessionAction::Pause
        | SessionAction::Resume
        | SessionAction::RequestEnd
        | SessionAction::SetPlaneDetection { .. }
        | SessionAction::SetFeaturePoints { .. } => Ok("skipped: not a frame action".to_owned()),
    };

    match result {
        Ok(text) => outcome(action, text),
        Err(err) => {
            warn!("{action:?} failed: {err}");
            outcome(action, format!("error: {err}"))
        }
    }
}
