use anchorage_core::error::{SdkError, XrError};
use anchorage_core::hit::HitTestTrackableType;
use anchorage_core::images::{ImageTrackingRequest, ImageTrackingScore, ImageTrackingState};
use anchorage_core::math::{Ray, RawPose};
use anchorage_core::render::DisplaySurface;
use anchorage_core::sdk::{DepthMode, ImageTrackingMethod, NativePoint, TrackableKind, TrackingState};
use anchorage_core::session::{
    DetectionBoundary, GeometryDetectorOptions, LifecycleEvent, Session, UpdateInterval,
};
use anchorage_core::{SessionConfig, StableId};
use anchorage_providers::{HeadlessCompositor, ObjectKind, SimulatedSdk, SimulatedWorld};
use approx::assert_relative_eq;

type SimSession = Session<SimulatedSdk, HeadlessCompositor>;

fn session_with(config: SessionConfig) -> (SimSession, SimulatedWorld) {
    let sdk = SimulatedSdk::new();
    let world = sdk.world();
    let session = Session::new(sdk, HeadlessCompositor::with_size(1280, 720), config);
    (session, world)
}

fn with_planes() -> SessionConfig {
    SessionConfig {
        plane_detection: true,
        ..SessionConfig::default()
    }
}

fn at(x: f32, y: f32, z: f32) -> RawPose {
    [0.0, 0.0, 0.0, 1.0, x, y, z]
}

fn square(half: f32) -> Vec<f32> {
    vec![-half, -half, half, -half, half, half, -half, half]
}

fn updated_planes(session: &mut SimSession) -> (Vec<StableId>, Vec<StableId>) {
    let frame = session.next_frame().expect("frame");
    (frame.updated_planes().to_vec(), frame.removed_planes().to_vec())
}

#[test]
fn plane_keeps_its_id_across_updates() {
    let (mut session, world) = session_with(with_planes());
    let floor = world.add_plane(at(0.0, -1.0, 0.0), square(1.0));

    {
        let frame = session.next_frame().expect("frame");
        assert_eq!(frame.updated_planes(), &[1]);
        let plane = frame.plane(1).expect("plane 1");
        assert_eq!(plane.polygon_size, 4);
        assert_relative_eq!(plane.center.translation.vector.y, -1.0);
    }

    // Reported again without moving: no update.
    world.touch_plane(floor);
    assert_eq!(updated_planes(&mut session), (vec![], vec![]));

    world.move_plane(floor, at(0.5, -1.0, 0.0), square(1.5));
    {
        let frame = session.next_frame().expect("frame");
        assert_eq!(frame.updated_planes(), &[1]);
        let plane = frame.plane(1).expect("plane 1");
        assert_relative_eq!(plane.center.translation.vector.x, 0.5);
        assert_relative_eq!(plane.polygon[0], -1.5);
    }

    assert_eq!(session.plane_tracker().tracked_count(), 1);
    assert_eq!(world.ledger().outstanding(ObjectKind::Trackable), 1);
}

#[test]
fn subsumed_plane_is_removed_once_and_purged_next_frame() {
    let (mut session, world) = session_with(with_planes());
    let small = world.add_plane(at(0.0, 0.0, 0.0), square(0.5));
    let large = world.add_plane(at(0.2, 0.0, 0.0), square(1.0));
    assert_eq!(updated_planes(&mut session), (vec![1, 2], vec![]));

    world.subsume_plane(small, large);
    world.touch_plane(small);
    world.move_plane(large, at(0.1, 0.0, 0.0), square(2.0));
    {
        let frame = session.next_frame().expect("frame");
        assert_eq!(frame.removed_planes(), &[1]);
        assert_eq!(frame.updated_planes(), &[2]);
        let retired = frame.plane(1).expect("still readable this frame");
        assert_eq!(retired.polygon_size, 0);
    }

    world.touch_plane(small);
    {
        let frame = session.next_frame().expect("frame");
        assert!(frame.removed_planes().is_empty());
        assert!(frame.updated_planes().is_empty());
        assert!(matches!(
            frame.plane(1),
            Err(XrError::NotFound { kind: "plane", id: 1 })
        ));
    }

    assert_eq!(world.ledger().outstanding(ObjectKind::Trackable), 1);
    assert!(world.ledger().violations().is_empty());
}

#[test]
fn stopped_plane_is_removed() {
    let (mut session, world) = session_with(with_planes());
    let plane = world.add_plane(at(0.0, 0.0, 0.0), square(1.0));
    updated_planes(&mut session);

    world.stop_plane(plane);
    assert_eq!(updated_planes(&mut session), (vec![], vec![1]));
    assert_eq!(world.ledger().outstanding(ObjectKind::Trackable), 0);
}

#[test]
fn recycled_plane_handle_gets_a_fresh_id() {
    let (mut session, world) = session_with(with_planes());
    let floor = world.add_plane(at(0.0, -1.0, 0.0), square(1.0));
    assert_eq!(updated_planes(&mut session), (vec![1], vec![]));

    world.stop_plane(floor);
    assert_eq!(updated_planes(&mut session), (vec![], vec![1]));

    let rug = world.recycle_plane(floor, at(3.0, -1.0, 0.0), square(0.5));
    assert_eq!(rug, floor);
    {
        let frame = session.next_frame().expect("frame");
        assert_eq!(frame.updated_planes(), &[2]);
        assert!(frame.removed_planes().is_empty());
        assert!(matches!(
            frame.plane(1),
            Err(XrError::NotFound { kind: "plane", id: 1 })
        ));
        let plane = frame.plane(2).expect("new plane");
        assert_relative_eq!(plane.center.translation.vector.x, 3.0);
        assert_eq!(plane.polygon_size, 4);
    }

    world.touch_plane(rug);
    assert_eq!(updated_planes(&mut session), (vec![], vec![]));
    assert_eq!(world.ledger().outstanding(ObjectKind::Trackable), 1);
    assert!(world.ledger().violations().is_empty());
}

#[test]
fn planes_are_ignored_while_detection_is_off() {
    let (mut session, world) = session_with(SessionConfig::default());
    world.add_plane(at(0.0, 0.0, 0.0), square(1.0));
    assert_eq!(updated_planes(&mut session), (vec![], vec![]));

    session.set_plane_detection_enabled(true);
    assert!(session.is_plane_detection_enabled());
    // The plane was reported during the previous update only.
    assert_eq!(updated_planes(&mut session), (vec![], vec![]));
    assert_eq!(world.ledger().outstanding(ObjectKind::Trackable), 0);
}

#[test]
fn no_diff_while_camera_is_not_tracking() {
    let (mut session, world) = session_with(with_planes());
    world.set_camera(TrackingState::Paused, at(0.0, 0.0, 0.0));
    world.add_plane(at(0.0, 0.0, 0.0), square(1.0));

    let mut frame = session.next_frame().expect("frame");
    assert!(!frame.is_tracking());
    assert!(frame.updated_planes().is_empty());
    assert!(frame.hit_test(&Ray::default(), HitTestTrackableType::PLANE).is_empty());
}

#[test]
fn image_scores_follow_request_order() {
    let (mut session, world) = session_with(SessionConfig::default());
    let textured: Vec<u8> = (0..16).map(|i| (i * 16) as u8).collect();
    let flat = vec![0x80_u8; 16];
    let requests = [
        ImageTrackingRequest {
            data: &textured,
            width: 2,
            height: 2,
            depth: 4,
            stride: 8,
            measured_width_m: 0.2,
        },
        ImageTrackingRequest {
            data: &flat,
            width: 2,
            height: 2,
            depth: 4,
            stride: 8,
            measured_width_m: 0.0,
        },
        ImageTrackingRequest {
            data: &textured,
            width: 2,
            height: 1,
            depth: 5,
            stride: 10,
            measured_width_m: 0.0,
        },
    ];

    let scores = session
        .create_augmented_image_database(&requests)
        .expect("database");
    assert_eq!(
        scores,
        vec![
            ImageTrackingScore::Trackable,
            ImageTrackingScore::Untrackable,
            ImageTrackingScore::Untrackable,
        ]
    );
    assert_eq!(session.image_tracking_scores(), Some(scores.as_slice()));
    assert_eq!(world.database_image_count(), 1);
    assert!(world.is_image_database_enabled());
}

#[test]
fn image_database_failure_is_reported() {
    let (mut session, world) = session_with(SessionConfig::default());
    world.fail_image_database(SdkError::Unavailable("augmented images"));
    let textured: Vec<u8> = (0..4).collect();
    let request = ImageTrackingRequest {
        data: &textured,
        width: 2,
        height: 2,
        depth: 1,
        stride: 2,
        measured_width_m: 0.0,
    };

    let err = session
        .create_augmented_image_database(&[request])
        .expect_err("enable fails");
    assert!(matches!(err, XrError::ImageDatabase(SdkError::Unavailable(_))));
    assert_eq!(session.image_tracking_scores(), None);
}

#[test]
fn tracked_image_degrades_instead_of_disappearing() {
    let (mut session, world) = session_with(SessionConfig::default());
    let poster = world.add_image(0, 0.3, at(0.0, 1.0, -2.0), ImageTrackingMethod::FullTracking);

    {
        let frame = session.next_frame().expect("frame");
        assert_eq!(frame.updated_image_tracking_results(), &[1]);
        let result = frame.image_tracking_result(1).expect("result");
        assert_eq!(result.image_index, 0);
        assert_eq!(result.tracking_state, ImageTrackingState::Tracked);
        assert_relative_eq!(result.measured_width_m, 0.3);
    }

    world.update_image(poster, at(0.0, 1.0, -2.5), ImageTrackingMethod::LastKnownPose);
    {
        let frame = session.next_frame().expect("frame");
        assert_eq!(frame.updated_image_tracking_results(), &[1]);
        let result = frame.image_tracking_result(1).expect("result");
        assert_eq!(result.tracking_state, ImageTrackingState::Emulated);
        assert_relative_eq!(result.pose.translation.vector.z, -2.5);
    }

    {
        let frame = session.next_frame().expect("frame");
        assert!(frame.updated_image_tracking_results().is_empty());
        assert!(frame.image_tracking_result(1).is_ok());
        assert!(matches!(
            frame.image_tracking_result(2),
            Err(XrError::NotFound { id: 2, .. })
        ));
    }
    assert_eq!(world.ledger().outstanding(ObjectKind::Trackable), 1);
}

#[test]
fn feature_points_get_stable_ids_and_mirrored_z() {
    let (mut session, world) = session_with(SessionConfig::default());
    assert!(session.try_set_feature_point_cloud_enabled(true));
    world.set_point_cloud(Some(vec![
        NativePoint {
            xyzc: [1.0, 2.0, 3.0, 0.9],
            id: 40,
        },
        NativePoint {
            xyzc: [0.0, 0.0, 1.0, 0.2],
            id: 7,
        },
    ]));

    {
        let frame = session.next_frame().expect("frame");
        let points = frame.feature_points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].id, 1);
        assert_relative_eq!(points[0].position.z, -3.0);
        assert_relative_eq!(points[0].confidence, 0.9);
    }

    world.set_point_cloud(Some(vec![NativePoint {
        xyzc: [0.0, 0.0, 2.0, 0.5],
        id: 7,
    }]));
    {
        let frame = session.next_frame().expect("frame");
        assert_eq!(frame.feature_points().len(), 1);
        assert_eq!(frame.feature_points()[0].id, 2);
    }

    session.try_set_feature_point_cloud_enabled(false);
    let frame = session.next_frame().expect("frame");
    assert!(frame.feature_points().is_empty());
}

#[test]
fn point_cloud_is_released_when_reading_fails() {
    let (mut session, world) = session_with(SessionConfig {
        feature_points: true,
        ..SessionConfig::default()
    });
    world.set_point_cloud(Some(vec![NativePoint {
        xyzc: [0.0, 0.0, 1.0, 1.0],
        id: 1,
    }]));
    world.fail_point_reads(true);

    {
        let frame = session.next_frame().expect("read failures do not fail the frame");
        assert!(frame.feature_points().is_empty());
    }
    assert_eq!(world.ledger().outstanding(ObjectKind::PointCloud), 0);
    assert!(world.ledger().acquired_total() > 0);

    world.set_point_cloud(None);
    let frame = session.next_frame().expect("frame");
    assert!(frame.feature_points().is_empty());
}

#[test]
fn hit_test_filters_by_kind_and_releases_at_frame_end() {
    let (mut session, world) = session_with(SessionConfig::default());
    let table = world.add_plane(at(0.0, -0.5, -1.0), square(0.5));
    let point = world.add_point_trackable();
    world.set_hits(vec![(at(0.0, -0.5, -1.0), table), (at(0.0, 0.0, -3.0), point)]);
    world.set_camera(TrackingState::Tracking, at(0.0, 1.0, 0.0));

    {
        let mut frame = session.next_frame().expect("frame");
        assert!(frame.hit_test(&Ray::default(), HitTestTrackableType::NONE).is_empty());

        let hits = frame.hit_test(&Ray::default(), HitTestTrackableType::PLANE);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, TrackableKind::Plane);
        assert_relative_eq!(hits[0].pose.translation.vector.z, -1.0);

        let hits = frame.hit_test(
            &Ray::default(),
            HitTestTrackableType::PLANE | HitTestTrackableType::POINT,
        );
        assert_eq!(hits.len(), 2);
        assert_eq!(world.ledger().outstanding(ObjectKind::Trackable), 3);
    }

    let (origin, direction) = world.last_ray().expect("ray cast");
    assert_eq!(origin, [0.0, 1.0, 0.0]);
    assert_eq!(direction, [0.0, 0.0, -1.0]);
    assert_eq!(world.ledger().outstanding(ObjectKind::Trackable), 0);
    assert!(world.ledger().violations().is_empty());
}

#[test]
fn mesh_hits_only_accept_points_inside_the_plane() {
    let (mut session, world) = session_with(SessionConfig::default());
    let table = world.add_plane(at(0.0, 0.0, -1.0), square(0.5));
    world.set_hits(vec![(at(0.2, 0.0, -1.2), table), (at(2.0, 0.0, -1.0), table)]);

    let mut frame = session.next_frame().expect("frame");
    let hits = frame.hit_test(&Ray::default(), HitTestTrackableType::MESH);
    assert_eq!(hits.len(), 1);
    assert_relative_eq!(hits[0].pose.translation.vector.x, 0.2);
}

#[test]
fn anchor_follows_tracking_and_deletes_once() {
    let (mut session, world) = session_with(SessionConfig::default());
    let mut frame = session.next_frame().expect("frame");

    let pose = anchorage_core::math::pose_from_raw(&at(1.0, 0.0, -1.0));
    let mut anchor = frame.create_anchor(&pose, None).expect("anchor");
    assert!(anchor.is_valid());
    let native = anchor.native_handle().expect("native");

    world.move_anchor(native, at(1.5, 0.0, -1.0));
    frame.update_anchor(&mut anchor);
    assert_relative_eq!(anchor.pose().translation.vector.x, 1.5);

    world.set_anchor_tracking(native, TrackingState::Paused);
    world.move_anchor(native, at(9.0, 0.0, 0.0));
    frame.update_anchor(&mut anchor);
    assert!(anchor.is_valid());
    assert_relative_eq!(anchor.pose().translation.vector.x, 1.5);

    frame.delete_anchor(&mut anchor);
    frame.delete_anchor(&mut anchor);
    assert!(!anchor.is_valid());
    assert!(anchor.native_handle().is_none());
    assert!(world.is_anchor_detached(native));
    drop(frame);

    assert_eq!(session.anchors().owned_count(), 0);
    assert_eq!(world.ledger().outstanding(ObjectKind::Anchor), 0);
    assert!(world.ledger().violations().is_empty());
}

#[test]
fn anchor_pose_round_trips_through_the_sdk() {
    let (mut session, _world) = session_with(SessionConfig::default());
    let mut frame = session.next_frame().expect("frame");

    let half = std::f32::consts::FRAC_1_SQRT_2;
    let raw = [0.0, half, 0.0, half, 0.25, 1.5, -2.0];
    let pose = anchorage_core::math::pose_from_raw(&raw);
    let mut anchor = frame.create_anchor(&pose, None).expect("anchor");
    frame.update_anchor(&mut anchor);

    assert!(anchor.is_valid());
    assert_eq!(anchorage_core::math::pose_to_raw(anchor.pose()), raw);
}

#[test]
fn declared_anchor_is_owned_by_the_session() {
    let (mut session, world) = session_with(SessionConfig::default());
    let external = world.spawn_anchor(at(0.0, 2.0, 0.0));
    {
        let mut frame = session.next_frame().expect("frame");
        let mut anchor = frame.declare_anchor(external);
        assert!(anchor.is_valid());
        assert_relative_eq!(anchor.pose().translation.vector.y, 2.0);

        frame.delete_anchor(&mut anchor);
    }
    assert_eq!(session.anchors().owned_count(), 0);
    assert!(world.ledger().is_balanced());
}

#[test]
fn declaring_an_owned_handle_twice_keeps_one_reference() {
    let (mut session, world) = session_with(SessionConfig::default());
    let mut frame = session.next_frame().expect("frame");

    let pose = anchorage_core::math::pose_from_raw(&at(0.0, 0.0, -1.0));
    let mut first = frame.create_anchor(&pose, None).expect("anchor");
    let native = first.native_handle().expect("native");
    let mut second = frame.declare_anchor(native);

    frame.delete_anchor(&mut first);
    frame.update_anchor(&mut second);
    assert!(!second.is_valid());
    assert!(second.native_handle().is_none());

    frame.delete_anchor(&mut second);
    drop(frame);

    assert_eq!(session.anchors().owned_count(), 0);
    assert!(world.ledger().violations().is_empty());
    assert!(world.ledger().is_balanced());
}

#[test]
fn stopped_anchor_becomes_invalid() {
    let (mut session, world) = session_with(SessionConfig::default());
    let mut frame = session.next_frame().expect("frame");
    let mut anchor = frame
        .create_anchor(&anchorage_core::math::Pose::identity(), None)
        .expect("anchor");

    world.set_anchor_tracking(anchor.native_handle().expect("native"), TrackingState::Stopped);
    frame.update_anchor(&mut anchor);
    assert!(!anchor.is_valid());
}

#[test]
fn anchor_creation_needs_tracking() {
    let (mut session, world) = session_with(SessionConfig::default());
    world.set_camera(TrackingState::Paused, at(0.0, 0.0, 0.0));
    let mut frame = session.next_frame().expect("frame");

    let err = frame
        .create_anchor(&anchorage_core::math::Pose::identity(), None)
        .expect_err("not tracking");
    assert!(matches!(err, XrError::Sdk(SdkError::NotTracking)));
}

#[test]
fn unsupported_queries_fail_cleanly() {
    let (mut session, _world) = session_with(SessionConfig::default());
    assert!(!session.try_set_mesh_detector_enabled(true));
    let options = GeometryDetectorOptions {
        detection_boundary: Some(DetectionBoundary::Sphere { radius: 5.0 }),
        update_interval: Some(UpdateInterval::Normal),
    };
    assert!(!session.try_set_preferred_plane_detector_options(&options));
    assert!(!session.try_set_preferred_mesh_detector_options(&options));

    let frame = session.next_frame().expect("frame");
    assert!(frame.input_sources().is_empty());
    assert!(frame.updated_meshes().is_empty());
    assert!(matches!(frame.scene_object(1), Err(XrError::NotSupported(_))));
    assert!(matches!(frame.mesh(1), Err(XrError::NotSupported(_))));
    assert!(matches!(
        frame.plane(42),
        Err(XrError::NotFound { kind: "plane", id: 42 })
    ));
}

#[test]
fn first_frame_configures_and_resumes() {
    let (mut session, world) = session_with(SessionConfig::default());
    world.set_depth_supported(false);
    assert!(!session.is_initialized());

    session.next_frame().expect("frame");

    assert!(session.is_initialized());
    let configured = world.configured().expect("configured");
    assert_eq!(configured.depth, DepthMode::Disabled);
    assert!(configured.geospatial);
    assert_eq!(world.resume_count(), 1);
    assert_eq!(world.display_geometry(), Some((0, 1280, 720)));
}

#[test]
fn configure_failure_keeps_session_uninitialized() {
    let (mut session, world) = session_with(SessionConfig::default());
    world.fail_configure(SdkError::Unavailable("geospatial"));

    let err = session.next_frame().err().expect("configure fails");
    assert!(matches!(err, XrError::SessionConfigure(SdkError::Unavailable(_))));
    assert!(!session.is_initialized());
    assert!(!world.is_running());
}

#[test]
fn pause_and_resume_follow_the_lifecycle() {
    let (mut session, world) = session_with(SessionConfig::default());
    session.handle_lifecycle(LifecycleEvent::Pause);
    assert_eq!(world.pause_count(), 0);

    session.next_frame().expect("frame");
    session.handle_lifecycle(LifecycleEvent::Pause);
    assert!(!world.is_running());
    assert!(matches!(
        session.next_frame().err(),
        Some(XrError::Sdk(SdkError::Status { call: "update", .. }))
    ));

    session.handle_lifecycle(LifecycleEvent::Resume);
    assert!(session.next_frame().is_ok());
    assert_eq!(world.resume_count(), 2);
}

#[test]
fn end_request_shows_on_the_next_frame() {
    let (mut session, _world) = session_with(SessionConfig::default());
    assert!(!session.next_frame().expect("frame").should_end_session());

    session.request_end();
    assert!(session.next_frame().expect("frame").should_end_session());
}

#[test]
fn projection_and_targets_are_rebuilt_on_change() {
    let (mut session, world) = session_with(SessionConfig::default());
    {
        let frame = session.next_frame().expect("frame");
        let view = &frame.views()[0];
        assert_eq!(view.targets.color.width, 1280);
        assert_relative_eq!(view.depth_near_z, 0.5);
        assert!(view.is_first_person_observer);
        assert!(frame.timestamp_ns() > 0);
    }
    session.next_frame().expect("frame");
    assert_eq!(world.projection_requests(), 1);

    session.set_depth_range(0.1, 50.0);
    assert_eq!(session.depth_range(), (0.1, 50.0));
    session.next_frame().expect("frame");
    assert_eq!(world.projection_requests(), 2);

    session.compositor_mut().set_surface(Some(DisplaySurface {
        width: 720,
        height: 1280,
        rotation: 1,
    }));
    {
        let frame = session.next_frame().expect("frame");
        assert_eq!(frame.views()[0].targets.color.width, 720);
    }
    assert_eq!(world.display_geometry(), Some((1, 720, 1280)));
    assert_eq!(world.projection_requests(), 3);
    assert_eq!(session.compositor().allocations(), 2);
    assert_eq!(session.compositor().live_targets(), 1);
    assert_eq!(session.compositor().presented().len(), 4);
}

#[test]
fn teardown_releases_everything() {
    let (mut session, world) = session_with(SessionConfig {
        plane_detection: true,
        feature_points: true,
        ..SessionConfig::default()
    });
    let table = world.add_plane(at(0.0, 0.0, -1.0), square(0.5));
    world.add_image(0, 0.1, at(0.0, 0.0, -1.0), ImageTrackingMethod::FullTracking);
    world.set_point_cloud(Some(Vec::new()));
    world.set_hits(vec![(at(0.0, 0.0, -1.0), table)]);

    {
        let mut frame = session.next_frame().expect("frame");
        frame
            .create_anchor(&anchorage_core::math::Pose::identity(), None)
            .expect("anchor");
        let hits = frame.hit_test(&Ray::default(), HitTestTrackableType::PLANE);
        frame
            .create_anchor(&hits[0].pose, Some(hits[0].trackable))
            .expect("attached anchor");
    }
    assert!(!world.ledger().is_balanced());

    drop(session);
    assert!(world.ledger().is_balanced(), "{:?}", *world.ledger());
}
