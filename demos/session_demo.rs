//! Anchor session walkthrough
//!
//! This example drives a full place -> save -> host -> resolve -> clear
//! cycle against the mock engine, printing the state transitions and the
//! status messages the UI layer would display.

use geoanchor::engine::{Frame, HitResult, MockArSession, TrackableHit};
use geoanchor::{
    AnchorSessionController, CloudAnchorState, GeospatialPose, Pose, SessionConfig,
};

fn main() {
    println!("=== Geospatial Anchor Session Demo ===\n");

    let mut session = MockArSession::new();
    session.set_camera_geospatial_pose(GeospatialPose::new(45.5231, -122.6765, 50.0));

    let controller = AnchorSessionController::new(session, SessionConfig::default());

    // Tap on a detected tabletop plane two meters ahead.
    controller.with_session(|s| {
        let mut frame = Frame::tracking(0, Pose::identity());
        frame.hits = vec![HitResult {
            hit_pose: Pose::from_translation(0.0, -0.8, -2.0),
            distance: 2.15,
            trackable: TrackableHit::Plane {
                in_polygon: true,
                distance_to_plane: 0.8,
            },
        }];
        s.push_frame(frame);
    });
    controller.place_anchor();
    controller.on_frame();
    println!("After placement: {:?}", controller.slot_state());

    // Save: converts the anchor pose to a geodetic position and starts
    // hosting it with the cloud service.
    controller.save().expect("save should succeed");
    println!("After save:      {:?}", controller.slot_state());
    print_messages(&controller);

    // A few frames pass while the hosting request is in flight.
    for _ in 0..3 {
        controller.on_frame();
    }
    println!(
        "Outstanding cloud requests: {}",
        controller.pending_request_count()
    );

    // The service reports success; the next frame adopts the hosted anchor.
    controller.with_session(|s| {
        let earth_anchor = s.host_requests()[0].0;
        s.finish_cloud_task(earth_anchor, CloudAnchorState::Success, Some("ua-f7a2c9"));
    });
    controller.on_frame();
    println!("After hosting:   {:?}", controller.slot_state());
    print_messages(&controller);

    // Clear the scene and resolve the anchor back by its short code, the
    // way a second device would.
    controller.clear();
    println!("After clear:     {:?}", controller.slot_state());

    controller
        .resolve("ua-f7a2c9")
        .expect("resolve should submit");
    controller.with_session(|s| {
        println!(
            "Resolving cloud anchor id: {}",
            s.resolve_requests().last().unwrap()
        );
    });

    controller.with_session(|s| {
        // The anchor being populated is the most recently created one.
        let anchor = geoanchor::AnchorId::new(3);
        s.finish_cloud_task(anchor, CloudAnchorState::Success, Some("ua-f7a2c9"));
    });
    controller.on_frame();
    println!("After resolve:   {:?}", controller.slot_state());
    print_messages(&controller);

    println!("\nAnchors created this session: {:?}", controller.anchors());
    println!("Demo completed successfully!");
}

fn print_messages(controller: &AnchorSessionController<MockArSession>) {
    for message in controller.take_messages() {
        println!("  [{:?}] {}", message.severity, message.text);
    }
}
