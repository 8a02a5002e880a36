use std::time::Duration;

use anchorage_core::availability::{
    Availability, ProbePolicy, SessionType, is_session_supported_async,
};
use anchorage_providers::ScriptedAvailability;

fn quick(attempts: u32) -> ProbePolicy {
    ProbePolicy {
        attempts,
        interval: Duration::from_millis(1),
    }
}

#[test]
fn installed_runtime_supports_immersive_ar() {
    let probe = ScriptedAvailability::after(3, Availability::SupportedInstalled);
    let query = is_session_supported_async(probe, SessionType::ImmersiveAr, quick(10));
    assert!(query.wait());
}

#[test]
fn inline_sessions_are_not_offered() {
    let probe = ScriptedAvailability::new([Availability::SupportedInstalled]);
    let mut query = is_session_supported_async(probe, SessionType::Inline, quick(10));
    assert_eq!(query.try_result(), Some(false));
}

#[test]
fn probe_that_never_decides_times_out_as_unsupported() {
    let probe = ScriptedAvailability::after(50, Availability::SupportedInstalled);
    let query = is_session_supported_async(probe, SessionType::ImmersiveAr, quick(5));
    assert!(!query.wait());
}

#[test]
fn try_result_eventually_settles() {
    let probe = ScriptedAvailability::after(2, Availability::UnsupportedDeviceNotCapable);
    let mut query = is_session_supported_async(probe, SessionType::ImmersiveAr, quick(10));

    let mut answer = None;
    for _ in 0..1_000 {
        answer = query.try_result();
        if answer.is_some() {
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(answer, Some(false));
    assert_eq!(query.try_result(), Some(false));
}
