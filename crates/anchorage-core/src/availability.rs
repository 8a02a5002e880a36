use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    ImmersiveVr,
    ImmersiveAr,
    Inline,
}

/// Install and capability state of the AR runtime on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    UnknownChecking,
    UnknownError,
    UnknownTimedOut,
    UnsupportedDeviceNotCapable,
    SupportedNotInstalled,
    SupportedApkTooOld,
    SupportedInstalled,
}

impl Availability {
    /// `None` while the runtime is still deciding.
    fn verdict(self) -> Option<bool> {
        match self {
            Availability::UnknownChecking => None,
            Availability::SupportedInstalled
            | Availability::SupportedNotInstalled
            | Availability::SupportedApkTooOld => Some(true),
            Availability::UnknownError
            | Availability::UnknownTimedOut
            | Availability::UnsupportedDeviceNotCapable => Some(false),
        }
    }
}

pub trait AvailabilityProbe: Send + 'static {
    fn check(&mut self) -> Availability;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            attempts: 100,
            interval: Duration::from_millis(200),
        }
    }
}

/// Answer to a support query, completed from a background thread.
#[derive(Debug)]
pub struct SupportQuery {
    receiver: Receiver<bool>,
    result: Option<bool>,
}

impl SupportQuery {
    fn ready(supported: bool) -> Self {
        let (sender, receiver) = mpsc::channel();
        let _ = sender.send(supported);
        Self {
            receiver,
            result: None,
        }
    }

    /// Non-blocking; `None` while the probe is still running.
    pub fn try_result(&mut self) -> Option<bool> {
        if self.result.is_none() {
            match self.receiver.try_recv() {
                Ok(supported) => self.result = Some(supported),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.result = Some(false),
            }
        }
        self.result
    }

    /// Blocks until the probe finishes.
    pub fn wait(self) -> bool {
        match self.result {
            Some(supported) => supported,
            None => self.receiver.recv().unwrap_or(false),
        }
    }
}

/// Checks whether `session_type` can run on this device. Only immersive AR
/// is supported; its probe runs on a detached thread.
pub fn is_session_supported_async<P: AvailabilityProbe>(
    mut probe: P,
    session_type: SessionType,
    policy: ProbePolicy,
) -> SupportQuery {
    if session_type != SessionType::ImmersiveAr {
        return SupportQuery::ready(false);
    }

    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let supported = poll_availability(&mut probe, policy);
        let _ = sender.send(supported);
    });
    SupportQuery {
        receiver,
        result: None,
    }
}

fn poll_availability<P: AvailabilityProbe>(probe: &mut P, policy: ProbePolicy) -> bool {
    for attempt in 0..policy.attempts {
        let availability = probe.check();
        if let Some(supported) = availability.verdict() {
            debug!(
                target: "anchorage_core::availability",
                "availability {availability:?} after {} checks",
                attempt + 1
            );
            return supported;
        }
        thread::sleep(policy.interval);
    }
    warn!(
        target: "anchorage_core::availability",
        "availability still unknown after {} checks",
        policy.attempts
    );
    false
}
