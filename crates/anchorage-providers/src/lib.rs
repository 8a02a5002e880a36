//! Stand-ins for the native pieces an anchorage session runs on: a scripted
//! AR SDK with reference accounting, a headless compositor and a scripted
//! availability probe.

pub mod availability;
pub mod compositor;
pub mod ledger;
pub mod scenario;
pub mod simulated;

pub use availability::ScriptedAvailability;
pub use compositor::HeadlessCompositor;
pub use ledger::{ObjectKind, ReferenceLedger};
pub use scenario::{PoseSpec, ScriptedWorld, WorldEvent};
pub use simulated::{FutureKind, SimulatedSdk, SimulatedWorld};
