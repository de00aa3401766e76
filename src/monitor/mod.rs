//! Order monitoring: a pure payment state machine, the tasks that drive it,
//! a registry enforcing one task per order, and the stale-reservation sweeper.

pub mod machine;
pub mod registry;
pub mod sweeper;
pub mod task;

pub use machine::{PaymentWatch, WatchEvent, WatchState};
pub use registry::{MonitorAction, MonitorActionResult, MonitorError, MonitorKind, MonitorRegistry};
pub use sweeper::{recover_in_flight, SweepSummary, Sweeper};
pub use task::{MonitorDeps, MonitorOutcome, PollSettings};

use crate::clients::MonitorClient;
use actor_framework::ServiceActor;

/// Creates the monitor registry actor and its client. Its context is the
/// [`MonitorDeps`] passed to `run`.
pub fn new() -> (ServiceActor<MonitorRegistry>, MonitorClient) {
    let (actor, generic_client) = ServiceActor::new(64, MonitorRegistry::new());
    (actor, MonitorClient::new(generic_client))
}
