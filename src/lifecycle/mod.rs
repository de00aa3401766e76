//! # System Lifecycle
//!
//! Starts the actors in dependency order, wires their clients together through
//! context injection, and shuts them down in reverse.
//!
//! ```text
//!   InventoryLedger  (Context = ())
//!        ▲
//!        │ InventoryClient
//!   MonitorRegistry  (Context = MonitorDeps)
//!        ▲
//!        │ MonitorClient + InventoryClient
//!   Sweeper, ReservationService, HistoryReader
//! ```
//!
//! Start-up re-arms monitors for orders that were in flight when the process
//! last stopped.

mod system;

pub use system::{Collaborators, RetirementSystem, SystemError};
