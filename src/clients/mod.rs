//! Typed clients for the crate's actors.

mod inventory_client;
mod monitor_client;

pub use inventory_client::InventoryClient;
pub use monitor_client::MonitorClient;
