//! Inventory store and order ledger.
//!
//! [`storage`] holds the durable table of allowance units; [`ledger`] runs it
//! behind an actor; order status is always derived from units by
//! [`OrderView::project`](crate::model::OrderView::project).

mod actions;
pub mod error;
pub mod ledger;
pub mod storage;

pub use actions::*;
pub use error::*;
pub use ledger::InventoryLedger;
pub use storage::{InventoryStorage, StorageError, StorageResult};

use crate::clients::InventoryClient;
use actor_framework::ServiceActor;

/// Creates the inventory actor over `storage` and its client.
pub fn new(storage: InventoryStorage) -> (ServiceActor<InventoryLedger>, InventoryClient) {
    let (actor, generic_client) = ServiceActor::new(64, InventoryLedger::new(storage));
    (actor, InventoryClient::new(generic_client))
}
