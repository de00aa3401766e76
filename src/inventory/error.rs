//! Error types for the inventory ledger.

use super::storage::StorageError;
use crate::model::{OrderId, OrderStatus};
use thiserror::Error;

/// Errors that can occur during inventory operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InventoryError {
    /// Fewer units are available than requested. Nothing was claimed.
    #[error("insufficient inventory, only {available} available")]
    InsufficientInventory { requested: u32, available: u64 },

    /// No unit carries this order id.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order exists but is in the wrong state for the operation.
    #[error("order {order_id} is {status}, expected {expected}")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
        expected: OrderStatus,
    },

    /// The order id is already in use.
    #[error("order {0} already exists")]
    DuplicateOrder(OrderId),

    /// The payment reference was already recorded for another order.
    #[error("payment {0} was already submitted")]
    PaymentReused(String),

    /// An underlying database error occurred.
    #[error("Inventory database error: {0}")]
    DatabaseError(String),

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<String> for InventoryError {
    fn from(msg: String) -> Self {
        InventoryError::ActorCommunicationError(msg)
    }
}

impl From<StorageError> for InventoryError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InsufficientInventory {
                requested,
                available,
            } => InventoryError::InsufficientInventory {
                requested,
                available,
            },
            StorageError::OrderNotFound(order_id) => InventoryError::OrderNotFound(order_id),
            StorageError::InvalidState {
                order_id,
                status,
                expected,
            } => InventoryError::InvalidState {
                order_id,
                status,
                expected,
            },
            StorageError::DuplicateOrder { order_id } => InventoryError::DuplicateOrder(order_id),
            StorageError::PaymentReused { tx_hash, .. } => {
                InventoryError::PaymentReused(tx_hash.to_string())
            }
            other => InventoryError::DatabaseError(other.to_string()),
        }
    }
}

impl InventoryError {
    /// Conflicts are caller-visible state errors, not infrastructure failures.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            InventoryError::InsufficientInventory { .. }
                | InventoryError::InvalidState { .. }
                | InventoryError::DuplicateOrder(_)
                | InventoryError::PaymentReused(_)
        )
    }
}
