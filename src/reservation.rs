//! Reservation service: validates requests, claims inventory, and hands
//! orders to the monitors.

use crate::clients::{InventoryClient, MonitorClient};
use crate::inventory::InventoryError;
use crate::model::{OrderId, OrderStatus, SerialNumber, TxHash, WalletAddress};
use crate::monitor::MonitorError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub const MIN_COUNT: i64 = 1;
pub const MAX_COUNT: i64 = 99;
pub const MAX_MESSAGE_CHARS: usize = 100;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReservationError {
    /// The request is malformed. Nothing was touched.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

/// Unvalidated reservation input as it arrives from a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub count: i64,
    pub wallet: String,
    #[serde(default)]
    pub message: String,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReservation {
    pub count: u32,
    pub wallet: WalletAddress,
    pub message: String,
}

impl ReservationRequest {
    pub fn new(count: i64, wallet: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            count,
            wallet: wallet.into(),
            message: message.into(),
        }
    }

    pub fn validate(&self) -> Result<ValidReservation, ReservationError> {
        if !(MIN_COUNT..=MAX_COUNT).contains(&self.count) {
            return Err(ReservationError::Validation(format!(
                "count must be between {MIN_COUNT} and {MAX_COUNT}"
            )));
        }
        let wallet = WalletAddress::parse(&self.wallet)
            .map_err(|e| ReservationError::Validation(e.to_string()))?;
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ReservationError::Validation(format!(
                "message must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }
        Ok(ValidReservation {
            count: self.count as u32,
            wallet,
            message: self.message.clone(),
        })
    }
}

/// A successful reservation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    pub order_id: OrderId,
    pub serial_numbers: Vec<SerialNumber>,
}

/// What a caller may see of an order.
///
/// Serial numbers are disclosed only once the order is completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStatusReport {
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_numbers: Option<Vec<SerialNumber>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_tx_hash: Option<String>,
}

#[derive(Clone)]
pub struct ReservationService {
    inventory: InventoryClient,
    monitors: MonitorClient,
}

impl ReservationService {
    pub fn new(inventory: InventoryClient, monitors: MonitorClient) -> Self {
        Self {
            inventory,
            monitors,
        }
    }

    /// Reserves units for a new order with a generated id.
    pub async fn create(&self, request: ReservationRequest) -> Result<Reservation, ReservationError> {
        let order_id = OrderId::new();
        let serial_numbers = self.reserve(&request, order_id).await?;
        Ok(Reservation {
            order_id,
            serial_numbers,
        })
    }

    /// Claims `request.count` units for `order_id` in one atomic step.
    ///
    /// On success the reservation hold is armed, so an order that never sees a
    /// payment reference is released after the monitor budget.
    #[instrument(skip(self, request), fields(count = request.count))]
    pub async fn reserve(
        &self,
        request: &ReservationRequest,
        order_id: OrderId,
    ) -> Result<Vec<SerialNumber>, ReservationError> {
        let valid = request.validate()?;
        let serials = self
            .inventory
            .claim(order_id, valid.count, valid.wallet, valid.message)
            .await?;

        if let Err(e) = self.monitors.start_hold(order_id).await {
            warn!(%order_id, error = %e, "Reservation hold not armed, sweeper will clean up");
        }
        Ok(serials)
    }

    /// Records the payment reference of a pending order and starts watching it.
    #[instrument(skip(self))]
    pub async fn record_payment_reference(
        &self,
        order_id: OrderId,
        tx_hash: TxHash,
    ) -> Result<(), ReservationError> {
        let view = self.inventory.stamp_payment(order_id, tx_hash.clone()).await?;
        if let Err(e) = self
            .monitors
            .start_payment(order_id, tx_hash, view.count())
            .await
        {
            error!(%order_id, error = %e, "Payment recorded but monitor not started");
            return Err(e.into());
        }
        info!(%order_id, units = view.count(), "Payment accepted for monitoring");
        Ok(())
    }

    pub async fn order_status(&self, order_id: OrderId) -> Result<OrderStatusReport, ReservationError> {
        let view = self
            .inventory
            .order_view(order_id)
            .await?
            .ok_or(InventoryError::OrderNotFound(order_id))?;
        let serial_numbers = (view.status == OrderStatus::Completed).then_some(view.serials);
        Ok(OrderStatusReport {
            status: view.status,
            tx_hash: view.tx_hash,
            serial_numbers,
            reward_tx_hash: view.reward_tx_hash,
        })
    }

    /// Releases a pending order on request. Paid orders are left to their monitor.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<usize, ReservationError> {
        let released = self.inventory.release_if_pending(order_id).await?;
        if released == 0 {
            let err = match self.inventory.order_view(order_id).await? {
                None => InventoryError::OrderNotFound(order_id),
                Some(view) => InventoryError::InvalidState {
                    order_id,
                    status: view.status,
                    expected: OrderStatus::Pending,
                },
            };
            return Err(err.into());
        }
        if let Err(e) = self.monitors.cancel(order_id).await {
            warn!(%order_id, error = %e, "Could not cancel hold after release");
        }
        info!(%order_id, released, "Order cancelled");
        Ok(released)
    }
}
