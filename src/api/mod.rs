//! HTTP surface.
//!
//! | Method | Path | Body / result |
//! |--------|------|---------------|
//! | POST | /api/retirements | `{num_allowances, message?, wallet}` → `{order_id, serial_numbers}` |
//! | POST | /api/retirements/confirm | `{order_id, tx_hash}` → `{status: "accepted"}` |
//! | GET | /api/retirements/status/{order_id} | `{status, tx_hash?, serial_numbers?, reward_tx_hash?}` |
//! | DELETE | /api/retirements/{order_id} | releases a pending order |
//! | GET | /api/retirements/history?limit= | `{retirements: [...]}` |
//! | GET | /api/stock | `{available, reserved, retired, total}` |
//! | GET | /health | `{status}` |

pub mod error;
mod retirements;

pub use error::{ApiResult, AppError};

use crate::clients::InventoryClient;
use crate::history::HistoryReader;
use crate::reservation::ReservationService;
use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;

pub struct AppState {
    pub reservations: ReservationService,
    pub history: HistoryReader,
    pub inventory: InventoryClient,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/retirements", post(retirements::create))
        .route("/api/retirements/confirm", post(retirements::confirm))
        .route("/api/retirements/status/{order_id}", get(retirements::status))
        .route("/api/retirements/{order_id}", delete(retirements::cancel))
        .route("/api/retirements/history", get(retirements::history))
        .route("/api/stock", get(stock))
        .route("/health", get(health))
        .with_state(state)
}

async fn stock(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let stock = state.inventory.stock().await?;
    Ok(Json(serde_json::json!({
        "available": stock.available,
        "reserved": stock.reserved,
        "retired": stock.retired,
        "total": stock.total(),
    })))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let inventory_ok = state.inventory.stock().await.is_ok();
    let status = if inventory_ok { "ok" } else { "degraded" };
    Json(serde_json::json!({ "status": status }))
}

impl AppState {
    pub fn new(
        reservations: ReservationService,
        history: HistoryReader,
        inventory: InventoryClient,
    ) -> Arc<Self> {
        Arc::new(Self {
            reservations,
            history,
            inventory,
        })
    }
}
