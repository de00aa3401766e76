use super::error::{ApiResult, AppError};
use super::AppState;
use crate::inventory::InventoryError;
use crate::model::{OrderId, RetirementRecord, SerialNumber, TxHash};
use crate::reservation::{OrderStatusReport, ReservationError, ReservationRequest};
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateRetirement {
    pub num_allowances: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub wallet: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRetirementResponse {
    pub order_id: OrderId,
    pub serial_numbers: Vec<SerialNumber>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPayment {
    pub order_id: String,
    pub tx_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub retirements: Vec<RetirementRecord>,
}

fn parse_order_id(raw: &str) -> ApiResult<OrderId> {
    raw.parse().map_err(|e: crate::model::IdentifierError| AppError::Validation(e.to_string()))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateRetirement>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateRetirementResponse>)> {
    let Json(body) = body?;
    let request = ReservationRequest::new(
        body.num_allowances,
        body.wallet,
        body.message.unwrap_or_default(),
    );
    let reservation = state.reservations.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateRetirementResponse {
            order_id: reservation.order_id,
            serial_numbers: reservation.serial_numbers,
        }),
    ))
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ConfirmPayment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let Json(body) = body?;
    let order_id = parse_order_id(&body.order_id)?;
    let tx_hash = TxHash::parse(&body.tx_hash).map_err(|e| AppError::Validation(e.to_string()))?;
    // Confirming an unknown order is a conflict, like confirming one that is
    // no longer pending.
    state
        .reservations
        .record_payment_reference(order_id, tx_hash)
        .await
        .map_err(|e| match e {
            ReservationError::Inventory(InventoryError::OrderNotFound(_)) => {
                AppError::Conflict("Order not found".to_string())
            }
            e => e.into(),
        })?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "accepted" })),
    ))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    order_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<OrderStatusReport>> {
    let Path(order_id) = order_id?;
    let order_id = parse_order_id(&order_id)?;
    Ok(Json(state.reservations.order_status(order_id).await?))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    order_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Path(order_id) = order_id?;
    let order_id = parse_order_id(&order_id)?;
    let released = state.reservations.cancel(order_id).await?;
    Ok(Json(serde_json::json!({ "released": released })))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<HistoryResponse>> {
    let Query(query) = query?;
    let retirements = state.history.list_retired(query.limit).await?;
    Ok(Json(HistoryResponse { retirements }))
}
