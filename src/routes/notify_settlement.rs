use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::Digest32;
use crate::error::{ApiError, ValidationError};
use crate::lifecycle::LifecycleController;

#[derive(Deserialize)]
pub struct NotifySettlementRequest {
    pub resolver: String,
    pub dst_token_amount: u128,
    pub dst_tx_hash: String,
}

#[derive(Serialize)]
pub struct NotifySettlementResponse {
    pub success: bool,
}

pub async fn notify_settlement(
    State(controller): State<Arc<LifecycleController>>,
    Path(order_id): Path<String>,
    Json(req): Json<NotifySettlementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = Digest32::from_hex(&order_id).map_err(|_| ValidationError::Malformed("orderId".into()))?;
    controller
        .notify_settlement(order_id, &req.resolver, req.dst_token_amount, req.dst_tx_hash)
        .await?;
    Ok(Json(NotifySettlementResponse { success: true }))
}
