use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Digest32;
use crate::error::{ApiError, ValidationError};
use crate::lifecycle::LifecycleController;

#[derive(Deserialize)]
pub struct CommitRequest {
    pub resolver: String,
    pub accepted_price: u128,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CommitResponse {
    pub success: bool,
    pub current_price: u128,
    pub expected_dst_amount: u128,
}

pub async fn commit_resolver(
    State(controller): State<Arc<LifecycleController>>,
    Path(order_id): Path<String>,
    Json(req): Json<CommitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = Digest32::from_hex(&order_id).map_err(|_| ValidationError::Malformed("orderId".into()))?;
    let receipt = controller.commit(order_id, req.resolver, req.accepted_price, req.timestamp).await?;
    Ok(Json(CommitResponse {
        success: receipt.success,
        current_price: receipt.current_price,
        expected_dst_amount: receipt.expected_taker_amount,
    }))
}
