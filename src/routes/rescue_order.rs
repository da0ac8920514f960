use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::Digest32;
use crate::error::{ApiError, ValidationError};
use crate::lifecycle::LifecycleController;

#[derive(Deserialize)]
pub struct RescueOrderRequest {
    pub resolver: String,
    pub accepted_price: u128,
}

#[derive(Serialize)]
pub struct RescueOrderResponse {
    pub success: bool,
    pub original_resolver: String,
}

pub async fn rescue_order(
    State(controller): State<Arc<LifecycleController>>,
    Path(order_id): Path<String>,
    Json(req): Json<RescueOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = Digest32::from_hex(&order_id).map_err(|_| ValidationError::Malformed("orderId".into()))?;
    let (original_resolver, receipt) = controller.rescue_order(order_id, req.resolver, req.accepted_price).await?;
    let _ = receipt;
    Ok(Json(RescueOrderResponse { success: true, original_resolver }))
}
