use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use crate::domain::Digest32;
use crate::error::{ApiError, StateError, ValidationError};
use crate::lifecycle::LifecycleController;
use crate::pricing;

pub async fn order_status(
    State(controller): State<Arc<LifecycleController>>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = Digest32::from_hex(&order_id).map_err(|_| ValidationError::Malformed("orderId".into()))?;
    let order = controller
        .store
        .get(order_id)
        .await
        .map_err(|_| StateError::NotFound(order_id.to_hex()))?;
    let now = Utc::now();
    Ok(Json(order.to_broadcast(pricing::current_price(&order.auction, now), now)))
}
