use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Digest32;
use crate::error::{ApiError, StateError, ValidationError};
use crate::lifecycle::LifecycleController;

#[derive(Deserialize)]
pub struct OrderSecretQuery {
    pub resolver: String,
}

#[derive(Serialize)]
pub struct OrderSecretResponse {
    pub reveal_tx_hash: Option<String>,
    pub revealed_at: Option<DateTime<Utc>>,
}

/// Discloses the reveal receipt only to the currently committed
/// resolver — the preimage itself is never returned here, it is
/// disclosed through the `SecretBroadcast` once competition opens.
pub async fn order_secret(
    State(controller): State<Arc<LifecycleController>>,
    Path(order_id): Path<String>,
    Query(query): Query<OrderSecretQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = Digest32::from_hex(&order_id).map_err(|_| ValidationError::Malformed("orderId".into()))?;
    let order = controller
        .store
        .get(order_id)
        .await
        .map_err(|_| StateError::NotFound(order_id.to_hex()))?;

    match &order.resolver {
        Some(resolver) if resolver == &query.resolver => {}
        Some(committed) => {
            return Err(StateError::NotOwningResolver { given: query.resolver, committed: committed.clone() }.into())
        }
        None => return Err(StateError::NotOwningResolver { given: query.resolver, committed: String::new() }.into()),
    }

    if order.secret_revealed_at.is_none() {
        return Err(StateError::WrongStatus {
            order: order_id.to_hex(),
            actual: order.status,
            expected: vec![crate::domain::OrderStatus::Completed],
        }
        .into());
    }

    Ok(Json(OrderSecretResponse { reveal_tx_hash: order.secret_reveal_tx, revealed_at: order.secret_revealed_at }))
}
