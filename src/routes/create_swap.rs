use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Digest32, Intent};
use crate::error::{ApiError, ValidationError};
use crate::lifecycle::LifecycleController;

#[derive(Deserialize)]
pub struct CreateSwapRequest {
    pub intent: Intent,
    pub signature: String,
    pub preimage: String,
}

#[derive(Serialize)]
pub struct CreateSwapResponse {
    pub order_id: String,
    pub market_price: u128,
    pub expires_at: DateTime<Utc>,
}

fn parse_signature(s: &str) -> Result<[u8; 65], ValidationError> {
    let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|_| ValidationError::BadSignature)?;
    bytes.try_into().map_err(|_| ValidationError::BadSignature)
}

pub async fn create_swap(
    State(controller): State<Arc<LifecycleController>>,
    Json(req): Json<CreateSwapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signature = parse_signature(&req.signature)?;
    let preimage = Digest32::from_hex(&req.preimage).map_err(|_| ValidationError::Malformed("preimage".into()))?;

    let (order_id, market_price, expires_at) = controller.admit(req.intent, signature, preimage).await?;

    Ok(Json(CreateSwapResponse { order_id: order_id.to_hex(), market_price, expires_at }))
}
