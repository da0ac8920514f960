use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::Digest32;
use crate::error::{ApiError, ValidationError};
use crate::lifecycle::LifecycleController;

#[derive(Deserialize)]
pub struct EscrowsReadyRequest {
    pub resolver: String,
    pub src_escrow: String,
    pub dst_escrow: String,
    /// Carried for audit purposes; the Chain Gateway re-derives fund
    /// state from the escrow address rather than trusting the tx hash.
    #[serde(default)]
    pub src_deposit_tx: Option<String>,
    #[serde(default)]
    pub dst_deposit_tx: Option<String>,
}

#[derive(Serialize)]
pub struct EscrowsReadyResponse {
    pub success: bool,
}

pub async fn escrows_ready(
    State(controller): State<Arc<LifecycleController>>,
    Path(order_id): Path<String>,
    Json(req): Json<EscrowsReadyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = Digest32::from_hex(&order_id).map_err(|_| ValidationError::Malformed("orderId".into()))?;
    controller
        .escrows_ready(order_id, &req.resolver, req.src_escrow, req.dst_escrow)
        .await?;
    Ok(Json(EscrowsReadyResponse { success: true }))
}
