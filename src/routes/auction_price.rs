use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::domain::Digest32;
use crate::error::{ApiError, StateError, ValidationError};
use crate::lifecycle::LifecycleController;
use crate::pricing;

#[derive(Serialize)]
pub struct AuctionPriceResponse {
    pub current_price: u128,
    pub maker_amount: u128,
    pub taker_amount: u128,
    pub time_remaining_secs: i64,
}

pub async fn auction_price(
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
    let current_price = pricing::current_price(&order.auction, now);

    let src_decimals = controller.chain.token_decimals(order.intent.src_chain, &order.intent.src_token).await.unwrap_or(18);
    let dst_decimals = controller.chain.token_decimals(order.intent.dst_chain, &order.intent.dst_token).await.unwrap_or(18);
    let taker_amount = pricing::token_amounts(order.intent.src_amount, src_decimals, dst_decimals, current_price);

    let deadline = order.auction.start_time + chrono::Duration::seconds(order.auction.duration_secs as i64);
    let time_remaining_secs = (deadline - now).num_seconds().max(0);

    Ok(Json(AuctionPriceResponse {
        current_price,
        maker_amount: order.intent.src_amount,
        taker_amount,
        time_remaining_secs,
    }))
}
