pub mod active_orders;
pub mod auction_price;
pub mod commit_resolver;
pub mod create_swap;
pub mod escrows_ready;
pub mod notify_settlement;
pub mod order_secret;
pub mod order_status;
pub mod rescue_order;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::lifecycle::LifecycleController;

pub fn router(controller: Arc<LifecycleController>) -> Router {
    Router::new()
        .route("/api/swaps", post(create_swap::create_swap))
        .route("/api/swaps/{order_id}/commit", post(commit_resolver::commit_resolver))
        .route("/api/swaps/{order_id}/escrows-ready", post(escrows_ready::escrows_ready))
        .route("/api/swaps/{order_id}/settlement", post(notify_settlement::notify_settlement))
        .route("/api/swaps/{order_id}/rescue", post(rescue_order::rescue_order))
        .route("/api/swaps/{order_id}", get(order_status::order_status))
        .route("/api/swaps/{order_id}/price", get(auction_price::auction_price))
        .route("/api/swaps/{order_id}/secret", get(order_secret::order_secret))
        .route("/api/swaps", get(active_orders::active_orders))
        .with_state(controller)
}
