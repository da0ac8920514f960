use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use crate::domain::{OrderBroadcast, OrderStatus};
use crate::error::ApiError;
use crate::lifecycle::LifecycleController;
use crate::pricing;

pub async fn active_orders(State(controller): State<Arc<LifecycleController>>) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let mut broadcasts: Vec<OrderBroadcast> = Vec::new();
    for status in [OrderStatus::Active, OrderStatus::Committed, OrderStatus::Settling, OrderStatus::Competing, OrderStatus::RescueAvailable] {
        let orders = controller.store.list_by_status(status).await.map_err(crate::error::CoordinatorError::Store)?;
        for order in orders {
            let price = pricing::current_price(&order.auction, now);
            broadcasts.push(order.to_broadcast(price, now));
        }
    }
    Ok(Json(broadcasts))
}
