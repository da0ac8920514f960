//! Message Bus (C3). Two fan-out topics — `OrderBroadcast` to the
//! resolver fleet, `SecretBroadcast` to start the reveal competition —
//! each at-least-once. Consumers must be idempotent on
//! `(order_id, type)`, which is why neither payload carries anything
//! that isn't safe to process twice (the secret broadcast itself is
//! naturally idempotent: revealing twice with the same preimage is a
//! no-op on-chain).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::order::OrderBroadcast;
use crate::domain::Digest32;
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretBroadcast {
    pub order_id: Digest32,
    pub preimage: Digest32,
    pub resolver_address: String,
    pub src_escrow: String,
    pub dst_escrow: String,
    pub src_chain: u64,
    pub dst_chain: u64,
    pub src_amount: u128,
    pub dst_amount: u128,
    pub timestamp: DateTime<Utc>,
    pub competition_deadline: DateTime<Utc>,
}

#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish_order(&self, broadcast: OrderBroadcast) -> Result<(), StoreError>;
    async fn publish_secret(&self, secret: SecretBroadcast) -> Result<(), StoreError>;
}

/// `tokio::sync::broadcast`-channel backed bus. A lagging receiver
/// sees `RecvError::Lagged` rather than silently missing messages,
/// which is the in-process analogue of "at-least-once" (a consumer
/// that lags must re-derive missed state from the Order Store, not
/// assume it saw every message).
pub struct InMemoryMessageBus {
    orders_tx: broadcast::Sender<OrderBroadcast>,
    secrets_tx: broadcast::Sender<SecretBroadcast>,
}

impl InMemoryMessageBus {
    pub fn new() -> Self {
        let (orders_tx, _) = broadcast::channel(1024);
        let (secrets_tx, _) = broadcast::channel(1024);
        Self { orders_tx, secrets_tx }
    }

    pub fn subscribe_orders(&self) -> broadcast::Receiver<OrderBroadcast> {
        self.orders_tx.subscribe()
    }

    pub fn subscribe_secrets(&self) -> broadcast::Receiver<SecretBroadcast> {
        self.secrets_tx.subscribe()
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish_order(&self, broadcast: OrderBroadcast) -> Result<(), StoreError> {
        // No subscribers yet is not an error: fan-out semantics mean a
        // topic with zero current listeners has simply delivered to
        // everyone currently listening (nobody).
        let _ = self.orders_tx.send(broadcast);
        Ok(())
    }

    async fn publish_secret(&self, secret: SecretBroadcast) -> Result<(), StoreError> {
        let _ = self.secrets_tx.send(secret);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_order_reaches_subscriber() {
        let bus = InMemoryMessageBus::new();
        let mut rx = bus.subscribe_orders();
        let now = Utc::now();
        let msg = OrderBroadcast {
            order_id: Digest32([1u8; 32]),
            maker: "0xA".into(),
            src_chain: 1,
            src_token: "0xT".into(),
            src_amount: 1,
            dst_chain: 2,
            dst_token: "0xU".into(),
            status: crate::domain::OrderStatus::Active,
            auction_start_price: 1,
            auction_end_price: 1,
            auction_duration_secs: 1,
            current_price: 1,
            timestamp: now,
            expires_at: now,
        };
        bus.publish_order(msg.clone()).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.order_id, msg.order_id);
    }
}
