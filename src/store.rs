//! Order Store (C2). Durable mapping from order-id to order record,
//! status-indexed queries, audit trail, secret storage isolated from
//! the broadcast payload. This build ships the `InMemoryOrderStore`
//! satisfying the full contract; a durable backend slots in behind the
//! same trait without the Lifecycle Controller noticing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::domain::{CommitmentStatus, Digest32, Order, OrderStatus, ResolverCommitment, Secret};
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Default)]
pub struct StoreStats {
    pub total_orders: usize,
    pub by_status: HashMap<String, usize>,
    pub total_commitments: usize,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn save(&self, order: Order) -> Result<(), StoreError>;
    async fn get(&self, id: Digest32) -> Result<Order, StoreError>;
    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError>;
    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError>;
    async fn expired_commitments(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError>;
    async fn pending_reveal(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError>;
    async fn save_secret(&self, secret: Secret) -> Result<(), StoreError>;
    async fn get_secret(&self, order_id: Digest32) -> Result<Secret, StoreError>;
    async fn mark_revealed(&self, order_id: Digest32, at: DateTime<Utc>) -> Result<(), StoreError>;
    async fn save_commitment(&self, commitment: ResolverCommitment) -> Result<(), StoreError>;
    async fn update_commitment_status(
        &self,
        order_id: Digest32,
        resolver: &str,
        status: CommitmentStatus,
    ) -> Result<(), StoreError>;
    async fn stats(&self) -> Result<StoreStats, StoreError>;
    async fn prune(&self, days: u64) -> Result<usize, StoreError>;
}

/// `DashMap`-indexed implementation. Point-in-time reads on a single
/// order are always consistent (a `DashMap` entry read is atomic with
/// respect to other entry operations); list queries iterate the whole
/// map and so are the "eventually consistent" reads the spec allows.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<Digest32, Order>,
    secrets: DashMap<Digest32, Secret>,
    commitments: DashMap<Digest32, Vec<ResolverCommitment>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save(&self, order: Order) -> Result<(), StoreError> {
        self.orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: Digest32) -> Result<Order, StoreError> {
        self.orders
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_hex()))
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.clone())
            .collect())
    }

    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .iter()
            .filter(|r| r.status == OrderStatus::Active && now > r.expires_at)
            .map(|r| r.clone())
            .collect())
    }

    async fn expired_commitments(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .iter()
            .filter(|r| {
                r.status == OrderStatus::Committed
                    && r.commitment_deadline.is_some_and(|d| now > d)
            })
            .map(|r| r.clone())
            .collect())
    }

    async fn pending_reveal(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .iter()
            .filter(|r| {
                r.status == OrderStatus::Settling
                    && r.src_settlement_tx.is_some()
                    && r.secret_revealed_at.is_none()
                    && r.funds_moved_at
                        .is_some_and(|t| (now - t).num_seconds() > 120)
            })
            .map(|r| r.clone())
            .collect())
    }

    async fn save_secret(&self, secret: Secret) -> Result<(), StoreError> {
        self.secrets.insert(secret.order_id, secret);
        Ok(())
    }

    async fn get_secret(&self, order_id: Digest32) -> Result<Secret, StoreError> {
        self.secrets
            .get(&order_id)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::SecretNotFound(order_id.to_hex()))
    }

    async fn mark_revealed(&self, order_id: Digest32, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut secret = self
            .secrets
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::SecretNotFound(order_id.to_hex()))?;
        secret.revealed_at = Some(at);
        Ok(())
    }

    async fn save_commitment(&self, commitment: ResolverCommitment) -> Result<(), StoreError> {
        self.commitments.entry(commitment.order_id).or_default().push(commitment);
        Ok(())
    }

    async fn update_commitment_status(
        &self,
        order_id: Digest32,
        resolver: &str,
        status: CommitmentStatus,
    ) -> Result<(), StoreError> {
        if let Some(mut rows) = self.commitments.get_mut(&order_id) {
            if let Some(row) = rows
                .iter_mut()
                .rev()
                .find(|r| r.resolver == resolver && r.status == CommitmentStatus::Active)
            {
                row.status = status;
            }
        }
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let mut by_status = HashMap::new();
        for r in self.orders.iter() {
            *by_status.entry(format!("{:?}", r.status)).or_insert(0) += 1;
        }
        let total_commitments = self.commitments.iter().map(|r| r.value().len()).sum();
        Ok(StoreStats {
            total_orders: self.orders.len(),
            by_status,
            total_commitments,
        })
    }

    async fn prune(&self, days: u64) -> Result<usize, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        let to_remove: Vec<Digest32> = self
            .orders
            .iter()
            .filter(|r| {
                matches!(r.status, OrderStatus::Completed | OrderStatus::Failed) && r.updated_at < cutoff
            })
            .map(|r| r.id)
            .collect();
        for id in &to_remove {
            self.orders.remove(id);
            self.secrets.remove(id);
            self.commitments.remove(id);
        }
        Ok(to_remove.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuctionParams, Intent};

    fn sample_order(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: Digest32([9u8; 32]),
            intent: Intent {
                maker: "0xA".into(),
                src_chain: 84532,
                src_token: "0xT1".into(),
                src_amount: 1_000_000,
                dst_chain: 421614,
                dst_token: "0xT2".into(),
                secret_hash: Digest32([1u8; 32]),
                min_acceptable_price: 900_000,
                order_duration_secs: 300,
                nonce: 1,
                deadline: now + chrono::Duration::days(1),
            },
            status,
            auction: AuctionParams { start_price: 1_000_000, end_price: 900_000, duration_secs: 60, start_time: now },
            market_price: 1_000_000,
            resolver: None,
            committed_price: None,
            commitment_time: None,
            commitment_deadline: None,
            src_escrow: None,
            dst_escrow: None,
            funds_moved_at: None,
            src_settlement_tx: None,
            dst_settlement_tx: None,
            dst_amount: None,
            secret_revealed_at: None,
            secret_reveal_tx: None,
            competition_deadline: None,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(300),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_then_get_roundtrips() {
        let store = InMemoryOrderStore::new();
        let order = sample_order(OrderStatus::Active);
        store.save(order.clone()).await.unwrap();
        let fetched = store.get(order.id).await.unwrap();
        assert_eq!(fetched.id, order.id);
    }

    #[tokio::test]
    async fn expired_only_returns_active_past_expiry() {
        let store = InMemoryOrderStore::new();
        let mut order = sample_order(OrderStatus::Active);
        order.expires_at = Utc::now() - chrono::Duration::seconds(1);
        store.save(order.clone()).await.unwrap();
        let expired = store.expired(Utc::now()).await.unwrap();
        assert_eq!(expired.len(), 1);
    }

    #[tokio::test]
    async fn prune_removes_only_terminal_old_orders() {
        let store = InMemoryOrderStore::new();
        let mut order = sample_order(OrderStatus::Completed);
        order.updated_at = Utc::now() - chrono::Duration::days(31);
        store.save(order.clone()).await.unwrap();
        let removed = store.prune(30).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get(order.id).await.is_err());
    }

    #[tokio::test]
    async fn commitment_audit_trail_is_append_only() {
        let store = InMemoryOrderStore::new();
        let order_id = Digest32([3u8; 32]);
        let c1 = ResolverCommitment::new(order_id, "0xR1".into(), 950_000, Utc::now());
        store.save_commitment(c1).await.unwrap();
        store.update_commitment_status(order_id, "0xR1", CommitmentStatus::Failed).await.unwrap();
        let c2 = ResolverCommitment::new(order_id, "0xR2".into(), 940_000, Utc::now());
        store.save_commitment(c2).await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_commitments, 2);
    }
}
