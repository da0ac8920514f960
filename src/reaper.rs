//! Timer/Reaper (C7). Polls the Order Store on a fixed interval and
//! drives the clock-triggered transitions the Lifecycle Controller
//! cannot discover on its own: nothing calls `OrderExpired` or
//! `CommitmentLapsed`, time just passes.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::retry_with_backoff;
use crate::lifecycle::LifecycleController;
use crate::store::OrderStore;

pub struct Reaper {
    controller: Arc<LifecycleController>,
    interval: Duration,
}

impl Reaper {
    pub fn new(controller: Arc<LifecycleController>, interval: Duration) -> Self {
        Self { controller, interval }
    }

    /// Runs forever. Intended to be `tokio::spawn`ed once at startup.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep().await {
                error!(error = %e, "reaper sweep failed");
            }
        }
    }

    async fn sweep(&self) -> Result<(), crate::error::CoordinatorError> {
        let now = chrono::Utc::now();

        let store = &self.controller.store;
        let expired = retry_with_backoff(|| store.expired(now)).await.map_err(crate::error::CoordinatorError::Store)?;
        for order in &expired {
            if let Err(e) = self.controller.order_expired(order.id).await {
                warn!(order_id = %order.id, error = %e, "OrderExpired transition failed");
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "reaped expired orders");
        }

        let lapsed = retry_with_backoff(|| store.expired_commitments(now))
            .await
            .map_err(crate::error::CoordinatorError::Store)?;
        for order in &lapsed {
            if let Err(e) = self.controller.commitment_lapsed(order.id).await {
                warn!(order_id = %order.id, error = %e, "CommitmentLapsed transition failed");
            }
        }
        if !lapsed.is_empty() {
            info!(count = lapsed.len(), "reaped lapsed commitments");
        }

        let competing = retry_with_backoff(|| store.list_by_status(crate::domain::OrderStatus::Competing))
            .await
            .map_err(crate::error::CoordinatorError::Store)?;
        for order in &competing {
            if let Some(deadline) = order.competition_deadline {
                if now > deadline {
                    if let Err(e) = self.controller.competition_timeout(order.id).await {
                        warn!(order_id = %order.id, error = %e, "CompetitionTimeout transition failed");
                    }
                }
            }
        }

        let stuck_reveals = retry_with_backoff(|| store.pending_reveal(now))
            .await
            .map_err(crate::error::CoordinatorError::Store)?;
        for order in &stuck_reveals {
            warn!(order_id = %order.id, "settlement stuck without a reveal for over 120s, forcing competition publish");
            if let Err(e) = self.controller.publish_secret_for_competition(order.id).await {
                warn!(order_id = %order.id, error = %e, "forced publish_secret_for_competition failed");
            }
        }

        Ok(())
    }
}

/// Daily retention sweep, run on its own long-period loop separate from
/// the fast reaper interval.
pub async fn run_retention_sweep(store: Arc<dyn OrderStore>, retention_days: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
    loop {
        ticker.tick().await;
        match store.prune(retention_days).await {
            Ok(n) if n > 0 => info!(pruned = n, "retention sweep pruned terminal orders"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "retention sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryMessageBus;
    use crate::chain::mock::MockChainGateway;
    use crate::config::Config;
    use crate::domain::{AuctionParams, Digest32, Intent, Order, OrderStatus};
    use crate::lifecycle::FixedPriceOracle;
    use crate::store::InMemoryOrderStore;
    use chrono::Utc;

    fn sample_order(status: OrderStatus, expires_at: chrono::DateTime<Utc>) -> Order {
        let now = Utc::now();
        Order {
            id: Digest32([11u8; 32]),
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
            expires_at,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn sweep_expires_active_orders_past_deadline() {
        let store = InMemoryOrderStore::new();
        let bus = Arc::new(InMemoryMessageBus::new());
        let chain = Arc::new(MockChainGateway::new());
        let oracle = Arc::new(FixedPriceOracle(1_000_000));
        let controller = Arc::new(LifecycleController::new(store.clone(), bus, chain, oracle, Config::from_env()));

        let order = sample_order(OrderStatus::Active, Utc::now() - chrono::Duration::seconds(1));
        store.save(order.clone()).await.unwrap();

        let reaper = Reaper::new(controller, Duration::from_secs(10));
        reaper.sweep().await.unwrap();

        let reloaded = store.get(order.id).await.unwrap();
        assert_eq!(reloaded.status, OrderStatus::Failed);
    }
}
