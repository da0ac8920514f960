//! Lifecycle Controller (C6). The state machine. Every public method
//! acquires the per-order keyed lock before touching the store, so two
//! operations on the same order are never interleaved; operations on
//! distinct orders proceed independently.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{info, warn};

use crate::bus::{MessageBus, SecretBroadcast};
use crate::chain::ChainGateway;
use crate::config::Config;
use crate::domain::{
    AuctionParams, CommitmentStatus, Digest32, Intent, Order, OrderStatus, ResolverCommitment, Secret,
};
use crate::error::{retry_with_backoff, ChainError, CoordinatorError, StateError, ValidationError};
use crate::lock::KeyedLock;
use crate::pricing;
use crate::signature::{self, Domain};
use crate::store::OrderStore;

/// Price oracle port. Out of scope per the spec ("price-feed
/// production... treated as an oracle") — callers supply any
/// implementation, including a fixed-price stub for tests.
#[async_trait::async_trait]
pub trait PriceOracle: Send + Sync {
    async fn market_price(&self, src_token: &str, dst_token: &str) -> u128;
}

pub struct FixedPriceOracle(pub u128);

#[async_trait::async_trait]
impl PriceOracle for FixedPriceOracle {
    async fn market_price(&self, _src_token: &str, _dst_token: &str) -> u128 {
        self.0
    }
}

pub struct CommitReceipt {
    pub success: bool,
    pub current_price: u128,
    pub expected_maker_amount: u128,
    pub expected_taker_amount: u128,
}

pub struct LifecycleController {
    pub store: Arc<dyn OrderStore>,
    pub bus: Arc<dyn MessageBus>,
    pub chain: Arc<dyn ChainGateway>,
    pub oracle: Arc<dyn PriceOracle>,
    pub config: Config,
    pub locks: KeyedLock,
    /// Notified per-order when a settlement supervisor task should
    /// stop racing its own timers (e.g. the order was superseded).
    pub cancel: Arc<dashmap::DashMap<Digest32, Arc<tokio::sync::Notify>>>,
}

fn escrow_factory(chain: u64) -> String {
    format!("escrow-factory-{}", chain)
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn OrderStore>,
        bus: Arc<dyn MessageBus>,
        chain: Arc<dyn ChainGateway>,
        oracle: Arc<dyn PriceOracle>,
        config: Config,
    ) -> Self {
        Self {
            store,
            bus,
            chain,
            oracle,
            config,
            locks: KeyedLock::new(),
            cancel: Arc::new(dashmap::DashMap::new()),
        }
    }

    fn notify_for(&self, order_id: Digest32) -> Arc<tokio::sync::Notify> {
        self.cancel.entry(order_id).or_insert_with(|| Arc::new(tokio::sync::Notify::new())).clone()
    }

    /// `admit(intent, signature, preimage)`.
    pub async fn admit(
        self: &Arc<Self>,
        intent: Intent,
        signature: [u8; 65],
        preimage: Digest32,
    ) -> Result<(Digest32, u128, DateTime<Utc>), CoordinatorError> {
        let domain = Domain::for_intent(&intent, escrow_factory);
        let order_id = signature::verify(&intent, &domain, &signature)?;

        // Idempotent admit: resubmitting the identical (intent, signature,
        // preimage) must return the same order-id without mutating state.
        if let Ok(existing) = self.store.get(order_id).await {
            let existing_secret = self.store.get_secret(order_id).await.ok();
            let matches_preimage = existing_secret.map(|s| s.preimage == preimage).unwrap_or(false);
            if matches_preimage {
                return Ok((order_id, existing.market_price, existing.expires_at));
            }
            return Err(ValidationError::DuplicateMismatch.into());
        }

        let hash = sha3_hash(&preimage.0);
        if hash != intent.secret_hash {
            return Err(ValidationError::HashMismatch.into());
        }

        let allowance = self
            .chain
            .allowance(intent.src_chain, &intent.src_token, &intent.maker, &escrow_factory(intent.src_chain))
            .await?;
        if allowance < intent.src_amount {
            return Err(ValidationError::InsufficientAllowance { have: allowance, need: intent.src_amount }.into());
        }

        let market_price = self.oracle.market_price(&intent.src_token, &intent.dst_token).await;
        let start_price = market_price.max(intent.min_acceptable_price);
        let end_price = intent.min_acceptable_price;
        let now = Utc::now();

        let auction = AuctionParams {
            start_price,
            end_price,
            duration_secs: self.config.fast_auction_duration_secs,
            start_time: now,
        };

        let order = Order {
            id: order_id,
            intent: intent.clone(),
            status: OrderStatus::Active,
            auction,
            market_price,
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
            expires_at: now + ChronoDuration::seconds(intent.order_duration_secs as i64),
            updated_at: now,
        };

        self.store.save(order.clone()).await?;
        self.store.save_secret(Secret::new(order_id, preimage, hash, now)).await?;

        let broadcast = order.to_broadcast(pricing::current_price(&order.auction, now), now);
        self.bus.publish_order(broadcast).await.map_err(CoordinatorError::Store)?;

        info!(order_id = %order_id, "order admitted");
        Ok((order_id, market_price, order.expires_at))
    }

    /// `commit(orderId, resolver, quoted, now)`.
    pub async fn commit(
        self: &Arc<Self>,
        order_id: Digest32,
        resolver: String,
        quoted: u128,
        now: DateTime<Utc>,
    ) -> Result<CommitReceipt, CoordinatorError> {
        let _guard = self.locks.lock(order_id).await;
        let mut order = self.store.get(order_id).await?;

        if !matches!(order.status, OrderStatus::Active | OrderStatus::RescueAvailable) {
            return Err(StateError::WrongStatus {
                order: order_id.to_hex(),
                actual: order.status,
                expected: vec![OrderStatus::Active, OrderStatus::RescueAvailable],
            }
            .into());
        }

        pricing::validate_quote(&order.auction, quoted, now, self.config.quote_tolerance)?;

        if let Some(prev_resolver) = order.resolver.clone() {
            self.store
                .update_commitment_status(order_id, &prev_resolver, CommitmentStatus::Failed)
                .await
                .map_err(CoordinatorError::Store)?;
        }

        order.resolver = Some(resolver.clone());
        order.committed_price = Some(quoted);
        order.commitment_time = Some(now);
        order.commitment_deadline = Some(now + ChronoDuration::seconds(self.config.resolver_commitment_window_secs as i64));
        order.status = OrderStatus::Committed;
        order.updated_at = now;

        let src_decimals = self.chain.token_decimals(order.intent.src_chain, &order.intent.src_token).await.unwrap_or(18);
        let dst_decimals = self.chain.token_decimals(order.intent.dst_chain, &order.intent.dst_token).await.unwrap_or(18);
        let taker_amount = pricing::token_amounts(order.intent.src_amount, src_decimals, dst_decimals, quoted);

        self.store.save(order.clone()).await?;
        self.store
            .save_commitment(ResolverCommitment::new(order_id, resolver, quoted, now))
            .await
            .map_err(CoordinatorError::Store)?;

        info!(order_id = %order_id, %quoted, "resolver committed");

        Ok(CommitReceipt {
            success: true,
            current_price: quoted,
            expected_maker_amount: order.intent.src_amount,
            expected_taker_amount: taker_amount,
        })
    }

    /// `escrowsReady(orderId, resolver, srcEscrow, dstEscrow, srcDepositTx, dstDepositTx)`.
    pub async fn escrows_ready(
        self: &Arc<Self>,
        order_id: Digest32,
        resolver: &str,
        src_escrow: String,
        dst_escrow: String,
    ) -> Result<(), CoordinatorError> {
        let _guard = self.locks.lock(order_id).await;
        let mut order = self.require_owned(order_id, resolver, &[OrderStatus::Committed]).await?;

        let min_src = self.config.min_safety_deposit_for(order.intent.src_chain);
        let min_dst = self.config.min_safety_deposit_for(order.intent.dst_chain);
        let src_balance = self.chain.escrow_balance(order.intent.src_chain, &src_escrow, None).await?;
        let dst_balance = self.chain.escrow_balance(order.intent.dst_chain, &dst_escrow, None).await?;
        if src_balance < min_src || dst_balance < min_dst {
            return Err(CoordinatorError::FundVerification(format!(
                "src safety deposit {src_balance} < {min_src} or dst {dst_balance} < {min_dst}"
            )));
        }

        order.src_escrow = Some(src_escrow);
        order.dst_escrow = Some(dst_escrow);
        order.updated_at = Utc::now();
        self.store.save(order.clone()).await?;

        info!(order_id = %order_id, "escrows ready, moving user funds");
        self.move_user_funds(order_id).await
    }

    /// `moveUserFunds(orderId)`.
    pub async fn move_user_funds(self: &Arc<Self>, order_id: Digest32) -> Result<(), CoordinatorError> {
        let mut order = self.store.get(order_id).await?;
        let tx_hash = self
            .chain
            .transfer_user_funds(order.intent.src_chain, order_id, &order.intent.maker, &order.intent.src_token, order.intent.src_amount)
            .await?;

        let now = Utc::now();
        order.status = OrderStatus::Settling;
        order.funds_moved_at = Some(now);
        order.src_settlement_tx = Some(tx_hash);
        order.updated_at = now;
        self.store.save(order).await?;

        info!(order_id = %order_id, "user funds moved, order settling");
        Ok(())
    }

    /// `notifySettlement(orderId, resolver, dstAmount, dstTxHash)`.
    /// Spawns the settlement supervisor task once verification passes.
    pub async fn notify_settlement(
        self: &Arc<Self>,
        order_id: Digest32,
        resolver: &str,
        dst_amount: u128,
        dst_tx_hash: String,
    ) -> Result<(), CoordinatorError> {
        let _guard = self.locks.lock(order_id).await;
        let mut order = self.require_owned(order_id, resolver, &[OrderStatus::Settling]).await?;

        let src_escrow = order.src_escrow.clone().ok_or_else(|| CoordinatorError::FundVerification("src escrow not recorded".into()))?;
        let dst_escrow = order.dst_escrow.clone().ok_or_else(|| CoordinatorError::FundVerification("dst escrow not recorded".into()))?;

        let src_balance = self.chain.escrow_balance(order.intent.src_chain, &src_escrow, Some(&order.intent.src_token)).await?;
        let dst_balance = self.chain.escrow_balance(order.intent.dst_chain, &dst_escrow, Some(&order.intent.dst_token)).await?;
        if src_balance < order.intent.src_amount {
            return Err(CoordinatorError::FundVerification(format!("src escrow {src_balance} < {}", order.intent.src_amount)));
        }
        if dst_balance < dst_amount {
            return Err(CoordinatorError::FundVerification(format!("dst escrow {dst_balance} < {dst_amount}")));
        }

        order.dst_settlement_tx = Some(dst_tx_hash.clone());
        order.dst_amount = Some(dst_amount);
        order.updated_at = Utc::now();
        self.store.save(order.clone()).await?;

        info!(order_id = %order_id, "settlement verified, spawning reveal supervisor");
        self.spawn_settlement_supervisor(order_id, order.intent.dst_chain, dst_tx_hash);
        Ok(())
    }

    /// Waits for the destination settlement tx to reach the chain's
    /// configured confirmation depth (spec.md: "await confirmations and
    /// perform the timed reveal"), then pauses `secretRevealDelay`
    /// before handing off to `publishSecretForCompetition`. Transient
    /// chain errors are retried with bounded back-off; the whole wait
    /// is cancelled if the order is superseded in the meantime.
    async fn await_settlement_and_reveal(
        self: &Arc<Self>,
        order_id: Digest32,
        dst_chain: u64,
        dst_tx_hash: String,
    ) -> Result<(), CoordinatorError> {
        let needed = self.config.confirmations_for(dst_chain);
        let chain = self.chain.clone();
        retry_with_backoff(|| {
            let chain = chain.clone();
            let tx_hash = dst_tx_hash.clone();
            async move { chain.await_confirmations(dst_chain, &tx_hash, needed).await }
        })
        .await?;

        tokio::time::sleep(std::time::Duration::from_secs(self.config.secret_reveal_delay_secs)).await;
        self.publish_secret_for_competition(order_id).await
    }

    fn spawn_settlement_supervisor(self: &Arc<Self>, order_id: Digest32, dst_chain: u64, dst_tx_hash: String) {
        let controller = self.clone();
        let notify = self.notify_for(order_id);
        tokio::spawn(async move {
            tokio::select! {
                result = controller.await_settlement_and_reveal(order_id, dst_chain, dst_tx_hash) => {
                    if let Err(e) = result {
                        warn!(order_id = %order_id, error = %e, "settlement supervisor failed");
                    }
                }
                _ = notify.notified() => {
                    info!(order_id = %order_id, "settlement supervisor cancelled: order superseded");
                }
            }
        });
    }

    /// `publishSecretForCompetition(orderId)`.
    pub async fn publish_secret_for_competition(self: &Arc<Self>, order_id: Digest32) -> Result<(), CoordinatorError> {
        let _guard = self.locks.lock(order_id).await;
        let mut order = self.store.get(order_id).await?;
        if order.status != OrderStatus::Settling {
            return Ok(()); // superseded between scheduling and firing; not an error.
        }

        let now = Utc::now();
        order.status = OrderStatus::Competing;
        order.competition_deadline = Some(now + ChronoDuration::seconds(self.config.competition_window_secs as i64));
        order.updated_at = now;
        self.store.save(order.clone()).await?;

        let secret = self.store.get_secret(order_id).await.map_err(CoordinatorError::Store)?;
        let resolver = order.resolver.clone().unwrap_or_default();
        let dst_escrow = order.dst_escrow.clone().unwrap_or_default();
        let src_escrow = order.src_escrow.clone().unwrap_or_default();
        let dst_amount = order.dst_amount.unwrap_or(0);

        self.bus
            .publish_secret(SecretBroadcast {
                order_id,
                preimage: secret.preimage,
                resolver_address: resolver,
                src_escrow,
                dst_escrow: dst_escrow.clone(),
                src_chain: order.intent.src_chain,
                dst_chain: order.intent.dst_chain,
                src_amount: order.intent.src_amount,
                dst_amount,
                timestamp: now,
                competition_deadline: order.competition_deadline.unwrap(),
            })
            .await
            .map_err(CoordinatorError::Store)?;

        info!(order_id = %order_id, "secret published for competition");

        // Authoritative reveal: the Controller races every other
        // resolver/maker by attempting the reveal itself.
        self.attempt_authoritative_reveal(order_id, order.intent.dst_chain, dst_escrow, secret.preimage).await;
        Ok(())
    }

    async fn attempt_authoritative_reveal(
        self: &Arc<Self>,
        order_id: Digest32,
        dst_chain: u64,
        dst_escrow: String,
        preimage: Digest32,
    ) {
        match self.chain.reveal_on_destination(dst_chain, &dst_escrow, preimage).await {
            Ok(tx_hash) => {
                if let Err(e) = self.complete_after_reveal(order_id, tx_hash).await {
                    warn!(order_id = %order_id, error = %e, "failed to mark order completed after reveal");
                }
            }
            Err(ChainError::AlreadyClaimed) => {
                // Someone else (rescuer or maker) beat us to it — liveness
                // preserved, just not by us. The reaper's CompetitionTimeout
                // handling will reconcile status if we can't find the tx.
                info!(order_id = %order_id, "destination already claimed by another party");
            }
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "authoritative reveal attempt failed");
            }
        }
    }

    async fn complete_after_reveal(self: &Arc<Self>, order_id: Digest32, tx_hash: String) -> Result<(), CoordinatorError> {
        let _guard = self.locks.lock(order_id).await;
        let mut order = self.store.get(order_id).await?;
        let now = Utc::now();
        order.status = OrderStatus::Completed;
        order.secret_revealed_at = Some(now);
        order.secret_reveal_tx = Some(tx_hash);
        order.updated_at = now;
        self.store.save(order.clone()).await?;
        self.store.mark_revealed(order_id, now).await.map_err(CoordinatorError::Store)?;
        if let Some(resolver) = &order.resolver {
            self.store
                .update_commitment_status(order_id, resolver, CommitmentStatus::Completed)
                .await
                .map_err(CoordinatorError::Store)?;
        }
        self.notify_for(order_id).notify_waiters();
        info!(order_id = %order_id, "order completed");
        Ok(())
    }

    /// `CommitmentLapsed(orderId)`.
    pub async fn commitment_lapsed(self: &Arc<Self>, order_id: Digest32) -> Result<(), CoordinatorError> {
        let _guard = self.locks.lock(order_id).await;
        let mut order = self.store.get(order_id).await?;
        if order.status != OrderStatus::Committed {
            return Ok(());
        }
        if let Some(resolver) = order.resolver.clone() {
            self.store
                .update_commitment_status(order_id, &resolver, CommitmentStatus::Failed)
                .await
                .map_err(CoordinatorError::Store)?;
        }
        order.status = OrderStatus::RescueAvailable;
        order.updated_at = Utc::now();
        self.store.save(order).await?;
        self.notify_for(order_id).notify_waiters();
        warn!(order_id = %order_id, "commitment lapsed, order rescuable");
        Ok(())
    }

    /// `OrderExpired(orderId)`.
    pub async fn order_expired(self: &Arc<Self>, order_id: Digest32) -> Result<(), CoordinatorError> {
        let _guard = self.locks.lock(order_id).await;
        let mut order = self.store.get(order_id).await?;
        if order.status != OrderStatus::Active {
            return Ok(());
        }
        order.status = OrderStatus::Failed;
        order.updated_at = Utc::now();
        self.store.save(order).await?;
        info!(order_id = %order_id, "order expired with no commitment");
        Ok(())
    }

    /// `CompetitionTimeout(orderId)`.
    pub async fn competition_timeout(self: &Arc<Self>, order_id: Digest32) -> Result<(), CoordinatorError> {
        let order = self.store.get(order_id).await?;
        if order.status != OrderStatus::Competing || order.secret_revealed_at.is_some() {
            return Ok(());
        }

        let secret = self.store.get_secret(order_id).await.map_err(CoordinatorError::Store)?;
        let dst_escrow = order.dst_escrow.clone().unwrap_or_default();
        match self.chain.reveal_on_destination(order.intent.dst_chain, &dst_escrow, secret.preimage).await {
            Ok(tx_hash) => self.complete_after_reveal(order_id, tx_hash).await,
            Err(_) => {
                let _guard = self.locks.lock(order_id).await;
                let mut order = self.store.get(order_id).await?;
                if order.status == OrderStatus::Competing {
                    order.status = OrderStatus::Failed;
                    order.updated_at = Utc::now();
                    self.store.save(order).await?;
                    warn!(order_id = %order_id, "competition window elapsed with no reveal, order failed");
                }
                Ok(())
            }
        }
    }

    /// `rescueOrder(orderId, resolver)`: the public entry point that
    /// re-enters `commit` for an order currently in RESCUE_AVAILABLE.
    pub async fn rescue_order(
        self: &Arc<Self>,
        order_id: Digest32,
        resolver: String,
        quoted: u128,
    ) -> Result<(String, CommitReceipt), CoordinatorError> {
        let order = self.store.get(order_id).await?;
        if order.status != OrderStatus::RescueAvailable {
            return Err(StateError::NotRescuable(order_id.to_hex()).into());
        }
        let original_resolver = order.resolver.clone().unwrap_or_default();
        let receipt = self.commit(order_id, resolver, quoted, Utc::now()).await?;
        Ok((original_resolver, receipt))
    }

    async fn require_owned(&self, order_id: Digest32, resolver: &str, expected: &[OrderStatus]) -> Result<Order, CoordinatorError> {
        let order = self.store.get(order_id).await?;
        if !expected.contains(&order.status) {
            return Err(StateError::WrongStatus {
                order: order_id.to_hex(),
                actual: order.status,
                expected: expected.to_vec(),
            }
            .into());
        }
        match &order.resolver {
            Some(committed) if committed == resolver => Ok(order),
            Some(committed) => Err(StateError::NotOwningResolver { given: resolver.to_string(), committed: committed.clone() }.into()),
            None => Err(StateError::NotOwningResolver { given: resolver.to_string(), committed: String::new() }.into()),
        }
    }
}

fn sha3_hash(preimage: &[u8; 32]) -> Digest32 {
    use sha3::{Digest, Keccak256};
    Digest32(Keccak256::digest(preimage).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryMessageBus;
    use crate::chain::mock::MockChainGateway;
    use crate::store::InMemoryOrderStore;
    use k256::ecdsa::signature::Signer as _;

    fn sample_intent(maker: &str, preimage: &[u8; 32]) -> (Intent, Digest32) {
        let hash = sha3_hash(preimage);
        (
            Intent {
                maker: maker.to_string(),
                src_chain: 84532,
                src_token: "0xT1".into(),
                src_amount: 1_000_000,
                dst_chain: 421614,
                dst_token: "0xT2".into(),
                secret_hash: hash,
                min_acceptable_price: 900_000,
                order_duration_secs: 300,
                nonce: 1,
                deadline: Utc::now() + ChronoDuration::days(1),
            },
            hash,
        )
    }

    fn controller() -> (Arc<LifecycleController>, Arc<MockChainGateway>) {
        let store = InMemoryOrderStore::new();
        let bus = Arc::new(InMemoryMessageBus::new());
        let chain = Arc::new(MockChainGateway::new());
        let oracle = Arc::new(FixedPriceOracle(1_000_000));
        let ctrl = Arc::new(LifecycleController::new(store, bus, chain.clone(), oracle, Config::from_env()));
        (ctrl, chain)
    }

    fn signed(intent: &Intent, key: &k256::ecdsa::SigningKey) -> ([u8; 65], Digest32) {
        let domain = Domain::for_intent(intent, escrow_factory);
        let order_id = signature::structural_hash(intent, &domain);
        let (sig, recid) = key.sign_prehash_recoverable(&order_id.0).unwrap();
        let mut raw = [0u8; 65];
        raw[..64].copy_from_slice(&sig.to_bytes());
        raw[64] = recid.to_byte();
        (raw, order_id)
    }

    fn eth_address(key: &k256::ecdsa::SigningKey) -> String {
        use sha3::{Digest, Keccak256};
        let encoded = key.verifying_key().to_encoded_point(false);
        let digest = Keccak256::digest(&encoded.as_bytes()[1..]);
        format!("0x{}", hex::encode(&digest[12..]))
    }

    #[tokio::test]
    async fn happy_path_reaches_completed() {
        let (ctrl, chain) = controller();
        let key = k256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let maker = eth_address(&key);
        let (intent, _) = sample_intent(&maker, &[42u8; 32]);
        let preimage = Digest32([42u8; 32]);

        chain.set_allowance(intent.src_chain, &intent.src_token, &maker, "escrow-factory-84532", 1_000_000);

        let (raw_sig, _) = signed(&intent, &key);
        let (order_id, market_price, _) = ctrl.admit(intent.clone(), raw_sig, preimage).await.unwrap();
        assert_eq!(market_price, 1_000_000);

        let now = Utc::now() + ChronoDuration::seconds(30);
        let receipt = ctrl.commit(order_id, "0xResolver".into(), 950_000, now).await.unwrap();
        assert!(receipt.success);

        chain.fund_escrow(intent.src_chain, "0xSrcEscrow", 10_000_000_000_000);
        chain.fund_escrow(intent.dst_chain, "0xDstEscrow", 10_000_000_000_000);
        ctrl.escrows_ready(order_id, "0xResolver", "0xSrcEscrow".into(), "0xDstEscrow".into()).await.unwrap();

        let order = ctrl.store.get(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Settling);

        chain.fund_escrow(intent.src_chain, "0xSrcEscrow", intent.src_amount);
        chain.fund_escrow(intent.dst_chain, "0xDstEscrow", 950_000);
        ctrl.notify_settlement(order_id, "0xResolver", 950_000, "0xdsttx".into()).await.unwrap();

        // Let the settlement supervisor run its reveal-delay timer.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        ctrl.publish_secret_for_competition(order_id).await.ok();

        let order = ctrl.store.get(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.secret_revealed_at.is_some());
    }

    #[tokio::test]
    async fn wrong_signer_is_rejected_without_mutating_store() {
        let (ctrl, _chain) = controller();
        let key = k256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let other = k256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let maker = eth_address(&key);
        let (intent, _) = sample_intent(&maker, &[1u8; 32]);
        let (raw_sig, _) = signed(&intent, &other);
        let result = ctrl.admit(intent, raw_sig, Digest32([1u8; 32])).await;
        assert!(matches!(result, Err(CoordinatorError::Validation(ValidationError::BadSignature))));
    }

    #[tokio::test]
    async fn insufficient_allowance_is_rejected() {
        let (ctrl, chain) = controller();
        let key = k256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let maker = eth_address(&key);
        let (intent, _) = sample_intent(&maker, &[2u8; 32]);
        chain.set_allowance(intent.src_chain, &intent.src_token, &maker, "escrow-factory-84532", 500_000);
        let (raw_sig, _) = signed(&intent, &key);
        let result = ctrl.admit(intent, raw_sig, Digest32([2u8; 32])).await;
        assert!(matches!(
            result,
            Err(CoordinatorError::Validation(ValidationError::InsufficientAllowance { .. }))
        ));
    }

    #[tokio::test]
    async fn hash_mismatch_is_rejected() {
        let (ctrl, chain) = controller();
        let key = k256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let maker = eth_address(&key);
        let (intent, _) = sample_intent(&maker, &[3u8; 32]);
        chain.set_allowance(intent.src_chain, &intent.src_token, &maker, "escrow-factory-84532", 1_000_000);
        let (raw_sig, _) = signed(&intent, &key);
        let wrong_preimage = Digest32([9u8; 32]);
        let result = ctrl.admit(intent, raw_sig, wrong_preimage).await;
        assert!(matches!(result, Err(CoordinatorError::Validation(ValidationError::HashMismatch))));
    }

    #[tokio::test]
    async fn rescue_transitions_commitment_lapsed_order_back_to_committed() {
        let (ctrl, chain) = controller();
        let key = k256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let maker = eth_address(&key);
        let (intent, _) = sample_intent(&maker, &[4u8; 32]);
        chain.set_allowance(intent.src_chain, &intent.src_token, &maker, "escrow-factory-84532", 1_000_000);
        let (raw_sig, _) = signed(&intent, &key);
        let (order_id, _, _) = ctrl.admit(intent, raw_sig, Digest32([4u8; 32])).await.unwrap();

        ctrl.commit(order_id, "0xDefaulter".into(), 950_000, Utc::now()).await.unwrap();
        ctrl.commitment_lapsed(order_id).await.unwrap();

        let order = ctrl.store.get(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::RescueAvailable);

        let (original, receipt) = ctrl.rescue_order(order_id, "0xRescuer".into(), 940_000).await.unwrap();
        assert_eq!(original, "0xDefaulter");
        assert!(receipt.success);

        let order = ctrl.store.get(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Committed);
        assert_eq!(order.resolver.as_deref(), Some("0xRescuer"));
    }

    #[tokio::test]
    async fn order_expired_transitions_active_to_failed() {
        let (ctrl, chain) = controller();
        let key = k256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let maker = eth_address(&key);
        let (intent, _) = sample_intent(&maker, &[5u8; 32]);
        chain.set_allowance(intent.src_chain, &intent.src_token, &maker, "escrow-factory-84532", 1_000_000);
        let (raw_sig, _) = signed(&intent, &key);
        let (order_id, _, _) = ctrl.admit(intent, raw_sig, Digest32([5u8; 32])).await.unwrap();
        ctrl.order_expired(order_id).await.unwrap();
        let order = ctrl.store.get(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
    }
}
