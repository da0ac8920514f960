use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Digest32;

/// The signed, off-chain intent a maker submits. Every field here
/// participates in the structural hash computed by the signature
/// verifier (see `crate::signature`), so field order is load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub maker: String,
    pub src_chain: u64,
    pub src_token: String,
    pub src_amount: u128,
    pub dst_chain: u64,
    pub dst_token: String,
    pub secret_hash: Digest32,
    pub min_acceptable_price: u128,
    pub order_duration_secs: u64,
    pub nonce: u64,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Active,
    Committed,
    Settling,
    Competing,
    Completed,
    Failed,
    RescueAvailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionParams {
    pub start_price: u128,
    pub end_price: u128,
    pub duration_secs: u64,
    pub start_time: DateTime<Utc>,
}

/// The primary entity. Mutated only by the Lifecycle Controller and
/// always under the per-order keyed lock (`crate::lock::KeyedLock`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Digest32,
    pub intent: Intent,
    pub status: OrderStatus,
    pub auction: AuctionParams,
    pub market_price: u128,

    pub resolver: Option<String>,
    pub committed_price: Option<u128>,
    pub commitment_time: Option<DateTime<Utc>>,
    pub commitment_deadline: Option<DateTime<Utc>>,

    pub src_escrow: Option<String>,
    pub dst_escrow: Option<String>,

    pub funds_moved_at: Option<DateTime<Utc>>,
    pub src_settlement_tx: Option<String>,
    pub dst_settlement_tx: Option<String>,
    pub dst_amount: Option<u128>,

    pub secret_revealed_at: Option<DateTime<Utc>>,
    pub secret_reveal_tx: Option<String>,
    pub competition_deadline: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The broadcast-safe projection of an order: never carries the
/// preimage or the maker's signature. This is the shape published on
/// `OrderBroadcast` and returned by `orderStatus`/`activeOrders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBroadcast {
    pub order_id: Digest32,
    pub maker: String,
    pub src_chain: u64,
    pub src_token: String,
    pub src_amount: u128,
    pub dst_chain: u64,
    pub dst_token: String,
    pub status: OrderStatus,
    pub auction_start_price: u128,
    pub auction_end_price: u128,
    pub auction_duration_secs: u64,
    pub current_price: u128,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Order {
    pub fn to_broadcast(&self, current_price: u128, now: DateTime<Utc>) -> OrderBroadcast {
        OrderBroadcast {
            order_id: self.id,
            maker: self.intent.maker.clone(),
            src_chain: self.intent.src_chain,
            src_token: self.intent.src_token.clone(),
            src_amount: self.intent.src_amount,
            dst_chain: self.intent.dst_chain,
            dst_token: self.intent.dst_token.clone(),
            status: self.status,
            auction_start_price: self.auction.start_price,
            auction_end_price: self.auction.end_price,
            auction_duration_secs: self.auction.duration_secs,
            current_price,
            timestamp: now,
            expires_at: self.expires_at,
        }
    }
}
