use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Digest32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentStatus {
    Active,
    Failed,
    Completed,
}

/// Append-only audit row. A new row is written on every `commit`; the
/// predecessor row (if superseded by a rescue) is flipped to `Failed`
/// rather than deleted, so the full resolver-competition history for
/// an order survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverCommitment {
    pub row_id: Uuid,
    pub order_id: Digest32,
    pub resolver: String,
    pub accepted_price: u128,
    pub timestamp: DateTime<Utc>,
    pub status: CommitmentStatus,
}

impl ResolverCommitment {
    pub fn new(order_id: Digest32, resolver: String, accepted_price: u128, timestamp: DateTime<Utc>) -> Self {
        Self {
            row_id: Uuid::new_v4(),
            order_id,
            resolver,
            accepted_price,
            timestamp,
            status: CommitmentStatus::Active,
        }
    }
}
