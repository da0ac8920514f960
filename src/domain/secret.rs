use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Digest32;

/// Stored in a table separate from `Order` so that a broadcast of the
/// order (or an accidental `Debug`-print of it) never carries the
/// preimage. Disclosed only via on-chain reveal or to the currently
/// committed resolver through `orderSecret`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub order_id: Digest32,
    pub preimage: Digest32,
    pub hash: Digest32,
    pub created_at: DateTime<Utc>,
    pub revealed_at: Option<DateTime<Utc>>,
}

impl Secret {
    pub fn new(order_id: Digest32, preimage: Digest32, hash: Digest32, now: DateTime<Utc>) -> Self {
        Self {
            order_id,
            preimage,
            hash,
            created_at: now,
            revealed_at: None,
        }
    }
}
