//! Chain Gateway (C1). The only component permitted to perform I/O
//! with the chains; every other component interacts with chains only
//! through this vocabulary.

pub mod evm;
pub mod mock;
pub mod near;

use async_trait::async_trait;

use crate::domain::Digest32;
use crate::error::ChainError;

#[derive(Debug, Clone)]
pub struct Receipt {
    pub tx_hash: String,
    pub confirmations: u64,
    pub success: bool,
}

#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn allowance(&self, chain: u64, token: &str, owner: &str, spender: &str) -> Result<u128, ChainError>;

    async fn escrow_balance(&self, chain: u64, escrow: &str, token: Option<&str>) -> Result<u128, ChainError>;

    async fn transfer_user_funds(
        &self,
        chain: u64,
        order_id: Digest32,
        from: &str,
        token: &str,
        amount: u128,
    ) -> Result<String, ChainError>;

    async fn await_confirmations(&self, chain: u64, tx_hash: &str, n: u64) -> Result<Receipt, ChainError>;

    async fn reveal_on_destination(
        &self,
        chain: u64,
        escrow: &str,
        preimage: Digest32,
    ) -> Result<String, ChainError>;

    async fn extract_revealed_secret(&self, chain: u64, tx_hash: &str, escrow: &str) -> Result<Digest32, ChainError>;

    /// Token decimals, used by the pricing engine's `tokenAmounts`.
    /// Falls back to 18 only when the underlying chain cannot answer —
    /// never assumed for a token whose decimals are knowable.
    async fn token_decimals(&self, chain: u64, token: &str) -> Result<u8, ChainError>;
}
