//! In-memory chain backend. Generalizes the teacher's one-off
//! `mock_transfer_funds`/`get_balance` demo routes (which hit real
//! Sepolia/NEAR testnets with hardcoded constants) into a reusable,
//! network-free `ChainGateway` suitable for tests and local dev.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ChainGateway, Receipt};
use crate::domain::Digest32;
use crate::error::ChainError;

pub struct MockChainGateway {
    allowances: DashMap<(u64, String, String, String), u128>,
    escrow_balances: DashMap<(u64, String), u128>,
    revealed: DashMap<(u64, String), Digest32>,
    tx_counter: AtomicU64,
}

impl Default for MockChainGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChainGateway {
    pub fn new() -> Self {
        Self {
            allowances: DashMap::new(),
            escrow_balances: DashMap::new(),
            revealed: DashMap::new(),
            tx_counter: AtomicU64::new(0),
        }
    }

    pub fn set_allowance(&self, chain: u64, token: &str, owner: &str, spender: &str, amount: u128) {
        self.allowances
            .insert((chain, token.to_string(), owner.to_string(), spender.to_string()), amount);
    }

    pub fn fund_escrow(&self, chain: u64, escrow: &str, amount: u128) {
        *self.escrow_balances.entry((chain, escrow.to_string())).or_insert(0) += amount;
    }

    fn next_tx_hash(&self) -> String {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        format!("0xmock{:016x}", n)
    }
}

#[async_trait]
impl ChainGateway for MockChainGateway {
    async fn allowance(&self, chain: u64, token: &str, owner: &str, spender: &str) -> Result<u128, ChainError> {
        Ok(self
            .allowances
            .get(&(chain, token.to_string(), owner.to_string(), spender.to_string()))
            .map(|v| *v)
            .unwrap_or(0))
    }

    async fn escrow_balance(&self, chain: u64, escrow: &str, _token: Option<&str>) -> Result<u128, ChainError> {
        Ok(self.escrow_balances.get(&(chain, escrow.to_string())).map(|v| *v).unwrap_or(0))
    }

    async fn transfer_user_funds(
        &self,
        chain: u64,
        _order_id: Digest32,
        from: &str,
        token: &str,
        amount: u128,
    ) -> Result<String, ChainError> {
        let key = (chain, token.to_string(), from.to_string(), format!("escrow-factory-{}", chain));
        let have = self.allowances.get(&key).map(|v| *v).unwrap_or(0);
        if have < amount {
            return Err(ChainError::InsufficientAllowance);
        }
        self.allowances.insert(key, have - amount);
        Ok(self.next_tx_hash())
    }

    async fn await_confirmations(&self, _chain: u64, tx_hash: &str, n: u64) -> Result<Receipt, ChainError> {
        Ok(Receipt { tx_hash: tx_hash.to_string(), confirmations: n.max(1), success: true })
    }

    async fn reveal_on_destination(&self, chain: u64, escrow: &str, preimage: Digest32) -> Result<String, ChainError> {
        let key = (chain, escrow.to_string());
        if self.revealed.contains_key(&key) {
            return Err(ChainError::AlreadyClaimed);
        }
        self.revealed.insert(key, preimage);
        Ok(self.next_tx_hash())
    }

    async fn extract_revealed_secret(&self, chain: u64, _tx_hash: &str, escrow: &str) -> Result<Digest32, ChainError> {
        self.revealed
            .get(&(chain, escrow.to_string()))
            .map(|v| *v)
            .ok_or_else(|| ChainError::SecretNotFound(escrow.to_string()))
    }

    async fn token_decimals(&self, _chain: u64, _token: &str) -> Result<u8, ChainError> {
        Ok(18)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transfer_fails_below_allowance() {
        let gw = MockChainGateway::new();
        gw.set_allowance(84532, "0xT1", "0xA", "escrow-factory-84532", 500_000);
        let result = gw.transfer_user_funds(84532, Digest32([0u8; 32]), "0xA", "0xT1", 1_000_000).await;
        assert!(matches!(result, Err(ChainError::InsufficientAllowance)));
    }

    #[tokio::test]
    async fn reveal_is_one_shot() {
        let gw = MockChainGateway::new();
        gw.reveal_on_destination(1, "0xEscrow", Digest32([1u8; 32])).await.unwrap();
        let second = gw.reveal_on_destination(1, "0xEscrow", Digest32([1u8; 32])).await;
        assert!(matches!(second, Err(ChainError::AlreadyClaimed)));
    }
}
