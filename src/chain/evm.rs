//! EVM-side `ChainGateway`. Grounded in the teacher's `eth/utils.rs`:
//! same `ethers::providers::Provider<Http>` + `omni_transaction::EVM`
//! transaction-building pipeline, the same external-signer callback
//! (`agent::request_signature`) standing in for local key custody —
//! the coordinator never holds an EVM private key itself.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use ethers::prelude::*;
use omni_transaction::{evm::types::Signature as OmniEvmSignature, EVM};
use sha3::{Digest, Keccak256};

use super::{ChainGateway, Receipt};
use crate::agent::{AgentConfig, SignerAgent};
use crate::domain::Digest32;
use crate::error::ChainError;

pub struct EvmChainGateway {
    rpc_urls: std::collections::HashMap<u64, String>,
    signer: SignerAgent,
    confirm_timeout: Duration,
}

impl EvmChainGateway {
    pub fn new(rpc_urls: std::collections::HashMap<u64, String>, signer_config: AgentConfig) -> Self {
        Self {
            rpc_urls,
            signer: SignerAgent::new(signer_config),
            confirm_timeout: Duration::from_secs(30),
        }
    }

    fn provider_for(&self, chain: u64) -> Result<Provider<Http>, ChainError> {
        let url = self.rpc_urls.get(&chain).ok_or(ChainError::Unreachable(chain))?;
        Provider::<Http>::try_from(url.as_str()).map_err(|_| ChainError::Unreachable(chain))
    }

    async fn sign_evm_tx(&self, unsigned: &[u8], path: &str) -> Result<OmniEvmSignature, ChainError> {
        let hash = Keccak256::digest(unsigned);
        let sig_json = self
            .signer
            .request_signature(path, &hex::encode(hash), Some("Ecdsa"))
            .await
            .map_err(|_| ChainError::Unreachable(0))?;

        let big_r_hex = sig_json["big_r"]["affine_point"]
            .as_str()
            .ok_or(ChainError::Unreachable(0))?
            .trim_start_matches("0x");
        let s_hex = sig_json["s"]["scalar"].as_str().ok_or(ChainError::Unreachable(0))?.trim_start_matches("0x");
        let v = sig_json["recovery_id"].as_u64().ok_or(ChainError::Unreachable(0))?;

        let r_bytes = hex::decode(&big_r_hex[2..]).map_err(|_| ChainError::Unreachable(0))?;
        let s_bytes = hex::decode(s_hex).map_err(|_| ChainError::Unreachable(0))?;

        Ok(OmniEvmSignature { v, r: r_bytes, s: s_bytes })
    }
}

#[async_trait]
impl ChainGateway for EvmChainGateway {
    async fn allowance(&self, chain: u64, token: &str, owner: &str, spender: &str) -> Result<u128, ChainError> {
        let provider = self.provider_for(chain)?;
        let token_addr = Address::from_str(token).map_err(|_| ChainError::Unreachable(chain))?;
        let owner_addr = Address::from_str(owner).map_err(|_| ChainError::Unreachable(chain))?;
        let spender_addr = Address::from_str(spender).map_err(|_| ChainError::Unreachable(chain))?;

        // `allowance(address,address) returns (uint256)` selector.
        let selector = &ethers::utils::keccak256("allowance(address,address)".as_bytes())[0..4];
        let mut call_data = selector.to_vec();
        call_data.extend(ethers::abi::encode(&[
            ethers::abi::Token::Address(owner_addr),
            ethers::abi::Token::Address(spender_addr),
        ]));

        let tx = TransactionRequest::new().to(token_addr).data(call_data);
        let result = tokio::time::timeout(self.confirm_timeout, provider.call(&tx.into(), None))
            .await
            .map_err(|_| ChainError::Timeout)?
            .map_err(|_| ChainError::Unreachable(chain))?;

        Ok(U256::from_big_endian(&result).as_u128())
    }

    async fn escrow_balance(&self, chain: u64, escrow: &str, token: Option<&str>) -> Result<u128, ChainError> {
        let provider = self.provider_for(chain)?;
        let escrow_addr = Address::from_str(escrow).map_err(|_| ChainError::Unreachable(chain))?;

        match token {
            None => {
                let balance = provider.get_balance(escrow_addr, None).await.map_err(|_| ChainError::Unreachable(chain))?;
                Ok(balance.as_u128())
            }
            Some(token) => {
                let token_addr = Address::from_str(token).map_err(|_| ChainError::Unreachable(chain))?;
                let selector = &ethers::utils::keccak256("balanceOf(address)".as_bytes())[0..4];
                let mut call_data = selector.to_vec();
                call_data.extend(ethers::abi::encode(&[ethers::abi::Token::Address(escrow_addr)]));
                let tx = TransactionRequest::new().to(token_addr).data(call_data);
                let result = provider.call(&tx.into(), None).await.map_err(|_| ChainError::Unreachable(chain))?;
                Ok(U256::from_big_endian(&result).as_u128())
            }
        }
    }

    async fn transfer_user_funds(
        &self,
        chain: u64,
        order_id: Digest32,
        from: &str,
        token: &str,
        amount: u128,
    ) -> Result<String, ChainError> {
        let provider = self.provider_for(chain)?;
        let from_addr = Address::from_str(from).map_err(|_| ChainError::NotAuthorized)?;
        let token_addr = Address::from_str(token).map_err(|_| ChainError::Unreachable(chain))?;

        let nonce = provider.get_transaction_count(from_addr, None).await.map_err(|_| ChainError::Unreachable(chain))?;

        let selector = &ethers::utils::keccak256("transferFrom(address,address,uint256)".as_bytes())[0..4];
        let mut call_data = selector.to_vec();
        call_data.extend(ethers::abi::encode(&[
            ethers::abi::Token::Address(from_addr),
            ethers::abi::Token::Address(Address::zero()), // escrow factory pulls to itself
            ethers::abi::Token::Uint(U256::from(amount)),
        ]));

        let evm_tx = omni_transaction::TransactionBuilder::new::<EVM>()
            .nonce(nonce.as_u64())
            .to(token_addr.to_fixed_bytes())
            .input(call_data)
            .gas_limit(120_000)
            .max_fee_per_gas(20_000_000_000)
            .max_priority_fee_per_gas(2_000_000_000)
            .chain_id(chain)
            .build();

        let encoded = evm_tx.build_for_signing();
        let signature = self.sign_evm_tx(&encoded, &format!("coordinator-fund-move-{}", order_id.to_hex())).await?;
        let signed = evm_tx.build_with_signature(&signature);

        let pending = provider
            .send_raw_transaction(signed.into())
            .await
            .map_err(|_| ChainError::Rejected)?;
        Ok(format!("{:?}", pending.tx_hash()))
    }

    async fn await_confirmations(&self, chain: u64, tx_hash: &str, n: u64) -> Result<Receipt, ChainError> {
        let provider = self.provider_for(chain)?;
        let hash = TxHash::from_str(tx_hash).map_err(|_| ChainError::TxNotFound(tx_hash.to_string()))?;

        let receipt = tokio::time::timeout(self.confirm_timeout, async {
            loop {
                if let Ok(Some(r)) = provider.get_transaction_receipt(hash).await {
                    if let Some(confirmed_block) = r.block_number {
                        if let Ok(Some(latest)) = provider.get_block(BlockNumber::Latest).await {
                            if let Some(latest_num) = latest.number {
                                if latest_num.as_u64().saturating_sub(confirmed_block.as_u64()) + 1 >= n {
                                    return Some(r);
                                }
                            }
                        }
                    }
                }
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        })
        .await
        .map_err(|_| ChainError::Timeout)?
        .ok_or_else(|| ChainError::TxNotFound(tx_hash.to_string()))?;

        let success = receipt.status.map(|s| s.as_u64() == 1).unwrap_or(false);
        if !success {
            return Err(ChainError::TxReverted(tx_hash.to_string()));
        }
        Ok(Receipt { tx_hash: tx_hash.to_string(), confirmations: n, success })
    }

    async fn reveal_on_destination(&self, chain: u64, escrow: &str, preimage: Digest32) -> Result<String, ChainError> {
        let provider = self.provider_for(chain)?;
        let escrow_addr = Address::from_str(escrow).map_err(|_| ChainError::Unreachable(chain))?;

        let selector = &ethers::utils::keccak256("withdraw(bytes32)".as_bytes())[0..4];
        let mut call_data = selector.to_vec();
        call_data.extend(ethers::abi::encode(&[ethers::abi::Token::FixedBytes(preimage.0.to_vec())]));

        let nonce = provider
            .get_transaction_count(Address::zero(), None)
            .await
            .map_err(|_| ChainError::Unreachable(chain))?;

        let evm_tx = omni_transaction::TransactionBuilder::new::<EVM>()
            .nonce(nonce.as_u64())
            .to(escrow_addr.to_fixed_bytes())
            .input(call_data)
            .gas_limit(150_000)
            .max_fee_per_gas(20_000_000_000)
            .max_priority_fee_per_gas(2_000_000_000)
            .chain_id(chain)
            .build();

        let encoded = evm_tx.build_for_signing();
        let signature = self.sign_evm_tx(&encoded, "coordinator-reveal").await?;
        let signed = evm_tx.build_with_signature(&signature);

        let pending = provider.send_raw_transaction(signed.into()).await.map_err(|_| ChainError::DeadlinePassed)?;
        Ok(format!("{:?}", pending.tx_hash()))
    }

    async fn extract_revealed_secret(&self, chain: u64, tx_hash: &str, _escrow: &str) -> Result<Digest32, ChainError> {
        let provider = self.provider_for(chain)?;
        let hash = TxHash::from_str(tx_hash).map_err(|_| ChainError::TxNotFound(tx_hash.to_string()))?;
        let tx = provider
            .get_transaction(hash)
            .await
            .map_err(|_| ChainError::Unreachable(chain))?
            .ok_or_else(|| ChainError::TxNotFound(tx_hash.to_string()))?;
        // `withdraw(bytes32)`: selector (4 bytes) + the 32-byte preimage argument.
        let data = tx.input.0;
        if data.len() < 36 {
            return Err(ChainError::SecretNotFound(tx_hash.to_string()));
        }
        let mut preimage = [0u8; 32];
        preimage.copy_from_slice(&data[4..36]);
        Ok(Digest32(preimage))
    }

    async fn token_decimals(&self, chain: u64, token: &str) -> Result<u8, ChainError> {
        let provider = self.provider_for(chain)?;
        let token_addr = Address::from_str(token).map_err(|_| ChainError::Unreachable(chain))?;
        let selector = &ethers::utils::keccak256("decimals()".as_bytes())[0..4];
        let tx = TransactionRequest::new().to(token_addr).data(selector.to_vec());
        match provider.call(&tx.into(), None).await {
            Ok(result) if !result.is_empty() => Ok(result[result.len() - 1]),
            _ => Ok(18),
        }
    }
}
