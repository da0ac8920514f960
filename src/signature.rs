//! Signature Verifier (C5). Pure and deterministic: identical
//! `(intent, domain)` pairs across independently-run coordinator
//! instances must yield identical `orderId`, which is why this module
//! never touches the Order Store or the clock.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::domain::{Digest32, Intent};
use crate::error::ValidationError;

/// `{name, version, chainId, verifyingContract}` — the domain
/// separator the structural hash is computed under. `chain_id` is
/// always the intent's `srcChain`; `verifying_contract` is that
/// chain's escrow factory address.
pub struct Domain {
    pub name: &'static str,
    pub version: &'static str,
    pub chain_id: u64,
    pub verifying_contract: String,
}

impl Domain {
    pub fn for_intent(intent: &Intent, escrow_factory: impl Fn(u64) -> String) -> Self {
        Self {
            name: "SwapCoordinator",
            version: "1",
            chain_id: intent.src_chain,
            verifying_contract: escrow_factory(intent.src_chain),
        }
    }

    fn separator(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.version.as_bytes());
        hasher.update(self.chain_id.to_be_bytes());
        hasher.update(self.verifying_contract.as_bytes());
        hasher.finalize().into()
    }
}

fn pad32_be(value: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Deterministic field-ordered encoding of the intent. Every field
/// contributes fixed-width bytes so two encoders never disagree on
/// where one field ends and the next begins.
fn encode_intent(intent: &Intent) -> Vec<u8> {
    let mut buf = Vec::with_capacity(320);
    buf.extend_from_slice(intent.maker.as_bytes());
    buf.extend_from_slice(&intent.src_chain.to_be_bytes());
    buf.extend_from_slice(intent.src_token.as_bytes());
    buf.extend_from_slice(&pad32_be(intent.src_amount));
    buf.extend_from_slice(&intent.dst_chain.to_be_bytes());
    buf.extend_from_slice(intent.dst_token.as_bytes());
    buf.extend_from_slice(&intent.secret_hash.0);
    buf.extend_from_slice(&pad32_be(intent.min_acceptable_price));
    buf.extend_from_slice(&intent.order_duration_secs.to_be_bytes());
    buf.extend_from_slice(&intent.nonce.to_be_bytes());
    buf.extend_from_slice(&intent.deadline.timestamp().to_be_bytes());
    buf
}

/// `H(O)`: the domain-separated structural hash, doubling as the
/// `orderId`.
pub fn structural_hash(intent: &Intent, domain: &Domain) -> Digest32 {
    let mut hasher = Keccak256::new();
    hasher.update(domain.separator());
    hasher.update(Keccak256::digest(encode_intent(intent)));
    Digest32(hasher.finalize().into())
}

/// Recovers the Ethereum-style address (last 20 bytes of
/// `keccak256(uncompressed_pubkey[1..])`) that produced `signature`
/// over `hash`, using the same recovery machinery the teacher already
/// depends on (`k256`) to derive addresses from public keys.
pub fn recover_signer(hash: &Digest32, signature: &[u8; 65]) -> Result<String, ValidationError> {
    let sig = EcdsaSignature::from_slice(&signature[..64])
        .map_err(|_| ValidationError::BadSignature)?;
    let recovery_id = RecoveryId::from_byte(signature[64])
        .ok_or(ValidationError::BadSignature)?;
    let verifying_key = VerifyingKey::recover_from_prehash(&hash.0, &sig, recovery_id)
        .map_err(|_| ValidationError::BadSignature)?;
    let encoded = verifying_key.to_encoded_point(false);
    let pubkey_bytes = &encoded.as_bytes()[1..];
    let digest = Keccak256::digest(pubkey_bytes);
    Ok(format!("0x{}", hex::encode(&digest[12..])))
}

/// Verifies `signature` over the structural hash of `intent` under
/// `domain`, and returns the derived `orderId` on success. Fails with
/// `BAD_SIGNATURE` if the recovered address is not `intent.maker`.
pub fn verify(intent: &Intent, domain: &Domain, signature: &[u8; 65]) -> Result<Digest32, ValidationError> {
    let order_id = structural_hash(intent, domain);
    let signer = recover_signer(&order_id, signature)?;
    if !signer.eq_ignore_ascii_case(&intent.maker) {
        return Err(ValidationError::BadSignature);
    }
    Ok(order_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use k256::ecdsa::{signature::Signer, SigningKey};

    fn sample_intent(maker: String) -> Intent {
        Intent {
            maker,
            src_chain: 84532,
            src_token: "0xT1".into(),
            src_amount: 1_000_000,
            dst_chain: 421614,
            dst_token: "0xT2".into(),
            secret_hash: Digest32([7u8; 32]),
            min_acceptable_price: 900_000,
            order_duration_secs: 300,
            nonce: 1,
            deadline: Utc::now(),
        }
    }

    fn domain_for(intent: &Intent) -> Domain {
        Domain::for_intent(intent, |_chain| "0xFactory".to_string())
    }

    fn eth_address_of(key: &SigningKey) -> String {
        let verifying_key = key.verifying_key();
        let encoded = verifying_key.to_encoded_point(false);
        let digest = Keccak256::digest(&encoded.as_bytes()[1..]);
        format!("0x{}", hex::encode(&digest[12..]))
    }

    #[test]
    fn order_id_is_deterministic_across_calls() {
        let intent = sample_intent("0xA".into());
        let domain = domain_for(&intent);
        let h1 = structural_hash(&intent, &domain);
        let h2 = structural_hash(&intent, &domain);
        assert_eq!(h1, h2);
    }

    #[test]
    fn order_id_ignores_wall_clock_and_depends_only_on_intent() {
        // Two encodings of the identical intent value (cloned) must match;
        // order-id must not depend on anything outside `(intent, domain)`.
        let intent = sample_intent("0xA".into());
        let domain = domain_for(&intent);
        assert_eq!(structural_hash(&intent, &domain), structural_hash(&intent.clone(), &domain));
    }

    #[test]
    fn valid_signature_recovers_to_maker() {
        let key = SigningKey::random(&mut rand::thread_rng());
        let maker = eth_address_of(&key);
        let intent = sample_intent(maker.clone());
        let domain = domain_for(&intent);
        let order_id = structural_hash(&intent, &domain);

        let (sig, recid) = key.sign_prehash_recoverable(&order_id.0).unwrap();
        let mut raw = [0u8; 65];
        raw[..64].copy_from_slice(&sig.to_bytes());
        raw[64] = recid.to_byte();

        let result = verify(&intent, &domain, &raw).unwrap();
        assert_eq!(result, order_id);
    }

    #[test]
    fn wrong_signer_is_rejected() {
        let key = SigningKey::random(&mut rand::thread_rng());
        let other_key = SigningKey::random(&mut rand::thread_rng());
        let maker = eth_address_of(&key);
        let intent = sample_intent(maker);
        let domain = domain_for(&intent);
        let order_id = structural_hash(&intent, &domain);

        let (sig, recid) = other_key.sign_prehash_recoverable(&order_id.0).unwrap();
        let mut raw = [0u8; 65];
        raw[..64].copy_from_slice(&sig.to_bytes());
        raw[64] = recid.to_byte();

        assert!(matches!(verify(&intent, &domain, &raw), Err(ValidationError::BadSignature)));
    }
}
