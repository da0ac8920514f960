pub mod commitment;
pub mod order;
pub mod secret;

pub use commitment::{CommitmentStatus, ResolverCommitment};
pub use order::{AuctionParams, Intent, Order, OrderBroadcast, OrderStatus};
pub use secret::Secret;

/// 32-byte structural hash used both as an order-id and as a
/// secret-hash. Newtype over `[u8; 32]` so the two never get mixed up
/// with plain hex `String`s at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Digest32(#[serde(with = "hex_bytes")] pub [u8; 32]);

impl Digest32 {
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.trim_start_matches("0x");
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for Digest32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let s = s.trim_start_matches("0x");
        let v = hex::decode(s).map_err(serde::de::Error::custom)?;
        v.try_into().map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}
