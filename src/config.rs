use std::collections::HashMap;
use std::env;

/// Coordinator-wide configuration, loaded from the environment the
/// same way the teacher's `build.rs` stages `.env` values: `dotenvy`
/// reads the file at startup and everything else is a plain
/// `env::var` lookup with a typed default.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub default_order_duration_secs: u64,
    pub fast_auction_duration_secs: u64,
    pub resolver_commitment_window_secs: u64,
    pub secret_reveal_delay_secs: u64,
    pub competition_window_secs: u64,
    pub retention_days: u64,
    pub reaper_interval_secs: u64,
    pub quote_tolerance: u128,
    pub confirmations_per_chain: HashMap<u64, u64>,
    pub min_safety_deposit_per_chain: HashMap<u64, u128>,
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u128(key: &str, default: u128) -> u128 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::from_filename(".env").ok();

        let mut confirmations_per_chain = HashMap::new();
        confirmations_per_chain.insert(84532u64, env_u64("CONFIRMATIONS_BASE_SEPOLIA", 2));
        confirmations_per_chain.insert(421614u64, env_u64("CONFIRMATIONS_ARB_SEPOLIA", 1));

        let mut min_safety_deposit_per_chain = HashMap::new();
        min_safety_deposit_per_chain.insert(84532u64, env_u128("MIN_SAFETY_DEPOSIT_BASE_SEPOLIA", 10_000_000_000_000u128));
        min_safety_deposit_per_chain.insert(421614u64, env_u128("MIN_SAFETY_DEPOSIT_ARB_SEPOLIA", 10_000_000_000_000u128));

        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string()),
            default_order_duration_secs: env_u64("DEFAULT_ORDER_DURATION_SECS", 300),
            fast_auction_duration_secs: env_u64("FAST_AUCTION_DURATION_SECS", 60),
            resolver_commitment_window_secs: env_u64("RESOLVER_COMMITMENT_WINDOW_SECS", 300),
            secret_reveal_delay_secs: env_u64("SECRET_REVEAL_DELAY_SECS", 10),
            competition_window_secs: env_u64("COMPETITION_WINDOW_SECS", 300),
            retention_days: env_u64("RETENTION_DAYS", 30),
            reaper_interval_secs: env_u64("REAPER_INTERVAL_SECS", 10),
            quote_tolerance: env_u128("QUOTE_TOLERANCE", 0),
            confirmations_per_chain,
            min_safety_deposit_per_chain,
        }
    }

    pub fn confirmations_for(&self, chain_id: u64) -> u64 {
        self.confirmations_per_chain.get(&chain_id).copied().unwrap_or(1)
    }

    pub fn min_safety_deposit_for(&self, chain_id: u64) -> u128 {
        self.min_safety_deposit_per_chain.get(&chain_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        // SAFETY: tests run single-threaded for env mutation via `cargo test -- --test-threads=1`
        // in CI; this test only reads, never mutates, the process environment.
        let cfg = Config {
            bind_addr: "0.0.0.0:3001".into(),
            default_order_duration_secs: 300,
            fast_auction_duration_secs: 60,
            resolver_commitment_window_secs: 300,
            secret_reveal_delay_secs: 10,
            competition_window_secs: 300,
            retention_days: 30,
            reaper_interval_secs: 10,
            quote_tolerance: 0,
            confirmations_per_chain: HashMap::new(),
            min_safety_deposit_per_chain: HashMap::new(),
        };
        assert_eq!(cfg.default_order_duration_secs, 300);
        assert_eq!(cfg.confirmations_for(999), 1);
    }
}
