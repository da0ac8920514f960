//! External signer client. The coordinator never custodies chain
//! private keys; every outgoing transaction is signed by a sidecar
//! ("agent") reachable over loopback HTTP, exactly the way the
//! teacher's TEE/MPC signer sidecar works — this module keeps that
//! `AgentConfig`/`request_signature` shape and wraps it in a
//! `SignerAgent` so the chain gateways don't thread a bare config
//! around.

use std::env;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct ContractArgs {
    #[serde(rename = "methodName")]
    pub method_name: String,
    pub args: serde_json::Value,
}

#[derive(Clone)]
pub struct AgentConfig {
    pub api_port: u16,
    pub api_path: String,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let api_port = env::var("API_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(3140);

        let contract_id = env::var("NEXT_PUBLIC_contractId").unwrap_or_default();
        let sandbox = Regex::new("(?i)sandbox").unwrap();
        let api_path = if sandbox.is_match(&contract_id) {
            "shade-agent-api".to_string()
        } else {
            "localhost".to_string()
        };

        Self { api_port, api_path }
    }
}

async fn agent_rpc(method_name: &str, args: serde_json::Value, config: &AgentConfig) -> Result<serde_json::Value, reqwest::Error> {
    let url = format!("http://{}:{}/api/agent/{}", config.api_path, config.api_port, method_name);
    reqwest::Client::new().post(&url).json(&args).send().await?.json::<serde_json::Value>().await
}

/// Thin wrapper over the sidecar RPC used by the chain gateways.
#[derive(Clone)]
pub struct SignerAgent {
    config: AgentConfig,
}

impl SignerAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    pub async fn account_id(&self) -> Result<serde_json::Value, reqwest::Error> {
        agent_rpc("getAccountId", serde_json::json!({}), &self.config).await
    }

    /// Requests a signature over `payload` (hex-encoded) under `path`,
    /// using `key_type` ("Ecdsa" for EVM, "Eddsa" for NEAR).
    pub async fn request_signature(
        &self,
        path: &str,
        payload: &str,
        key_type: Option<&str>,
    ) -> Result<serde_json::Value, reqwest::Error> {
        let args = ContractArgs {
            method_name: "request_signature".to_string(),
            args: serde_json::json!({
                "path": path,
                "payload": payload,
                "key_type": key_type.unwrap_or("Ecdsa"),
            }),
        };
        agent_rpc("call", serde_json::to_value(args).unwrap(), &self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_agent_config_targets_localhost() {
        // No NEXT_PUBLIC_contractId set in the test process -> not sandbox.
        let cfg = AgentConfig { api_port: 3140, api_path: "localhost".to_string() };
        assert_eq!(cfg.api_path, "localhost");
    }
}
