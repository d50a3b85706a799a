//! Read-only chain access over plain JSON-RPC `eth_call`.

use super::{ChainReader, WalletError};
use crate::chain::Chain;
use alloy_primitives::{hex, Address, U256};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// `allowance(address,address)`
const ALLOWANCE_SELECTOR: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];
/// `decimals()`
const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// [`ChainReader`] backed by one HTTP RPC endpoint per chain.
pub struct JsonRpcChainReader {
    client: reqwest::Client,
    rpc_urls: HashMap<Chain, String>,
    next_id: AtomicU64,
}

impl JsonRpcChainReader {
    pub fn new(rpc_urls: HashMap<Chain, String>, timeout_sec: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()?;
        Ok(Self {
            client,
            rpc_urls,
            next_id: AtomicU64::new(1),
        })
    }

    fn rpc_url(&self, chain: Chain) -> Result<&str, WalletError> {
        self.rpc_urls
            .get(&chain)
            .map(|s| s.as_str())
            .ok_or_else(|| WalletError::UnsupportedChain(chain.to_string()))
    }

    async fn eth_call(&self, chain: Chain, to: Address, data: Vec<u8>) -> Result<U256, WalletError> {
        let url = self.rpc_url(chain)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [
                { "to": format!("{:#x}", to), "data": format!("0x{}", hex::encode(&data)) },
                "latest"
            ],
        });

        debug!("eth_call on {} to {:#x}", chain, to);
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WalletError::Transport(format!(
                "RPC endpoint for {} returned status {}",
                chain,
                response.status()
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| WalletError::InvalidResponse(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(WalletError::from_rpc(error.code, error.message));
        }

        let result = parsed
            .result
            .ok_or_else(|| WalletError::InvalidResponse("Missing result".to_string()))?;
        decode_word(&result)
    }
}

fn encode_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

fn decode_word(result: &str) -> Result<U256, WalletError> {
    let bytes = hex::decode(result)
        .map_err(|e| WalletError::InvalidResponse(format!("Bad hex {:?}: {}", result, e)))?;
    if bytes.is_empty() {
        return Err(WalletError::InvalidResponse(
            "Empty call result (not a contract?)".to_string(),
        ));
    }
    let word = &bytes[..bytes.len().min(32)];
    Ok(U256::from_be_slice(word))
}

#[async_trait]
impl ChainReader for JsonRpcChainReader {
    async fn allowance(
        &self,
        chain: Chain,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, WalletError> {
        let mut data = ALLOWANCE_SELECTOR.to_vec();
        data.extend_from_slice(&encode_address(&owner));
        data.extend_from_slice(&encode_address(&spender));
        self.eth_call(chain, token, data).await
    }

    async fn decimals(&self, chain: Chain, token: Address) -> Result<u8, WalletError> {
        let value = self
            .eth_call(chain, token, DECIMALS_SELECTOR.to_vec())
            .await?;
        if value > U256::from(u8::MAX) {
            return Err(WalletError::InvalidResponse(format!(
                "Failed to fetch decimals for {} on {}: got {}",
                token, chain, value
            )));
        }
        Ok(value.to::<u8>())
    }
}
