use super::{ChainReader, WalletError};
use crate::chain::{is_native_token, Chain};
use alloy_primitives::Address;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Token decimals, fetched once per (chain, token) and cached.
pub struct TokenDecimalsCache {
    reader: Arc<dyn ChainReader>,
    cache: Mutex<HashMap<(Chain, Address), u8>>,
}

impl TokenDecimalsCache {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self {
            reader,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the decimals of `token` on `chain`.
    ///
    /// Native tokens resolve to the chain's native decimals without an RPC call.
    pub async fn decimals(&self, chain: Chain, token: Address) -> Result<u8, WalletError> {
        if !chain.is_evm() {
            return Err(WalletError::UnsupportedChain(chain.to_string()));
        }
        if is_native_token(&token) {
            return Ok(chain.native_decimals());
        }

        let cached = self.cache.lock().unwrap().get(&(chain, token)).copied();
        if let Some(decimals) = cached {
            return Ok(decimals);
        }

        let decimals = self.reader.decimals(chain, token).await?;
        debug!("Fetched decimals for {} on {}: {}", token, chain, decimals);
        self.cache.lock().unwrap().insert((chain, token), decimals);
        Ok(decimals)
    }

    pub fn reader(&self) -> &Arc<dyn ChainReader> {
        &self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainReader for CountingReader {
        async fn allowance(
            &self,
            _chain: Chain,
            _token: Address,
            _owner: Address,
            _spender: Address,
        ) -> Result<U256, WalletError> {
            Ok(U256::ZERO)
        }

        async fn decimals(&self, _chain: Chain, token: Address) -> Result<u8, WalletError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Different tokens on the same chain report different decimals.
            Ok(if token == Address::repeat_byte(0x06) { 6 } else { 18 })
        }
    }

    #[tokio::test]
    async fn test_cache_is_keyed_by_chain_and_token() {
        let reader = Arc::new(CountingReader {
            calls: AtomicUsize::new(0),
        });
        let cache = TokenDecimalsCache::new(reader.clone());

        let usdc = Address::repeat_byte(0x06);
        let dai = Address::repeat_byte(0x12);

        assert_eq!(cache.decimals(Chain::Ethereum, usdc).await.unwrap(), 6);
        assert_eq!(cache.decimals(Chain::Ethereum, dai).await.unwrap(), 18);
        assert_eq!(cache.decimals(Chain::Ethereum, usdc).await.unwrap(), 6);
        assert_eq!(reader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_native_token_skips_rpc() {
        let reader = Arc::new(CountingReader {
            calls: AtomicUsize::new(0),
        });
        let cache = TokenDecimalsCache::new(reader.clone());

        assert_eq!(cache.decimals(Chain::Arbitrum, Address::ZERO).await.unwrap(), 18);
        assert_eq!(reader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_evm_chain_is_rejected() {
        let reader = Arc::new(CountingReader {
            calls: AtomicUsize::new(0),
        });
        let cache = TokenDecimalsCache::new(reader);

        assert!(matches!(
            cache.decimals(Chain::Solana, Address::ZERO).await,
            Err(WalletError::UnsupportedChain(_))
        ));
    }
}
