//! Supported chains.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chains the application knows about. All but Solana are EVM chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Arbitrum,
    Optimism,
    Polygon,
    Base,
    Bsc,
    Solana,
}

/// Display information for a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainInfo {
    pub chain: Chain,
    pub name: &'static str,
    pub native_token: &'static str,
}

pub const SUPPORTED_CHAINS: &[ChainInfo] = &[
    ChainInfo {
        chain: Chain::Ethereum,
        name: "Ethereum",
        native_token: "ETH",
    },
    ChainInfo {
        chain: Chain::Arbitrum,
        name: "Arbitrum",
        native_token: "ETH",
    },
    ChainInfo {
        chain: Chain::Optimism,
        name: "Optimism",
        native_token: "ETH",
    },
    ChainInfo {
        chain: Chain::Polygon,
        name: "Polygon",
        native_token: "MATIC",
    },
    ChainInfo {
        chain: Chain::Base,
        name: "Base",
        native_token: "ETH",
    },
    ChainInfo {
        chain: Chain::Bsc,
        name: "BNB Chain",
        native_token: "BNB",
    },
    ChainInfo {
        chain: Chain::Solana,
        name: "Solana",
        native_token: "SOL",
    },
];

/// Addresses routers and wallets use to denote the chain's native currency.
const NATIVE_TOKEN_ADDRESSES: [&str; 2] = [
    "0x0000000000000000000000000000000000000000",
    "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
];

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Polygon => "polygon",
            Chain::Base => "base",
            Chain::Bsc => "bsc",
            Chain::Solana => "solana",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ethereum" | "mainnet" => Some(Chain::Ethereum),
            "arbitrum" => Some(Chain::Arbitrum),
            "optimism" => Some(Chain::Optimism),
            "polygon" => Some(Chain::Polygon),
            "base" => Some(Chain::Base),
            "bsc" | "bnb" => Some(Chain::Bsc),
            "solana" => Some(Chain::Solana),
            _ => None,
        }
    }

    /// EVM chain id, `None` for non-EVM chains.
    pub fn id(&self) -> Option<u64> {
        match self {
            Chain::Ethereum => Some(1),
            Chain::Arbitrum => Some(42161),
            Chain::Optimism => Some(10),
            Chain::Polygon => Some(137),
            Chain::Base => Some(8453),
            Chain::Bsc => Some(56),
            Chain::Solana => None,
        }
    }

    pub fn from_id(chain_id: u64) -> Option<Self> {
        SUPPORTED_CHAINS
            .iter()
            .map(|info| info.chain)
            .find(|chain| chain.id() == Some(chain_id))
    }

    pub fn info(&self) -> &'static ChainInfo {
        SUPPORTED_CHAINS
            .iter()
            .find(|info| info.chain == *self)
            .unwrap_or(&SUPPORTED_CHAINS[0])
    }

    pub fn is_evm(&self) -> bool {
        self.id().is_some()
    }

    /// Decimals of the native currency on EVM chains.
    pub fn native_decimals(&self) -> u8 {
        match self {
            Chain::Solana => 9,
            _ => 18,
        }
    }

    /// The default public RPC endpoint for EVM chains.
    pub fn default_rpc_url(&self) -> Option<&'static str> {
        match self {
            Chain::Ethereum => Some("https://eth.llamarpc.com"),
            Chain::Arbitrum => Some("https://arb1.arbitrum.io/rpc"),
            Chain::Optimism => Some("https://mainnet.optimism.io"),
            Chain::Polygon => Some("https://polygon-rpc.com"),
            Chain::Base => Some("https://mainnet.base.org"),
            Chain::Bsc => Some("https://bsc-dataseed.bnbchain.org"),
            Chain::Solana => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn is_native_token(address: &Address) -> bool {
    let lower = format!("{:#x}", address);
    NATIVE_TOKEN_ADDRESSES.contains(&lower.as_str())
}

/// Shortened `0x1234...abcd` form used in labels.
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
