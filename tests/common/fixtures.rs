//! Constants and sample payloads shared by the integration tests.

use alloy_primitives::Address;
use defi_hub::routing::Quote;

pub const ACCOUNT: Address = Address::new([0xaa; 20]);
pub const USDC_ARBITRUM: Address = Address::new([0x01; 20]);
pub const USDS_ETHEREUM: Address = Address::new([0x02; 20]);
pub const LIFI_DIAMOND: Address = Address::new([0x11; 20]);

pub const ARBITRUM_ID: u64 = 42161;
pub const ETHEREUM_ID: u64 = 1;

pub const ROUTE_TX_HASH: &str =
    "0x5f3c0d6e1b8a4c2f9e7d6a5b4c3d2e1f0a9b8c7d6e5f4a3b2c1d0e9f8a7b6c5d";

pub const QUOTE_JSON: &str = r#"{
    "id": "quote-1",
    "type": "lifi",
    "tool": "stargate",
    "toolDetails": { "key": "stargate", "name": "Stargate" },
    "action": {
        "fromChainId": 42161,
        "toChainId": 1,
        "fromToken": { "address": "0x0101010101010101010101010101010101010101", "chainId": 42161, "symbol": "USDC", "decimals": 6 },
        "toToken": { "address": "0x0202020202020202020202020202020202020202", "chainId": 1, "symbol": "USDS", "decimals": 18 },
        "fromAmount": "25000000",
        "slippage": 0.003
    },
    "estimate": {
        "fromAmount": "25000000",
        "toAmount": "24900000000000000000",
        "toAmountMin": "24825300000000000000",
        "approvalAddress": "0x1111111111111111111111111111111111111111"
    },
    "transactionRequest": { "to": "0x1111111111111111111111111111111111111111", "data": "0xabcd", "value": "0x0", "chainId": 42161 }
}"#;

pub fn sample_quote() -> Quote {
    serde_json::from_str(QUOTE_JSON).expect("Invalid quote fixture")
}

pub const POOLS_JSON: &str = r#"{
    "status": "success",
    "data": [
        {
            "pool": "747c1d2a-c668-4682-b9f9-296708a3dd90",
            "chain": "Ethereum",
            "project": "Lido",
            "symbol": "STETH",
            "tvlUsd": 24000000000,
            "apy": 2.9,
            "apyMean30d": 3.1,
            "stablecoin": false,
            "volumeUsd1d": 150000000
        },
        {
            "pool": "aa70268e-4b52-42bf-a116-608b370f9501",
            "chain": "Arbitrum",
            "project": "aave-v3",
            "symbol": "USDC",
            "tvlUsd": 450000000,
            "apy": 4.2,
            "stablecoin": true,
            "underlyingTokens": ["0xaf88d065e77c8cc2239327c5edb3a432268e5831"]
        }
    ]
}"#;

pub const PROTOCOLS_JSON: &str = r#"[
    {
        "id": "182",
        "name": "Lido",
        "slug": "lido",
        "audits": "2",
        "listedAt": 1608336000,
        "tvl": 24500000000,
        "chains": ["Ethereum"]
    }
]"#;
