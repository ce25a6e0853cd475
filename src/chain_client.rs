use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use serde::Deserialize;

use crate::errors::FetchError;
use crate::model::{Network, Outpoint, RawUtxo, ScriptPublicKey, UtxoEntryData};

/// The chain's REST API, modeled as a trait so the core never hard-depends
/// on a live network.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `GET /addresses/{addr}/utxos`.
    async fn get_utxos(&self, address: &str, network: Network) -> Result<Vec<RawUtxo>, FetchError>;

    /// `GET /info/blockdag`. Never fails upward; returns `0` on any error so
    /// enrichment degrades gracefully.
    async fn get_virtual_daa_score(&self, address_hint: &str, network: Network) -> u64;
}

/// `reqwest`-backed `ChainClient`, forcing IPv4 and a 10s per-request timeout
/// to tolerate dual-stack hosts.
pub struct HttpChainClient {
    client: reqwest::Client,
}

impl HttpChainClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .local_address(Some(IpAddr::from([0, 0, 0, 0])))
            .build()?;
        Ok(Self { client })
    }
}

#[derive(Debug, Deserialize)]
struct WireUtxoEntry {
    amount: Option<String>,
    #[serde(rename = "scriptPublicKey")]
    script_public_key: Option<WireScriptPublicKey>,
    #[serde(rename = "blockDaaScore")]
    block_daa_score: Option<String>,
    #[serde(rename = "isCoinbase", default)]
    is_coinbase: bool,
}

#[derive(Debug, Deserialize)]
struct WireScriptPublicKey {
    version: u16,
    #[serde(rename = "scriptPublicKey")]
    script: String,
}

#[derive(Debug, Deserialize)]
struct WireUtxo {
    address: Option<String>,
    outpoint: Option<WireOutpoint>,
    #[serde(rename = "utxoEntry")]
    utxo_entry: Option<WireUtxoEntry>,
}

#[derive(Debug, Deserialize)]
struct WireOutpoint {
    #[serde(rename = "transactionId")]
    transaction_id: Option<String>,
    index: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BlockDagInfoResponse {
    #[serde(rename = "virtualDaaScore")]
    virtual_daa_score: String,
}

/// Converts one wire entry into a `RawUtxo`, returning `None` (filtered out by
/// the fetcher, not a hard error) when any required field is missing. The
/// wire's `address` field is echoed back per-entry but isn't part of the
/// core's identity model, so it's dropped here.
fn parse_wire_utxo(wire: WireUtxo) -> Option<RawUtxo> {
    let outpoint = wire.outpoint?;
    let transaction_id = outpoint.transaction_id?;
    let index = outpoint.index?;
    let entry = wire.utxo_entry?;
    let amount: u64 = entry.amount?.parse().ok()?;
    let block_daa_score: u64 = entry.block_daa_score.unwrap_or_else(|| "0".to_string()).parse().ok()?;
    let script_public_key = entry
        .script_public_key
        .map(|s| ScriptPublicKey {
            version: s.version,
            script: s.script,
        })
        .unwrap_or(ScriptPublicKey {
            version: 0,
            script: String::new(),
        });

    Some(RawUtxo {
        outpoint: Outpoint::new(transaction_id, index),
        utxo_entry: UtxoEntryData {
            amount,
            script_public_key,
            block_daa_score,
            is_coinbase: entry.is_coinbase,
        },
    })
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn get_utxos(&self, address: &str, network: Network) -> Result<Vec<RawUtxo>, FetchError> {
        let url = format!("{}/addresses/{}/utxos", network.base_url(), address);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Exhausted {
                address: address.to_string(),
                attempts: 1,
                cause: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Exhausted {
                address: address.to_string(),
                attempts: 1,
                cause: format!("chain returned HTTP {}", response.status()),
            });
        }

        let wire: Vec<WireUtxo> = response.json().await.map_err(|e| FetchError::Exhausted {
            address: address.to_string(),
            attempts: 1,
            cause: e.to_string(),
        })?;

        Ok(wire.into_iter().filter_map(parse_wire_utxo).collect())
    }

    async fn get_virtual_daa_score(&self, address_hint: &str, network: Network) -> u64 {
        let url = format!("{}/info/blockdag", network.base_url());
        let result: Result<BlockDagInfoResponse, String> = async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| e.to_string())?;
            response
                .json::<BlockDagInfoResponse>()
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        match result {
            Ok(info) => info.virtual_daa_score.parse().unwrap_or(0),
            Err(cause) => {
                warn!("virtual daa score fetch failed for {address_hint} on {network}: {cause}");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Option<RawUtxo> {
        let wire: WireUtxo = serde_json::from_str(raw).expect("fixture should deserialize");
        parse_wire_utxo(wire)
    }

    #[test]
    fn well_formed_entry_parses_into_raw_utxo() {
        let tx_id = "a".repeat(64);
        let raw = format!(
            r#"{{
                "address": "kaspa:qq...",
                "outpoint": {{"transactionId": "{tx_id}", "index": 0}},
                "utxoEntry": {{
                    "amount": "100000000",
                    "scriptPublicKey": {{"version": 0, "scriptPublicKey": "aabb"}},
                    "blockDaaScore": "12345",
                    "isCoinbase": false
                }}
            }}"#
        );
        let utxo = parse(&raw).expect("well-formed entry must parse");
        assert_eq!(utxo.outpoint.index, 0);
        assert_eq!(utxo.utxo_entry.amount, 100_000_000);
        assert_eq!(utxo.utxo_entry.block_daa_score, 12345);
        assert_eq!(utxo.utxo_entry.script_public_key.script, "aabb");
    }

    #[test]
    fn missing_outpoint_is_filtered_out() {
        let raw = r#"{
            "address": "kaspa:qq...",
            "utxoEntry": {"amount": "1", "scriptPublicKey": {"version": 0, "scriptPublicKey": ""}}
        }"#;
        assert!(parse(raw).is_none());
    }

    #[test]
    fn missing_transaction_id_is_filtered_out() {
        let raw = r#"{
            "outpoint": {"index": 0},
            "utxoEntry": {"amount": "1"}
        }"#;
        assert!(parse(raw).is_none());
    }

    #[test]
    fn missing_index_is_filtered_out() {
        let raw = r#"{
            "outpoint": {"transactionId": "deadbeef"},
            "utxoEntry": {"amount": "1"}
        }"#;
        assert!(parse(raw).is_none());
    }

    #[test]
    fn missing_amount_is_filtered_out() {
        let raw = r#"{
            "outpoint": {"transactionId": "deadbeef", "index": 0},
            "utxoEntry": {"blockDaaScore": "1"}
        }"#;
        assert!(parse(raw).is_none());
    }

    #[test]
    fn missing_utxo_entry_is_filtered_out() {
        let raw = r#"{
            "outpoint": {"transactionId": "deadbeef", "index": 0}
        }"#;
        assert!(parse(raw).is_none());
    }

    #[test]
    fn missing_block_daa_score_defaults_to_zero() {
        let raw = r#"{
            "outpoint": {"transactionId": "deadbeef", "index": 1},
            "utxoEntry": {"amount": "500"}
        }"#;
        let utxo = parse(raw).expect("amount and outpoint present, should parse");
        assert_eq!(utxo.utxo_entry.block_daa_score, 0);
    }

    #[test]
    fn missing_script_public_key_defaults_to_empty() {
        let raw = r#"{
            "outpoint": {"transactionId": "deadbeef", "index": 1},
            "utxoEntry": {"amount": "500"}
        }"#;
        let utxo = parse(raw).expect("should still parse without a script");
        assert_eq!(utxo.utxo_entry.script_public_key.version, 0);
        assert!(utxo.utxo_entry.script_public_key.script.is_empty());
    }
}
