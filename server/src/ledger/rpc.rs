use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::abi;
use super::{LedgerClient, LedgerError, StartBlock, StatusRequestStream, TxHash, Wei};
use crate::config::LedgerSettings;
use crate::models::{Address, Identity, IndexAssignment, ResponseSubmission, StatusRequest};

/// Ethereum JSON-RPC client for the FlightSuretyApp contract.
///
/// Transactions are sent with `eth_sendTransaction`, so the node must manage
/// (and have unlocked) every oracle account, as development chains do.
#[derive(Clone)]
pub struct JsonRpcLedger {
    settings: LedgerSettings,
    http: Client,
    request_id: Arc<AtomicU64>,
}

impl JsonRpcLedger {
    pub fn new(settings: LedgerSettings) -> Self {
        Self {
            settings,
            http: Client::new(),
            request_id: Arc::new(AtomicU64::new(1)),
        }
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .http
            .post(&self.settings.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        if let Some(err) = response.get("error") {
            return Err(LedgerError::Rpc {
                code: err.pointer("/code").and_then(Value::as_i64).unwrap_or_default(),
                message: err
                    .pointer("/message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Malformed(format!("{method}: no result in RPC response")))
    }

    async fn call(&self, from: Option<&Identity>, data: String) -> Result<String, LedgerError> {
        let mut tx = json!({
            "to": self.settings.app_address,
            "data": data,
        });
        if let Some(from) = from {
            tx["from"] = json!(from);
        }

        let result = self.rpc_call("eth_call", json!([tx, "latest"])).await?;
        result
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| LedgerError::Malformed("eth_call result is not a string".to_string()))
    }

    async fn send_transaction(
        &self,
        from: &Identity,
        data: String,
        value: Wei,
        gas: u64,
    ) -> Result<TxHash, LedgerError> {
        let tx = json!({
            "from": from,
            "to": self.settings.app_address,
            "data": data,
            "value": abi::to_quantity(value),
            "gas": abi::to_quantity(u128::from(gas)),
            "gasPrice": abi::to_quantity(u128::from(self.settings.gas_price)),
        });

        let tx_hash = self
            .rpc_call("eth_sendTransaction", json!([tx]))
            .await?
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| LedgerError::Malformed("transaction hash is not a string".to_string()))?;

        self.wait_for_receipt(&tx_hash).await?;
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<(), LedgerError> {
        let attempts = self.settings.receipt_poll_attempts.max(1);
        for _ in 0..attempts {
            let receipt = self
                .rpc_call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if receipt.is_null() {
                sleep(self.settings.poll_interval).await;
                continue;
            }

            return receipt_outcome(&receipt, tx_hash);
        }

        Err(LedgerError::ReceiptTimeout {
            tx_hash: tx_hash.to_string(),
            attempts,
        })
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        let result = self.rpc_call("eth_blockNumber", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| LedgerError::Malformed("block number is not a string".to_string()))?;
        abi::parse_quantity(raw)
    }

    async fn fetch_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<Value>, LedgerError> {
        let filter = json!({
            "fromBlock": abi::to_quantity(u128::from(from_block)),
            "toBlock": abi::to_quantity(u128::from(to_block)),
            "address": self.settings.app_address,
            "topics": [abi::ORACLE_REQUEST_TOPIC],
        });

        let result = self.rpc_call("eth_getLogs", json!([filter])).await?;
        result
            .as_array()
            .cloned()
            .ok_or_else(|| LedgerError::Malformed("eth_getLogs result is not an array".to_string()))
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedger {
    async fn accounts(&self) -> Result<Vec<Identity>, LedgerError> {
        let result = self.rpc_call("eth_accounts", json!([])).await?;
        let accounts = result
            .as_array()
            .ok_or_else(|| LedgerError::Malformed("eth_accounts result is not an array".to_string()))?;

        Ok(accounts
            .iter()
            .filter_map(Value::as_str)
            .map(Address::new)
            .collect())
    }

    async fn registration_fee(&self) -> Result<Wei, LedgerError> {
        let data = self.call(None, abi::encode_call(abi::REGISTRATION_FEE)).await?;
        abi::decode_wei(&data)
    }

    async fn register_oracle(&self, identity: &Identity, fee: Wei) -> Result<TxHash, LedgerError> {
        self.send_transaction(
            identity,
            abi::encode_call(abi::REGISTER_ORACLE),
            fee,
            self.settings.registration_gas,
        )
        .await
    }

    async fn assigned_indexes(&self, identity: &Identity) -> Result<IndexAssignment, LedgerError> {
        let data = self
            .call(Some(identity), abi::encode_call(abi::GET_MY_INDEXES))
            .await?;
        abi::decode_index_triple(&data)
    }

    async fn submit_status_response(
        &self,
        submission: &ResponseSubmission,
    ) -> Result<TxHash, LedgerError> {
        let data = abi::encode_submit_oracle_response(submission)?;
        self.send_transaction(&submission.identity, data, 0, self.settings.response_gas)
            .await
    }

    fn status_requests(&self, from: StartBlock) -> StatusRequestStream {
        let cursor = LogCursor {
            ledger: self.clone(),
            start: from,
            next_block: None,
            pending: VecDeque::new(),
        };

        stream::unfold(cursor, |mut cursor| async move {
            let item = cursor.next_request().await;
            Some((item, cursor))
        })
        .boxed()
    }
}

/// Polling state behind one status-request subscription.
struct LogCursor {
    ledger: JsonRpcLedger,
    start: StartBlock,
    next_block: Option<u64>,
    pending: VecDeque<StatusRequest>,
}

impl LogCursor {
    async fn next_request(&mut self) -> Result<StatusRequest, LedgerError> {
        loop {
            if let Some(request) = self.pending.pop_front() {
                return Ok(request);
            }

            match self.poll_once().await {
                Ok(true) => continue,
                Ok(false) => sleep(self.ledger.settings.poll_interval).await,
                Err(err) => {
                    sleep(self.ledger.settings.poll_interval).await;
                    return Err(err);
                }
            }
        }
    }

    /// Reads the next block range. Returns `false` when the cursor is already at the head.
    async fn poll_once(&mut self) -> Result<bool, LedgerError> {
        let latest = self.ledger.block_number().await?;
        let from_block = *self
            .next_block
            .get_or_insert_with(|| self.start.resolve(latest));
        if from_block > latest {
            return Ok(false);
        }

        // Bound each query so a long backlog from genesis is read in slices.
        let to_block = latest.min(from_block + self.ledger.settings.block_range - 1);
        let logs = self.ledger.fetch_logs(from_block, to_block).await?;

        for raw in &logs {
            if raw.pointer("/removed").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            match parse_status_request(raw) {
                Ok(request) => self.pending.push_back(request),
                Err(err) => warn!(error = %err, "skipping undecodable OracleRequest log"),
            }
        }

        debug!(from_block, to_block, logs = logs.len(), "scanned blocks for status requests");
        self.next_block = Some(to_block + 1);
        Ok(true)
    }
}

/// Only an explicit `0x0` status is a revert. Pre-Byzantium development
/// chains omit `status` from receipts, so a missing field counts as mined.
fn receipt_outcome(receipt: &Value, tx_hash: &str) -> Result<(), LedgerError> {
    match receipt.pointer("/status").and_then(Value::as_str) {
        Some("0x0") => Err(LedgerError::Reverted {
            tx_hash: tx_hash.to_string(),
        }),
        _ => Ok(()),
    }
}

fn parse_status_request(raw: &Value) -> Result<StatusRequest, LedgerError> {
    let data = raw
        .pointer("/data")
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::Malformed("log without data".to_string()))?;
    let block_number = raw
        .pointer("/blockNumber")
        .and_then(Value::as_str)
        .map(abi::parse_quantity)
        .transpose()?
        .unwrap_or_default();

    let (index, flight) = abi::decode_oracle_request(data)?;
    Ok(StatusRequest {
        index,
        flight,
        block_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_request_log() {
        let data = concat!(
            "0x",
            "0000000000000000000000000000000000000000000000000000000000000007",
            "000000000000000000000000f17f52151ebef6c7334fad080c5704d77216b732",
            "0000000000000000000000000000000000000000000000000000000000000080",
            "000000000000000000000000000000000000000000000000000000006553f100",
            "0000000000000000000000000000000000000000000000000000000000000006",
            "4e44313330390000000000000000000000000000000000000000000000000000",
        );
        let log = json!({
            "address": "0x345ca3e014aaf5dca488057592ee47305d9b3e10",
            "blockNumber": "0x1b4",
            "data": data,
            "topics": [abi::ORACLE_REQUEST_TOPIC],
            "removed": false,
        });

        let request = parse_status_request(&log).unwrap();
        assert_eq!(request.index, 7);
        assert_eq!(request.block_number, 436);
        assert_eq!(request.flight.flight, "ND1309");
        assert_eq!(request.flight.timestamp, 1_700_000_000);
        assert_eq!(
            request.flight.airline.as_str(),
            "0xf17f52151ebef6c7334fad080c5704d77216b732"
        );
    }

    #[test]
    fn test_receipt_outcome() {
        let hash = "0xabc";
        assert!(receipt_outcome(&json!({ "status": "0x1" }), hash).is_ok());
        assert!(matches!(
            receipt_outcome(&json!({ "status": "0x0" }), hash),
            Err(LedgerError::Reverted { ref tx_hash }) if tx_hash == hash
        ));
        // Pre-Byzantium receipt: no status field.
        assert!(receipt_outcome(&json!({ "root": "0x01", "gasUsed": "0x5208" }), hash).is_ok());
    }

    #[test]
    fn test_parse_status_request_without_data() {
        let log = json!({ "blockNumber": "0x1" });
        assert!(matches!(
            parse_status_request(&log),
            Err(LedgerError::Malformed(_))
        ));
    }
}
