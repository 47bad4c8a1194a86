//! 交易历史解码
//!
//! 把索引器原始记录转换为面向展示的 `NormalizedTransactionRecord`。
//! 单个字段缺失或格式异常时按 0 / 空处理，只有整条记录不可识别时才报错。

use bitcoin::blockdata::script::Script;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::chain_config::ChainId;
use crate::domain::script::op_return_payload;
use crate::error::{Result, WalletError};
use crate::service::blockchain_client::ChainBackend;
use crate::utils::amount::coins_to_satoshis;
use crate::utils::time_utils::{millis_to_datetime, seconds_to_millis};

const OP_RETURN_ASM_MARKER: &str = "OP_RETURN ";

/// 展示用交易记录，金额均为最小单位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTransactionRecord {
    pub txid: String,
    pub fee: i64,
    pub block_height: i64,
    pub timestamp_millis: i64,
    /// 正数为收入；为负时已加回手续费
    pub amount: i64,
    pub message: String,
}

impl NormalizedTransactionRecord {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        millis_to_datetime(self.timestamp_millis)
    }

    /// 未确认交易的区块高度为 0 或负数
    pub fn is_confirmed(&self) -> bool {
        self.block_height > 0
    }
}

/// 十六进制字节对 → Latin-1 字符，遇到 `00`、非法字节对或数据结束即停止
pub fn decode_hex_message(hex_payload: &str) -> String {
    let mut message = String::new();
    for pair in hex_payload.as_bytes().chunks(2) {
        let Ok(pair) = std::str::from_utf8(pair) else {
            break;
        };
        if pair.len() < 2 || pair == "00" {
            break;
        }
        match u8::from_str_radix(pair, 16) {
            Ok(byte) => message.push(char::from(byte)),
            Err(_) => break,
        }
    }
    message
}

/// 从 asm 文本中取 `OP_RETURN ` 之后的载荷
pub fn decode_asm_message(asm: &str) -> String {
    match asm.split_once(OP_RETURN_ASM_MARKER) {
        Some((_, payload)) => decode_hex_message(payload),
        None => String::new(),
    }
}

fn decode_script_hex_message(script_hex: &str) -> String {
    let Ok(bytes) = hex::decode(script_hex) else {
        return String::new();
    };
    match op_return_payload(Script::from_bytes(&bytes)) {
        Some(payload) => decode_hex_message(&hex::encode(payload)),
        None => String::new(),
    }
}

fn output_message(vout: &Value) -> String {
    let script = &vout["scriptPubKey"];
    if let Some(asm) = script["asm"].as_str() {
        let message = decode_asm_message(asm);
        if !message.is_empty() {
            return message;
        }
    }
    script["hex"]
        .as_str()
        .map(decode_script_hex_message)
        .unwrap_or_default()
}

fn satoshis_of(value: &Value) -> i64 {
    coins_to_satoshis(value).unwrap_or(0)
}

fn input_satoshis(vin: &Value) -> i64 {
    match vin.get("value") {
        Some(value) if !value.is_null() => satoshis_of(value),
        _ => vin["valueSat"].as_i64().unwrap_or(0),
    }
}

/// 求和溢出时按 0 处理
fn checked_total(mut values: impl Iterator<Item = i64>) -> i64 {
    values.try_fold(0i64, i64::checked_add).unwrap_or(0)
}

fn output_address(vout: &Value) -> Option<&str> {
    vout["scriptPubKey"]["addresses"]
        .as_array()
        .and_then(|addresses| addresses.first())
        .and_then(Value::as_str)
}

/// 解码单条索引器交易
pub fn process_transaction(raw: &Value, address: &str) -> Result<NormalizedTransactionRecord> {
    let record = raw.as_object().ok_or_else(|| {
        WalletError::MalformedIndexerRecord("transaction record is not an object".into())
    })?;
    let txid = record
        .get("txid")
        .and_then(Value::as_str)
        .ok_or_else(|| WalletError::MalformedIndexerRecord("transaction record has no txid".into()))?;

    let empty = Vec::new();
    let vins = raw["vin"].as_array().unwrap_or(&empty);
    let vouts = raw["vout"].as_array().unwrap_or(&empty);

    let amount_sent = checked_total(
        vins.iter()
            .filter(|vin| vin["addr"].as_str() == Some(address))
            .map(input_satoshis),
    );
    let amount_received = checked_total(
        vouts
            .iter()
            .filter(|vout| output_address(vout) == Some(address))
            .map(|vout| satoshis_of(&vout["value"])),
    );

    let mut message = String::new();
    for vout in vouts {
        let decoded = output_message(vout);
        if !decoded.is_empty() {
            message = decoded;
        }
    }

    let fee = satoshis_of(&raw["fees"]);
    let mut amount = amount_received.checked_sub(amount_sent).unwrap_or(0);
    if amount < 0 {
        amount = amount.checked_add(fee).unwrap_or(0);
    }

    Ok(NormalizedTransactionRecord {
        txid: txid.to_string(),
        fee,
        block_height: raw["blockheight"].as_i64().unwrap_or(0),
        timestamp_millis: seconds_to_millis(raw["time"].as_i64().unwrap_or(0)),
        amount,
        message,
    })
}

/// 拉取并解码一页地址交易
pub async fn fetch_address_transactions(
    backend: &dyn ChainBackend,
    address: &str,
    chain: ChainId,
    from: u32,
    to: u32,
) -> Result<Vec<NormalizedTransactionRecord>> {
    let items = backend
        .fetch_address_transactions(address, chain, from, to)
        .await?;

    let records = items
        .iter()
        .map(|item| process_transaction(item, address))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(chain = %chain, from = from, to = to, count = records.len(), "Decoded address history");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hello_stops_at_terminator() {
        assert_eq!(decode_asm_message("OP_RETURN 48656c6c6f00ffff"), "Hello");
        assert_eq!(decode_asm_message("OP_DUP OP_HASH160"), "");
    }

    #[test]
    fn test_invalid_pair_stops_decoding() {
        assert_eq!(decode_hex_message("4869zz41"), "Hi");
        assert_eq!(decode_hex_message("486"), "H");
    }

    #[test]
    fn test_high_bytes_map_to_latin1() {
        assert_eq!(decode_hex_message("e9"), "é");
    }

    #[test]
    fn test_message_from_script_hex() {
        let raw = json!({
            "txid": "t",
            "vout": [{"value": "0", "scriptPubKey": {"hex": "6a0548656c6c6f"}}]
        });
        assert_eq!(process_transaction(&raw, "x").unwrap().message, "Hello");
    }

    #[test]
    fn test_last_message_wins() {
        let raw = json!({
            "txid": "t",
            "vout": [
                {"value": "0", "scriptPubKey": {"asm": "OP_RETURN 6669727374"}},
                {"value": "1", "scriptPubKey": {"asm": "OP_DUP", "addresses": ["other"]}},
                {"value": "0", "scriptPubKey": {"asm": "OP_RETURN 6c617374"}}
            ]
        });
        assert_eq!(process_transaction(&raw, "x").unwrap().message, "last");
    }

    #[test]
    fn test_missing_txid_is_malformed() {
        assert!(matches!(
            process_transaction(&json!({"vin": []}), "x"),
            Err(WalletError::MalformedIndexerRecord(_))
        ));
        assert!(matches!(
            process_transaction(&json!([1, 2]), "x"),
            Err(WalletError::MalformedIndexerRecord(_))
        ));
    }

    #[test]
    fn test_field_quirks_degrade_to_zero() {
        let raw = json!({
            "txid": "t",
            "fees": "not-a-number",
            "vin": [{"addr": "me", "value": null}],
            "vout": [{"value": "0.5", "scriptPubKey": {}}]
        });
        let record = process_transaction(&raw, "me").unwrap();
        assert_eq!(record.amount, 0);
        assert_eq!(record.fee, 0);
        assert_eq!(record.block_height, 0);
        assert_eq!(record.message, "");
    }

    #[test]
    fn test_oversized_values_degrade_to_zero() {
        let raw = json!({
            "txid": "t",
            "fees": "0.0001",
            "vin": [
                {"addr": "me", "value": "50000000000"},
                {"addr": "me", "value": "50000000000"}
            ],
            "vout": [
                {"value": "50000000000", "scriptPubKey": {"addresses": ["me"]}},
                {"value": "50000000000", "scriptPubKey": {"addresses": ["me"]}}
            ]
        });
        let record = process_transaction(&raw, "me").unwrap();
        assert_eq!(record.amount, 0);
        assert_eq!(record.fee, 10_000);

        // 只有发送侧溢出
        let raw = json!({
            "txid": "t",
            "vin": [
                {"addr": "me", "value": "50000000000"},
                {"addr": "me", "value": "50000000000"}
            ],
            "vout": [{"value": "1", "scriptPubKey": {"addresses": ["me"]}}]
        });
        assert_eq!(process_transaction(&raw, "me").unwrap().amount, 100_000_000);
    }

    #[test]
    fn test_received_amount_is_positive_without_fee() {
        let raw = json!({
            "txid": "t",
            "fees": 0.0001,
            "blockheight": 1500000,
            "time": 1700000000,
            "vin": [{"addr": "other", "value": 2.0}],
            "vout": [{"value": "1.5", "scriptPubKey": {"addresses": ["me"]}}]
        });
        let record = process_transaction(&raw, "me").unwrap();
        assert_eq!(record.amount, 150_000_000);
        assert_eq!(record.fee, 10_000);
        assert_eq!(record.timestamp_millis, 1_700_000_000_000);
        assert_eq!(record.block_height, 1_500_000);
        assert!(record.is_confirmed());
        assert_eq!(
            record.datetime().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }
}
