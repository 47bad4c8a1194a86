//! 测试辅助模块
//! 固定助记词、链上夹具与本地模拟 Insight 索引器

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sspcore::config::{BackendsConfig, HttpConfig};
use bitcoin::hashes::Hash;
use bitcoin::{Amount, TxOut, Txid};
use sspcore::domain::chain_config::ChainId;
use sspcore::domain::transaction::{prev_txid_hex, unsigned_input, UtxoTransaction};
use sspcore::prelude::*;

/// 钱包端助记词（BIP39 标准向量）
pub const WALLET_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
/// 共签端助记词
pub const KEY_MNEMONIC: &str = "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong";

pub fn account_key_pair(mnemonic: &str, chain: ChainId) -> ExtendedKeyPair {
    let seed = SeedPhrase::parse(mnemonic).expect("valid mnemonic");
    derive_master_key_pair(&seed, 48, chain.params().coin_type, 0, ScriptType::P2sh)
        .expect("derivation succeeds")
}

pub fn account_xpub(mnemonic: &str, chain: ChainId) -> String {
    account_key_pair(mnemonic, chain).encode_xpub(chain)
}

pub fn account_xpriv(mnemonic: &str, chain: ChainId) -> DecryptedSecret {
    let encoded = account_key_pair(mnemonic, chain)
        .encode_xpriv(chain)
        .expect("private key present");
    DecryptedSecret::from(encoded.as_str())
}

/// 花费钱包 UTXO 的未签名交易；返回交易 hex 与对应的 UTXO 快照
pub fn spend_fixture(
    chain: ChainId,
    wallet: &MultisigDescriptor,
    pay_to: &str,
    inputs: u8,
) -> (String, Vec<UtxoRef>) {
    let wallet_script = sspcore::domain::address::decode_address(&wallet.address, chain)
        .unwrap()
        .script_pubkey();
    let receiver_script = sspcore::domain::address::decode_address(pay_to, chain)
        .unwrap()
        .script_pubkey();

    let mut tx_inputs = Vec::new();
    let mut utxos = Vec::new();
    for i in 0..inputs {
        let input = unsigned_input(Txid::from_byte_array([0xa0 + i; 32]), u32::from(i));
        utxos.push(UtxoRef {
            txid: prev_txid_hex(&input),
            vout: input.previous_output.vout,
            satoshis: 100_000_000,
            script_pub_key: Some(hex::encode(wallet_script.as_bytes())),
            redeem_script: None,
        });
        tx_inputs.push(input);
    }

    let mut tx = UtxoTransaction::unsigned(
        chain.params().tx_family,
        tx_inputs,
        vec![
            TxOut {
                value: Amount::from_sat(25_000_000),
                script_pubkey: receiver_script,
            },
            TxOut {
                value: Amount::from_sat(u64::from(inputs) * 100_000_000 - 25_010_000),
                script_pubkey: wallet_script,
            },
        ],
    );
    if let Some(fields) = tx.sapling.as_mut() {
        fields.expiry_height = 1_600_000;
    }

    (tx.to_hex(), utxos)
}

#[derive(Default)]
pub struct MockIndexerState {
    pub utxos: Mutex<Value>,
    pub transactions: Mutex<Value>,
    pub broadcasts: Mutex<Vec<String>>,
    /// 设置后广播返回 400 与该消息
    pub reject_with: Mutex<Option<String>>,
}

#[derive(Deserialize)]
struct PageQuery {
    from: u32,
    to: u32,
}

async fn utxo_handler(
    State(state): State<Arc<MockIndexerState>>,
    Path(_address): Path<String>,
) -> Json<Value> {
    Json(state.utxos.lock().unwrap().clone())
}

async fn txs_handler(
    State(state): State<Arc<MockIndexerState>>,
    Path(_address): Path<String>,
    Query(page): Query<PageQuery>,
) -> Json<Value> {
    let items = state.transactions.lock().unwrap().clone();
    let items: Vec<Value> = items
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .skip(page.from as usize)
        .take(page.to.saturating_sub(page.from) as usize)
        .collect();
    Json(json!({ "totalItems": items.len(), "from": page.from, "to": page.to, "items": items }))
}

async fn send_handler(
    State(state): State<Arc<MockIndexerState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if let Some(message) = state.reject_with.lock().unwrap().clone() {
        return Err((StatusCode::BAD_REQUEST, message));
    }
    let rawtx = body["rawtx"].as_str().unwrap_or_default().to_string();
    state.broadcasts.lock().unwrap().push(rawtx);
    Ok(Json(json!({ "txid": "f".repeat(64) })))
}

/// 在随机端口启动模拟索引器，返回 base url
pub async fn spawn_mock_indexer(state: Arc<MockIndexerState>) -> String {
    let app = Router::new()
        .route("/api/addr/:address/utxo", get(utxo_handler))
        .route("/api/addrs/:address/txs", get(txs_handler))
        .route("/api/tx/send", post(send_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn indexer_client(base_url: &str) -> IndexerClient {
    IndexerClient::new(
        BackendsConfig::uniform(base_url),
        &HttpConfig {
            timeout_secs: 5,
            connect_timeout_secs: 2,
        },
    )
}
