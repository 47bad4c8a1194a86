// 索引器客户端服务
// Insight 风格 API：UTXO 查询、地址交易历史、交易广播
// 不做重试，传输失败以 Network 错误交给调用方

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{BackendsConfig, HttpConfig};
use crate::domain::chain_config::ChainId;
use crate::error::{Result, WalletError};
use crate::service::transaction_builder::UtxoRef;
use crate::utils::{amount::coins_to_satoshis, string_utils::strip_hex_prefix};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BroadcastTransactionRequest {
    pub rawtx: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BroadcastTransactionResponse {
    pub txid: String,
}

/// Insight `/api/addr/{address}/utxo` 单条记录
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsightUtxo {
    txid: String,
    vout: u32,
    #[serde(default)]
    satoshis: Option<u64>,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    script_pub_key: Option<String>,
}

impl InsightUtxo {
    fn into_utxo_ref(self) -> Result<UtxoRef> {
        let satoshis = match (self.satoshis, &self.amount) {
            (Some(sats), _) => sats,
            (None, Some(amount)) => coins_to_satoshis(amount)
                .and_then(|s| u64::try_from(s).ok())
                .ok_or_else(|| {
                    WalletError::MalformedIndexerRecord(format!(
                        "utxo {}:{} has an unreadable amount",
                        self.txid, self.vout
                    ))
                })?,
            (None, None) => {
                return Err(WalletError::MalformedIndexerRecord(format!(
                    "utxo {}:{} has no value",
                    self.txid, self.vout
                )))
            }
        };

        Ok(UtxoRef {
            txid: self.txid,
            vout: self.vout,
            satoshis,
            script_pub_key: self.script_pub_key,
            redeem_script: None,
        })
    }
}

/// 链数据后端（UTXO 提供者 / 广播器 / 历史来源）
#[async_trait]
pub trait ChainBackend: Send + Sync {
    /// 地址的未花费输出快照
    async fn fetch_utxos(&self, address: &str, chain: ChainId) -> Result<Vec<UtxoRef>>;

    /// 地址交易分页，返回未解码的索引器记录
    async fn fetch_address_transactions(
        &self,
        address: &str,
        chain: ChainId,
        from: u32,
        to: u32,
    ) -> Result<Vec<Value>>;

    /// 广播成品交易，返回 txid
    async fn broadcast_tx(&self, final_tx_hex: &str, chain: ChainId) -> Result<String>;
}

/// Insight API 客户端
pub struct IndexerClient {
    http_client: reqwest::Client,
    backends: BackendsConfig,
}

impl IndexerClient {
    pub fn new(backends: BackendsConfig, http: &HttpConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(http.timeout())
            .connect_timeout(http.connect_timeout())
            .pool_max_idle_per_host(4)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client: client,
            backends,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.backends.clone(), &config.http)
    }

    /// 节点是裸主机名时补 https://
    pub fn base_url(&self, chain: ChainId) -> String {
        let node = self.backends.get(chain).node.trim().trim_end_matches('/');
        if node.contains("://") {
            node.to_string()
        } else {
            format!("https://{}", node)
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalletError::MalformedIndexerRecord(format!(
                "indexer returned {}: {}",
                status,
                crate::utils::string_utils::truncate(&body, 200)
            )));
        }
        response.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                WalletError::MalformedIndexerRecord(format!("response body: {}", e))
            } else {
                WalletError::Network(e)
            }
        })
    }
}

#[async_trait]
impl ChainBackend for IndexerClient {
    async fn fetch_utxos(&self, address: &str, chain: ChainId) -> Result<Vec<UtxoRef>> {
        let url = format!("{}/api/addr/{}/utxo", self.base_url(chain), address);
        let json = self.get_json(&url).await?;

        let records: Vec<InsightUtxo> = serde_json::from_value(json)
            .map_err(|e| WalletError::MalformedIndexerRecord(format!("utxo list: {}", e)))?;

        let utxos = records
            .into_iter()
            .map(InsightUtxo::into_utxo_ref)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(chain = %chain, address = %address, count = utxos.len(), "Fetched utxos");
        Ok(utxos)
    }

    async fn fetch_address_transactions(
        &self,
        address: &str,
        chain: ChainId,
        from: u32,
        to: u32,
    ) -> Result<Vec<Value>> {
        let url = format!(
            "{}/api/addrs/{}/txs?from={}&to={}",
            self.base_url(chain),
            address,
            from,
            to
        );
        let json = self.get_json(&url).await?;

        match json.get("items") {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(WalletError::MalformedIndexerRecord(
                "transaction page has no items array".into(),
            )),
        }
    }

    async fn broadcast_tx(&self, final_tx_hex: &str, chain: ChainId) -> Result<String> {
        let url = format!("{}/api/tx/send", self.base_url(chain));
        let request = BroadcastTransactionRequest {
            rawtx: strip_hex_prefix(final_tx_hex.trim()).to_string(),
        };

        let response = self.http_client.post(&url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(chain = %chain, status = %status, "Broadcast rejected");
            return Err(WalletError::BroadcastRejected(if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }));
        }

        let parsed: BroadcastTransactionResponse = response.json().await.map_err(|e| {
            WalletError::MalformedIndexerRecord(format!("broadcast response: {}", e))
        })?;

        tracing::info!(chain = %chain, txid = %parsed.txid, "Transaction broadcast successful");
        Ok(parsed.txid)
    }
}
