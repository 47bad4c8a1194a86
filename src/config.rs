//! 配置管理模块
//! 支持从环境变量、.env 与 TOML 配置文件加载配置

use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::chain_config::ChainId;
use crate::utils::string_utils::is_blank;

/// 核心库配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

/// 单条索引器后端
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// 主机名（默认加 https://），或带 scheme 的完整地址
    pub node: String,
}

/// 各链索引器后端
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendsConfig {
    pub flux: BackendConfig,
    #[serde(rename = "fluxTestnet", alias = "flux_testnet")]
    pub flux_testnet: BackendConfig,
    pub rvn: BackendConfig,
    pub ltc: BackendConfig,
}

/// HTTP 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

fn env_backend(var: &str, chain: ChainId) -> BackendConfig {
    BackendConfig {
        node: std::env::var(var).unwrap_or_else(|_| chain.params().default_backend.to_string()),
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            flux: env_backend("FLUX_BACKEND", ChainId::Flux),
            flux_testnet: env_backend("FLUX_TESTNET_BACKEND", ChainId::FluxTestnet),
            rvn: env_backend("RVN_BACKEND", ChainId::Rvn),
            ltc: env_backend("LTC_BACKEND", ChainId::Ltc),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: std::env::var("INDEXER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            connect_timeout_secs: std::env::var("INDEXER_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl BackendsConfig {
    pub fn get(&self, chain: ChainId) -> &BackendConfig {
        match chain {
            ChainId::Flux => &self.flux,
            ChainId::FluxTestnet => &self.flux_testnet,
            ChainId::Rvn => &self.rvn,
            ChainId::Ltc => &self.ltc,
        }
    }

    fn get_mut(&mut self, chain: ChainId) -> &mut BackendConfig {
        match chain {
            ChainId::Flux => &mut self.flux,
            ChainId::FluxTestnet => &mut self.flux_testnet,
            ChainId::Rvn => &mut self.rvn,
            ChainId::Ltc => &mut self.ltc,
        }
    }

    /// 所有链都指向同一个节点（测试与本地索引器使用）
    pub fn uniform(node: impl Into<String>) -> Self {
        let node = node.into();
        let backend = BackendConfig { node };
        Self {
            flux: backend.clone(),
            flux_testnet: backend.clone(),
            rvn: backend.clone(),
            ltc: backend,
        }
    }

    /// 合并移动端存储的后端覆盖项：`{"flux": {"node": "..."}, ...}`
    ///
    /// 未知链名会被忽略，已知链的空节点视为错误。
    pub fn apply_overrides_json(&mut self, json: &str) -> Result<()> {
        let overrides: HashMap<String, BackendConfig> =
            serde_json::from_str(json).context("Failed to parse backend overrides")?;

        for (name, backend) in overrides {
            let chain: ChainId = match name.parse() {
                Ok(chain) => chain,
                Err(_) => {
                    tracing::warn!(chain = %name, "Ignoring backend override for unknown chain");
                    continue;
                }
            };
            if is_blank(&backend.node) {
                anyhow::bail!("Backend override for {} has an empty node", chain);
            }
            tracing::info!(chain = %chain, node = %backend.node, "Applied backend override");
            *self.get_mut(chain) = backend;
        }

        Ok(())
    }
}

impl Config {
    /// 从环境变量加载配置（先读取 .env）
    pub fn from_env() -> Result<Self> {
        // .env 不存在时忽略
        let _ = dotenvy::dotenv();

        Ok(Self {
            logging: LoggingConfig::default(),
            backends: BackendsConfig::default(),
            http: HttpConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        for chain in ChainId::ALL {
            let node = &self.backends.get(chain).node;
            if is_blank(node) {
                anyhow::bail!("Backend node for {} must not be empty", chain);
            }
            if node.contains(char::is_whitespace) {
                anyhow::bail!("Backend node for {} must not contain whitespace", chain);
            }
        }

        if self.http.timeout_secs == 0 || self.http.connect_timeout_secs == 0 {
            anyhow::bail!("INDEXER_TIMEOUT_SECS and INDEXER_CONNECT_TIMEOUT_SECS must be positive");
        }

        Ok(())
    }
}
