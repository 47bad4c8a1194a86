//! 统一错误类型
//!
//! 核心层所有失败都以 `WalletError` 返回给调用方，由调用方决定提示与重试策略。

use thiserror::Error;

pub type Result<T, E = WalletError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid seed phrase: {0}")]
    InvalidSeed(String),

    #[error("key derivation failed: {0}")]
    DerivationError(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("utxo mismatch for input {txid}:{vout}: {reason}")]
    UtxoMismatch {
        txid: String,
        vout: u32,
        reason: String,
    },

    #[error("signing failed: {0}")]
    SigningError(String),

    #[error("insufficient signatures on input {input}: have {have}, need {need}")]
    InsufficientSignatures {
        input: usize,
        have: usize,
        need: usize,
    },

    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    #[error("malformed indexer record: {0}")]
    MalformedIndexerRecord(String),

    // 扩展错误码
    #[error("indexer request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation cancelled before completion")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

/// 稳定的错误码（供调用方做本地化映射）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletErrorCode {
    InvalidSeed,
    DerivationError,
    InvalidPublicKey,
    UtxoMismatch,
    SigningError,
    InsufficientSignatures,
    BroadcastRejected,
    MalformedIndexerRecord,
    Network,
    UnsupportedChain,
    InvalidInput,
    Cancelled,
    Config,
}

impl WalletErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletErrorCode::InvalidSeed => "invalid_seed",
            WalletErrorCode::DerivationError => "derivation_error",
            WalletErrorCode::InvalidPublicKey => "invalid_public_key",
            WalletErrorCode::UtxoMismatch => "utxo_mismatch",
            WalletErrorCode::SigningError => "signing_error",
            WalletErrorCode::InsufficientSignatures => "insufficient_signatures",
            WalletErrorCode::BroadcastRejected => "broadcast_rejected",
            WalletErrorCode::MalformedIndexerRecord => "malformed_indexer_record",
            WalletErrorCode::Network => "network",
            WalletErrorCode::UnsupportedChain => "unsupported_chain",
            WalletErrorCode::InvalidInput => "invalid_input",
            WalletErrorCode::Cancelled => "cancelled",
            WalletErrorCode::Config => "config",
        }
    }
}

impl WalletError {
    pub fn code(&self) -> WalletErrorCode {
        match self {
            WalletError::InvalidSeed(_) => WalletErrorCode::InvalidSeed,
            WalletError::DerivationError(_) => WalletErrorCode::DerivationError,
            WalletError::InvalidPublicKey(_) => WalletErrorCode::InvalidPublicKey,
            WalletError::UtxoMismatch { .. } => WalletErrorCode::UtxoMismatch,
            WalletError::SigningError(_) => WalletErrorCode::SigningError,
            WalletError::InsufficientSignatures { .. } => WalletErrorCode::InsufficientSignatures,
            WalletError::BroadcastRejected(_) => WalletErrorCode::BroadcastRejected,
            WalletError::MalformedIndexerRecord(_) => WalletErrorCode::MalformedIndexerRecord,
            WalletError::Network(_) => WalletErrorCode::Network,
            WalletError::UnsupportedChain(_) => WalletErrorCode::UnsupportedChain,
            WalletError::InvalidInput(_) => WalletErrorCode::InvalidInput,
            WalletError::Cancelled => WalletErrorCode::Cancelled,
            WalletError::Config(_) => WalletErrorCode::Config,
        }
    }

    /// 传输层失败可由调用方重试；核心层自身不做重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::Network(_))
    }

    pub fn signing(msg: impl Into<String>) -> Self {
        WalletError::SigningError(msg.into())
    }

    pub fn utxo_mismatch(txid: impl Into<String>, vout: u32, reason: impl Into<String>) -> Self {
        WalletError::UtxoMismatch {
            txid: txid.into(),
            vout,
            reason: reason.into(),
        }
    }
}

impl From<tokio::task::JoinError> for WalletError {
    fn from(_: tokio::task::JoinError) -> Self {
        WalletError::Cancelled
    }
}

/// 配置加载内部使用 anyhow，对外统一为 Config
impl From<anyhow::Error> for WalletError {
    fn from(err: anyhow::Error) -> Self {
        WalletError::Config(format!("{:#}", err))
    }
}
