//! 共签方收到的输入
//!
//! 由调用方显式标注类型；中继载荷使用 `xpub:` / `tx:` 前缀。

use std::fmt;

use crate::error::{Result, WalletError};
use crate::utils::string_utils::is_blank;

const XPUB_TAG: &str = "xpub:";
const TX_TAG: &str = "tx:";

#[derive(Clone, PartialEq, Eq)]
pub enum WalletInput {
    /// 钱包端账户 xpub，触发同步
    ExtendedPublicKey(String),
    /// 待共签的原始交易
    RawTransactionHex(String),
}

impl WalletInput {
    pub fn parse_tagged(payload: &str) -> Result<Self> {
        let payload = payload.trim();
        let (input, body) = if let Some(body) = payload.strip_prefix(XPUB_TAG) {
            (WalletInput::ExtendedPublicKey(body.trim().to_string()), body)
        } else if let Some(body) = payload.strip_prefix(TX_TAG) {
            (WalletInput::RawTransactionHex(body.trim().to_string()), body)
        } else {
            return Err(WalletError::InvalidInput(
                "payload must be tagged with xpub: or tx:".into(),
            ));
        };

        if is_blank(body) {
            return Err(WalletError::InvalidInput("payload is empty".into()));
        }
        Ok(input)
    }

    pub fn payload(&self) -> &str {
        match self {
            WalletInput::ExtendedPublicKey(s) | WalletInput::RawTransactionHex(s) => s,
        }
    }
}

impl fmt::Debug for WalletInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview = crate::utils::string_utils::truncate(self.payload(), 16);
        match self {
            WalletInput::ExtendedPublicKey(_) => write!(f, "ExtendedPublicKey({})", preview),
            WalletInput::RawTransactionHex(_) => write!(f, "RawTransactionHex({})", preview),
        }
    }
}
