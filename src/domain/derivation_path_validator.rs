//! BIP48 派生路径验证器
//!
//! 账户级路径固定为 m/purpose'/coin_type'/account'/script_type'，
//! 地址级路径在其下追加两层非硬化索引 change/index。

use bitcoin::bip32::{ChildNumber, DerivationPath};
use serde::{Deserialize, Serialize};

use crate::domain::chain_config::ChainId;
use crate::error::{Result, WalletError};

/// 默认钱包密钥使用的 purpose（BIP48 多签）
pub const MULTISIG_PURPOSE: u32 = 48;
pub const DEFAULT_ACCOUNT: u32 = 0;

/// 脚本类型（决定账户路径最后一层硬化索引以及地址编码方式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    #[serde(rename = "p2sh")]
    P2sh,
    #[serde(rename = "p2sh-p2wsh")]
    P2shP2wsh,
    #[serde(rename = "p2wsh")]
    P2wsh,
}

impl ScriptType {
    pub fn path_index(&self) -> u32 {
        match self {
            ScriptType::P2sh => 0,
            ScriptType::P2shP2wsh => 1,
            ScriptType::P2wsh => 2,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "p2sh" => Ok(ScriptType::P2sh),
            "p2sh-p2wsh" => Ok(ScriptType::P2shP2wsh),
            "p2wsh" => Ok(ScriptType::P2wsh),
            other => Err(WalletError::InvalidInput(format!(
                "unknown script type: {}",
                other
            ))),
        }
    }
}

/// 派生路径验证器
pub struct DerivationPathValidator;

impl DerivationPathValidator {
    /// 构建账户级路径，任何一层超出硬化范围都返回 DerivationError
    pub fn account_path(
        purpose: u32,
        coin_type: u32,
        account: u32,
        script_type: ScriptType,
    ) -> Result<DerivationPath> {
        let components = [
            ("purpose", purpose),
            ("coin_type", coin_type),
            ("account", account),
            ("script_type", script_type.path_index()),
        ];

        let mut path = Vec::with_capacity(components.len());
        for (name, index) in components {
            let child = ChildNumber::from_hardened_idx(index).map_err(|_| {
                WalletError::DerivationError(format!(
                    "{} {} is outside the hardened index range",
                    name, index
                ))
            })?;
            path.push(child);
        }

        Ok(DerivationPath::from(path))
    }

    /// 默认钱包密钥路径 m/48'/coin'/0'/0'
    pub fn default_key_path(chain: ChainId) -> Result<DerivationPath> {
        Self::account_path(
            MULTISIG_PURPOSE,
            chain.params().coin_type,
            DEFAULT_ACCOUNT,
            ScriptType::P2sh,
        )
    }

    /// 地址级相对路径 change/index（非硬化）
    pub fn address_suffix(change_index: u32, address_index: u32) -> Result<[ChildNumber; 2]> {
        let change = ChildNumber::from_normal_idx(change_index).map_err(|_| {
            WalletError::DerivationError(format!("change index {} must be non-hardened", change_index))
        })?;
        let index = ChildNumber::from_normal_idx(address_index).map_err(|_| {
            WalletError::DerivationError(format!(
                "address index {} must be non-hardened",
                address_index
            ))
        })?;
        Ok([change, index])
    }
}
