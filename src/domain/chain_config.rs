//! 链参数配置模块
//!
//! 定义所有支持的 UTXO 链的地址前缀、BIP32 版本号与交易格式

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// 链标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChainId {
    Flux,
    FluxTestnet,
    Rvn,
    Ltc,
}

/// 交易序列化格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxFamily {
    /// 比特币传统格式（无隔离见证）
    Legacy,
    /// Zcash Sapling v4（仅透明部分），签名哈希为 ZIP-243
    Sapling {
        version_group_id: u32,
        consensus_branch_id: u32,
    },
}

/// 链参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    pub id: ChainId,
    pub name: &'static str,
    pub symbol: &'static str,
    /// SLIP-44 coin type
    pub coin_type: u32,
    /// P2PKH 地址版本前缀
    pub pub_key_hash: &'static [u8],
    /// P2SH 地址版本前缀
    pub script_hash: &'static [u8],
    /// WIF 私钥前缀
    pub wif: u8,
    pub bip32_public: u32,
    pub bip32_private: u32,
    pub tx_family: TxFamily,
    /// 默认索引器主机
    pub default_backend: &'static str,
    pub is_testnet: bool,
}

const SAPLING_FLUX: TxFamily = TxFamily::Sapling {
    version_group_id: 0x892f_2085,
    consensus_branch_id: 0x76b8_09bb,
};

static FLUX: ChainParams = ChainParams {
    id: ChainId::Flux,
    name: "Flux",
    symbol: "FLUX",
    coin_type: 19167,
    pub_key_hash: &[0x1c, 0xb8],
    script_hash: &[0x1c, 0xbd],
    wif: 0x80,
    bip32_public: 0x0488_b21e,
    bip32_private: 0x0488_ade4,
    tx_family: SAPLING_FLUX,
    default_backend: "blockbook.runonflux.io",
    is_testnet: false,
};

static FLUX_TESTNET: ChainParams = ChainParams {
    id: ChainId::FluxTestnet,
    name: "Flux Testnet",
    symbol: "TEST-FLUX",
    coin_type: 1,
    pub_key_hash: &[0x1d, 0x25],
    script_hash: &[0x1c, 0xba],
    wif: 0xef,
    bip32_public: 0x0435_87cf,
    bip32_private: 0x0435_8394,
    tx_family: SAPLING_FLUX,
    default_backend: "testnet.runonflux.io",
    is_testnet: true,
};

static RVN: ChainParams = ChainParams {
    id: ChainId::Rvn,
    name: "Ravencoin",
    symbol: "RVN",
    coin_type: 175,
    pub_key_hash: &[0x3c],
    script_hash: &[0x7a],
    wif: 0x80,
    bip32_public: 0x0488_b21e,
    bip32_private: 0x0488_ade4,
    tx_family: TxFamily::Legacy,
    default_backend: "api.ravencoin.org",
    is_testnet: false,
};

static LTC: ChainParams = ChainParams {
    id: ChainId::Ltc,
    name: "Litecoin",
    symbol: "LTC",
    coin_type: 2,
    pub_key_hash: &[0x30],
    script_hash: &[0x32],
    wif: 0xb0,
    bip32_public: 0x019d_a462,
    bip32_private: 0x019d_9cfe,
    tx_family: TxFamily::Legacy,
    default_backend: "blockbooklitecoin.app.runonflux.io",
    is_testnet: false,
};

impl ChainId {
    pub const ALL: [ChainId; 4] = [ChainId::Flux, ChainId::FluxTestnet, ChainId::Rvn, ChainId::Ltc];

    pub fn params(&self) -> &'static ChainParams {
        match self {
            ChainId::Flux => &FLUX,
            ChainId::FluxTestnet => &FLUX_TESTNET,
            ChainId::Rvn => &RVN,
            ChainId::Ltc => &LTC,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainId::Flux => "flux",
            ChainId::FluxTestnet => "fluxTestnet",
            ChainId::Rvn => "rvn",
            ChainId::Ltc => "ltc",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainId {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 兼容移动端存储中出现过的大小写写法
        match s.trim().to_ascii_lowercase().as_str() {
            "flux" => Ok(ChainId::Flux),
            "fluxtestnet" | "flux-testnet" | "flux_testnet" => Ok(ChainId::FluxTestnet),
            "rvn" | "ravencoin" => Ok(ChainId::Rvn),
            "ltc" | "litecoin" => Ok(ChainId::Ltc),
            other => Err(WalletError::UnsupportedChain(other.to_string())),
        }
    }
}
