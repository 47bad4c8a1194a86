//! UTXO 交易编解码
//!
//! 支持比特币传统格式（无隔离见证）与 Zcash Sapling v4（仅透明部分）。
//! 透明部分统一用 `bitcoin::Transaction` 表示；Sapling 只额外处理头部与尾部字段。
//! 含屏蔽数据或隔离见证的交易直接拒绝。

use std::io::Cursor;

use bitcoin::absolute::LockTime;
use bitcoin::blockdata::script::{Script, ScriptBuf};
use bitcoin::consensus::encode::{self, Decodable, VarInt};
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::transaction::Version;
use bitcoin::{OutPoint, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

use crate::domain::chain_config::TxFamily;
use crate::error::{Result, WalletError};

pub(crate) const OVERWINTERED_FLAG: u32 = 1 << 31;
const SAPLING_VERSION: u32 = 4;

fn malformed(reason: impl Into<String>) -> WalletError {
    WalletError::SigningError(format!("malformed transaction: {}", reason.into()))
}

fn decode_field<T: Decodable>(cursor: &mut Cursor<&[u8]>) -> Result<T> {
    T::consensus_decode(cursor).map_err(|e| malformed(e.to_string()))
}

/// 未签名输入
pub fn unsigned_input(txid: Txid, vout: u32) -> TxIn {
    TxIn {
        previous_output: OutPoint::new(txid, vout),
        script_sig: ScriptBuf::new(),
        sequence: Sequence::MAX,
        witness: Witness::default(),
    }
}

/// 浏览器显示字节序的前序 txid
pub fn prev_txid_hex(input: &TxIn) -> String {
    input.previous_output.txid.to_string()
}

/// Sapling 专有头部字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaplingFields {
    pub version_group_id: u32,
    pub expiry_height: u32,
    pub value_balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoTransaction {
    /// 透明部分；Sapling 交易的版本号不含 overwintered 标志
    pub transparent: Transaction,
    pub sapling: Option<SaplingFields>,
}

impl UtxoTransaction {
    /// 按链的交易格式构造未签名交易
    pub fn unsigned(family: TxFamily, inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        let (version, sapling) = match family {
            TxFamily::Legacy => (Version::ONE, None),
            TxFamily::Sapling {
                version_group_id, ..
            } => (
                Version(SAPLING_VERSION as i32),
                Some(SaplingFields {
                    version_group_id,
                    expiry_height: 0,
                    value_balance: 0,
                }),
            ),
        };
        Self {
            transparent: Transaction {
                version,
                lock_time: LockTime::ZERO,
                input: inputs,
                output: outputs,
            },
            sapling,
        }
    }

    pub fn from_hex(raw_hex: &str, family: TxFamily) -> Result<Self> {
        let bytes = hex::decode(raw_hex.trim()).map_err(|e| malformed(format!("hex: {}", e)))?;
        Self::from_bytes(&bytes, family)
    }

    pub fn from_bytes(bytes: &[u8], family: TxFamily) -> Result<Self> {
        let tx = match family {
            TxFamily::Legacy => Self::decode_legacy(bytes)?,
            TxFamily::Sapling {
                version_group_id, ..
            } => Self::decode_sapling(bytes, version_group_id)?,
        };
        if tx.transparent.input.is_empty() {
            return Err(malformed("transaction has no inputs"));
        }
        Ok(tx)
    }

    fn decode_legacy(bytes: &[u8]) -> Result<Self> {
        let transparent: Transaction =
            encode::deserialize(bytes).map_err(|e| malformed(e.to_string()))?;
        if transparent.input.iter().any(|input| !input.witness.is_empty()) {
            return Err(malformed("segwit transactions are not supported"));
        }
        Ok(Self {
            transparent,
            sapling: None,
        })
    }

    fn decode_sapling(bytes: &[u8], expected_group: u32) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let header: u32 = decode_field(&mut cursor)?;
        if header & OVERWINTERED_FLAG == 0 {
            return Err(malformed("transaction is not overwintered"));
        }
        let version = header & !OVERWINTERED_FLAG;
        if version != SAPLING_VERSION {
            return Err(malformed(format!("unsupported version {}", version)));
        }
        let version_group_id: u32 = decode_field(&mut cursor)?;
        if version_group_id != expected_group {
            return Err(malformed(format!(
                "unexpected version group id {:08x}",
                version_group_id
            )));
        }

        let input: Vec<TxIn> = decode_field(&mut cursor)?;
        let output: Vec<TxOut> = decode_field(&mut cursor)?;
        let lock_time: LockTime = decode_field(&mut cursor)?;
        let expiry_height: u32 = decode_field(&mut cursor)?;
        let value_balance: i64 = decode_field(&mut cursor)?;

        // spend / output / joinsplit 计数
        for _ in 0..3 {
            let VarInt(count) = decode_field(&mut cursor)?;
            if count != 0 {
                return Err(malformed("shielded data is not supported"));
            }
        }
        if value_balance != 0 {
            return Err(malformed("non-zero sapling value balance"));
        }
        if cursor.position() != bytes.len() as u64 {
            return Err(malformed("trailing bytes"));
        }

        Ok(Self {
            transparent: Transaction {
                version: Version(version as i32),
                lock_time,
                input,
                output,
            },
            sapling: Some(SaplingFields {
                version_group_id,
                expiry_height,
                value_balance,
            }),
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let Some(fields) = &self.sapling else {
            return encode::serialize(&self.transparent);
        };

        let tx = &self.transparent;
        let mut out = encode::serialize(&(tx.version.0 as u32 | OVERWINTERED_FLAG));
        out.extend(encode::serialize(&fields.version_group_id));
        out.extend(encode::serialize(&tx.input));
        out.extend(encode::serialize(&tx.output));
        out.extend(encode::serialize(&tx.lock_time));
        out.extend(encode::serialize(&fields.expiry_height));
        out.extend(encode::serialize(&fields.value_balance));
        // 无 spend / output / joinsplit
        for _ in 0..3 {
            out.extend(encode::serialize(&VarInt(0)));
        }
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    pub fn txid(&self) -> Txid {
        match self.sapling {
            None => self.transparent.txid(),
            Some(_) => Txid::from_raw_hash(sha256d::Hash::hash(&self.serialize())),
        }
    }

    pub fn inputs(&self) -> &[TxIn] {
        &self.transparent.input
    }

    pub fn inputs_mut(&mut self) -> &mut [TxIn] {
        &mut self.transparent.input
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.transparent.output
    }

    pub fn input_script_sig(&self, index: usize) -> Option<&Script> {
        self.inputs().get(index).map(|i| i.script_sig.as_script())
    }
}
