//! 脚本构建与解析
//!
//! 多签赎回脚本 `OP_m <pubkeys…> OP_n OP_CHECKMULTISIG`、P2SH/P2PKH 输出脚本、
//! 多签 scriptSig 的槽位布局以及 OP_RETURN 载荷提取。

use bitcoin::blockdata::opcodes::{self, all::*, Opcode};
use bitcoin::blockdata::script::{Builder, Instruction, PushBytes, Script, ScriptBuf};
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::PublicKey;

use crate::error::{Result, WalletError};

pub const MAX_MULTISIG_KEYS: usize = 15;
const COMPRESSED_KEY_LEN: usize = 33;

pub fn hash160(data: &[u8]) -> [u8; 20] {
    bitcoin::hashes::hash160::Hash::hash(data).to_byte_array()
}

fn push_bytes(data: &[u8]) -> Result<&PushBytes> {
    <&PushBytes>::try_from(data)
        .map_err(|_| WalletError::SigningError(format!("push of {} bytes is too large", data.len())))
}

fn decode_pushnum(op: Opcode) -> Option<usize> {
    let code = op.to_u8();
    if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&code) {
        Some((code - OP_PUSHNUM_1.to_u8() + 1) as usize)
    } else {
        None
    }
}

/// m-of-n 多签赎回脚本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigScript {
    threshold: usize,
    keys: Vec<PublicKey>,
}

impl MultisigScript {
    /// 按压缩序列化字节序排序后构建
    pub fn new(threshold: usize, mut keys: Vec<PublicKey>) -> Result<Self> {
        if keys.is_empty() || keys.len() > MAX_MULTISIG_KEYS {
            return Err(WalletError::InvalidInput(format!(
                "multisig needs 1..={} keys, got {}",
                MAX_MULTISIG_KEYS,
                keys.len()
            )));
        }
        if threshold == 0 || threshold > keys.len() {
            return Err(WalletError::InvalidInput(format!(
                "threshold {} is invalid for {} keys",
                threshold,
                keys.len()
            )));
        }

        keys.sort_by_key(|k| k.serialize());
        if keys.windows(2).any(|w| w[0] == w[1]) {
            return Err(WalletError::InvalidPublicKey(
                "duplicate cosigner key".to_string(),
            ));
        }

        Ok(Self { threshold, keys })
    }

    /// 解析现有赎回脚本，保留脚本中的密钥顺序
    pub fn parse(script: &Script) -> Result<Self> {
        let not_multisig =
            || WalletError::SigningError("redeem script is not a standard multisig script".into());

        let instructions = script
            .instructions()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| not_multisig())?;

        let (first, rest) = instructions.split_first().ok_or_else(not_multisig)?;
        let threshold = match first {
            Instruction::Op(op) => decode_pushnum(*op).ok_or_else(not_multisig)?,
            _ => return Err(not_multisig()),
        };

        let [middle @ .., Instruction::Op(n_op), Instruction::Op(check)] = rest else {
            return Err(not_multisig());
        };
        if *check != OP_CHECKMULTISIG {
            return Err(not_multisig());
        }
        let n = decode_pushnum(*n_op).ok_or_else(not_multisig)?;

        let mut keys = Vec::with_capacity(middle.len());
        for instruction in middle {
            match instruction {
                Instruction::PushBytes(bytes) if bytes.len() == COMPRESSED_KEY_LEN => {
                    let key = PublicKey::from_slice(bytes.as_bytes())
                        .map_err(|e| WalletError::SigningError(format!("redeem script key: {}", e)))?;
                    keys.push(key);
                }
                _ => return Err(not_multisig()),
            }
        }

        if keys.len() != n || threshold > n {
            return Err(not_multisig());
        }

        Ok(Self { threshold, keys })
    }

    pub fn from_hex(redeem_script_hex: &str) -> Result<Self> {
        let bytes = hex::decode(redeem_script_hex.trim())
            .map_err(|e| WalletError::SigningError(format!("redeem script hex: {}", e)))?;
        Self::parse(Script::from_bytes(&bytes))
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    pub fn position(&self, key: &PublicKey) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn to_script(&self) -> ScriptBuf {
        let mut builder = Builder::new().push_int(self.threshold as i64);
        for key in &self.keys {
            builder = builder.push_slice(<&PushBytes>::from(&key.serialize()));
        }
        builder
            .push_int(self.keys.len() as i64)
            .push_opcode(OP_CHECKMULTISIG)
            .into_script()
    }

    pub fn script_hash(&self) -> [u8; 20] {
        hash160(self.to_script().as_bytes())
    }
}

pub fn p2sh_script_pubkey(script_hash: &[u8; 20]) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_HASH160)
        .push_slice(<&PushBytes>::from(script_hash))
        .push_opcode(OP_EQUAL)
        .into_script()
}

pub fn p2pkh_script_pubkey(pubkey_hash: &[u8; 20]) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(<&PushBytes>::from(pubkey_hash))
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

/// 输出脚本模板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTemplate {
    P2pkh([u8; 20]),
    P2sh([u8; 20]),
}

pub fn classify_output(script: &Script) -> Option<OutputTemplate> {
    let bytes = script.as_bytes();
    if script.is_p2sh() {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes[2..22]);
        Some(OutputTemplate::P2sh(hash))
    } else if script.is_p2pkh() {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes[3..23]);
        Some(OutputTemplate::P2pkh(hash))
    } else {
        None
    }
}

/// 多签输入 scriptSig 的内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptSigParts {
    /// 非空签名（含 sighash 类型字节），按出现顺序
    pub signatures: Vec<Vec<u8>>,
    pub redeem_script: Option<ScriptBuf>,
}

impl ScriptSigParts {
    pub fn parse(script_sig: &Script) -> Result<Self> {
        if script_sig.is_empty() {
            return Ok(Self::default());
        }

        let mut pushes = Vec::new();
        for instruction in script_sig.instructions() {
            match instruction {
                Ok(Instruction::PushBytes(bytes)) => pushes.push(bytes.as_bytes().to_vec()),
                _ => {
                    return Err(WalletError::SigningError(
                        "scriptSig contains non-push operations".into(),
                    ))
                }
            }
        }

        let redeem_script = match pushes.last() {
            Some(last) if MultisigScript::parse(Script::from_bytes(last)).is_ok() => {
                pushes.pop().map(ScriptBuf::from_bytes)
            }
            _ => None,
        };

        Ok(Self {
            signatures: pushes.into_iter().filter(|p| !p.is_empty()).collect(),
            redeem_script,
        })
    }
}

/// `OP_0 <slot_1|OP_0> … <slot_n|OP_0> <redeem_script>`
pub fn build_partial_script_sig(slots: &[Option<Vec<u8>>], redeem_script: &Script) -> Result<ScriptBuf> {
    let mut builder = Builder::new().push_opcode(opcodes::OP_0);
    for slot in slots {
        builder = match slot {
            Some(sig) => builder.push_slice(push_bytes(sig)?),
            None => builder.push_opcode(opcodes::OP_0),
        };
    }
    Ok(builder
        .push_slice(push_bytes(redeem_script.as_bytes())?)
        .into_script())
}

/// `OP_0 <sig…> <redeem_script>`
pub fn build_final_script_sig(signatures: &[Vec<u8>], redeem_script: &Script) -> Result<ScriptBuf> {
    let mut builder = Builder::new().push_opcode(opcodes::OP_0);
    for sig in signatures {
        builder = builder.push_slice(push_bytes(sig)?);
    }
    Ok(builder
        .push_slice(push_bytes(redeem_script.as_bytes())?)
        .into_script())
}

/// OP_RETURN 之后的数据推送拼接结果
pub fn op_return_payload(script: &Script) -> Option<Vec<u8>> {
    if !script.is_op_return() {
        return None;
    }
    let mut payload = Vec::new();
    for instruction in script.instructions().skip(1) {
        match instruction {
            Ok(Instruction::PushBytes(bytes)) => payload.extend_from_slice(bytes.as_bytes()),
            _ => break,
        }
    }
    Some(payload)
}
