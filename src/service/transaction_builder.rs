//! 多签交易签名器
//!
//! 输入：未签名或部分签名的原始交易 + UTXO 快照 + 地址级密钥 + 赎回脚本。
//! 输出：在本方槽位写入签名后的部分签名交易。
//!
//! # 流程
//! 1. 按链的交易格式解析
//! 2. 逐个输入匹配 UTXO 并校验赎回脚本
//! 3. 通过 ECDSA 验证把已有签名归位到对应公钥槽位
//! 4. 本方槽位为空时签名（RFC6979，low-S）
//! 5. 全部输入成功后一次性写回

use bitcoin::blockdata::script::{Script, ScriptBuf};
use bitcoin::secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, Verification};
use bitcoin::TxIn;
use serde::{Deserialize, Serialize};

use crate::domain::address::DecodedAddress;
use crate::domain::chain_config::ChainId;
use crate::domain::derivation::AddressKeypair;
use crate::domain::script::{self, build_partial_script_sig, MultisigScript, ScriptSigParts};
use crate::domain::sighash::{signature_hash, SIGHASH_ALL};
use crate::domain::transaction::{prev_txid_hex, UtxoTransaction};
use crate::error::{Result, WalletError};

/// 未花费输出快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoRef {
    pub txid: String,
    pub vout: u32,
    pub satoshis: u64,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "scriptPubKey")]
    pub script_pub_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "redeemScript")]
    pub redeem_script: Option<String>,
}

impl UtxoRef {
    fn matches(&self, input: &TxIn) -> bool {
        self.vout == input.previous_output.vout
            && self.txid.eq_ignore_ascii_case(&prev_txid_hex(input))
    }
}

pub(crate) fn find_utxo<'a>(utxos: &'a [UtxoRef], input: &TxIn) -> Result<&'a UtxoRef> {
    utxos.iter().find(|u| u.matches(input)).ok_or_else(|| {
        WalletError::utxo_mismatch(
            prev_txid_hex(input),
            input.previous_output.vout,
            "no utxo supplied for this input",
        )
    })
}

/// 校验签名（含末尾 hashType 字节）是否由 `key` 对 `sighash` 签出
pub(crate) fn verify_signature<C: Verification>(
    secp: &Secp256k1<C>,
    sig_with_type: &[u8],
    sighash: &[u8; 32],
    key: &PublicKey,
) -> Result<bool> {
    let (hash_type, der) = sig_with_type
        .split_last()
        .ok_or_else(|| WalletError::signing("empty signature"))?;
    if *hash_type as u32 != SIGHASH_ALL {
        return Err(WalletError::SigningError(format!(
            "unsupported sighash type {:#04x} in existing signature",
            hash_type
        )));
    }

    let mut signature = Signature::from_der_lax(der)
        .map_err(|e| WalletError::SigningError(format!("invalid DER signature: {}", e)))?;
    signature.normalize_s();

    let message = Message::from_digest_slice(sighash)
        .map_err(|e| WalletError::SigningError(e.to_string()))?;
    Ok(secp.verify_ecdsa(&message, &signature, key).is_ok())
}

fn hex_eq(expected_hex: &str, candidate: &str) -> bool {
    expected_hex.eq_ignore_ascii_case(crate::utils::string_utils::strip_hex_prefix(candidate.trim()))
}

/// 为交易的每个输入添加本方签名
pub fn sign_transaction(
    raw_tx_hex: &str,
    chain: ChainId,
    key: &AddressKeypair,
    redeem_script_hex: &str,
    utxos: &[UtxoRef],
) -> Result<String> {
    let family = chain.params().tx_family;
    let mut tx = UtxoTransaction::from_hex(raw_tx_hex, family)?;

    let redeem_bytes = hex::decode(redeem_script_hex.trim())
        .map_err(|e| WalletError::SigningError(format!("redeem script hex: {}", e)))?;
    let redeem_script = ScriptBuf::from_bytes(redeem_bytes);
    let redeem_hex = hex::encode(redeem_script.as_bytes());
    let multisig = MultisigScript::parse(&redeem_script)?;

    let own_position = multisig.position(key.public_key()).ok_or_else(|| {
        WalletError::signing("signing key is not a cosigner of the redeem script")
    })?;

    let expected_script_pubkey =
        DecodedAddress::ScriptHash(script::hash160(redeem_script.as_bytes())).script_pubkey();

    let secp = Secp256k1::new();
    let mut script_sigs = Vec::with_capacity(tx.inputs().len());

    for (index, input) in tx.inputs().iter().enumerate() {
        let utxo = find_utxo(utxos, input)?;
        let mismatch = |reason: &str| {
            WalletError::utxo_mismatch(prev_txid_hex(input), input.previous_output.vout, reason)
        };

        if utxo.redeem_script.is_none() && utxo.script_pub_key.is_none() {
            return Err(mismatch("utxo carries no script to attribute"));
        }
        if let Some(utxo_redeem) = &utxo.redeem_script {
            if !hex_eq(&redeem_hex, utxo_redeem) {
                return Err(mismatch("utxo redeem script differs from the supplied one"));
            }
        }
        if let Some(script_pub_key) = &utxo.script_pub_key {
            if !hex_eq(&hex::encode(expected_script_pubkey.as_bytes()), script_pub_key) {
                return Err(mismatch("utxo is not locked to the redeem script"));
            }
        }

        let existing = ScriptSigParts::parse(&input.script_sig)?;
        if let Some(embedded) = &existing.redeem_script {
            if embedded != &redeem_script {
                return Err(mismatch("input already carries a different redeem script"));
            }
        }

        let sighash = signature_hash(&tx, family, index, &redeem_script, utxo.satoshis, SIGHASH_ALL)?;
        let slots = place_signatures(&secp, &multisig, &existing.signatures, &sighash, index)?;
        let slots = fill_own_slot(&secp, slots, own_position, key, &sighash)?;

        script_sigs.push(build_partial_script_sig(&slots, &redeem_script)?);
    }

    for (input, script_sig) in tx.inputs_mut().iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    tracing::debug!(
        chain = %chain,
        inputs = tx.inputs().len(),
        slot = own_position,
        "Signed multisig transaction"
    );

    Ok(tx.to_hex())
}

/// 将已有签名按公钥位置归位
pub(crate) fn place_signatures<C: Verification>(
    secp: &Secp256k1<C>,
    multisig: &MultisigScript,
    signatures: &[Vec<u8>],
    sighash: &[u8; 32],
    input_index: usize,
) -> Result<Vec<Option<Vec<u8>>>> {
    let mut slots: Vec<Option<Vec<u8>>> = vec![None; multisig.keys().len()];

    for signature in signatures {
        let mut placed = false;
        for (position, key) in multisig.keys().iter().enumerate() {
            if slots[position].is_some() {
                continue;
            }
            if verify_signature(secp, signature, sighash, key)? {
                slots[position] = Some(signature.clone());
                placed = true;
                break;
            }
        }
        if !placed {
            return Err(WalletError::SigningError(format!(
                "input {} carries a signature that matches no cosigner",
                input_index
            )));
        }
    }

    Ok(slots)
}

fn fill_own_slot<C: bitcoin::secp256k1::Signing>(
    secp: &Secp256k1<C>,
    mut slots: Vec<Option<Vec<u8>>>,
    own_position: usize,
    key: &AddressKeypair,
    sighash: &[u8; 32],
) -> Result<Vec<Option<Vec<u8>>>> {
    if slots[own_position].is_some() {
        return Ok(slots);
    }

    let message = Message::from_digest_slice(sighash)
        .map_err(|e| WalletError::SigningError(e.to_string()))?;
    let signature = secp.sign_ecdsa(&message, key.secret_key());

    let mut encoded = signature.serialize_der().to_vec();
    encoded.push(SIGHASH_ALL as u8);
    slots[own_position] = Some(encoded);
    Ok(slots)
}

/// 已签名输入所使用的赎回脚本
pub fn input_redeem_script(script_sig: &Script) -> Result<Option<ScriptBuf>> {
    Ok(ScriptSigParts::parse(script_sig)?.redeem_script)
}
