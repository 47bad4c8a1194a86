//! 签名哈希
//!
//! - 传统格式：交由 `bitcoin::sighash::SighashCache`
//! - Sapling v4：ZIP-243 BLAKE2b-256，个性化串带共识分支 ID

use blake2::digest::core_api::{Buffer, UpdateCore, VariableOutputCore};
use blake2::digest::Output;
use blake2::Blake2bVarCore;
use bitcoin::blockdata::script::Script;
use bitcoin::consensus::encode::serialize;
use bitcoin::hashes::Hash;
use bitcoin::sighash::SighashCache;

use crate::domain::chain_config::TxFamily;
use crate::domain::transaction::{UtxoTransaction, OVERWINTERED_FLAG};
use crate::error::{Result, WalletError};

pub const SIGHASH_ALL: u32 = 0x01;

const PREVOUTS_PERSONALIZATION: &[u8; 16] = b"ZcashPrevoutHash";
const SEQUENCE_PERSONALIZATION: &[u8; 16] = b"ZcashSequencHash";
const OUTPUTS_PERSONALIZATION: &[u8; 16] = b"ZcashOutputsHash";
const SIGHASH_PERSONALIZATION_PREFIX: &[u8; 12] = b"ZcashSigHash";

/// BLAKE2b-256，不带密钥，带 16 字节个性化串
fn blake2b_256(personal: &[u8; 16], data: &[u8]) -> [u8; 32] {
    let mut core = Blake2bVarCore::new_with_params(&[], personal, 0, 32);
    let mut buffer = Buffer::<Blake2bVarCore>::default();
    buffer.digest_blocks(data, |blocks| core.update_blocks(blocks));

    let mut full = Output::<Blake2bVarCore>::default();
    core.finalize_variable_core(&mut buffer, &mut full);

    let mut out = [0u8; 32];
    out.copy_from_slice(&full[..32]);
    out
}

/// 计算输入 `input_index` 的签名哈希
pub fn signature_hash(
    tx: &UtxoTransaction,
    family: TxFamily,
    input_index: usize,
    script_code: &Script,
    amount: u64,
    hash_type: u32,
) -> Result<[u8; 32]> {
    if hash_type != SIGHASH_ALL {
        return Err(WalletError::SigningError(format!(
            "unsupported sighash type {:#04x}",
            hash_type
        )));
    }
    if input_index >= tx.inputs().len() {
        return Err(WalletError::SigningError(format!(
            "input {} out of range",
            input_index
        )));
    }

    match family {
        TxFamily::Legacy => legacy_sighash(tx, input_index, script_code, hash_type),
        TxFamily::Sapling {
            consensus_branch_id,
            ..
        } => zip243_sighash(tx, consensus_branch_id, input_index, script_code, amount, hash_type),
    }
}

fn legacy_sighash(
    tx: &UtxoTransaction,
    input_index: usize,
    script_code: &Script,
    hash_type: u32,
) -> Result<[u8; 32]> {
    let sighash = SighashCache::new(&tx.transparent)
        .legacy_signature_hash(input_index, script_code, hash_type)
        .map_err(|e| WalletError::SigningError(format!("legacy sighash: {}", e)))?;
    Ok(sighash.to_byte_array())
}

fn zip243_sighash(
    tx: &UtxoTransaction,
    consensus_branch_id: u32,
    input_index: usize,
    script_code: &Script,
    amount: u64,
    hash_type: u32,
) -> Result<[u8; 32]> {
    let fields = tx
        .sapling
        .as_ref()
        .ok_or_else(|| WalletError::SigningError("transaction is not a sapling transaction".into()))?;
    let body = &tx.transparent;

    let mut prevouts = Vec::with_capacity(body.input.len() * 36);
    let mut sequences = Vec::with_capacity(body.input.len() * 4);
    for input in &body.input {
        prevouts.extend(serialize(&input.previous_output));
        sequences.extend(serialize(&input.sequence));
    }

    let mut outputs = Vec::new();
    for output in &body.output {
        outputs.extend(serialize(output));
    }

    let hash_outputs = if body.output.is_empty() {
        [0u8; 32]
    } else {
        blake2b_256(OUTPUTS_PERSONALIZATION, &outputs)
    };

    let mut preimage = Vec::with_capacity(512);
    preimage.extend(serialize(&(body.version.0 as u32 | OVERWINTERED_FLAG)));
    preimage.extend(serialize(&fields.version_group_id));
    preimage.extend_from_slice(&blake2b_256(PREVOUTS_PERSONALIZATION, &prevouts));
    preimage.extend_from_slice(&blake2b_256(SEQUENCE_PERSONALIZATION, &sequences));
    preimage.extend_from_slice(&hash_outputs);
    // joinsplits / shielded spends / shielded outputs
    preimage.extend_from_slice(&[0u8; 32 * 3]);
    preimage.extend(serialize(&body.lock_time));
    preimage.extend(serialize(&fields.expiry_height));
    preimage.extend(serialize(&fields.value_balance));
    preimage.extend(serialize(&hash_type));

    let input = &body.input[input_index];
    preimage.extend(serialize(&input.previous_output));
    preimage.extend(serialize(script_code));
    preimage.extend(serialize(&amount));
    preimage.extend(serialize(&input.sequence));

    let mut personal = [0u8; 16];
    personal[..12].copy_from_slice(SIGHASH_PERSONALIZATION_PREFIX);
    personal[12..].copy_from_slice(&consensus_branch_id.to_le_bytes());

    Ok(blake2b_256(&personal, &preimage))
}
