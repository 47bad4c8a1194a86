//! 交易最终化
//!
//! 部分签名 scriptSig → `OP_0 <前 m 个签名> <redeem_script>`，以及对成品交易的
//! OP_CHECKMULTISIG 等价校验。

use bitcoin::secp256k1::Secp256k1;

use crate::domain::chain_config::ChainId;
use crate::domain::script::{build_final_script_sig, MultisigScript, ScriptSigParts};
use crate::domain::sighash::{signature_hash, SIGHASH_ALL};
use crate::domain::transaction::UtxoTransaction;
use crate::error::{Result, WalletError};
use crate::service::transaction_builder::{find_utxo, verify_signature, UtxoRef};

/// 组装最终 scriptSig；签名不足阈值时返回 InsufficientSignatures
pub fn finalise_transaction(signed_tx_hex: &str, chain: ChainId) -> Result<String> {
    let mut tx = UtxoTransaction::from_hex(signed_tx_hex, chain.params().tx_family)?;

    let mut finals = Vec::with_capacity(tx.inputs().len());
    for (index, input) in tx.inputs().iter().enumerate() {
        let parts = ScriptSigParts::parse(&input.script_sig)?;
        let redeem_script = parts.redeem_script.ok_or_else(|| {
            WalletError::SigningError(format!("input {} has no redeem script", index))
        })?;
        let multisig = MultisigScript::parse(&redeem_script)?;

        let need = multisig.threshold();
        let have = parts.signatures.len();
        if have < need {
            return Err(WalletError::InsufficientSignatures {
                input: index,
                have,
                need,
            });
        }

        finals.push(build_final_script_sig(&parts.signatures[..need], &redeem_script)?);
    }

    for (input, script_sig) in tx.inputs_mut().iter_mut().zip(finals) {
        input.script_sig = script_sig;
    }

    tracing::debug!(chain = %chain, inputs = tx.inputs().len(), "Finalised transaction");
    Ok(tx.to_hex())
}

/// 按 OP_CHECKMULTISIG 语义校验每个输入：签名与公钥都按脚本顺序单向匹配
pub fn verify_multisig_inputs(final_tx_hex: &str, chain: ChainId, utxos: &[UtxoRef]) -> Result<()> {
    let family = chain.params().tx_family;
    let tx = UtxoTransaction::from_hex(final_tx_hex, family)?;
    let secp = Secp256k1::verification_only();

    for (index, input) in tx.inputs().iter().enumerate() {
        let utxo = find_utxo(utxos, input)?;
        let parts = ScriptSigParts::parse(&input.script_sig)?;
        let redeem_script = parts.redeem_script.ok_or_else(|| {
            WalletError::SigningError(format!("input {} has no redeem script", index))
        })?;
        let multisig = MultisigScript::parse(&redeem_script)?;

        if parts.signatures.len() != multisig.threshold() {
            return Err(WalletError::InsufficientSignatures {
                input: index,
                have: parts.signatures.len(),
                need: multisig.threshold(),
            });
        }

        let sighash = signature_hash(&tx, family, index, &redeem_script, utxo.satoshis, SIGHASH_ALL)?;

        let mut keys = multisig.keys().iter();
        for signature in &parts.signatures {
            let mut matched = false;
            for key in keys.by_ref() {
                if verify_signature(&secp, signature, &sighash, key)? {
                    matched = true;
                    break;
                }
            }
            if !matched {
                return Err(WalletError::SigningError(format!(
                    "input {} failed multisig verification",
                    index
                )));
            }
        }
    }

    Ok(())
}
