//! 待审批交易摘要
//!
//! 共签方在签名前需要看到收款地址与金额。发送方由第一个输入携带的赎回脚本推出。

use serde::{Deserialize, Serialize};

use crate::domain::address::{address_from_output_script, p2sh_address};
use crate::domain::chain_config::ChainId;
use crate::domain::script;
use crate::domain::transaction::UtxoTransaction;
use crate::error::{Result, WalletError};
use crate::service::transaction_builder::input_redeem_script;
use crate::utils::amount::satoshis_to_coins;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSummary {
    pub sender: String,
    /// 没有找到找零以外的输出时为空
    pub receiver: String,
    pub amount_satoshis: u64,
    pub amount: String,
}

/// 解析钱包发来的部分签名交易
pub fn decode_transaction_for_approval(raw_tx_hex: &str, chain: ChainId) -> Result<ApprovalSummary> {
    let tx = UtxoTransaction::from_hex(raw_tx_hex, chain.params().tx_family)?;

    let first_script_sig = tx
        .input_script_sig(0)
        .ok_or_else(|| WalletError::InvalidInput("transaction has no inputs".into()))?;
    let redeem_script = input_redeem_script(first_script_sig)?.ok_or_else(|| {
        WalletError::InvalidInput("first input carries no redeem script".into())
    })?;
    let sender = p2sh_address(&script::hash160(redeem_script.as_bytes()), chain);

    let mut receiver = String::new();
    let mut amount_satoshis = 0u64;
    for (index, output) in tx.outputs().iter().enumerate() {
        if output.value.to_sat() == 0 {
            continue;
        }
        let address = address_from_output_script(&output.script_pubkey, chain).ok_or_else(|| {
            WalletError::InvalidInput(format!("output {} pays a non-standard script", index))
        })?;
        if address != sender {
            receiver = address;
            amount_satoshis = output.value.to_sat();
        }
    }

    let amount = satoshis_to_coins(i64::try_from(amount_satoshis).map_err(|_| {
        WalletError::InvalidInput("output value exceeds the supported range".into())
    })?);

    tracing::debug!(chain = %chain, outputs = tx.outputs().len(), "Decoded transaction for approval");

    Ok(ApprovalSummary {
        sender,
        receiver,
        amount_satoshis,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address::{build_multisig_descriptor, decode_address};
    use crate::domain::derivation::AddressKeypair;
    use crate::domain::transaction::{prev_txid_hex, unsigned_input};
    use crate::service::transaction_builder::{sign_transaction, UtxoRef};
    use bitcoin::hashes::Hash;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use bitcoin::{Amount, TxOut, Txid};

    fn keypair(byte: u8) -> AddressKeypair {
        AddressKeypair::from_secret_key(SecretKey::from_slice(&[byte; 32]).unwrap())
    }

    fn build(chain: ChainId, outputs: Vec<TxOut>) -> (String, String) {
        let a = keypair(1);
        let b = keypair(2);
        let descriptor = build_multisig_descriptor(
            2,
            vec![*a.public_key(), *b.public_key()],
            chain,
        )
        .unwrap();

        let input = unsigned_input(Txid::from_byte_array([7u8; 32]), 0);
        let utxo = UtxoRef {
            txid: prev_txid_hex(&input),
            vout: 0,
            satoshis: 500_000_000,
            script_pub_key: None,
            redeem_script: Some(descriptor.redeem_script_hex()),
        };
        let tx = UtxoTransaction::unsigned(chain.params().tx_family, vec![input], outputs);
        let signed = sign_transaction(
            &tx.to_hex(),
            chain,
            &a,
            &descriptor.redeem_script_hex(),
            &[utxo],
        )
        .unwrap();
        (signed, descriptor.address)
    }

    fn pay_to(address: &str, chain: ChainId, value: u64) -> TxOut {
        TxOut {
            value: Amount::from_sat(value),
            script_pubkey: decode_address(address, chain).unwrap().script_pubkey(),
        }
    }

    #[test]
    fn test_receiver_skips_change_output() {
        let chain = ChainId::Rvn;
        let secp = Secp256k1::new();
        let receiver_key = SecretKey::from_slice(&[9u8; 32]).unwrap().public_key(&secp);
        let receiver = crate::domain::address::p2pkh_address(&receiver_key, chain);

        // 先拿到钱包地址再构造找零输出
        let (_, wallet_address) = build(chain, vec![]);
        let (signed, _) = build(
            chain,
            vec![
                pay_to(&receiver, chain, 123_450_000),
                pay_to(&wallet_address, chain, 300_000_000),
            ],
        );

        let summary = decode_transaction_for_approval(&signed, chain).unwrap();
        assert_eq!(summary.sender, wallet_address);
        assert_eq!(summary.receiver, receiver);
        assert_eq!(summary.amount_satoshis, 123_450_000);
        assert_eq!(summary.amount, "1.2345");
    }

    #[test]
    fn test_unsigned_transaction_is_rejected() {
        let tx = UtxoTransaction::unsigned(
            ChainId::Ltc.params().tx_family,
            vec![unsigned_input(Txid::from_byte_array([7u8; 32]), 0)],
            vec![],
        );
        assert!(matches!(
            decode_transaction_for_approval(&tx.to_hex(), ChainId::Ltc),
            Err(WalletError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_garbage_hex_is_signing_error() {
        assert!(matches!(
            decode_transaction_for_approval("zz", ChainId::Flux),
            Err(WalletError::SigningError(_))
        ));
    }
}
