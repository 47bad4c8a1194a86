//! 共签方（Key）工作流
//!
//! - 收到钱包 xpub：生成 2-of-2 钱包地址、钱包身份地址与纯身份地址
//! - 收到原始交易：拉取 UTXO → 派生地址密钥 → 签名 → 组装 → 广播
//!
//! 签名与派生在阻塞线程池中执行；调用方丢弃 future 时结果随之丢弃，不会广播。

use serde::Serialize;

use crate::domain::address::{generate_identity_address, generate_multisig_address, MultisigDescriptor};
use crate::domain::chain_config::ChainId;
use crate::domain::derivation::generate_address_keypair;
use crate::domain::wallet_input::WalletInput;
use crate::error::{Result, WalletError};
use crate::infrastructure::secret::DecryptedSecret;
use crate::service::approval::{decode_transaction_for_approval, ApprovalSummary};
use crate::service::blockchain_client::ChainBackend;
use crate::service::finalizer::{finalise_transaction, verify_multisig_inputs};
use crate::service::transaction_builder::sign_transaction;
use crate::utils::string_utils::truncate;

/// 钱包收款地址（0/0）
pub const WALLET_CHANGE_INDEX: u32 = 0;
pub const WALLET_ADDRESS_INDEX: u32 = 0;
/// 钱包身份地址（0/10），中继按它寻址
pub const KEY_IDENTITY_ADDRESS_INDEX: u32 = 10;

/// 与钱包同步后需要持久化的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSyncArtifacts {
    pub wallet: MultisigDescriptor,
    pub key_identity_address: String,
    pub identity_address: String,
}

/// 处理一次输入后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Synced(WalletSyncArtifacts),
    Broadcast { txid: String },
}

/// 根据钱包 xpub 与本方 xpub 生成全部地址
pub fn sync_with_wallet(
    partner_xpub: &str,
    own_xpub: &str,
    chain: ChainId,
) -> Result<WalletSyncArtifacts> {
    let wallet = generate_multisig_address(
        partner_xpub,
        own_xpub,
        WALLET_ADDRESS_INDEX,
        WALLET_CHANGE_INDEX,
        chain,
    )?;
    let key_identity = generate_multisig_address(
        partner_xpub,
        own_xpub,
        KEY_IDENTITY_ADDRESS_INDEX,
        WALLET_CHANGE_INDEX,
        chain,
    )?;
    let identity_address = generate_identity_address(partner_xpub, chain)?;

    tracing::info!(
        chain = %chain,
        partner = %truncate(partner_xpub.trim(), 16),
        address = %wallet.address,
        "Synced with wallet"
    );

    Ok(WalletSyncArtifacts {
        wallet,
        key_identity_address: key_identity.address,
        identity_address,
    })
}

pub struct KeyWorkflow<B: ChainBackend> {
    backend: B,
    chain: ChainId,
}

impl<B: ChainBackend> KeyWorkflow<B> {
    pub fn new(backend: B, chain: ChainId) -> Self {
        Self { backend, chain }
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn sync_with_wallet(&self, partner_xpub: &str, own_xpub: &str) -> Result<WalletSyncArtifacts> {
        sync_with_wallet(partner_xpub, own_xpub, self.chain)
    }

    /// 签名前展示给用户的摘要
    pub fn preview_transaction(&self, raw_tx_hex: &str) -> Result<ApprovalSummary> {
        decode_transaction_for_approval(raw_tx_hex, self.chain)
    }

    /// 共签并广播，返回 txid
    pub async fn approve_transaction(
        &self,
        raw_tx_hex: &str,
        xpriv: DecryptedSecret,
        artifacts: &WalletSyncArtifacts,
    ) -> Result<String> {
        let chain = self.chain;
        if artifacts.wallet.chain != chain {
            return Err(WalletError::UnsupportedChain(format!(
                "wallet belongs to {}, workflow runs on {}",
                artifacts.wallet.chain, chain
            )));
        }

        let utxos = self.backend.fetch_utxos(&artifacts.wallet.address, chain).await?;
        let raw_tx_hex = raw_tx_hex.trim().to_string();
        let redeem_script_hex = artifacts.wallet.redeem_script_hex();

        let final_tx_hex = tokio::task::spawn_blocking(move || -> Result<String> {
            let keypair =
                generate_address_keypair(&xpriv, WALLET_CHANGE_INDEX, WALLET_ADDRESS_INDEX, chain)?;
            let signed = sign_transaction(&raw_tx_hex, chain, &keypair, &redeem_script_hex, &utxos)?;
            let final_tx_hex = finalise_transaction(&signed, chain)?;
            verify_multisig_inputs(&final_tx_hex, chain, &utxos)?;
            Ok(final_tx_hex)
        })
        .await??;

        let txid = self.backend.broadcast_tx(&final_tx_hex, chain).await?;
        tracing::info!(chain = %chain, txid = %txid, "Co-signed transaction broadcast");
        Ok(txid)
    }

    /// 按输入类型分派；`unlock` 只在需要签名时调用
    pub async fn handle_input<F>(
        &self,
        input: WalletInput,
        own_xpub: &str,
        artifacts: Option<&WalletSyncArtifacts>,
        unlock: F,
    ) -> Result<WorkflowOutcome>
    where
        F: FnOnce() -> Result<DecryptedSecret>,
    {
        match input {
            WalletInput::ExtendedPublicKey(partner_xpub) => self
                .sync_with_wallet(&partner_xpub, own_xpub)
                .map(WorkflowOutcome::Synced),
            WalletInput::RawTransactionHex(raw_tx_hex) => {
                let artifacts = artifacts.ok_or_else(|| {
                    WalletError::InvalidInput("not synced with a wallet yet".into())
                })?;
                let xpriv = unlock()?;
                let txid = self.approve_transaction(&raw_tx_hex, xpriv, artifacts).await?;
                Ok(WorkflowOutcome::Broadcast { txid })
            }
        }
    }
}
