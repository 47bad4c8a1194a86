//! sspcore - 多签共签钱包核心
//!
//! 非托管模式：密钥材料只在单次调用期间借入，核心层不保存任何状态

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use error::{Result, WalletError, WalletErrorCode};

pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{
            derive_master_key_pair, generate_address_keypair, generate_identity_address,
            generate_multisig_address, AddressKeypair, ChainId, ExtendedKeyPair,
            MultisigDescriptor, ScriptType, SeedPhrase, WalletInput,
        },
        error::{Result, WalletError, WalletErrorCode},
        infrastructure::secret::DecryptedSecret,
        service::{
            finalizer::finalise_transaction,
            history::{process_transaction, NormalizedTransactionRecord},
            key_workflow::{KeyWorkflow, WalletSyncArtifacts},
            sign_transaction, ChainBackend, IndexerClient, UtxoRef,
        },
    };
}
