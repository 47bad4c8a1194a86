//! Domain 模块
//!
//! 链参数、密钥派生、脚本与交易编解码等纯计算逻辑

pub mod address;
pub mod chain_config;
pub mod derivation;
pub mod derivation_path_validator;
pub mod extended_key;
pub mod script;
pub mod sighash;
pub mod transaction;
pub mod wallet_input;

// 重新导出常用类型
pub use address::{generate_identity_address, generate_multisig_address, MultisigDescriptor};
pub use chain_config::{ChainId, ChainParams, TxFamily};
pub use derivation::{
    derive_master_key_pair, derive_master_public_key, generate_address_keypair, AddressKeypair,
    ExtendedKeyPair, SeedPhrase,
};
pub use derivation_path_validator::{DerivationPathValidator, ScriptType};
pub use transaction::UtxoTransaction;
pub use wallet_input::WalletInput;
