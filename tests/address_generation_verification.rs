//! 地址生成算法验证测试
//!
//! 固定向量由独立的 BIP32/Base58 参考实现计算：
//! - 钱包助记词 "abandon … about"，共签助记词 "zoo … wrong"
//! - 路径 m/48'/19167'/0'/0'

mod common;

use common::{account_key_pair, account_xpub, KEY_MNEMONIC, WALLET_MNEMONIC};
use bitcoin::bip32::DerivationPath;
use sspcore::domain::derivation::derive_master_public_key;
use sspcore::prelude::*;
use sspcore::service::key_workflow::sync_with_wallet;

const WALLET_XPUB: &str = "xpub6Dqni6m6r6yWq9KomUmJduE1XvTe6ZqpiqRoXtDgpkr3ynnYQwQHwLbx82nSzP6tatE6R1qnGs6626oG9qbvvSEv9zdtpdUiFz1Cs2Wen6T";
const WALLET_XPRIV: &str = "xprv9zrSJbED1jRDcfFLfTEJGmHGytd9h77yMcWCjVp5GRK56zTPsQ63PYHUGkfBtfck4G8YmUoWJWeVZZamGacyJvfWU7sSFdARkyfkFxTSciF";
const KEY_XPUB: &str = "xpub6Ee4sqGkhrF4JfTF4fpHdRZ4yKFhJBe8iUpNmszi1qLRMfxak5FcNtW1uWLGN5k28a1G6YQnn4HS2GRz6fP474ETqkWF1JG7vEfrNXS6fVD";

const WALLET_ADDRESS: &str = "t3RBCidPL3tWF5DFww4ioXSx3ngjr5zbPLC";
const WALLET_REDEEM_SCRIPT: &str = "5221029dc716836b95896999586ecb843be1de573ffafa1196c520bd7362a05b9d54c02103246fe832ca2c161020db8fedf91a70540d3b6554bc105eb30f7fb67ce83867ca52ae";
const KEY_IDENTITY_ADDRESS: &str = "t3N1aDU86mkknQh5ejGrzudVp8Hh7TH5niX";
const IDENTITY_ADDRESS: &str = "t1Y5WXQCaV4sBHmJf25ZWzRZAzyR4vedC41";

#[test]
fn test_flux_account_xpub_vector() {
    assert_eq!(account_xpub(WALLET_MNEMONIC, ChainId::Flux), WALLET_XPUB);
    assert_eq!(account_xpub(KEY_MNEMONIC, ChainId::Flux), KEY_XPUB);

    let pair = account_key_pair(WALLET_MNEMONIC, ChainId::Flux);
    assert_eq!(
        pair.derivation_path(),
        &"m/48'/19167'/0'/0'".parse::<DerivationPath>().unwrap()
    );
    assert_eq!(
        pair.encode_xpriv(ChainId::Flux).unwrap().as_str(),
        WALLET_XPRIV
    );
}

#[test]
fn test_public_only_derivation_matches() {
    let seed = SeedPhrase::parse(WALLET_MNEMONIC).unwrap();
    let public = derive_master_public_key(&seed, 48, 19167, 0, ScriptType::P2sh).unwrap();
    assert!(public.is_watch_only());
    assert!(public.encode_xpriv(ChainId::Flux).is_none());
    assert_eq!(public.encode_xpub(ChainId::Flux), WALLET_XPUB);
}

#[test]
fn test_wallet_multisig_address_vector() {
    let wallet = generate_multisig_address(WALLET_XPUB, KEY_XPUB, 0, 0, ChainId::Flux).unwrap();
    assert_eq!(wallet.address, WALLET_ADDRESS);
    assert_eq!(wallet.redeem_script_hex(), WALLET_REDEEM_SCRIPT);

    // 双方各自计算得到同一地址
    let from_wallet_side =
        generate_multisig_address(KEY_XPUB, WALLET_XPUB, 0, 0, ChainId::Flux).unwrap();
    assert_eq!(from_wallet_side, wallet);
}

#[test]
fn test_sync_artifacts_vector() {
    let artifacts = sync_with_wallet(WALLET_XPUB, KEY_XPUB, ChainId::Flux).unwrap();
    assert_eq!(artifacts.wallet.address, WALLET_ADDRESS);
    assert_eq!(artifacts.key_identity_address, KEY_IDENTITY_ADDRESS);
    assert_eq!(artifacts.identity_address, IDENTITY_ADDRESS);
    assert_eq!(
        generate_identity_address(WALLET_XPUB, ChainId::Flux).unwrap(),
        IDENTITY_ADDRESS
    );
}

#[test]
fn test_litecoin_uses_ltub_version() {
    let xpub = account_xpub(WALLET_MNEMONIC, ChainId::Ltc);
    assert_eq!(
        xpub,
        "Ltub2aDdm1un2XjaEqn9XUizUYmaXiuFiM3ckyxXzxp19NGmE2xmB8XzhFefQvCJ3HTqqUPf8TmFo4wvDdYqmsxAPWLaRfGhCR2Tv7tMR3aRDg9"
    );

    // 其他链的版本号不能混用
    assert!(matches!(
        generate_multisig_address(&xpub, &xpub, 0, 0, ChainId::Flux),
        Err(WalletError::InvalidPublicKey(_))
    ));
}

#[test]
fn test_address_keypair_matches_redeem_script() {
    let xpriv = common::account_xpriv(KEY_MNEMONIC, ChainId::Flux);
    let keypair = generate_address_keypair(&xpriv, 0, 0, ChainId::Flux).unwrap();
    assert_eq!(
        keypair.to_wif(ChainId::Flux).as_str(),
        "L3uPxoUtK5XLuH4tAxLgkCo3xjgeWVYWUV78TnX2K1d5GuyTmhc5"
    );

    let wallet = generate_multisig_address(WALLET_XPUB, KEY_XPUB, 0, 0, ChainId::Flux).unwrap();
    assert!(wallet.cosigner_public_keys.contains(keypair.public_key()));
}

#[test]
fn test_derivation_is_deterministic() {
    let a = account_key_pair(WALLET_MNEMONIC, ChainId::Rvn);
    let b = account_key_pair(WALLET_MNEMONIC, ChainId::Rvn);
    assert_eq!(a.encode_xpub(ChainId::Rvn), b.encode_xpub(ChainId::Rvn));
    assert_eq!(a.chain_code(), b.chain_code());
}
