//! 扩展密钥编解码
//!
//! `bitcoin` 的 BIP32 类型只认识比特币主网/测试网的版本号，这里负责在各链自己的
//! 版本号（如 LTC 的 `Ltub`）与比特币版本号之间转换后再交给 `Xpub`/`Xpriv` 解析。

use bitcoin::bip32::{Xpriv, Xpub};
use zeroize::Zeroizing;

use crate::domain::chain_config::ChainId;
use crate::error::{Result, WalletError};

const BITCOIN_XPUB_VERSION: [u8; 4] = [0x04, 0x88, 0xb2, 0x1e];
const BITCOIN_XPRV_VERSION: [u8; 4] = [0x04, 0x88, 0xad, 0xe4];
const EXTENDED_KEY_LEN: usize = 78;

/// 解析链对应版本号的 xpub
pub fn decode_xpub(encoded: &str, chain: ChainId) -> Result<Xpub> {
    let mut raw = bs58::decode(encoded.trim())
        .with_check(None)
        .into_vec()
        .map_err(|e| WalletError::InvalidPublicKey(format!("base58check: {}", e)))?;

    if raw.len() != EXTENDED_KEY_LEN {
        return Err(WalletError::InvalidPublicKey(format!(
            "extended key must be {} bytes, got {}",
            EXTENDED_KEY_LEN,
            raw.len()
        )));
    }

    let expected = chain.params().bip32_public.to_be_bytes();
    if raw[..4] != expected {
        return Err(WalletError::InvalidPublicKey(format!(
            "version bytes {} do not belong to {} xpub",
            hex::encode(&raw[..4]),
            chain
        )));
    }

    raw[..4].copy_from_slice(&BITCOIN_XPUB_VERSION);
    Xpub::decode(&raw).map_err(|e| WalletError::InvalidPublicKey(e.to_string()))
}

pub fn encode_xpub(xpub: &Xpub, chain: ChainId) -> String {
    let mut raw = xpub.encode();
    raw[..4].copy_from_slice(&chain.params().bip32_public.to_be_bytes());
    bs58::encode(raw).with_check().into_string()
}

/// 解析链对应版本号的 xpriv；失败一律视为派生错误，不回显输入内容
pub fn decode_xpriv(encoded: &str, chain: ChainId) -> Result<Xpriv> {
    let mut raw = Zeroizing::new(
        bs58::decode(encoded.trim())
            .with_check(None)
            .into_vec()
            .map_err(|_| WalletError::DerivationError("xpriv is not valid base58check".into()))?,
    );

    if raw.len() != EXTENDED_KEY_LEN {
        return Err(WalletError::DerivationError(format!(
            "extended key must be {} bytes",
            EXTENDED_KEY_LEN
        )));
    }
    if raw[..4] != chain.params().bip32_private.to_be_bytes() {
        return Err(WalletError::DerivationError(format!(
            "xpriv version bytes do not belong to {}",
            chain
        )));
    }

    raw[..4].copy_from_slice(&BITCOIN_XPRV_VERSION);
    Xpriv::decode(&raw).map_err(|e| WalletError::DerivationError(e.to_string()))
}

pub fn encode_xpriv(xpriv: &Xpriv, chain: ChainId) -> Zeroizing<String> {
    let mut raw = Zeroizing::new(xpriv.encode());
    raw[..4].copy_from_slice(&chain.params().bip32_private.to_be_bytes());
    Zeroizing::new(bs58::encode(&raw[..]).with_check().into_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // BIP32 test vector 1, m
    const VECTOR_XPUB: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";
    const VECTOR_XPRV: &str = "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi";

    #[test]
    fn test_xpub_round_trip_flux() {
        let xpub = decode_xpub(VECTOR_XPUB, ChainId::Flux).unwrap();
        assert_eq!(encode_xpub(&xpub, ChainId::Flux), VECTOR_XPUB);
    }

    #[test]
    fn test_xpub_version_is_chain_specific() {
        let err = decode_xpub(VECTOR_XPUB, ChainId::Ltc).unwrap_err();
        assert!(matches!(err, WalletError::InvalidPublicKey(_)));

        let xpub = decode_xpub(VECTOR_XPUB, ChainId::Rvn).unwrap();
        let ltub = encode_xpub(&xpub, ChainId::Ltc);
        assert!(ltub.starts_with("Ltub"));
        assert_eq!(decode_xpub(&ltub, ChainId::Ltc).unwrap(), xpub);
    }

    #[test]
    fn test_xpriv_round_trip() {
        let xpriv = decode_xpriv(VECTOR_XPRV, ChainId::Flux).unwrap();
        assert_eq!(encode_xpriv(&xpriv, ChainId::Flux).as_str(), VECTOR_XPRV);
    }

    #[test]
    fn test_garbage_is_invalid_public_key() {
        assert!(matches!(
            decode_xpub("xpub-not-a-key", ChainId::Flux),
            Err(WalletError::InvalidPublicKey(_))
        ));
    }
}
