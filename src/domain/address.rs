//! 地址生成
//!
//! xpub → 多签 P2SH 地址 / 单钥身份地址，以及输出脚本 → 地址。

use bitcoin::bip32::Xpub;
use bitcoin::blockdata::script::{Script, ScriptBuf};
use bitcoin::secp256k1::{PublicKey, Secp256k1};
use serde::Serialize;

use crate::domain::chain_config::ChainId;
use crate::domain::derivation_path_validator::DerivationPathValidator;
use crate::domain::extended_key;
use crate::domain::script::{self, classify_output, MultisigScript, OutputTemplate};
use crate::error::{Result, WalletError};

/// 身份地址使用的 change/index
pub const IDENTITY_CHANGE_INDEX: u32 = 11;
pub const IDENTITY_ADDRESS_INDEX: u32 = 0;

/// prefix ‖ payload 的 base58check 编码
pub fn encode_base58check(prefix: &[u8], payload: &[u8]) -> String {
    let mut raw = Vec::with_capacity(prefix.len() + payload.len());
    raw.extend_from_slice(prefix);
    raw.extend_from_slice(payload);
    bs58::encode(raw).with_check().into_string()
}

/// 已解码地址
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedAddress {
    PubKeyHash([u8; 20]),
    ScriptHash([u8; 20]),
}

impl DecodedAddress {
    pub fn script_pubkey(&self) -> ScriptBuf {
        match self {
            DecodedAddress::PubKeyHash(hash) => script::p2pkh_script_pubkey(hash),
            DecodedAddress::ScriptHash(hash) => script::p2sh_script_pubkey(hash),
        }
    }
}

/// 解析属于指定链的 P2PKH/P2SH 地址
pub fn decode_address(address: &str, chain: ChainId) -> Result<DecodedAddress> {
    let raw = bs58::decode(address.trim())
        .with_check(None)
        .into_vec()
        .map_err(|e| WalletError::InvalidInput(format!("address {}: {}", address, e)))?;

    let params = chain.params();
    let split = |prefix: &[u8]| -> Option<[u8; 20]> {
        let body = raw.strip_prefix(prefix)?;
        <[u8; 20]>::try_from(body).ok()
    };

    if let Some(hash) = split(params.script_hash) {
        return Ok(DecodedAddress::ScriptHash(hash));
    }
    if let Some(hash) = split(params.pub_key_hash) {
        return Ok(DecodedAddress::PubKeyHash(hash));
    }

    Err(WalletError::InvalidInput(format!(
        "address {} does not belong to {}",
        address, chain
    )))
}

pub fn p2sh_address(script_hash: &[u8; 20], chain: ChainId) -> String {
    encode_base58check(chain.params().script_hash, script_hash)
}

pub fn p2pkh_address(public_key: &PublicKey, chain: ChainId) -> String {
    encode_base58check(
        chain.params().pub_key_hash,
        &script::hash160(&public_key.serialize()),
    )
}

/// 标准输出脚本对应的地址；非标准脚本返回 None
pub fn address_from_output_script(script_pubkey: &Script, chain: ChainId) -> Option<String> {
    match classify_output(script_pubkey)? {
        OutputTemplate::P2sh(hash) => Some(p2sh_address(&hash, chain)),
        OutputTemplate::P2pkh(hash) => Some(encode_base58check(chain.params().pub_key_hash, &hash)),
    }
}

/// 多签钱包描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultisigDescriptor {
    #[serde(skip)]
    pub chain: ChainId,
    /// 按字节序排序
    #[serde(serialize_with = "serialize_keys")]
    pub cosigner_public_keys: Vec<PublicKey>,
    pub threshold: usize,
    #[serde(serialize_with = "serialize_script")]
    pub redeem_script: ScriptBuf,
    pub address: String,
}

fn serialize_keys<S: serde::Serializer>(keys: &[PublicKey], s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_seq(keys.iter().map(|k| hex::encode(k.serialize())))
}

fn serialize_script<S: serde::Serializer>(script: &ScriptBuf, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(script.as_bytes()))
}

impl MultisigDescriptor {
    pub fn redeem_script_hex(&self) -> String {
        hex::encode(self.redeem_script.as_bytes())
    }

    pub fn multisig(&self) -> Result<MultisigScript> {
        MultisigScript::parse(&self.redeem_script)
    }
}

/// 通用 M-of-N 描述
pub fn build_multisig_descriptor(
    threshold: usize,
    keys: Vec<PublicKey>,
    chain: ChainId,
) -> Result<MultisigDescriptor> {
    let multisig = MultisigScript::new(threshold, keys)?;
    let redeem_script = multisig.to_script();
    let address = p2sh_address(&script::hash160(redeem_script.as_bytes()), chain);

    Ok(MultisigDescriptor {
        chain,
        cosigner_public_keys: multisig.keys().to_vec(),
        threshold: multisig.threshold(),
        redeem_script,
        address,
    })
}

fn derive_child_public_key(xpub: &Xpub, change_index: u32, address_index: u32) -> Result<PublicKey> {
    let suffix = DerivationPathValidator::address_suffix(change_index, address_index)?;
    let secp = Secp256k1::verification_only();
    let child = xpub
        .derive_pub(&secp, &suffix)
        .map_err(|e| WalletError::DerivationError(e.to_string()))?;
    Ok(child.public_key)
}

/// 2-of-2 多签地址，参数顺序不影响结果
pub fn generate_multisig_address(
    partner_xpub: &str,
    own_xpub: &str,
    address_index: u32,
    change_index: u32,
    chain: ChainId,
) -> Result<MultisigDescriptor> {
    let partner = extended_key::decode_xpub(partner_xpub, chain)?;
    let own = extended_key::decode_xpub(own_xpub, chain)?;

    let keys = vec![
        derive_child_public_key(&partner, change_index, address_index)?,
        derive_child_public_key(&own, change_index, address_index)?,
    ];

    let descriptor = build_multisig_descriptor(2, keys, chain)?;
    tracing::debug!(
        chain = %chain,
        change = change_index,
        index = address_index,
        address = %descriptor.address,
        "Generated multisig address"
    );
    Ok(descriptor)
}

/// 身份地址：xpub/11/0 的 P2PKH
pub fn generate_identity_address(xpub: &str, chain: ChainId) -> Result<String> {
    let xpub = extended_key::decode_xpub(xpub, chain)?;
    let key = derive_child_public_key(&xpub, IDENTITY_CHANGE_INDEX, IDENTITY_ADDRESS_INDEX)?;
    Ok(p2pkh_address(&key, chain))
}
