//! 密钥派生
//!
//! 助记词 → BIP48 账户级扩展密钥对 → 地址级密钥对。
//! 纯函数、无 I/O；PBKDF2 与逐层 CKD 都是 CPU 密集型，异步调用方应使用
//! `derive_master_key_pair_async` 放到阻塞线程池执行。

use std::fmt;

use bip39::{Language, Mnemonic};
use bitcoin::bip32::{ChainCode, DerivationPath, Xpriv, Xpub};
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use bitcoin::Network;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::domain::chain_config::ChainId;
use crate::domain::derivation_path_validator::{DerivationPathValidator, ScriptType};
use crate::domain::extended_key;
use crate::error::{Result, WalletError};
use crate::infrastructure::secret::DecryptedSecret;

pub const MIN_SEED_WORDS: usize = 12;

/// 已校验的助记词
pub struct SeedPhrase {
    phrase: Zeroizing<String>,
    word_count: usize,
}

impl SeedPhrase {
    /// 校验词数与 BIP39 校验和
    pub fn parse(phrase: &str) -> Result<Self> {
        let normalized = Zeroizing::new(phrase.split_whitespace().collect::<Vec<_>>().join(" "));
        let word_count = normalized.split(' ').filter(|w| !w.is_empty()).count();

        if word_count < MIN_SEED_WORDS {
            return Err(WalletError::InvalidSeed(format!(
                "expected at least {} words, got {}",
                MIN_SEED_WORDS, word_count
            )));
        }

        Mnemonic::parse_in(Language::English, normalized.as_str())
            .map_err(|e| WalletError::InvalidSeed(e.to_string()))?;

        Ok(Self {
            phrase: normalized,
            word_count,
        })
    }

    pub fn from_secret(secret: &DecryptedSecret) -> Result<Self> {
        Self::parse(secret.expose_str()?)
    }

    /// 生成新助记词（12 或 24 词）
    pub fn generate(word_count: usize) -> Result<Self> {
        let entropy_len = match word_count {
            12 => 16,
            24 => 32,
            other => {
                return Err(WalletError::InvalidInput(format!(
                    "unsupported word count {}, use 12 or 24",
                    other
                )))
            }
        };

        let mut entropy = Zeroizing::new(vec![0u8; entropy_len]);
        rand::rngs::OsRng.fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|e| WalletError::InvalidSeed(e.to_string()))?;

        Ok(Self {
            phrase: Zeroizing::new(mnemonic.to_string()),
            word_count,
        })
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// 明文助记词，仅用于交给调用方加密保存
    pub fn expose(&self) -> &str {
        &self.phrase
    }

    fn to_seed(&self) -> Result<Zeroizing<[u8; 64]>> {
        let mnemonic = Mnemonic::parse_in(Language::English, self.phrase.as_str())
            .map_err(|e| WalletError::InvalidSeed(e.to_string()))?;
        Ok(Zeroizing::new(mnemonic.to_seed("")))
    }
}

impl fmt::Debug for SeedPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeedPhrase([REDACTED; {} words])", self.word_count)
    }
}

/// 扩展密钥对；没有私钥时为观察钱包
#[derive(Clone)]
pub struct ExtendedKeyPair {
    private_key: Option<Xpriv>,
    public_key: Xpub,
    derivation_path: DerivationPath,
    script_type: ScriptType,
}

impl ExtendedKeyPair {
    pub fn from_xpriv(xpriv: &DecryptedSecret, chain: ChainId) -> Result<Self> {
        let private_key = extended_key::decode_xpriv(xpriv.expose_str()?, chain)?;
        let secp = Secp256k1::signing_only();
        let public_key = Xpub::from_priv(&secp, &private_key);
        Ok(Self {
            private_key: Some(private_key),
            public_key,
            derivation_path: DerivationPath::master(),
            script_type: ScriptType::P2sh,
        })
    }

    pub fn from_xpub(xpub: &str, chain: ChainId) -> Result<Self> {
        Ok(Self {
            private_key: None,
            public_key: extended_key::decode_xpub(xpub, chain)?,
            derivation_path: DerivationPath::master(),
            script_type: ScriptType::P2sh,
        })
    }

    pub fn is_watch_only(&self) -> bool {
        self.private_key.is_none()
    }

    /// 去掉私钥部分
    pub fn watch_only(&self) -> Self {
        Self {
            private_key: None,
            public_key: self.public_key,
            derivation_path: self.derivation_path.clone(),
            script_type: self.script_type,
        }
    }

    pub fn public_key(&self) -> &Xpub {
        &self.public_key
    }

    pub fn chain_code(&self) -> ChainCode {
        self.public_key.chain_code
    }

    pub fn derivation_path(&self) -> &DerivationPath {
        &self.derivation_path
    }

    pub fn script_type(&self) -> ScriptType {
        self.script_type
    }

    pub fn encode_xpub(&self, chain: ChainId) -> String {
        extended_key::encode_xpub(&self.public_key, chain)
    }

    pub fn encode_xpriv(&self, chain: ChainId) -> Option<Zeroizing<String>> {
        self.private_key
            .as_ref()
            .map(|k| extended_key::encode_xpriv(k, chain))
    }
}

impl Drop for ExtendedKeyPair {
    fn drop(&mut self) {
        if let Some(key) = self.private_key.as_mut() {
            key.private_key.non_secure_erase();
        }
    }
}

impl fmt::Debug for ExtendedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKeyPair")
            .field("derivation_path", &self.derivation_path.to_string())
            .field("fingerprint", &self.public_key.fingerprint())
            .field("watch_only", &self.is_watch_only())
            .finish()
    }
}

/// 派生账户级扩展密钥对 m/purpose'/coin_type'/account'/script_type'
pub fn derive_master_key_pair(
    seed: &SeedPhrase,
    purpose: u32,
    coin_type: u32,
    account: u32,
    script_type: ScriptType,
) -> Result<ExtendedKeyPair> {
    let path = DerivationPathValidator::account_path(purpose, coin_type, account, script_type)?;
    let seed_bytes = seed.to_seed()?;

    let secp = Secp256k1::new();
    // 网络字段只影响 bitcoin 自身的序列化版本号，各链版本号由 extended_key 处理
    let mut root = Xpriv::new_master(Network::Bitcoin, seed_bytes.as_slice())
        .map_err(|e| WalletError::DerivationError(e.to_string()))?;
    let derived = root.derive_priv(&secp, &path);
    root.private_key.non_secure_erase();
    let private_key = derived.map_err(|e| WalletError::DerivationError(e.to_string()))?;

    let public_key = Xpub::from_priv(&secp, &private_key);

    tracing::debug!(path = %path, fingerprint = %public_key.fingerprint(), "Derived account key pair");

    Ok(ExtendedKeyPair {
        private_key: Some(private_key),
        public_key,
        derivation_path: path,
        script_type,
    })
}

/// 只返回公钥部分的派生
pub fn derive_master_public_key(
    seed: &SeedPhrase,
    purpose: u32,
    coin_type: u32,
    account: u32,
    script_type: ScriptType,
) -> Result<ExtendedKeyPair> {
    derive_master_key_pair(seed, purpose, coin_type, account, script_type).map(|pair| pair.watch_only())
}

/// 在阻塞线程池中派生；future 被丢弃时结果随之丢弃
pub async fn derive_master_key_pair_async(
    seed: SeedPhrase,
    purpose: u32,
    coin_type: u32,
    account: u32,
    script_type: ScriptType,
) -> Result<ExtendedKeyPair> {
    tokio::task::spawn_blocking(move || {
        derive_master_key_pair(&seed, purpose, coin_type, account, script_type)
    })
    .await?
}

/// 地址级密钥对
#[derive(Clone)]
pub struct AddressKeypair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl AddressKeypair {
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// 导入压缩公钥格式的 WIF
    pub fn from_wif(wif: &DecryptedSecret, chain: ChainId) -> Result<Self> {
        let raw = Zeroizing::new(
            bs58::decode(wif.expose_str()?)
                .with_check(None)
                .into_vec()
                .map_err(|_| WalletError::SigningError("private key is not valid WIF".into()))?,
        );

        let prefix = chain.params().wif;
        let body = match raw.as_slice() {
            [p, body @ .., 0x01] if *p == prefix && body.len() == 32 => body,
            [p, body @ ..] if *p == prefix && body.len() == 32 => body,
            _ => {
                return Err(WalletError::SigningError(format!(
                    "WIF does not belong to {}",
                    chain
                )))
            }
        };

        let secret_key = SecretKey::from_slice(body)
            .map_err(|e| WalletError::SigningError(e.to_string()))?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn to_wif(&self, chain: ChainId) -> Zeroizing<String> {
        let mut raw = Zeroizing::new(Vec::with_capacity(34));
        raw.push(chain.params().wif);
        raw.extend_from_slice(&self.secret_key.secret_bytes());
        raw.push(0x01);
        Zeroizing::new(bs58::encode(raw.as_slice()).with_check().into_string())
    }
}

impl Drop for AddressKeypair {
    fn drop(&mut self) {
        self.secret_key.non_secure_erase();
    }
}

impl fmt::Debug for AddressKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressKeypair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// 从账户级 xpriv 派生 change/index 地址密钥对
pub fn generate_address_keypair(
    xpriv: &DecryptedSecret,
    change_index: u32,
    address_index: u32,
    chain: ChainId,
) -> Result<AddressKeypair> {
    let account = ExtendedKeyPair::from_xpriv(xpriv, chain)?;
    let suffix = DerivationPathValidator::address_suffix(change_index, address_index)?;

    let secp = Secp256k1::new();
    let xpriv = account
        .private_key
        .as_ref()
        .ok_or_else(|| WalletError::DerivationError("missing private key".into()))?;
    let mut child = xpriv
        .derive_priv(&secp, &suffix)
        .map_err(|e| WalletError::DerivationError(e.to_string()))?;

    let keypair = AddressKeypair::from_secret_key(child.private_key);
    child.private_key.non_secure_erase();
    Ok(keypair)
}
