//! 解密后密钥材料的作用域持有者
//!
//! 调用方从安全存储中解密出助记词、xpriv 或 WIF 后包装为 `DecryptedSecret`，
//! 仅在一次派生/签名调用期间借给核心层；无论正常返回还是出错，明文缓冲区都会在
//! drop 时被清零。

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Result, WalletError};

/// 明文密钥材料（使用Zeroize保护）
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DecryptedSecret {
    bytes: Vec<u8>,
}

impl DecryptedSecret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_string(secret: String) -> Self {
        Self {
            bytes: secret.into_bytes(),
        }
    }

    /// 作用域内使用明文，离开闭包即清零
    pub fn scoped<T>(bytes: Vec<u8>, f: impl FnOnce(&DecryptedSecret) -> T) -> T {
        let secret = DecryptedSecret::new(bytes);
        f(&secret)
    }

    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    /// 以 UTF-8 文本形式读取（xpriv / WIF / 助记词）
    pub fn expose_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes)
            .map(str::trim)
            .map_err(|_| WalletError::InvalidInput("secret is not valid utf-8".to_string()))
    }

    /// 复制一份同样受保护的文本
    pub fn to_zeroizing_string(&self) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new(self.expose_str()?.to_string()))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<String> for DecryptedSecret {
    fn from(secret: String) -> Self {
        Self::from_string(secret)
    }
}

impl From<&str> for DecryptedSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret.as_bytes().to_vec())
    }
}

impl fmt::Debug for DecryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecryptedSecret([REDACTED; {} bytes])", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_material() {
        let secret = DecryptedSecret::from("xprv-super-secret");
        let printed = format!("{:?}", secret);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("17 bytes"));
    }

    #[test]
    fn test_scoped_returns_closure_result() {
        let len = DecryptedSecret::scoped(b"abc".to_vec(), |s| s.len());
        assert_eq!(len, 3);
    }

    #[test]
    fn test_expose_str_trims_whitespace() {
        let secret = DecryptedSecret::from("  word list \n");
        assert_eq!(secret.expose_str().unwrap(), "word list");
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let secret = DecryptedSecret::new(vec![0xff, 0xfe]);
        assert!(matches!(
            secret.expose_str(),
            Err(WalletError::InvalidInput(_))
        ));
    }
}
