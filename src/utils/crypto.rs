//! Crypto provider capability consumed by the protocol engine.
//!
//! The engine never implements RSA or AES itself. It calls a
//! [`CryptoProvider`] for the four primitives the protocol needs:
//!
//! - generating the device's RSA keypair at registration,
//! - deriving the wire public key from a stored private key,
//! - unwrapping the RSA-encrypted session key sent by the server,
//! - AES-128-CBC encryption of upload content.
//!
//! ## Known weakness
//! The protocol mandates AES-CBC with a fixed all-zero initialization vector.
//! Identical plaintext prefixes therefore produce identical ciphertext
//! prefixes. Implementations must reproduce the zero IV anyway: the server
//! decrypts with the same fixed IV and any other choice breaks
//! interoperability.

use crate::core::types::{PublicKey, SymmetricKey};
use crate::error::Result;
use std::fmt;
use zeroize::Zeroize;

/// Encoded RSA private key as produced by the provider.
///
/// Opaque to the engine; only handed back to the provider. Zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([{} bytes])", self.0.len())
    }
}

/// RSA and AES primitives supplied by the embedding application.
///
/// Errors from `rsa_decrypt` and `aes_decrypt` should be reported as
/// [`ProtocolError::DecryptionFailure`](crate::error::ProtocolError::DecryptionFailure),
/// errors from `aes_encrypt` as
/// [`ProtocolError::EncryptionFailure`](crate::error::ProtocolError::EncryptionFailure).
pub trait CryptoProvider {
    /// Generate a fresh RSA keypair. The public half must encode to exactly
    /// [`PUBLIC_KEY_SIZE`](crate::core::types::PUBLIC_KEY_SIZE) bytes.
    fn generate_keypair(&self) -> Result<(PublicKey, PrivateKey)>;

    /// Derive the wire-encoded public key belonging to `private`.
    fn public_key(&self, private: &PrivateKey) -> Result<PublicKey>;

    /// Unwrap key material the server encrypted under our public key.
    fn rsa_decrypt(&self, private: &PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// AES-128-CBC encrypt with the protocol's fixed zero IV.
    fn aes_encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// AES-128-CBC decrypt with the protocol's fixed zero IV.
    fn aes_decrypt(&self, key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_key_debug_hides_bytes() {
        let key = PrivateKey::from_bytes(vec![0x42; 32]);
        let rendered = format!("{key:?}");
        assert_eq!(rendered, "PrivateKey([32 bytes])");
        assert!(!rendered.contains("42"));
    }
}
