//! Fixed-width protocol field types.
//!
//! Every field the server reads or writes has a fixed size on the wire. These
//! types enforce those sizes at construction so the codec never has to
//! truncate or pad anything it was not told to.

use crate::error::{constants, ProtocolError, Result};
use std::fmt;
use zeroize::Zeroize;

/// Size of a client identifier
pub const CLIENT_ID_SIZE: usize = 16;

/// Width of a name field (username or file name) on the wire
pub const NAME_SIZE: usize = 255;

/// Longest name that still leaves room for the NUL terminator
pub const MAX_NAME_LEN: usize = NAME_SIZE - 1;

/// Encoded RSA public key size (1024-bit key)
pub const PUBLIC_KEY_SIZE: usize = 160;

/// AES-128 key size
pub const SYMMETRIC_KEY_SIZE: usize = 16;

/// Server-assigned identity token. All zeroes means "not assigned yet".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClientId([u8; CLIENT_ID_SIZE]);

impl ClientId {
    pub const UNASSIGNED: ClientId = ClientId([0u8; CLIENT_ID_SIZE]);

    pub const fn from_bytes(bytes: [u8; CLIENT_ID_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CLIENT_ID_SIZE] {
        &self.0
    }

    pub fn is_assigned(&self) -> bool {
        self.0 != [0u8; CLIENT_ID_SIZE]
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({self})")
    }
}

/// Bounded ASCII name carried in a 255-byte NUL-padded field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name(String);

impl Name {
    /// Validate `value` for the wire: at most 254 printable ASCII bytes.
    pub fn new(value: &str) -> Result<Self> {
        if value.len() > MAX_NAME_LEN {
            return Err(ProtocolError::InvalidName(
                constants::ERR_NAME_TOO_LONG.to_string(),
            ));
        }
        if !value.bytes().all(|b| b.is_ascii() && b != 0 && !b.is_ascii_control()) {
            return Err(ProtocolError::InvalidName(
                constants::ERR_NAME_NOT_ASCII.to_string(),
            ));
        }
        Ok(Self(value.to_string()))
    }

    /// Read a name back from its wire field, stopping at the first NUL.
    ///
    /// Peer-supplied bytes are not re-validated; anything that is not UTF-8 is
    /// replaced rather than rejected. An unterminated field is read as its
    /// first [`MAX_NAME_LEN`] bytes, the most [`Name::to_wire`] can carry.
    pub fn from_wire(field: &[u8; NAME_SIZE]) -> Self {
        let text = &field[..MAX_NAME_LEN];
        let end = text.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
        Self(String::from_utf8_lossy(&text[..end]).into_owned())
    }

    /// The NUL-padded 255-byte field for this name.
    pub fn to_wire(&self) -> [u8; NAME_SIZE] {
        let mut field = [0u8; NAME_SIZE];
        let bytes = self.0.as_bytes();
        let len = bytes.len().min(MAX_NAME_LEN);
        field[..len].copy_from_slice(&bytes[..len]);
        field
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wire-encoded RSA public key, exactly 160 bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; PUBLIC_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| ProtocolError::InvalidPublicKey(bytes.len()))?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey([{PUBLIC_KEY_SIZE} bytes])")
    }
}

/// AES-128 session key. Zeroed on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl SymmetricKey {
    /// Accept exactly 16 bytes of unwrapped key material.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; SYMMETRIC_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| ProtocolError::InvalidKeyMaterial(bytes.len()))?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}
