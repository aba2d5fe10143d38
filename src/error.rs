//! # Error Types
//!
//! Error handling for the transfer protocol engine.
//!
//! Every failure surfaced by the codec, the framed transport, the response
//! validator, the session state machine and the checksum retry loop maps to a
//! distinct [`ProtocolError`] variant so callers can tell them apart.
//!
//! ## Error Categories
//! - **Transport**: frame writes/reads failing, connect failures, timeouts
//! - **Decode**: malformed headers, truncated payloads, unknown response codes
//! - **Validation**: server errors, unexpected codes, payload size mismatches
//! - **Key material**: bad public keys, undecryptable or wrongly sized session keys
//! - **Transfer**: checksum mismatches and abandoned uploads
//!
//! ## Example Usage
//! ```rust
//! use secure_transfer::error::{ProtocolError, Result};
//!
//! fn check_len(bytes: &[u8]) -> Result<()> {
//!     if bytes.len() < 7 {
//!         return Err(ProtocolError::MalformedHeader {
//!             need: 7,
//!             have: bytes.len(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_len(&[0u8; 3]).is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to keep common error paths allocation free.
pub mod constants {
    /// Transport errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed before the expected bytes arrived";
    pub const ERR_ZERO_WRITE: &str = "Frame write reported zero bytes written";

    /// Session errors
    pub const ERR_USERNAME_EMPTY: &str = "Username cannot be empty";
    pub const ERR_USERNAME_CHARSET: &str =
        "Username may contain only alphanumeric characters";
    pub const ERR_NAME_TOO_LONG: &str = "Name exceeds 254 characters";
    pub const ERR_NAME_NOT_ASCII: &str = "Name must be printable ASCII without NUL bytes";
    pub const ERR_NO_FILE_NAME: &str = "Transfer path has no file name";

    /// Persistence errors
    pub const ERR_NO_IDENTITY: &str = "No stored identity available";
}

/// ProtocolError is the primary error type for all engine operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Failed to connect to {address}: {reason}")]
    ConnectFailed { address: String, reason: String },

    #[error("Transport write failed: {0}")]
    TransportWrite(String),

    #[error("Transport read failed: {0}")]
    TransportRead(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Malformed header: need {need} bytes, have {have}")]
    MalformedHeader { need: usize, have: usize },

    #[error("Truncated payload: need {need} bytes, have {have}")]
    TruncatedPayload { need: usize, have: usize },

    #[error("Unknown response code: {0}")]
    UnknownResponseCode(u16),

    #[error("Content of {0} bytes does not fit the 32-bit size field")]
    OversizedContent(usize),

    #[error("Response declares {declared} payload bytes, limit is {max}")]
    OversizedResponse { declared: u32, max: usize },

    #[error("Unknown request code: {0}")]
    UnknownRequestCode(u16),

    #[error("Server reported a general error")]
    ServerError,

    #[error("Unexpected response code: expected {expected}, got {got}")]
    UnexpectedResponseCode { expected: u16, got: u16 },

    #[error("Payload size mismatch for code {code}: expected {expected}, declared {declared}")]
    PayloadSizeMismatch {
        code: u16,
        expected: u32,
        declared: u32,
    },

    #[error("Invalid key material: decrypted key is {0} bytes, expected 16")]
    InvalidKeyMaterial(usize),

    #[error("Invalid public key: {0} bytes, expected 160")]
    InvalidPublicKey(usize),

    #[error("Checksum mismatch: local {local:#010x}, server {server:#010x}")]
    IntegrityMismatch { local: u32, server: u32 },

    #[error("Transfer abandoned after {attempts} attempts")]
    TransferAbandoned { attempts: u32 },

    #[error("Decryption failed")]
    DecryptionFailure,

    #[error("Encryption failed")]
    EncryptionFailure,

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Session has no client ID; register first")]
    NotRegistered,

    #[error("Session has no symmetric key; exchange keys or reconnect first")]
    NoSymmetricKey,

    #[error("Server denied the registration")]
    RegistrationDenied,

    #[error("Server denied the reconnection")]
    ReconnectionDenied,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Whether the caller may retry the upload after this error.
    ///
    /// Only a checksum disagreement qualifies; everything else aborts the
    /// current operation.
    pub fn is_integrity_mismatch(&self) -> bool {
        matches!(self, ProtocolError::IntegrityMismatch { .. })
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
