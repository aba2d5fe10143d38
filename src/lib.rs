//! # secure-transfer
//!
//! Client engine for a small secure file-upload protocol: register a device,
//! receive an RSA-wrapped AES session key, upload a file encrypted under that
//! key and confirm its CRC-32 with the server.
//!
//! ## Layers
//! - [`core`]: wire types, headers and the fixed 1024-byte frame codec
//! - [`protocol`]: request/response messages, response validation, session state
//! - [`transport`]: framed send/receive and connection establishment
//! - [`service`]: [`TransferClient`], the round-trips and the checksum retry loop
//! - [`utils`]: checksum, crypto provider seam, logging, metrics, timeouts
//!
//! RSA and AES are supplied by the caller through [`CryptoProvider`]; stored
//! identities and file contents through [`Persistence`].

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::config::TransferConfig;
pub use crate::core::packet::{RequestCode, ResponseCode, ResponseHeader};
pub use crate::core::types::{ClientId, Name, PublicKey, SymmetricKey};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::message::{Request, Response, ResponsePayload};
pub use crate::protocol::session::{Persistence, Session, SessionState, StoredIdentity};
pub use crate::service::client::TransferClient;
pub use crate::service::transfer::{RetryBudget, TransferOutcome};
pub use crate::utils::crypto::{CryptoProvider, PrivateKey};
