//! # Utility Modules
//!
//! Supporting utilities shared by the protocol engine.
//!
//! ## Components
//! - **Checksum**: CRC-32 over file content, matching the server's `zlib.crc32`
//! - **Crypto**: the crypto provider capability (RSA unwrap, AES-CBC) and key types
//! - **Logging**: `tracing-subscriber` installation from [`crate::config::LoggingConfig`]
//! - **Metrics**: thread-safe counters for round-trips, frames and transfers
//! - **Timeout**: async timeout wrappers used by the framed transport
//!
//! ## Security
//! - Private and symmetric key buffers are zeroed on drop (zeroize crate)
//! - Key material never reaches log output

pub mod checksum;
pub mod crypto;
pub mod logging;
pub mod metrics;
pub mod timeout;
