//! # Client Service
//!
//! [`TransferClient`](client::TransferClient) drives registration, key
//! exchange, reconnection and checksum-confirmed uploads over fresh
//! connections.

pub mod client;
pub mod transfer;
