//! # Core Protocol Components
//!
//! Low-level wire types, headers and transport framing.
//!
//! ## Components
//! - **Types**: fixed-width fields (client id, names, keys)
//! - **Packet**: request/response headers and operation codes
//! - **Codec**: Tokio codec splitting the byte stream into 1024-byte frames
//!
//! ## Wire Format
//! ```text
//! Request:  [ClientId(16)] [Version(1)] [Code(2)] [PayloadSize(4)] [Payload(N)]
//! Response: [Version(1)] [Code(2)] [PayloadSize(4)] [Payload(N)]
//! ```
//! All integers are little-endian; messages travel zero-padded to a multiple of
//! the frame size.

pub mod codec;
pub mod packet;
pub mod types;
