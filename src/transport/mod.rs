//! # Transport Layer
//!
//! Moves encoded messages across a byte stream in fixed 1024-byte frames.
//!
//! - **framed**: [`FramedConnection`](framed::FramedConnection) send/receive over any async stream
//! - **tcp**: the [`Connector`](tcp::Connector) seam and its TCP implementation

pub mod framed;
pub mod tcp;
