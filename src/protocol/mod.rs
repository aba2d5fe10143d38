//! # Protocol Layer
//!
//! Typed messages, response validation and the client session model.
//!
//! - **message**: [`Request`](message::Request) and [`Response`](message::Response) codecs
//! - **validator**: header checks applied before a payload is trusted
//! - **session**: session state, stored identity and the persistence seam

pub mod message;
pub mod session;
pub mod validator;
