//! Request and response headers, and the operation codes they carry.
//!
//! ## Wire Format (little-endian, no padding)
//! ```text
//! Request:  [ClientId(16)] [Version(1)] [Code(2)] [PayloadSize(4)]   = 23 bytes
//! Response:                [Version(1)] [Code(2)] [PayloadSize(4)]   =  7 bytes
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::config::PROTOCOL_VERSION;
use crate::core::types::{ClientId, CLIENT_ID_SIZE};
use crate::error::{ProtocolError, Result};

/// Encoded size of a [`RequestHeader`]
pub const REQUEST_HEADER_SIZE: usize = CLIENT_ID_SIZE + 1 + 2 + 4;

/// Encoded size of a [`ResponseHeader`]
pub const RESPONSE_HEADER_SIZE: usize = 1 + 2 + 4;

/// Operation codes sent by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RequestCode {
    Registration = 1100,
    SendPublicKey = 1101,
    Reconnect = 1102,
    SendFile = 1103,
    ValidCrc = 1104,
    InvalidCrc = 1105,
    FinalInvalidCrc = 1106,
}

impl RequestCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1100 => Some(RequestCode::Registration),
            1101 => Some(RequestCode::SendPublicKey),
            1102 => Some(RequestCode::Reconnect),
            1103 => Some(RequestCode::SendFile),
            1104 => Some(RequestCode::ValidCrc),
            1105 => Some(RequestCode::InvalidCrc),
            1106 => Some(RequestCode::FinalInvalidCrc),
            _ => None,
        }
    }
}

/// Operation codes sent by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ResponseCode {
    RegistrationSuccess = 2100,
    RegistrationFailure = 2101,
    KeyExchange = 2102,
    FileDeliveredWithCrc = 2103,
    MessageDelivered = 2104,
    ReconnectionAccepted = 2105,
    ReconnectionDenied = 2106,
    ServerError = 2107,
}

impl ResponseCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            2100 => Some(ResponseCode::RegistrationSuccess),
            2101 => Some(ResponseCode::RegistrationFailure),
            2102 => Some(ResponseCode::KeyExchange),
            2103 => Some(ResponseCode::FileDeliveredWithCrc),
            2104 => Some(ResponseCode::MessageDelivered),
            2105 => Some(ResponseCode::ReconnectionAccepted),
            2106 => Some(ResponseCode::ReconnectionDenied),
            2107 => Some(ResponseCode::ServerError),
            _ => None,
        }
    }
}

/// Header preceding every client request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub client_id: ClientId,
    pub version: u8,
    pub code: u16,
    pub payload_size: u32,
}

impl RequestHeader {
    /// Header for `code` stamped with the client's protocol version
    pub fn new(client_id: ClientId, code: RequestCode, payload_size: u32) -> Self {
        Self {
            client_id,
            version: PROTOCOL_VERSION,
            code: code.as_u16(),
            payload_size,
        }
    }

    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(REQUEST_HEADER_SIZE);
        dst.put_slice(self.client_id.as_bytes());
        dst.put_u8(self.version);
        dst.put_u16_le(self.code);
        dst.put_u32_le(self.payload_size);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(REQUEST_HEADER_SIZE);
        self.write_to(&mut buf);
        buf.to_vec()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < REQUEST_HEADER_SIZE {
            return Err(ProtocolError::MalformedHeader {
                need: REQUEST_HEADER_SIZE,
                have: data.len(),
            });
        }

        let mut buf = &data[..REQUEST_HEADER_SIZE];
        let mut client_id = [0u8; CLIENT_ID_SIZE];
        buf.copy_to_slice(&mut client_id);

        Ok(Self {
            client_id: ClientId::from_bytes(client_id),
            version: buf.get_u8(),
            code: buf.get_u16_le(),
            payload_size: buf.get_u32_le(),
        })
    }
}

/// Header preceding every server response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub version: u8,
    pub code: u16,
    pub payload_size: u32,
}

impl ResponseHeader {
    pub fn new(code: ResponseCode, payload_size: u32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            code: code.as_u16(),
            payload_size,
        }
    }

    /// The typed code, if this client models it
    pub fn response_code(&self) -> Option<ResponseCode> {
        ResponseCode::from_u16(self.code)
    }

    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(RESPONSE_HEADER_SIZE);
        dst.put_u8(self.version);
        dst.put_u16_le(self.code);
        dst.put_u32_le(self.payload_size);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_SIZE);
        self.write_to(&mut buf);
        buf.to_vec()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < RESPONSE_HEADER_SIZE {
            return Err(ProtocolError::MalformedHeader {
                need: RESPONSE_HEADER_SIZE,
                have: data.len(),
            });
        }

        let mut buf = &data[..RESPONSE_HEADER_SIZE];
        Ok(Self {
            version: buf.get_u8(),
            code: buf.get_u16_le(),
            payload_size: buf.get_u32_le(),
        })
    }
}
