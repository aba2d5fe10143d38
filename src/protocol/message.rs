//! Typed requests and responses, and their byte-exact wire encodings.
//!
//! ## Payload layouts
//! ```text
//! Registration / Reconnect / *Crc:  [Name(255)]
//! SendPublicKey:                    [Name(255)] [PublicKey(160)]
//! SendFile:                         [ContentSize(4)] [FileName(255)] [Content(N)]
//!
//! RegistrationSuccess / MessageDelivered / ReconnectionDenied: [ClientId(16)]
//! KeyExchange / ReconnectionAccepted:  [ClientId(16)] [EncryptedKey(rest)]
//! FileDeliveredWithCrc:  [ClientId(16)] [ContentSize(4)] [FileName(255)] [Crc(4)]
//! RegistrationFailure / ServerError:   (empty)
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::core::packet::{
    RequestCode, RequestHeader, ResponseCode, ResponseHeader, REQUEST_HEADER_SIZE,
    RESPONSE_HEADER_SIZE,
};
use crate::core::types::{
    ClientId, Name, PublicKey, CLIENT_ID_SIZE, NAME_SIZE, PUBLIC_KEY_SIZE,
};
use crate::error::{ProtocolError, Result};

/// Payload of requests that carry only a name
pub const NAME_PAYLOAD_SIZE: usize = NAME_SIZE;

/// Payload of a public key submission
pub const SEND_PUBLIC_KEY_PAYLOAD_SIZE: usize = NAME_SIZE + PUBLIC_KEY_SIZE;

/// Fixed prefix of a file upload, before the content bytes
pub const SEND_FILE_PREFIX_SIZE: usize = 4 + NAME_SIZE;

/// Payload of a file delivery acknowledgement
pub const FILE_DELIVERED_PAYLOAD_SIZE: usize = CLIENT_ID_SIZE + 4 + NAME_SIZE + 4;

/// Largest response payload this client will read off the wire
pub const MAX_RESPONSE_PAYLOAD_SIZE: usize = 64 * 1024;

/// A client request, ready to be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Registration {
        name: Name,
    },
    SendPublicKey {
        client_id: ClientId,
        name: Name,
        public_key: PublicKey,
    },
    Reconnect {
        client_id: ClientId,
        name: Name,
    },
    SendFile {
        client_id: ClientId,
        file_name: Name,
        content: Vec<u8>,
    },
    ValidCrc {
        client_id: ClientId,
        file_name: Name,
    },
    InvalidCrc {
        client_id: ClientId,
        file_name: Name,
    },
    FinalInvalidCrc {
        client_id: ClientId,
        file_name: Name,
    },
}

impl Request {
    /// Build a file upload, rejecting content the size field cannot describe.
    pub fn send_file(client_id: ClientId, file_name: Name, content: Vec<u8>) -> Result<Self> {
        let request = Request::SendFile {
            client_id,
            file_name,
            content,
        };
        request.header()?;
        Ok(request)
    }

    pub fn code(&self) -> RequestCode {
        match self {
            Request::Registration { .. } => RequestCode::Registration,
            Request::SendPublicKey { .. } => RequestCode::SendPublicKey,
            Request::Reconnect { .. } => RequestCode::Reconnect,
            Request::SendFile { .. } => RequestCode::SendFile,
            Request::ValidCrc { .. } => RequestCode::ValidCrc,
            Request::InvalidCrc { .. } => RequestCode::InvalidCrc,
            Request::FinalInvalidCrc { .. } => RequestCode::FinalInvalidCrc,
        }
    }

    /// Identity stamped into the header. Registration always sends zeroes.
    pub fn client_id(&self) -> ClientId {
        match self {
            Request::Registration { .. } => ClientId::UNASSIGNED,
            Request::SendPublicKey { client_id, .. }
            | Request::Reconnect { client_id, .. }
            | Request::SendFile { client_id, .. }
            | Request::ValidCrc { client_id, .. }
            | Request::InvalidCrc { client_id, .. }
            | Request::FinalInvalidCrc { client_id, .. } => *client_id,
        }
    }

    pub fn payload_size(&self) -> usize {
        match self {
            Request::SendPublicKey { .. } => SEND_PUBLIC_KEY_PAYLOAD_SIZE,
            Request::SendFile { content, .. } => SEND_FILE_PREFIX_SIZE.saturating_add(content.len()),
            _ => NAME_PAYLOAD_SIZE,
        }
    }

    /// Header for this request. Fails with `OversizedContent` when an upload
    /// is too large for the 32-bit size field.
    pub fn header(&self) -> Result<RequestHeader> {
        let content_len = match self {
            Request::SendFile { content, .. } => content.len(),
            _ => 0,
        };
        let size = size_field(self.payload_size(), content_len)?;
        Ok(RequestHeader::new(self.client_id(), self.code(), size))
    }

    /// Header followed by payload, unpadded.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let header = self.header()?;
        let mut buf = BytesMut::with_capacity(REQUEST_HEADER_SIZE + self.payload_size());
        header.write_to(&mut buf);

        match self {
            Request::Registration { name }
            | Request::Reconnect { name, .. }
            | Request::ValidCrc {
                file_name: name, ..
            }
            | Request::InvalidCrc {
                file_name: name, ..
            }
            | Request::FinalInvalidCrc {
                file_name: name, ..
            } => buf.put_slice(&name.to_wire()),
            Request::SendPublicKey {
                name, public_key, ..
            } => {
                buf.put_slice(&name.to_wire());
                buf.put_slice(public_key.as_bytes());
            }
            Request::SendFile {
                file_name, content, ..
            } => {
                // header() bounded the whole payload, so the content fits too
                buf.put_u32_le(header.payload_size - SEND_FILE_PREFIX_SIZE as u32);
                buf.put_slice(&file_name.to_wire());
                buf.put_slice(content);
            }
        }

        Ok(buf.to_vec())
    }

    /// Parse a request from its wire bytes. Trailing frame padding is ignored.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let header = RequestHeader::from_bytes(data)?;
        let code = RequestCode::from_u16(header.code)
            .ok_or(ProtocolError::UnknownRequestCode(header.code))?;
        let mut payload = &data[REQUEST_HEADER_SIZE..];
        let client_id = header.client_id;

        let request = match code {
            RequestCode::Registration => Request::Registration {
                name: read_name(&mut payload)?,
            },
            RequestCode::SendPublicKey => {
                let name = read_name(&mut payload)?;
                ensure_remaining(payload, PUBLIC_KEY_SIZE)?;
                let public_key = PublicKey::from_slice(&payload[..PUBLIC_KEY_SIZE])?;
                Request::SendPublicKey {
                    client_id,
                    name,
                    public_key,
                }
            }
            RequestCode::Reconnect => Request::Reconnect {
                client_id,
                name: read_name(&mut payload)?,
            },
            RequestCode::SendFile => {
                ensure_remaining(payload, SEND_FILE_PREFIX_SIZE)?;
                let content_size = payload.get_u32_le() as usize;
                let file_name = read_name(&mut payload)?;
                ensure_remaining(payload, content_size)?;
                Request::SendFile {
                    client_id,
                    file_name,
                    content: payload[..content_size].to_vec(),
                }
            }
            RequestCode::ValidCrc => Request::ValidCrc {
                client_id,
                file_name: read_name(&mut payload)?,
            },
            RequestCode::InvalidCrc => Request::InvalidCrc {
                client_id,
                file_name: read_name(&mut payload)?,
            },
            RequestCode::FinalInvalidCrc => Request::FinalInvalidCrc {
                client_id,
                file_name: read_name(&mut payload)?,
            },
        };

        Ok(request)
    }
}

/// Decoded body of a server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    RegistrationSuccess {
        client_id: ClientId,
    },
    RegistrationFailure,
    KeyExchange {
        client_id: ClientId,
        encrypted_key: Vec<u8>,
    },
    FileDelivered {
        client_id: ClientId,
        content_size: u32,
        file_name: Name,
        checksum: u32,
    },
    MessageDelivered {
        client_id: ClientId,
    },
    ReconnectionAccepted {
        client_id: ClientId,
        encrypted_key: Vec<u8>,
    },
    ReconnectionDenied {
        client_id: ClientId,
    },
    ServerError,
}

impl ResponsePayload {
    pub fn code(&self) -> ResponseCode {
        match self {
            ResponsePayload::RegistrationSuccess { .. } => ResponseCode::RegistrationSuccess,
            ResponsePayload::RegistrationFailure => ResponseCode::RegistrationFailure,
            ResponsePayload::KeyExchange { .. } => ResponseCode::KeyExchange,
            ResponsePayload::FileDelivered { .. } => ResponseCode::FileDeliveredWithCrc,
            ResponsePayload::MessageDelivered { .. } => ResponseCode::MessageDelivered,
            ResponsePayload::ReconnectionAccepted { .. } => ResponseCode::ReconnectionAccepted,
            ResponsePayload::ReconnectionDenied { .. } => ResponseCode::ReconnectionDenied,
            ResponsePayload::ServerError => ResponseCode::ServerError,
        }
    }

    /// Client identity echoed by the server, where the payload carries one.
    pub fn client_id(&self) -> Option<ClientId> {
        match self {
            ResponsePayload::RegistrationSuccess { client_id }
            | ResponsePayload::KeyExchange { client_id, .. }
            | ResponsePayload::FileDelivered { client_id, .. }
            | ResponsePayload::MessageDelivered { client_id }
            | ResponsePayload::ReconnectionAccepted { client_id, .. }
            | ResponsePayload::ReconnectionDenied { client_id } => Some(*client_id),
            ResponsePayload::RegistrationFailure | ResponsePayload::ServerError => None,
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            ResponsePayload::RegistrationFailure | ResponsePayload::ServerError => 0,
            ResponsePayload::RegistrationSuccess { .. }
            | ResponsePayload::MessageDelivered { .. }
            | ResponsePayload::ReconnectionDenied { .. } => CLIENT_ID_SIZE,
            ResponsePayload::KeyExchange { encrypted_key, .. }
            | ResponsePayload::ReconnectionAccepted { encrypted_key, .. } => {
                CLIENT_ID_SIZE + encrypted_key.len()
            }
            ResponsePayload::FileDelivered { .. } => FILE_DELIVERED_PAYLOAD_SIZE,
        }
    }

    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        match self {
            ResponsePayload::RegistrationFailure | ResponsePayload::ServerError => {}
            ResponsePayload::RegistrationSuccess { client_id }
            | ResponsePayload::MessageDelivered { client_id }
            | ResponsePayload::ReconnectionDenied { client_id } => {
                dst.put_slice(client_id.as_bytes());
            }
            ResponsePayload::KeyExchange {
                client_id,
                encrypted_key,
            }
            | ResponsePayload::ReconnectionAccepted {
                client_id,
                encrypted_key,
            } => {
                dst.put_slice(client_id.as_bytes());
                dst.put_slice(encrypted_key);
            }
            ResponsePayload::FileDelivered {
                client_id,
                content_size,
                file_name,
                checksum,
            } => {
                dst.put_slice(client_id.as_bytes());
                dst.put_u32_le(*content_size);
                dst.put_slice(&file_name.to_wire());
                dst.put_u32_le(*checksum);
            }
        }
    }

    /// Decode the payload of a response carrying `code`.
    ///
    /// `data` must hold exactly the declared payload; for the key-carrying
    /// responses everything past the client id is the encrypted key.
    pub fn decode(code: u16, data: &[u8]) -> Result<Self> {
        let code = ResponseCode::from_u16(code).ok_or(ProtocolError::UnknownResponseCode(code))?;
        let mut buf = data;

        let payload = match code {
            ResponseCode::RegistrationFailure => ResponsePayload::RegistrationFailure,
            ResponseCode::ServerError => ResponsePayload::ServerError,
            ResponseCode::RegistrationSuccess => ResponsePayload::RegistrationSuccess {
                client_id: read_client_id(&mut buf)?,
            },
            ResponseCode::MessageDelivered => ResponsePayload::MessageDelivered {
                client_id: read_client_id(&mut buf)?,
            },
            ResponseCode::ReconnectionDenied => ResponsePayload::ReconnectionDenied {
                client_id: read_client_id(&mut buf)?,
            },
            ResponseCode::KeyExchange => ResponsePayload::KeyExchange {
                client_id: read_client_id(&mut buf)?,
                encrypted_key: buf.to_vec(),
            },
            ResponseCode::ReconnectionAccepted => ResponsePayload::ReconnectionAccepted {
                client_id: read_client_id(&mut buf)?,
                encrypted_key: buf.to_vec(),
            },
            ResponseCode::FileDeliveredWithCrc => {
                ensure_remaining(buf, FILE_DELIVERED_PAYLOAD_SIZE)?;
                let client_id = read_client_id(&mut buf)?;
                let content_size = buf.get_u32_le();
                let file_name = read_name(&mut buf)?;
                let checksum = buf.get_u32_le();
                ResponsePayload::FileDelivered {
                    client_id,
                    content_size,
                    file_name,
                    checksum,
                }
            }
        };

        Ok(payload)
    }
}

/// A complete server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub header: ResponseHeader,
    pub payload: ResponsePayload,
}

impl Response {
    /// Wrap `payload` in a header with the matching code and size.
    pub fn new(payload: ResponsePayload) -> Self {
        let size = u32::try_from(payload.encoded_len()).unwrap_or(u32::MAX);
        Self {
            header: ResponseHeader::new(payload.code(), size),
            payload,
        }
    }

    pub fn code(&self) -> ResponseCode {
        self.payload.code()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_SIZE + self.payload.encoded_len());
        self.header.write_to(&mut buf);
        self.payload.write_to(&mut buf);
        buf.to_vec()
    }

    /// Decode header and payload from `data`, which may carry frame padding.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let header = ResponseHeader::from_bytes(data)?;
        let payload = decode_declared_payload(&header, &data[RESPONSE_HEADER_SIZE..])?;
        Ok(Self { header, payload })
    }
}

/// Decode the payload following an already-parsed header.
///
/// Only the `payload_size` bytes the header declares are consumed.
pub fn decode_declared_payload(header: &ResponseHeader, body: &[u8]) -> Result<ResponsePayload> {
    let declared = header.payload_size as usize;
    ensure_remaining(body, declared)?;
    ResponsePayload::decode(header.code, &body[..declared])
}

/// Full wire length of the response `header` announces.
///
/// Fails with `OversizedResponse` when the declared payload exceeds
/// [`MAX_RESPONSE_PAYLOAD_SIZE`].
pub fn response_len(header: &ResponseHeader) -> Result<usize> {
    let declared = header.payload_size as usize;
    if declared > MAX_RESPONSE_PAYLOAD_SIZE {
        return Err(ProtocolError::OversizedResponse {
            declared: header.payload_size,
            max: MAX_RESPONSE_PAYLOAD_SIZE,
        });
    }
    Ok(RESPONSE_HEADER_SIZE + declared)
}

fn size_field(payload_len: usize, content_len: usize) -> Result<u32> {
    u32::try_from(payload_len).map_err(|_| ProtocolError::OversizedContent(content_len))
}

fn ensure_remaining(buf: &[u8], need: usize) -> Result<()> {
    if buf.len() < need {
        return Err(ProtocolError::TruncatedPayload {
            need,
            have: buf.len(),
        });
    }
    Ok(())
}

fn read_client_id(buf: &mut &[u8]) -> Result<ClientId> {
    ensure_remaining(buf, CLIENT_ID_SIZE)?;
    let mut id = [0u8; CLIENT_ID_SIZE];
    buf.copy_to_slice(&mut id);
    Ok(ClientId::from_bytes(id))
}

fn read_name(buf: &mut &[u8]) -> Result<Name> {
    ensure_remaining(buf, NAME_SIZE)?;
    let mut field = [0u8; NAME_SIZE];
    buf.copy_to_slice(&mut field);
    Ok(Name::from_wire(&field))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn cid(byte: u8) -> ClientId {
        ClientId::from_bytes([byte; CLIENT_ID_SIZE])
    }

    #[test]
    fn test_registration_request_bytes() {
        let request = Request::Registration {
            name: Name::new("alice1").unwrap(),
        };
        let bytes = request.encode().unwrap();
        assert_eq!(bytes.len(), REQUEST_HEADER_SIZE + NAME_SIZE);
        assert!(bytes[..16].iter().all(|&b| b == 0));
        assert_eq!(bytes[16], 3);
        assert_eq!(&bytes[17..19], &1100u16.to_le_bytes());
        assert_eq!(&bytes[19..23], &255u32.to_le_bytes());
        assert_eq!(&bytes[23..29], b"alice1");
        assert!(bytes[29..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_send_file_layout() {
        let request = Request::send_file(
            cid(0x42),
            Name::new("a.txt").unwrap(),
            vec![0xEE; 32],
        )
        .unwrap();
        let bytes = request.encode().unwrap();
        assert_eq!(bytes.len(), REQUEST_HEADER_SIZE + SEND_FILE_PREFIX_SIZE + 32);
        assert_eq!(&bytes[19..23], &(259u32 + 32).to_le_bytes());
        assert_eq!(&bytes[23..27], &32u32.to_le_bytes());
        assert_eq!(&bytes[27..32], b"a.txt");
        assert_eq!(&bytes[REQUEST_HEADER_SIZE + SEND_FILE_PREFIX_SIZE..], &[0xEE; 32]);
        assert_eq!(Request::decode(&bytes).unwrap(), request);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_size_field_rejects_payloads_past_u32() {
        assert_eq!(size_field(u32::MAX as usize, 7).unwrap(), u32::MAX);
        assert!(matches!(
            size_field(u32::MAX as usize + 1, 4_294_967_037),
            Err(ProtocolError::OversizedContent(4_294_967_037))
        ));
    }

    #[test]
    fn test_request_decode_ignores_padding() {
        let request = Request::InvalidCrc {
            client_id: cid(9),
            file_name: Name::new("f").unwrap(),
        };
        let mut bytes = request.encode().unwrap();
        bytes.resize(1024, 0);
        assert_eq!(Request::decode(&bytes).unwrap(), request);
    }

    #[test]
    fn test_request_decode_unknown_code() {
        let mut bytes = Request::Registration {
            name: Name::new("x").unwrap(),
        }
        .encode()
        .unwrap();
        bytes[17..19].copy_from_slice(&1999u16.to_le_bytes());
        assert!(matches!(
            Request::decode(&bytes),
            Err(ProtocolError::UnknownRequestCode(1999))
        ));
    }

    #[test]
    fn test_key_exchange_takes_remaining_bytes() {
        let mut body = cid(7).as_bytes().to_vec();
        body.extend_from_slice(&[0x5A; 128]);
        let payload = ResponsePayload::decode(2102, &body).unwrap();
        match payload {
            ResponsePayload::KeyExchange {
                client_id,
                encrypted_key,
            } => {
                assert_eq!(client_id, cid(7));
                assert_eq!(encrypted_key.len(), 128);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_file_delivered_decode() {
        let response = Response::new(ResponsePayload::FileDelivered {
            client_id: cid(1),
            content_size: 48,
            file_name: Name::new("notes.txt").unwrap(),
            checksum: 0xDEADBEEF,
        });
        let bytes = response.encode();
        assert_eq!(bytes.len(), RESPONSE_HEADER_SIZE + 279);
        assert_eq!(&bytes[bytes.len() - 4..], &0xDEADBEEFu32.to_le_bytes());

        let mut padded = bytes.clone();
        padded.resize(1024, 0);
        assert_eq!(Response::decode(&padded).unwrap(), response);
    }

    #[test]
    fn test_truncated_payload() {
        let header = ResponseHeader::new(ResponseCode::FileDeliveredWithCrc, 279);
        let mut bytes = header.to_bytes();
        bytes.extend_from_slice(&[0u8; 100]);
        assert!(matches!(
            Response::decode(&bytes),
            Err(ProtocolError::TruncatedPayload { need: 279, have: 100 })
        ));
    }

    #[test]
    fn test_unknown_response_code() {
        assert!(matches!(
            ResponsePayload::decode(2200, &[]),
            Err(ProtocolError::UnknownResponseCode(2200))
        ));
    }

    #[test]
    fn test_empty_payload_responses() {
        let failure = Response::new(ResponsePayload::RegistrationFailure);
        assert_eq!(failure.encode().len(), RESPONSE_HEADER_SIZE);
        assert_eq!(failure.header.payload_size, 0);
        assert_eq!(ResponsePayload::ServerError.client_id(), None);
    }

    #[test]
    fn test_response_len_follows_declared_size() {
        let key_exchange = ResponseHeader::new(ResponseCode::KeyExchange, 272);
        assert_eq!(response_len(&key_exchange).unwrap(), 279);

        let delivered = ResponseHeader::new(ResponseCode::FileDeliveredWithCrc, 279);
        assert_eq!(response_len(&delivered).unwrap(), 286);

        let huge = ResponseHeader::new(ResponseCode::KeyExchange, u32::MAX);
        assert!(matches!(
            response_len(&huge),
            Err(ProtocolError::OversizedResponse { declared: u32::MAX, .. })
        ));
    }
}
