//! Response header validation.
//!
//! Runs on the decoded header before any payload is interpreted. The rules,
//! in order:
//!
//! 1. A `ServerError` code always fails.
//! 2. The code must match the expected one, except that a registration may be
//!    answered by `RegistrationFailure` and a reconnection by
//!    `ReconnectionDenied`.
//! 3. The declared payload size must match the fixed size of the received
//!    code. Key-carrying responses are variable and unmodeled codes are let
//!    through to the payload decoder.

use tracing::warn;

use crate::config::PROTOCOL_VERSION;
use crate::core::packet::{ResponseCode, ResponseHeader};
use crate::core::types::CLIENT_ID_SIZE;
use crate::error::{ProtocolError, Result};
use crate::protocol::message::FILE_DELIVERED_PAYLOAD_SIZE;

/// Fixed payload size for `code`, or `None` when the size varies.
pub fn expected_payload_size(code: ResponseCode) -> Option<u32> {
    let size = match code {
        ResponseCode::RegistrationSuccess
        | ResponseCode::MessageDelivered
        | ResponseCode::ReconnectionDenied => CLIENT_ID_SIZE,
        ResponseCode::FileDeliveredWithCrc => FILE_DELIVERED_PAYLOAD_SIZE,
        ResponseCode::RegistrationFailure | ResponseCode::ServerError => 0,
        ResponseCode::KeyExchange | ResponseCode::ReconnectionAccepted => return None,
    };
    Some(size as u32)
}

/// Whether `got` is an acceptable answer to a request expecting `expected`.
pub fn is_permitted_substitute(expected: ResponseCode, got: u16) -> bool {
    matches!(
        (expected, ResponseCode::from_u16(got)),
        (
            ResponseCode::RegistrationSuccess,
            Some(ResponseCode::RegistrationFailure)
        ) | (
            ResponseCode::ReconnectionAccepted,
            Some(ResponseCode::ReconnectionDenied)
        )
    )
}

/// Check `header` against the response the caller is waiting for.
pub fn validate(header: &ResponseHeader, expected: ResponseCode) -> Result<()> {
    if header.code == ResponseCode::ServerError.as_u16() {
        return Err(ProtocolError::ServerError);
    }

    if header.code != expected.as_u16() && !is_permitted_substitute(expected, header.code) {
        return Err(ProtocolError::UnexpectedResponseCode {
            expected: expected.as_u16(),
            got: header.code,
        });
    }

    if header.version != PROTOCOL_VERSION {
        warn!(
            version = header.version,
            expected = PROTOCOL_VERSION,
            code = header.code,
            "Response carries a different protocol version"
        );
    }

    let fixed = header.response_code().and_then(expected_payload_size);
    if let Some(size) = fixed {
        if header.payload_size != size {
            return Err(ProtocolError::PayloadSizeMismatch {
                code: header.code,
                expected: size,
                declared: header.payload_size,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(code: ResponseCode, size: u32) -> ResponseHeader {
        ResponseHeader::new(code, size)
    }

    #[test]
    fn test_matching_code_and_size() {
        assert!(validate(
            &header(ResponseCode::RegistrationSuccess, 16),
            ResponseCode::RegistrationSuccess
        )
        .is_ok());
        assert!(validate(
            &header(ResponseCode::FileDeliveredWithCrc, 279),
            ResponseCode::FileDeliveredWithCrc
        )
        .is_ok());
    }

    #[test]
    fn test_server_error_wins() {
        for expected in [
            ResponseCode::RegistrationSuccess,
            ResponseCode::KeyExchange,
            ResponseCode::MessageDelivered,
        ] {
            assert!(matches!(
                validate(&header(ResponseCode::ServerError, 0), expected),
                Err(ProtocolError::ServerError)
            ));
        }
    }

    #[test]
    fn test_substitutions() {
        assert!(validate(
            &header(ResponseCode::RegistrationFailure, 0),
            ResponseCode::RegistrationSuccess
        )
        .is_ok());
        assert!(validate(
            &header(ResponseCode::ReconnectionDenied, 16),
            ResponseCode::ReconnectionAccepted
        )
        .is_ok());
        assert!(matches!(
            validate(
                &header(ResponseCode::RegistrationFailure, 0),
                ResponseCode::KeyExchange
            ),
            Err(ProtocolError::UnexpectedResponseCode {
                expected: 2102,
                got: 2101
            })
        ));
    }

    #[test]
    fn test_size_checked_against_received_code() {
        assert!(matches!(
            validate(
                &header(ResponseCode::ReconnectionDenied, 0),
                ResponseCode::ReconnectionAccepted
            ),
            Err(ProtocolError::PayloadSizeMismatch {
                code: 2106,
                expected: 16,
                declared: 0
            })
        ));
    }

    #[test]
    fn test_variable_sizes_trusted() {
        for size in [16, 144, 176, 400] {
            assert!(validate(
                &header(ResponseCode::KeyExchange, size),
                ResponseCode::KeyExchange
            )
            .is_ok());
        }
    }

    #[test]
    fn test_version_mismatch_is_tolerated() {
        let mut h = header(ResponseCode::MessageDelivered, 16);
        h.version = 2;
        assert!(validate(&h, ResponseCode::MessageDelivered).is_ok());
    }
}
