//! Response validation rules across the full code table.

#![allow(clippy::unwrap_used)]

use secure_transfer::core::packet::{ResponseCode, ResponseHeader};
use secure_transfer::error::ProtocolError;
use secure_transfer::protocol::validator::{expected_payload_size, is_permitted_substitute, validate};

const ALL_CODES: [ResponseCode; 8] = [
    ResponseCode::RegistrationSuccess,
    ResponseCode::RegistrationFailure,
    ResponseCode::KeyExchange,
    ResponseCode::FileDeliveredWithCrc,
    ResponseCode::MessageDelivered,
    ResponseCode::ReconnectionAccepted,
    ResponseCode::ReconnectionDenied,
    ResponseCode::ServerError,
];

fn header_with_size(code: ResponseCode) -> ResponseHeader {
    let size = expected_payload_size(code).unwrap_or(16 + 128);
    ResponseHeader::new(code, size)
}

#[test]
fn test_size_table() {
    assert_eq!(expected_payload_size(ResponseCode::RegistrationSuccess), Some(16));
    assert_eq!(expected_payload_size(ResponseCode::RegistrationFailure), Some(0));
    assert_eq!(expected_payload_size(ResponseCode::KeyExchange), None);
    assert_eq!(expected_payload_size(ResponseCode::FileDeliveredWithCrc), Some(279));
    assert_eq!(expected_payload_size(ResponseCode::MessageDelivered), Some(16));
    assert_eq!(expected_payload_size(ResponseCode::ReconnectionAccepted), None);
    assert_eq!(expected_payload_size(ResponseCode::ReconnectionDenied), Some(16));
    assert_eq!(expected_payload_size(ResponseCode::ServerError), Some(0));
}

#[test]
fn test_only_two_substitutions_exist() {
    let mut permitted = Vec::new();
    for expected in ALL_CODES {
        for got in ALL_CODES {
            if expected != got && is_permitted_substitute(expected, got.as_u16()) {
                permitted.push((expected, got));
            }
        }
    }
    assert_eq!(
        permitted,
        vec![
            (ResponseCode::RegistrationSuccess, ResponseCode::RegistrationFailure),
            (ResponseCode::ReconnectionAccepted, ResponseCode::ReconnectionDenied),
        ]
    );
}

#[test]
fn test_every_mismatch_outside_substitutions_fails() {
    for expected in ALL_CODES {
        for got in ALL_CODES {
            let result = validate(&header_with_size(got), expected);
            if got == ResponseCode::ServerError {
                assert!(matches!(result, Err(ProtocolError::ServerError)));
            } else if got == expected || is_permitted_substitute(expected, got.as_u16()) {
                assert!(result.is_ok(), "{expected:?} <- {got:?}");
            } else {
                assert!(
                    matches!(result, Err(ProtocolError::UnexpectedResponseCode { .. })),
                    "{expected:?} <- {got:?}"
                );
            }
        }
    }
}

#[test]
fn test_unknown_code_is_unexpected() {
    let header = ResponseHeader {
        version: 3,
        code: 2999,
        payload_size: 0,
    };
    assert!(matches!(
        validate(&header, ResponseCode::MessageDelivered),
        Err(ProtocolError::UnexpectedResponseCode {
            expected: 2104,
            got: 2999
        })
    ));
}

#[test]
fn test_fixed_sizes_enforced() {
    let header = ResponseHeader::new(ResponseCode::FileDeliveredWithCrc, 278);
    assert!(matches!(
        validate(&header, ResponseCode::FileDeliveredWithCrc),
        Err(ProtocolError::PayloadSizeMismatch {
            code: 2103,
            expected: 279,
            declared: 278
        })
    ));

    let header = ResponseHeader::new(ResponseCode::RegistrationFailure, 16);
    assert!(matches!(
        validate(&header, ResponseCode::RegistrationSuccess),
        Err(ProtocolError::PayloadSizeMismatch { .. })
    ));
}
