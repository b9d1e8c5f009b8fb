//! Unit tests for the RADIUS packet codec

use md5::{Digest, Md5};

use crate::backends::radius::{decode_response, encode_access_request, hide_password};

const SECRET: &[u8] = b"s3cr3t";
const AUTHENTICATOR: [u8; 16] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10,
];

/// Reverse the RFC 2865 hiding to recover the padded password
fn unhide(secret: &[u8], authenticator: &[u8; 16], hidden: &[u8]) -> Vec<u8> {
    let mut recovered = Vec::with_capacity(hidden.len());
    let mut chain: Vec<u8> = authenticator.to_vec();
    for block in hidden.chunks(16) {
        let mut hasher = Md5::new();
        hasher.update(secret);
        hasher.update(&chain);
        let mask = hasher.finalize();
        recovered.extend(block.iter().zip(mask.iter()).map(|(c, m)| c ^ m));
        chain = block.to_vec();
    }
    recovered
}

#[test]
fn hidden_password_recovers_after_unhiding() {
    for password in ["pw", "exactly-16-bytes", "a-password-longer-than-one-block"] {
        let hidden = hide_password(SECRET, &AUTHENTICATOR, password.as_bytes()).unwrap();
        assert_eq!(hidden.len() % 16, 0);
        let recovered = unhide(SECRET, &AUTHENTICATOR, &hidden);
        assert_eq!(&recovered[..password.len()], password.as_bytes());
        // padding is zeros
        assert!(recovered[password.len()..].iter().all(|b| *b == 0));
    }
}

#[test]
fn empty_password_still_fills_one_block() {
    let hidden = hide_password(SECRET, &AUTHENTICATOR, b"").unwrap();
    assert_eq!(hidden.len(), 16);
}

#[test]
fn oversized_password_is_rejected() {
    let long = vec![b'x'; 129];
    assert!(hide_password(SECRET, &AUTHENTICATOR, &long).is_err());
}

#[test]
fn access_request_layout() {
    let hidden = hide_password(SECRET, &AUTHENTICATOR, b"pw").unwrap();
    let packet = encode_access_request(42, &AUTHENTICATOR, "test.com/jeff", &hidden);

    assert_eq!(packet[0], 1); // Access-Request
    assert_eq!(packet[1], 42);
    let length = u16::from_be_bytes([packet[2], packet[3]]) as usize;
    assert_eq!(length, packet.len());
    assert_eq!(&packet[4..20], &AUTHENTICATOR);

    // first attribute: User-Name
    assert_eq!(packet[20], 1);
    let name_len = packet[21] as usize;
    assert_eq!(&packet[22..20 + name_len], b"test.com/jeff");
}

fn build_response(code: u8, identifier: u8, request_auth: &[u8; 16], secret: &[u8]) -> Vec<u8> {
    let mut packet = vec![code, identifier, 0, 20];
    let mut hasher = Md5::new();
    hasher.update(&packet[0..4]);
    hasher.update(request_auth);
    hasher.update(secret);
    packet.extend_from_slice(&hasher.finalize());
    packet
}

#[test]
fn valid_responses_decode() {
    let accept = build_response(2, 7, &AUTHENTICATOR, SECRET);
    assert_eq!(decode_response(&accept, 7, &AUTHENTICATOR, SECRET).unwrap(), 2);

    let reject = build_response(3, 7, &AUTHENTICATOR, SECRET);
    assert_eq!(decode_response(&reject, 7, &AUTHENTICATOR, SECRET).unwrap(), 3);
}

#[test]
fn mismatched_identifier_is_rejected() {
    let response = build_response(2, 7, &AUTHENTICATOR, SECRET);
    assert!(decode_response(&response, 8, &AUTHENTICATOR, SECRET).is_err());
}

#[test]
fn tampered_authenticator_is_rejected() {
    let mut response = build_response(2, 7, &AUTHENTICATOR, SECRET);
    response[4] ^= 0xff;
    assert!(decode_response(&response, 7, &AUTHENTICATOR, SECRET).is_err());
}

#[test]
fn wrong_secret_is_rejected() {
    let response = build_response(2, 7, &AUTHENTICATOR, b"other-secret");
    assert!(decode_response(&response, 7, &AUTHENTICATOR, SECRET).is_err());
}

#[test]
fn truncated_response_is_rejected() {
    let response = build_response(2, 7, &AUTHENTICATOR, SECRET);
    assert!(decode_response(&response[..10], 7, &AUTHENTICATOR, SECRET).is_err());
}
