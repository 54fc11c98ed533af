// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Option stream encoding, decoding and policy tests.

use super::*;

#[test]
fn push_keeps_numbers_sorted() {
    let mut options = Options::new();
    options.push_uint(opt::CONTENT_FORMAT, 40);
    options.push_str(opt::URI_PATH, "rd");
    options.push_uint(opt::OBSERVE, 0);

    let numbers: Vec<u16> = options.iter().map(|(n, _)| n).collect();
    assert_eq!(numbers, vec![opt::OBSERVE, opt::URI_PATH, opt::CONTENT_FORMAT]);
}

#[test]
fn repeated_options_keep_insertion_order() {
    let mut options = Options::new();
    options.push_str(opt::URI_PATH, "rd");
    options.push_str(opt::URI_PATH, "5a3f");

    let segments: Vec<&[u8]> = options.all(opt::URI_PATH).collect();
    assert_eq!(segments, vec![b"rd".as_slice(), b"5a3f".as_slice()]);
}

#[test]
fn uint_encoding_is_shortest_form() {
    let mut options = Options::new();
    options.push_uint(opt::CONTENT_FORMAT, 0);
    assert_eq!(options.first(opt::CONTENT_FORMAT), Some(&[][..]));

    let mut options = Options::new();
    options.push_uint(opt::CONTENT_FORMAT, 60);
    assert_eq!(options.first(opt::CONTENT_FORMAT), Some(&[60u8][..]));

    let mut options = Options::new();
    options.push_uint(opt::ACCEPT, 11544);
    assert_eq!(options.first(opt::ACCEPT), Some(&[0x2d, 0x18][..]));
}

#[test]
fn encode_decode_roundtrip() {
    let mut options = Options::new();
    options.push_str(opt::URI_PATH, "rd");
    options.push_str(opt::URI_QUERY, "ep=name");
    options.push_uint(opt::CONTENT_FORMAT, 40);
    options.push_uint(opt::BLOCK2, 0x1e);

    let mut wire = Vec::new();
    options.encode(&mut wire);

    let (decoded, consumed) = Options::decode(&wire).unwrap();
    assert_eq!(consumed, wire.len());
    assert_eq!(decoded, options);
}

#[test]
fn decode_handles_extended_deltas() {
    // Size1 (60) needs a 13+ext delta from zero; a large value needs an
    // extended length too.
    let mut options = Options::new();
    options.push_uint(opt::SIZE1, 4096);
    options.push(opt::URI_PATH, vec![b'x'; 300]);

    let mut wire = Vec::new();
    options.encode(&mut wire);
    let (decoded, _) = Options::decode(&wire).unwrap();
    assert_eq!(decoded.uint(opt::SIZE1).unwrap(), Some(4096));
    assert_eq!(decoded.first(opt::URI_PATH).map(<[u8]>::len), Some(300));
}

#[test]
fn unknown_critical_option_rejected() {
    // Option 9 is critical (odd) and not in the known set.
    let wire = [0x90u8]; // delta 9, length 0
    assert_eq!(
        Options::decode(&wire),
        Err(CoapError::UnrecognizedCriticalOption { number: 9 })
    );
}

#[test]
fn unknown_elective_option_skipped() {
    // Option 2 is elective (even) and unknown: skipped, stream continues.
    let mut wire = vec![0x20u8]; // delta 2, length 0
    wire.push(0x91); // delta 9 from 2 = Uri-Path (11), length 1
    wire.push(b'3');

    let (decoded, _) = Options::decode(&wire).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded.first(opt::URI_PATH), Some(&b"3"[..]));
}

#[test]
fn repeated_nonrepeatable_critical_rejected() {
    // Two Uri-Host options (3, critical, not repeatable).
    let wire = [0x31u8, b'a', 0x01, b'b'];
    assert_eq!(
        Options::decode(&wire),
        Err(CoapError::UnrecognizedCriticalOption { number: opt::URI_HOST })
    );
}

#[test]
fn repeated_nonrepeatable_elective_skipped() {
    // Two Content-Format options (12, elective): second one is dropped.
    let wire = [0xc1u8, 0x00, 0x01, 0x3c];
    let (decoded, _) = Options::decode(&wire).unwrap();
    assert_eq!(decoded.all(opt::CONTENT_FORMAT).count(), 1);
    assert_eq!(decoded.uint(opt::CONTENT_FORMAT).unwrap(), Some(0));
}

#[test]
fn truncated_value_is_exceed_buffer() {
    let wire = [0xb5u8, b'r']; // Uri-Path declaring 5 bytes, 1 present
    assert_eq!(Options::decode(&wire), Err(CoapError::OptionsExceedBuffer));
}

#[test]
fn reserved_nibble_is_malformed() {
    let wire = [0xf0u8, 0x00];
    assert!(matches!(Options::decode(&wire), Err(CoapError::Malformed(_))));
}

#[test]
fn decode_stops_at_payload_marker() {
    let mut options = Options::new();
    options.push_str(opt::URI_PATH, "3");
    let mut wire = Vec::new();
    options.encode(&mut wire);
    let option_len = wire.len();
    wire.push(0xff);
    wire.extend_from_slice(b"payload");

    let (decoded, consumed) = Options::decode(&wire).unwrap();
    assert_eq!(consumed, option_len);
    assert_eq!(decoded.len(), 1);
}

#[test]
fn uint_rejects_overlong_values() {
    let mut options = Options::new();
    options.push(opt::MAX_AGE, vec![0u8; 9]);
    assert!(options.uint(opt::MAX_AGE).is_err());
}
