// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-crate invariants: canonical frame encoding, path ordering, and
//! codec round-trips through the public APIs.

use mote_coap::{Message, MsgType, Options, Token};
use mote_core::{ContentFormat, Value};
use mote_codec::{decoder_for, encoder_for, Record};
use proptest::prelude::*;

use crate::prelude::*;

#[test]
fn canonical_encoding_is_a_fixed_point() {
    let mut msg = Message::new(
        MsgType::Confirmable,
        Code::GET,
        0x1234,
        Token::from_slice(&[1, 2, 3]).unwrap(),
    );
    msg.push_uri_path("3");
    msg.push_uri_path("0");
    msg.set_accept(ContentFormat::SenmlCbor);

    let wire = msg.encode();
    let redecoded = Message::decode(&wire).unwrap();
    assert_eq!(redecoded.encode(), wire);
    assert_eq!(redecoded, msg);
}

proptest! {
    /// decode(encode(decode(F))) equals decode(F) for frames we emit.
    #[test]
    fn frame_roundtrip(
        message_id in any::<u16>(),
        token_bytes in prop::collection::vec(any::<u8>(), 0..=8),
        segments in prop::collection::vec("[a-z0-9]{1,6}", 0..4),
        payload in prop::collection::vec(any::<u8>(), 0..48),
    ) {
        let mut msg = Message::new(
            MsgType::Confirmable,
            Code::POST,
            message_id,
            Token::from_slice(&token_bytes).unwrap(),
        );
        for segment in &segments {
            msg.push_uri_path(segment);
        }
        msg.payload = payload;

        let wire = msg.encode();
        let decoded = Message::decode(&wire).unwrap();
        prop_assert_eq!(decoded.encode(), wire);
    }

    /// Prefix paths order before their extensions; disjoint paths order
    /// by ids.
    #[test]
    fn path_ordering(
        a in prop::collection::vec(0u16..100, 0..=4),
        b in prop::collection::vec(0u16..100, 0..=4),
    ) {
        let pa = Path::from_ids(&a).unwrap();
        let pb = Path::from_ids(&b).unwrap();
        prop_assert_eq!(pa.cmp(&pb), a.cmp(&b));
        if pb.starts_with(&pa) {
            prop_assert!(pa <= pb);
        }
    }

    /// Entries written at a base path read back identically.
    #[test]
    fn senml_codec_roundtrip(values in prop::collection::vec(any::<i64>(), 1..8)) {
        let base = Path::instance(3, 0);
        let records: Vec<Record> = values
            .iter()
            .enumerate()
            .map(|(i, v)| Record::new(Path::resource(3, 0, i as u16), Value::Int(*v)))
            .collect();

        let mut encoder = encoder_for(ContentFormat::SenmlCbor, base, records.len()).unwrap();
        for record in &records {
            encoder.add(record).unwrap();
        }
        encoder.finish().unwrap();
        let wire = std::mem::take(encoder.output_mut());

        let read = decoder_for(112, base, None).unwrap().read_all(&wire).unwrap();
        prop_assert_eq!(read.len(), records.len());
        for (got, want) in read.iter().zip(&records) {
            prop_assert_eq!(got.path, want.path);
            let matches = match (&got.value, &want.value) {
                (Value::Int(a), Value::Int(b)) => a == b,
                (Value::Uint(a), Value::Int(b)) => *b >= 0 && *a == *b as u64,
                _ => false,
            };
            prop_assert!(matches, "value mismatch: {:?} vs {:?}", got.value, want.value);
        }
    }
}

#[test]
fn options_decode_tolerates_only_defined_repeats() {
    // two ETag options are fine
    let mut options = Options::new();
    options.push(mote_coap::opt::ETAG, vec![1]);
    options.push(mote_coap::opt::ETAG, vec![2]);
    let mut wire = Vec::new();
    options.encode(&mut wire);
    assert!(Options::decode(&wire).is_ok());

    // two Accept options (critical, not repeatable) are not
    let wire = [0xd0u8, 0x04, 0x00]; // Accept(17), then repeat delta 0
    assert!(Options::decode(&wire).is_err());
}
