// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests: canonical frame encoding is a fixed point of
//! decode ∘ encode.

use proptest::prelude::*;

use crate::code::Code;
use crate::msg::{Message, MsgType, Token};
use crate::option::{opt, Options};

fn msg_type_strategy() -> impl Strategy<Value = MsgType> {
    prop_oneof![
        Just(MsgType::Confirmable),
        Just(MsgType::NonConfirmable),
        Just(MsgType::Acknowledgement),
        Just(MsgType::Reset),
    ]
}

fn code_strategy() -> impl Strategy<Value = Code> {
    prop_oneof![
        Just(Code::GET),
        Just(Code::POST),
        Just(Code::PUT),
        Just(Code::DELETE),
        Just(Code::FETCH),
        Just(Code::IPATCH),
        Just(Code::CONTENT),
        Just(Code::CHANGED),
        Just(Code::NOT_FOUND),
        Just(Code::INTERNAL_SERVER_ERROR),
    ]
}

fn token_strategy() -> impl Strategy<Value = Token> {
    prop::collection::vec(any::<u8>(), 0..=8)
        .prop_map(|bytes| Token::from_slice(&bytes).unwrap())
}

fn options_strategy() -> impl Strategy<Value = Options> {
    let entry = prop_oneof![
        "[a-z0-9]{0,8}".prop_map(|s| (opt::URI_PATH, s.into_bytes())),
        "[a-z]{1,4}=[0-9]{1,4}".prop_map(|s| (opt::URI_QUERY, s.into_bytes())),
        (0u64..=11544).prop_map(|n| {
            let mut options = Options::new();
            options.push_uint(opt::CONTENT_FORMAT, n);
            (opt::CONTENT_FORMAT, options.first(opt::CONTENT_FORMAT).unwrap_or_default().to_vec())
        }),
        prop::collection::vec(any::<u8>(), 1..=8).prop_map(|v| (opt::ETAG, v)),
        (0u64..=0xffffff).prop_map(|n| {
            let mut options = Options::new();
            options.push_uint(opt::OBSERVE, n);
            (opt::OBSERVE, options.first(opt::OBSERVE).unwrap_or_default().to_vec())
        }),
    ];
    prop::collection::vec(entry, 0..6).prop_map(|entries| {
        let mut options = Options::new();
        let mut seen_singletons = Vec::new();
        for (number, value) in entries {
            // Keep generated streams legal: non-repeatable numbers once.
            if !crate::option::is_repeatable(number) {
                if seen_singletons.contains(&number) {
                    continue;
                }
                seen_singletons.push(number);
            }
            options.push(number, value);
        }
        options
    })
}

fn message_strategy() -> impl Strategy<Value = Message> {
    (
        msg_type_strategy(),
        code_strategy(),
        any::<u16>(),
        token_strategy(),
        options_strategy(),
        prop::collection::vec(any::<u8>(), 0..64),
    )
        .prop_map(|(kind, code, message_id, token, options, payload)| Message {
            kind,
            code,
            message_id,
            token,
            options,
            payload,
        })
}

proptest! {
    /// decode(encode(m)) == m for any well-formed message.
    #[test]
    fn encode_decode_roundtrip(msg in message_strategy()) {
        let wire = msg.encode();
        let decoded = Message::decode(&wire).unwrap();
        prop_assert_eq!(decoded, msg);
    }

    /// Canonical encoding is a fixed point: re-encoding a decoded frame
    /// reproduces the same bytes.
    #[test]
    fn encoding_is_canonical(msg in message_strategy()) {
        let wire = msg.encode();
        let reencoded = Message::decode(&wire).unwrap().encode();
        prop_assert_eq!(reencoded, wire);
    }

    /// The decoder never panics on arbitrary input.
    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let _ = Message::decode(&bytes);
    }
}
