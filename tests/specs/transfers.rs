// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Block transfer specs: a 64-byte-block read of a payload larger than
//! two blocks arrives in order and reassembles exactly.

use mote_core::{ContentFormat, Value};

use crate::prelude::*;

#[test]
fn block2_read_paginates_in_64_byte_blocks() {
    let mut harness = harness();
    // fatten the device object so the SenML payload clears 128 bytes
    {
        let registry = harness.client.registry_mut();
        let handler = registry.handler_mut(3).unwrap();
        handler
            .write_unrestricted(0, 0, None, Value::text("m".repeat(180)))
            .unwrap();
    }

    let mut msg = request(Code::GET, 60, &[0xd0], &["3"]);
    msg.set_accept(ContentFormat::SenmlCbor);
    msg.set_block(Block::new(BlockKind::Block2, 0, false, 64).unwrap());
    let server = harness.server;
    let first = harness.exchange(server, msg);

    assert_eq!(first.code, Code::CONTENT);
    let block = first.block2().unwrap().unwrap();
    assert_eq!((block.number, block.more, block.size), (0, true, 64));
    assert_eq!(first.payload.len(), 64);
    assert_eq!(first.token.as_slice(), &[0xd0]);

    let mut assembled = first.payload.clone();
    let mut number = 1u32;
    loop {
        let mut msg = request(Code::GET, 60 + number as u16, &[0xd0], &["3"]);
        msg.set_accept(ContentFormat::SenmlCbor);
        msg.set_block(Block::new(BlockKind::Block2, number, false, 64).unwrap());
        let reply = harness.exchange(server, msg);
        assert_eq!(reply.code, Code::CONTENT);
        assert_eq!(reply.token.as_slice(), &[0xd0]);
        let block = reply.block2().unwrap().unwrap();
        assert_eq!(block.number, number);
        assembled.extend_from_slice(&reply.payload);
        if !block.more {
            break;
        }
        number += 1;
    }
    assert!(number >= 2, "payload should span at least three blocks");

    // the concatenation equals an unpaginated read
    let mut whole = request(Code::GET, 90, &[0xd1], &["3"]);
    whole.set_accept(ContentFormat::SenmlCbor);
    let reply = harness.exchange(server, whole);
    assert!(reply.block2().unwrap().is_none());
    assert_eq!(assembled, reply.payload);
}

#[test]
fn block1_reassembly_enforces_sequence() {
    let mut harness = harness();
    let server = harness.server;

    let mut first = request(Code::PUT, 70, &[0xd2], &["1", "0", "1"]);
    first.set_content_format(ContentFormat::PlainText);
    first.set_block(Block::new(BlockKind::Block1, 0, true, 16).unwrap());
    first.payload = b"4200".to_vec();
    let reply = harness.exchange(server, first);
    assert_eq!(reply.code, Code::CONTINUE);

    // skipping block 1 breaks the sequence
    let mut wrong = request(Code::PUT, 71, &[0xd2], &["1", "0", "1"]);
    wrong.set_content_format(ContentFormat::PlainText);
    wrong.set_block(Block::new(BlockKind::Block1, 2, true, 16).unwrap());
    wrong.payload = b"00".to_vec();
    let reply = harness.exchange(server, wrong);
    assert_eq!(reply.code, Code::REQUEST_ENTITY_INCOMPLETE);
}
