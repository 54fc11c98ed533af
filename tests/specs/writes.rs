// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactional write specs: a payload that goes bad half-way leaves
//! every resource exactly as it was.

use mote_core::{ContentFormat, Value};

use crate::prelude::*;

#[test]
fn malformed_write_rolls_back_both_resources() {
    let mut harness = harness();
    let server = harness.server;

    // sets /1/0/1 = 86400 (valid), then a record whose value bytes are
    // cut off mid-item
    let payload = vec![
        0x82, // array(2)
        0xa2, // {n: "/1/0/1", v: 86400}
        0x00, 0x66, b'/', b'1', b'/', b'0', b'/', b'1',
        0x02, 0x1a, 0x00, 0x01, 0x51, 0x80,
        0xa2, // {n: "/1/0/2", v: <truncated>}
        0x00, 0x66, b'/', b'1', b'/', b'0', b'/', b'2',
        0x02,
    ];

    // distinct pre-request values
    {
        let handler = harness.client.registry_mut().handler_mut(1).unwrap();
        handler.write_unrestricted(0, 1, None, Value::Int(1111)).unwrap();
        handler.write_unrestricted(0, 2, None, Value::Int(2222)).unwrap();
    }

    let mut msg = request(Code::PUT, 80, &[0xe0], &["1", "0"]);
    msg.set_content_format(ContentFormat::SenmlCbor);
    msg.payload = payload;
    let reply = harness.exchange(server, msg);
    assert_eq!(reply.code, Code::BAD_REQUEST);

    let handler = harness.client.registry().handler(1).unwrap();
    assert_eq!(handler.read(0, 1, None).unwrap(), Value::Int(1111));
    assert_eq!(handler.read(0, 2, None).unwrap(), Value::Int(2222));
}

#[test]
fn failing_record_mid_payload_rolls_back_earlier_writes() {
    let mut harness = harness();
    let server = harness.server;

    // second record targets a resource the object does not declare
    let payload = vec![
        0x82, // array(2)
        0xa2, 0x00, 0x66, b'/', b'1', b'/', b'0', b'/', b'1', 0x02, 0x18, 0x63, // /1/0/1 = 99
        0xa2, 0x00, 0x67, b'/', b'1', b'/', b'0', b'/', b'9', b'9', 0x02, 0x01, // /1/0/99 = 1
    ];

    let mut msg = request(Code::PUT, 81, &[0xe1], &["1", "0"]);
    msg.set_content_format(ContentFormat::SenmlCbor);
    msg.payload = payload;
    let reply = harness.exchange(server, msg);
    assert_eq!(reply.code, Code::NOT_FOUND);

    let handler = harness.client.registry().handler(1).unwrap();
    assert_eq!(handler.read(0, 1, None).unwrap(), Value::Int(86400));
}

#[test]
fn composite_write_spans_objects_atomically() {
    let mut harness = harness();
    let server = harness.server;

    // /1/0/1 is writable; /3/0/9 is read-only, so the whole iPATCH fails
    let payload = vec![
        0x82,
        0xa2, 0x00, 0x66, b'/', b'1', b'/', b'0', b'/', b'1', 0x02, 0x18, 0x63,
        0xa2, 0x00, 0x66, b'/', b'3', b'/', b'0', b'/', b'9', 0x02, 0x01,
    ];

    let mut msg = request(Code::IPATCH, 82, &[0xe2], &[]);
    msg.set_content_format(ContentFormat::SenmlCbor);
    msg.payload = payload;
    let reply = harness.exchange(server, msg);
    assert_eq!(reply.code, Code::METHOD_NOT_ALLOWED);

    let handler = harness.client.registry().handler(1).unwrap();
    assert_eq!(handler.read(0, 1, None).unwrap(), Value::Int(86400));
}
