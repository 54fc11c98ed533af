// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Register specs: request shape and payload iteration order.

use crate::prelude::*;

#[test]
fn register_frame_shape() {
    let mut harness = harness();
    let now = harness.now;
    let server = harness.server;
    harness.client.request_register(now, server).unwrap();

    let out = harness.step();
    assert_eq!(out.len(), 1);
    let msg = mote_coap::Message::decode(&out[0].bytes).unwrap();

    assert_eq!(msg.kind, MsgType::Confirmable);
    assert_eq!(msg.code, Code::POST);
    assert_eq!(msg.token.len(), 8);
    assert_eq!(msg.uri_path().unwrap(), vec!["rd"]);
    assert_eq!(msg.content_format_raw().unwrap(), Some(40));

    let queries = msg.uri_queries().unwrap();
    assert!(queries.contains(&"ep=name"));
    assert!(queries.contains(&"lt=120"));
    assert!(queries.contains(&"lwm2m=1.2"));

    // Security (0) and OSCORE (21) stay out of the payload.
    assert_eq!(msg.payload, b"</1>,</1/0>,</3>,</3/0>");
}

#[test]
fn register_payload_lists_each_entity_once_ascending() {
    let mut harness = harness();
    // a second server instance and a second device instance, added out
    // of order
    {
        let registry = harness.client.registry_mut();
        let handler = registry.handler_mut(3).unwrap();
        handler.create_instance(Some(5)).unwrap();
        handler.create_instance(Some(2)).unwrap();
    }

    let now = harness.now;
    let server = harness.server;
    harness.client.request_register(now, server).unwrap();
    let out = harness.step();
    let msg = mote_coap::Message::decode(&out[0].bytes).unwrap();
    let text = String::from_utf8(msg.payload).unwrap();

    let entries: Vec<&str> = text.split(',').collect();
    assert_eq!(entries, vec!["</1>", "</1/0>", "</3>", "</3/0>", "</3/2>", "</3/5>"]);

    // strictly ascending, no duplicates
    let mut seen = std::collections::BTreeSet::new();
    for entry in entries {
        assert!(seen.insert(entry.to_string()), "duplicate {entry}");
    }
}
