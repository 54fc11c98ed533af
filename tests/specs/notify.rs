// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notify-on-change spec: observation on /3/0/9 with pmin=0, pmax=60,
//! lt=50; the value moving 60 → 45 produces an incremented notify.

use mote_core::Value;

use crate::prelude::*;

#[test]
fn notify_on_threshold_change() {
    let mut harness = harness();

    let mut observe = request(Code::GET, 40, &[0xb0], &["3", "0", "9"]);
    observe.set_observe(0);
    observe.push_uri_query("pmin=0");
    observe.push_uri_query("pmax=60");
    observe.push_uri_query("lt=50");
    let server = harness.server;
    let reply = harness.exchange(server, observe);

    assert_eq!(reply.code, Code::CONTENT);
    assert_eq!(reply.observe().unwrap(), Some(0));
    assert_eq!(reply.payload, b"60");

    // 60 → 45 crosses lt=50
    harness
        .client
        .registry_mut()
        .handler_mut(3)
        .unwrap()
        .write_unrestricted(0, 9, None, Value::Int(45))
        .unwrap();
    harness.client.trigger_notification(Path::resource(3, 0, 9));

    let out = harness.step();
    assert_eq!(out.len(), 1);
    let notify = mote_coap::Message::decode(&out[0].bytes).unwrap();
    assert_eq!(notify.code, Code::CONTENT);
    assert_eq!(notify.token.as_slice(), &[0xb0]);
    assert_eq!(notify.observe().unwrap(), Some(1));
    assert_eq!(notify.payload, b"45");
}

#[test]
fn observe_numbers_never_decrease() {
    let mut harness = harness();
    let mut observe = request(Code::GET, 41, &[0xb1], &["3", "0", "9"]);
    observe.set_observe(0);
    let server = harness.server;
    harness.exchange(server, observe);

    let mut last = 0u32;
    for value in [45, 50, 55, 60, 65] {
        harness
            .client
            .registry_mut()
            .handler_mut(3)
            .unwrap()
            .write_unrestricted(0, 9, None, Value::Int(value))
            .unwrap();
        harness.client.trigger_notification(Path::resource(3, 0, 9));
        let out = harness.step();
        assert_eq!(out.len(), 1);
        let notify = mote_coap::Message::decode(&out[0].bytes).unwrap();
        let number = notify.observe().unwrap().unwrap();
        assert!(number > last, "observe number regressed: {number} after {last}");
        last = number;
    }
}
