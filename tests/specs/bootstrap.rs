// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bootstrap-Discover and Bootstrap-Delete specs over the §8 fixture.

use mote_core::ContentFormat;

use crate::prelude::*;

#[test]
fn bootstrap_discover_on_root() {
    let mut harness = harness();
    let mut msg = request(Code::GET, 50, &[0xc0], &[]);
    msg.set_accept(ContentFormat::LinkFormat);
    let bootstrap = harness.bootstrap;
    let reply = harness.exchange(bootstrap, msg);

    assert_eq!(reply.code, Code::CONTENT);
    assert_eq!(reply.content_format_raw().unwrap(), Some(40));
    assert_eq!(
        String::from_utf8(reply.payload).unwrap(),
        "</>;lwm2m=1.2,\
         </0/0>;ssid=101;uri=\"coaps://s1\",\
         </0/1>,\
         </1/0>;ssid=101,\
         </3/0>,\
         </21/0>;ssid=101"
    );
}

#[test]
fn bootstrap_delete_root_preserves_required_instances() {
    let mut harness = harness();
    let msg = request(Code::DELETE, 51, &[0xc1], &[]);
    let bootstrap = harness.bootstrap;
    let reply = harness.exchange(bootstrap, msg);
    assert_eq!(reply.code, Code::DELETED);

    let registry = harness.client.registry();
    // Security keeps only the bootstrap instance
    assert!(!registry.exists(&Path::instance(0, 0)));
    assert!(registry.exists(&Path::instance(0, 1)));
    // Server table is empty
    assert!(!registry.exists(&Path::instance(1, 0)));
    // Device survives
    assert!(registry.exists(&Path::instance(3, 0)));
    // OSCORE 0 survives: referenced by the preserved Security instance
    assert!(registry.exists(&Path::instance(21, 0)));
}

#[test]
fn regular_server_cannot_delete_root() {
    let mut harness = harness();
    let msg = request(Code::DELETE, 52, &[0xc2], &[]);
    let server = harness.server;
    let reply = harness.exchange(server, msg);
    assert_eq!(reply.code, Code::METHOD_NOT_ALLOWED);
}

#[test]
fn bootstrap_finish_acknowledged() {
    let mut harness = harness();
    let msg = request(Code::POST, 53, &[0xc3], &["bs"]);
    let bootstrap = harness.bootstrap;
    let reply = harness.exchange(bootstrap, msg);
    assert_eq!(reply.code, Code::CHANGED);
}
