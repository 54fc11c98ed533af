// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures: a client populated with the standard bootstrap-era
//! data model (Security, Server, Device, OSCORE).

use std::time::Instant;

use mote_client::{Client, Config, Datagram, ServerHandle, ServerRole};
use mote_coap::Message;
use mote_core::{Objlnk, ResourceType, Value};
use mote_dm::{Ops, ResourceSpec, StaticObject};

pub use mote_coap::{Block, BlockKind, Code, MsgType, Token};
pub use mote_core::Path;
pub use mote_dm::ObjectHandler;

// Security object (0) resource ids
pub const SEC_URI: u16 = 0;
pub const SEC_BOOTSTRAP: u16 = 1;
pub const SEC_SSID: u16 = 10;
pub const SEC_OSCORE: u16 = 17;

pub struct Harness {
    pub client: Client,
    pub server: ServerHandle,
    pub bootstrap: ServerHandle,
    pub now: Instant,
}

pub fn security_object() -> StaticObject {
    StaticObject::builder(0)
        .resource(ResourceSpec::single(SEC_URI, Ops::Read, ResourceType::Text))
        .resource(ResourceSpec::single(SEC_BOOTSTRAP, Ops::Read, ResourceType::Bool))
        .resource(ResourceSpec::single(SEC_SSID, Ops::Read, ResourceType::Int))
        .resource(ResourceSpec::single(SEC_OSCORE, Ops::Read, ResourceType::Objlnk))
        .build()
}

pub fn server_object() -> StaticObject {
    StaticObject::builder(1)
        .resource(ResourceSpec::single(0, Ops::Read, ResourceType::Int).mandatory())
        .resource(ResourceSpec::single(1, Ops::ReadWrite, ResourceType::Int).mandatory())
        .resource(ResourceSpec::single(2, Ops::ReadWrite, ResourceType::Int))
        .resource(ResourceSpec::single(7, Ops::ReadWrite, ResourceType::Text).mandatory())
        .build()
}

pub fn device_object() -> StaticObject {
    StaticObject::builder(3)
        .resource(ResourceSpec::single(0, Ops::Read, ResourceType::Text))
        .resource(ResourceSpec::single(9, Ops::Read, ResourceType::Int))
        .build()
}

pub fn oscore_object() -> StaticObject {
    StaticObject::builder(21)
        .resource(ResourceSpec::single(0, Ops::Read, ResourceType::Text))
        .build()
}

/// The §8 fixture: Security 0 (SSID 101, uri), Security 1 (bootstrap,
/// linked to OSCORE 0), Server 0 (SSID 101), Device 0, OSCORE 0.
pub fn harness() -> Harness {
    let mut client = Client::new(Config::new("name").lifetime(120).seed(11));
    let server = client.add_server(101, ServerRole::Regular);
    let bootstrap = client.add_server(0, ServerRole::Bootstrap);

    let mut security = security_object();
    security.add_instance(0).unwrap();
    security.set(0, SEC_URI, Value::text("coaps://s1")).unwrap();
    security.set(0, SEC_BOOTSTRAP, Value::Bool(false)).unwrap();
    security.set(0, SEC_SSID, Value::Int(101)).unwrap();
    security
        .set(0, SEC_OSCORE, Value::Objlnk(Objlnk { oid: 21, iid: 0 }))
        .unwrap();
    security.add_instance(1).unwrap();
    security.set(1, SEC_URI, Value::text("coaps://bs")).unwrap();
    security.set(1, SEC_BOOTSTRAP, Value::Bool(true)).unwrap();
    security
        .set(1, SEC_OSCORE, Value::Objlnk(Objlnk { oid: 21, iid: 0 }))
        .unwrap();
    client.register_object(0, Box::new(security)).unwrap();

    let mut srv = server_object();
    srv.add_instance(0).unwrap();
    srv.set(0, 0, Value::Int(101)).unwrap();
    srv.set(0, 1, Value::Int(86400)).unwrap();
    srv.set(0, 7, Value::text("U")).unwrap();
    client.register_object(1, Box::new(srv)).unwrap();

    let mut device = device_object();
    device.add_instance(0).unwrap();
    device.set(0, 0, Value::text("mote")).unwrap();
    device.set(0, 9, Value::Int(60)).unwrap();
    client.register_object(3, Box::new(device)).unwrap();

    let mut oscore = oscore_object();
    oscore.add_instance(0).unwrap();
    oscore.set(0, 0, Value::text("sender")).unwrap();
    client.register_object(21, Box::new(oscore)).unwrap();

    Harness { client, server, bootstrap, now: Instant::now() }
}

impl Harness {
    /// Deliver one frame from `from` and decode the single reply.
    pub fn exchange(&mut self, from: ServerHandle, msg: Message) -> Message {
        let out = self
            .client
            .step(self.now, Some(Datagram { server: from, bytes: msg.encode() }))
            .unwrap();
        assert!(!out.is_empty(), "expected a response");
        Message::decode(&out[0].bytes).unwrap()
    }

    pub fn step(&mut self) -> Vec<Datagram> {
        self.client.step(self.now, None).unwrap()
    }
}

pub fn request(code: Code, message_id: u16, tkn: &[u8], segments: &[&str]) -> Message {
    let mut msg = Message::new(
        MsgType::Confirmable,
        code,
        message_id,
        Token::from_slice(tkn).unwrap(),
    );
    for segment in segments {
        msg.push_uri_path(segment);
    }
    msg
}
