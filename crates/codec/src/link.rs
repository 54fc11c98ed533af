// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CoRE Link Format (content format 40) payload writers for Register,
//! Discover and Bootstrap-Discover.

use mote_core::{Lwm2mVersion, NotificationAttrs, ObjectVersion, Path};

use crate::text::format_double;

/// Register payload: `</1>,</1/0>,</3/0>,</5>;ver=2.3`.
#[derive(Debug, Default)]
pub struct RegisterPayload {
    out: Vec<u8>,
}

impl RegisterPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, oid: u16, version: Option<ObjectVersion>) {
        self.separator();
        self.out.extend_from_slice(format!("</{oid}>").as_bytes());
        if let Some(version) = version {
            self.out.extend_from_slice(format!(";ver={version}").as_bytes());
        }
    }

    pub fn add_instance(&mut self, oid: u16, iid: u16) {
        self.separator();
        self.out.extend_from_slice(format!("</{oid}/{iid}>").as_bytes());
    }

    fn separator(&mut self) {
        if !self.out.is_empty() {
            self.out.push(b',');
        }
    }

    pub fn output_mut(&mut self) -> &mut Vec<u8> {
        &mut self.out
    }
}

/// One line of a Discover response.
#[derive(Debug, Clone, Default)]
pub struct DiscoverLine {
    pub path: Path,
    pub version: Option<ObjectVersion>,
    /// Resource-instance count, attached to multi-instance resources.
    pub dim: Option<u16>,
    pub attrs: NotificationAttrs,
}

/// Discover payload: subtree lines with attributes.
#[derive(Debug, Default)]
pub struct DiscoverPayload {
    out: Vec<u8>,
}

impl DiscoverPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, line: &DiscoverLine) {
        if !self.out.is_empty() {
            self.out.push(b',');
        }
        self.out.extend_from_slice(format!("<{}>", line.path).as_bytes());
        if let Some(version) = line.version {
            self.out.extend_from_slice(format!(";ver={version}").as_bytes());
        }
        if let Some(dim) = line.dim {
            self.out.extend_from_slice(format!(";dim={dim}").as_bytes());
        }
        append_attrs(&mut self.out, &line.attrs);
    }

    pub fn output_mut(&mut self) -> &mut Vec<u8> {
        &mut self.out
    }
}

fn append_attrs(out: &mut Vec<u8>, attrs: &NotificationAttrs) {
    let mut push = |text: String| out.extend_from_slice(text.as_bytes());
    if let Some(pmin) = attrs.pmin {
        push(format!(";pmin={pmin}"));
    }
    if let Some(pmax) = attrs.pmax {
        push(format!(";pmax={pmax}"));
    }
    if let Some(epmin) = attrs.epmin {
        push(format!(";epmin={epmin}"));
    }
    if let Some(epmax) = attrs.epmax {
        push(format!(";epmax={epmax}"));
    }
    if let Some(gt) = attrs.gt {
        push(format!(";gt={}", format_double(gt)));
    }
    if let Some(lt) = attrs.lt {
        push(format!(";lt={}", format_double(lt)));
    }
    if let Some(st) = attrs.st {
        push(format!(";st={}", format_double(st)));
    }
    if let Some(edge) = attrs.edge {
        push(format!(";edge={}", u8::from(edge)));
    }
    if let Some(con) = attrs.con {
        push(format!(";con={}", u8::from(con)));
    }
    if let Some(hqmax) = attrs.hqmax {
        push(format!(";hqmax={hqmax}"));
    }
}

/// Bootstrap-Discover payload: `</>;lwm2m=1.2` preamble, then one line per
/// entity with `ssid`/`uri` decorations on Security, Server and OSCORE
/// instances.
#[derive(Debug)]
pub struct BootstrapDiscoverPayload {
    out: Vec<u8>,
}

impl BootstrapDiscoverPayload {
    pub fn new(version: Lwm2mVersion) -> Self {
        Self { out: format!("</>;lwm2m={version}").into_bytes() }
    }

    pub fn add(
        &mut self,
        path: Path,
        version: Option<ObjectVersion>,
        ssid: Option<u16>,
        uri: Option<&str>,
    ) {
        self.out.push(b',');
        self.out.extend_from_slice(format!("<{path}>").as_bytes());
        if let Some(version) = version {
            self.out.extend_from_slice(format!(";ver={version}").as_bytes());
        }
        if let Some(ssid) = ssid {
            self.out.extend_from_slice(format!(";ssid={ssid}").as_bytes());
        }
        if let Some(uri) = uri {
            self.out.extend_from_slice(format!(";uri=\"{uri}\"").as_bytes());
        }
    }

    pub fn output_mut(&mut self) -> &mut Vec<u8> {
        &mut self.out
    }
}

#[cfg(test)]
#[path = "link_tests.rs"]
mod tests;
