// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted state: observations and per-server message-id counters in a
//! versioned binary stream (`LW2P` magic, big-endian fields).

use std::time::Instant;

use mote_coap::Token;
use mote_core::{ContentFormat, NotificationAttrs, Path};

use crate::client::Client;
use crate::error::ClientError;
use crate::observe::Observation;

const MAGIC: &[u8; 4] = b"LW2P";
const VERSION: u16 = 1;

// attribute presence bits
const HAS_PMIN: u16 = 1 << 0;
const HAS_PMAX: u16 = 1 << 1;
const HAS_EPMIN: u16 = 1 << 2;
const HAS_EPMAX: u16 = 1 << 3;
const HAS_GT: u16 = 1 << 4;
const HAS_LT: u16 = 1 << 5;
const HAS_ST: u16 = 1 << 6;
const HAS_CON: u16 = 1 << 7;
const HAS_HQMAX: u16 = 1 << 8;
const HAS_EDGE: u16 = 1 << 9;

impl Client {
    /// Snapshot observation and message-id state into an opaque stream.
    pub fn persist(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        push_u16(&mut out, VERSION);

        let observations: Vec<&Observation> = self.observations.iter().collect();
        push_u16(&mut out, observations.len() as u16);
        for observation in observations {
            let ssid = self
                .servers
                .get(observation.server)
                .map(|conn| conn.ssid)
                .unwrap_or_default();
            push_u16(&mut out, ssid);
            out.push(observation.token.len() as u8);
            out.extend_from_slice(observation.token.as_slice());
            out.push(observation.path.len() as u8);
            for id in observation.path.ids() {
                push_u16(&mut out, *id);
            }
            push_attrs(&mut out, &observation.attrs);
            push_u16(&mut out, observation.format.number());
            push_u32(&mut out, observation.observe_number);
        }

        let servers: Vec<_> = self.servers.iter().collect();
        push_u16(&mut out, servers.len() as u16);
        for (_, conn) in servers {
            push_u16(&mut out, conn.ssid);
            push_u16(&mut out, conn.next_message_id);
        }
        out
    }

    /// Restore a stream produced by [`Client::persist`]. Server slots are
    /// matched by SSID; observations whose server is gone are dropped.
    pub fn restore(&mut self, bytes: &[u8], now: Instant) -> Result<(), ClientError> {
        let mut reader = Reader { buf: bytes, pos: 0 };
        if reader.take(4)? != MAGIC {
            return Err(ClientError::Persist("bad magic"));
        }
        if reader.u16()? != VERSION {
            return Err(ClientError::Persist("unsupported version"));
        }

        let observation_count = reader.u16()?;
        for _ in 0..observation_count {
            let ssid = reader.u16()?;
            let token_length = reader.u8()? as usize;
            let token = Token::from_slice(reader.take(token_length)?)
                .map_err(|_| ClientError::Persist("token too long"))?;
            let depth = reader.u8()? as usize;
            if depth > Path::MAX_DEPTH {
                return Err(ClientError::Persist("path too deep"));
            }
            let mut ids = Vec::with_capacity(depth);
            for _ in 0..depth {
                ids.push(reader.u16()?);
            }
            let path =
                Path::from_ids(&ids).map_err(|_| ClientError::Persist("invalid path"))?;
            let attrs = read_attrs(&mut reader)?;
            let format = ContentFormat::from_number(reader.u16()?)
                .ok_or(ClientError::Persist("unknown content format"))?;
            let observe_number = reader.u32()?;

            let server = self
                .servers
                .iter()
                .find(|(_, conn)| conn.ssid == ssid)
                .map(|(index, _)| index);
            let Some(server) = server else {
                tracing::warn!(ssid, "dropping observation for unknown server");
                continue;
            };
            self.observations.insert(Observation {
                server,
                token,
                path,
                attrs,
                format,
                observe_number,
                last_payload: Vec::new(),
                last_numeric: None,
                last_sent_at: now,
                next_eligible_at: now,
                pending: false,
                last_message_id: None,
                awaiting_ack: None,
            });
        }

        let server_count = reader.u16()?;
        for _ in 0..server_count {
            let ssid = reader.u16()?;
            let next_message_id = reader.u16()?;
            if let Some(conn) = self.servers.by_ssid_mut(ssid) {
                conn.next_message_id = next_message_id;
            }
        }
        Ok(())
    }
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_f64(out: &mut Vec<u8>, value: f64) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_attrs(out: &mut Vec<u8>, attrs: &NotificationAttrs) {
    let mut flags = 0u16;
    let pairs = [
        (attrs.pmin.is_some(), HAS_PMIN),
        (attrs.pmax.is_some(), HAS_PMAX),
        (attrs.epmin.is_some(), HAS_EPMIN),
        (attrs.epmax.is_some(), HAS_EPMAX),
        (attrs.gt.is_some(), HAS_GT),
        (attrs.lt.is_some(), HAS_LT),
        (attrs.st.is_some(), HAS_ST),
        (attrs.con.is_some(), HAS_CON),
        (attrs.hqmax.is_some(), HAS_HQMAX),
        (attrs.edge.is_some(), HAS_EDGE),
    ];
    for (present, bit) in pairs {
        if present {
            flags |= bit;
        }
    }
    push_u16(out, flags);
    if let Some(pmin) = attrs.pmin {
        push_u32(out, pmin);
    }
    if let Some(pmax) = attrs.pmax {
        push_u32(out, pmax);
    }
    if let Some(epmin) = attrs.epmin {
        push_u32(out, epmin);
    }
    if let Some(epmax) = attrs.epmax {
        push_u32(out, epmax);
    }
    if let Some(gt) = attrs.gt {
        push_f64(out, gt);
    }
    if let Some(lt) = attrs.lt {
        push_f64(out, lt);
    }
    if let Some(st) = attrs.st {
        push_f64(out, st);
    }
    if let Some(con) = attrs.con {
        out.push(u8::from(con));
    }
    if let Some(hqmax) = attrs.hqmax {
        push_u32(out, hqmax);
    }
    if let Some(edge) = attrs.edge {
        out.push(u8::from(edge));
    }
}

fn read_attrs(reader: &mut Reader<'_>) -> Result<NotificationAttrs, ClientError> {
    let flags = reader.u16()?;
    let mut attrs = NotificationAttrs::default();
    if flags & HAS_PMIN != 0 {
        attrs.pmin = Some(reader.u32()?);
    }
    if flags & HAS_PMAX != 0 {
        attrs.pmax = Some(reader.u32()?);
    }
    if flags & HAS_EPMIN != 0 {
        attrs.epmin = Some(reader.u32()?);
    }
    if flags & HAS_EPMAX != 0 {
        attrs.epmax = Some(reader.u32()?);
    }
    if flags & HAS_GT != 0 {
        attrs.gt = Some(reader.f64()?);
    }
    if flags & HAS_LT != 0 {
        attrs.lt = Some(reader.f64()?);
    }
    if flags & HAS_ST != 0 {
        attrs.st = Some(reader.f64()?);
    }
    if flags & HAS_CON != 0 {
        attrs.con = Some(reader.u8()? != 0);
    }
    if flags & HAS_HQMAX != 0 {
        attrs.hqmax = Some(reader.u32()?);
    }
    if flags & HAS_EDGE != 0 {
        attrs.edge = Some(reader.u8()? != 0);
    }
    Ok(attrs)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, count: usize) -> Result<&'a [u8], ClientError> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|end| *end <= self.buf.len())
            .ok_or(ClientError::Persist("stream truncated"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClientError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClientError> {
        let raw = self.take(2)?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClientError> {
        let raw = self.take(4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn f64(&mut self) -> Result<f64, ClientError> {
        let raw = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(f64::from_be_bytes(bytes))
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
