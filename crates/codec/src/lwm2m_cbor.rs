// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LwM2M-CBOR (content format 11544): nested id-keyed maps,
//! `{OID: {IID: {RID: value}}}` with one more level for multi-instance
//! resources. Only levels below the request path are encoded; a request
//! addressed at a single resource instance carries a bare value.

use mote_core::{Path, Value, ID_INVALID};

use crate::cbor::dec::{Decoder, Event};
use crate::cbor::enc;
use crate::cbor::value::{encode_value, event_to_value};
use crate::error::CodecError;
use crate::input::Parsed;
use crate::record::Record;

#[derive(Debug)]
pub struct Lwm2mCborWriter {
    out: Vec<u8>,
    base: Path,
    last: Option<Path>,
    maps_opened: u8,
    bare: bool,
}

impl Lwm2mCborWriter {
    pub fn new(base: Path) -> Self {
        Self { out: Vec::new(), base, last: None, maps_opened: 0, bare: false }
    }

    pub fn add(&mut self, record: &Record) -> Result<(), CodecError> {
        if self.bare {
            return Err(CodecError::RecordSequence("bare value admits one record"));
        }
        if !record.path.starts_with(&self.base) {
            return Err(CodecError::RecordSequence("record outside base path"));
        }

        let base_len = self.base.len();
        let ids = record.path.ids();

        match &self.last {
            None => {
                if ids.len() == base_len {
                    // request addressed the value itself
                    encode_value(&mut self.out, &record.value)?;
                    self.bare = true;
                    self.last = Some(record.path);
                    return Ok(());
                }
                enc::map_indefinite(&mut self.out);
                self.maps_opened = 1;
                for &id in &ids[base_len..ids.len() - 1] {
                    enc::uint(&mut self.out, u64::from(id));
                    enc::map_indefinite(&mut self.out);
                    self.maps_opened += 1;
                }
            }
            Some(last) => {
                if !Path::increasing(last, &record.path) {
                    return Err(CodecError::RecordSequence("paths not ascending"));
                }
                if ids.len() == base_len {
                    return Err(CodecError::RecordSequence("bare value after records"));
                }
                let last_ids = last.ids();
                let common = last_ids
                    .iter()
                    .zip(ids)
                    .take_while(|(a, b)| a == b)
                    .count();
                if common == last_ids.len() {
                    return Err(CodecError::RecordSequence("record nested under a value"));
                }
                let closes = last_ids.len() - 1 - common;
                for _ in 0..closes {
                    enc::break_stop(&mut self.out);
                    self.maps_opened -= 1;
                }
                for &id in &ids[common..ids.len() - 1] {
                    enc::uint(&mut self.out, u64::from(id));
                    enc::map_indefinite(&mut self.out);
                    self.maps_opened += 1;
                }
            }
        }

        enc::uint(&mut self.out, u64::from(ids[ids.len() - 1]));
        encode_value(&mut self.out, &record.value)?;
        self.last = Some(record.path);
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), CodecError> {
        if self.last.is_none() {
            return Err(CodecError::RecordSequence("payload needs at least one record"));
        }
        for _ in 0..self.maps_opened {
            enc::break_stop(&mut self.out);
        }
        self.maps_opened = 0;
        Ok(())
    }

    pub fn output_mut(&mut self) -> &mut Vec<u8> {
        &mut self.out
    }
}

#[derive(Debug)]
struct Level {
    remaining: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Expect {
    Key,
    Value,
}

#[derive(Debug)]
pub struct Lwm2mCborReader {
    decoder: Decoder,
    base: Path,
    stack: Vec<Level>,
    ids: Vec<u16>,
    expect: Expect,
    started: bool,
    done: bool,
    time_tagged: bool,
}

impl Lwm2mCborReader {
    pub fn new(base: Path) -> Self {
        Self {
            decoder: Decoder::new(),
            base,
            stack: Vec::new(),
            ids: Vec::new(),
            expect: Expect::Value,
            started: false,
            done: false,
            time_tagged: false,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.decoder.feed(bytes);
    }

    pub fn end(&mut self) {
        self.decoder.end();
    }

    pub fn next(&mut self) -> Result<Parsed, CodecError> {
        loop {
            let Some(event) = self.decoder.next()? else {
                if !self.decoder.at_end() {
                    return Ok(Parsed::Pending);
                }
                return if self.done { Ok(Parsed::Done) } else { Err(CodecError::Truncated) };
            };

            if self.done {
                return Err(CodecError::Malformed("items after payload"));
            }

            if !self.started {
                self.started = true;
                match event {
                    Event::Map(remaining) => {
                        if remaining == Some(0) {
                            self.done = true;
                            continue;
                        }
                        self.stack.push(Level { remaining });
                        self.expect = Expect::Key;
                        continue;
                    }
                    Event::Tag(enc::TAG_EPOCH_TIME) => {
                        self.started = false;
                        self.time_tagged = true;
                        continue;
                    }
                    event => {
                        // bare value addressed at the request path
                        let value = event_to_value(event, self.time_tagged, None)?;
                        self.done = true;
                        return Ok(Parsed::Record(Record::new(self.base, value)));
                    }
                }
            }

            match self.expect {
                Expect::Key => match event {
                    Event::Uint(key) => {
                        let id = u16::try_from(key)
                            .ok()
                            .filter(|id| *id != ID_INVALID)
                            .ok_or(CodecError::Malformed("map key is not a valid id"))?;
                        self.ids.push(id);
                        self.expect = Expect::Value;
                    }
                    Event::Break => {
                        let level = self
                            .stack
                            .pop()
                            .ok_or(CodecError::Malformed("unbalanced break"))?;
                        if level.remaining.is_some() {
                            return Err(CodecError::Malformed("break in definite map"));
                        }
                        if self.stack.is_empty() {
                            self.done = true;
                        } else {
                            self.ids.pop();
                            self.entry_completed();
                        }
                    }
                    _ => return Err(CodecError::Malformed("expected id key")),
                },
                Expect::Value => match event {
                    Event::Map(remaining) => {
                        if remaining == Some(0) {
                            // empty aggregate: drop its key, complete entry
                            self.ids.pop();
                            self.entry_completed();
                            continue;
                        }
                        self.stack.push(Level { remaining });
                        self.expect = Expect::Key;
                    }
                    Event::Tag(enc::TAG_EPOCH_TIME) => self.time_tagged = true,
                    Event::Tag(_) => {}
                    event => {
                        let value = event_to_value(event, self.time_tagged, None)?;
                        self.time_tagged = false;
                        let mut path = self.base;
                        for id in &self.ids {
                            path = path.child(*id).map_err(CodecError::Path)?;
                        }
                        self.ids.pop();
                        self.entry_completed();
                        return Ok(Parsed::Record(Record::new(path, value)));
                    }
                },
            }
        }
    }

    fn entry_completed(&mut self) {
        loop {
            let Some(top) = self.stack.last_mut() else {
                self.done = true;
                return;
            };
            match top.remaining.as_mut() {
                Some(remaining) => {
                    *remaining -= 1;
                    if *remaining == 0 {
                        self.stack.pop();
                        if self.stack.is_empty() {
                            self.done = true;
                            return;
                        }
                        self.ids.pop();
                        continue;
                    }
                    self.expect = Expect::Key;
                    return;
                }
                None => {
                    self.expect = Expect::Key;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "lwm2m_cbor_tests.rs"]
mod tests;
