// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mapping between data model values and CBOR items, plus the
//! single-scalar `application/cbor` reader and writer.

use mote_core::{Path, ResourceType, Value};

use crate::cbor::dec::{Decoder, Event};
use crate::cbor::enc;
use crate::error::CodecError;
use crate::input::Parsed;
use crate::record::Record;

const EXTERNAL_PULL_CHUNK: usize = 512;

/// Emit one value as a CBOR item (objlnk as `"OID:IID"` text, time as
/// tag 1 + integer).
pub fn encode_value(out: &mut Vec<u8>, value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Null => enc::null(out),
        Value::Bytes(chunk) => {
            if !chunk.is_complete() {
                return Err(CodecError::RecordSequence("partial chunk in output"));
            }
            enc::bytes(out, &chunk.data);
        }
        Value::Text(chunk) => {
            if !chunk.is_complete() {
                return Err(CodecError::RecordSequence("partial chunk in output"));
            }
            let text = std::str::from_utf8(&chunk.data)
                .map_err(|_| CodecError::Malformed("string value is not UTF-8"))?;
            enc::text(out, text);
        }
        Value::Int(v) => enc::int(out, *v),
        Value::Uint(v) => enc::uint(out, *v),
        Value::Double(v) => enc::float(out, *v),
        Value::Bool(v) => enc::boolean(out, *v),
        Value::Objlnk(objlnk) => enc::text(out, &objlnk.to_string()),
        Value::Time(v) => {
            enc::tag(out, enc::TAG_EPOCH_TIME);
            enc::int(out, *v);
        }
        Value::External(ext) => {
            match ext.kind {
                mote_core::value::ExternalKind::Bytes => enc::bytes_header(out, ext.length),
                mote_core::value::ExternalKind::Text => enc::text_header(out, ext.length),
            }
            let mut offset = 0usize;
            let mut buf = [0u8; EXTERNAL_PULL_CHUNK];
            while offset < ext.length {
                let take = (ext.length - offset).min(EXTERNAL_PULL_CHUNK);
                ext.read(offset, &mut buf[..take])?;
                out.extend_from_slice(&buf[..take]);
                offset += take;
            }
        }
    }
    Ok(())
}

/// Interpret a scalar CBOR event as a value, guided by the resource's
/// declared type where the wire form is ambiguous.
pub fn event_to_value(
    event: Event,
    time_tagged: bool,
    expected: Option<ResourceType>,
) -> Result<Value, CodecError> {
    let value = match event {
        Event::Uint(v) => {
            if time_tagged || expected == Some(ResourceType::Time) {
                let seconds =
                    i64::try_from(v).map_err(|_| CodecError::Malformed("time out of range"))?;
                Value::Time(seconds)
            } else if expected == Some(ResourceType::Int) {
                let v = i64::try_from(v)
                    .map_err(|_| CodecError::Malformed("integer out of range"))?;
                Value::Int(v)
            } else if expected == Some(ResourceType::Double) {
                Value::Double(v as f64)
            } else {
                Value::Uint(v)
            }
        }
        Event::Int(v) => {
            if time_tagged || expected == Some(ResourceType::Time) {
                Value::Time(v)
            } else if expected == Some(ResourceType::Double) {
                Value::Double(v as f64)
            } else {
                Value::Int(v)
            }
        }
        Event::Float(v) => Value::Double(v),
        Event::Bool(v) => Value::Bool(v),
        Event::Bytes(data) => Value::bytes(data),
        Event::Text(text) => {
            if expected == Some(ResourceType::Objlnk) {
                Value::Objlnk(text.parse().map_err(CodecError::Value)?)
            } else {
                Value::text(text)
            }
        }
        Event::Null | Event::Undefined => Value::Null,
        Event::Array(_) | Event::Map(_) | Event::Tag(_) | Event::Break => {
            return Err(CodecError::Malformed("container where scalar expected"))
        }
    };
    Ok(value)
}

/// Writer for `application/cbor`: exactly one scalar per payload.
#[derive(Debug, Default)]
pub struct CborValueWriter {
    out: Vec<u8>,
    entry_added: bool,
}

impl CborValueWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &Record) -> Result<(), CodecError> {
        if self.entry_added {
            return Err(CodecError::RecordSequence("cbor payload carries one value"));
        }
        self.entry_added = true;
        encode_value(&mut self.out, &record.value)
    }

    pub fn finish(&mut self) -> Result<(), CodecError> {
        if !self.entry_added {
            return Err(CodecError::RecordSequence("cbor payload needs one value"));
        }
        Ok(())
    }

    pub fn output_mut(&mut self) -> &mut Vec<u8> {
        &mut self.out
    }
}

/// Reader for `application/cbor`: exactly one scalar, addressed at the
/// request path.
#[derive(Debug)]
pub struct CborValueReader {
    decoder: Decoder,
    base: Path,
    expected: Option<ResourceType>,
    time_tagged: bool,
    produced: bool,
}

impl CborValueReader {
    pub fn new(base: Path, expected: Option<ResourceType>) -> Self {
        Self {
            decoder: Decoder::new(),
            base,
            expected,
            time_tagged: false,
            produced: false,
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
                return if self.decoder.at_end() {
                    if self.produced {
                        Ok(Parsed::Done)
                    } else {
                        Err(CodecError::Truncated)
                    }
                } else {
                    Ok(Parsed::Pending)
                };
            };
            match event {
                Event::Tag(enc::TAG_EPOCH_TIME) => {
                    self.time_tagged = true;
                    continue;
                }
                Event::Tag(_) => continue,
                event => {
                    if self.produced {
                        return Err(CodecError::Malformed("trailing items after scalar"));
                    }
                    self.produced = true;
                    let value = event_to_value(event, self.time_tagged, self.expected)?;
                    return Ok(Parsed::Record(Record::new(self.base, value)));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
