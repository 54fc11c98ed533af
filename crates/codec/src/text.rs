// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain Text (content format 0): one scalar per payload.
//!
//! Numbers travel in decimal, booleans as `0`/`1`, opaque data as base64,
//! objlnk as `OID:IID`. The reader streams base64 input: any buffered
//! 4-character group decodes immediately into a partial [`Chunk`], so an
//! opaque value larger than one block never has to be held as text.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use mote_core::{Chunk, Path, ResourceType, Value};

use crate::error::CodecError;
use crate::input::Parsed;
use crate::record::Record;

const EXTERNAL_PULL_CHUNK: usize = 512;

#[derive(Debug, Default)]
pub struct TextWriter {
    out: Vec<u8>,
    entry_added: bool,
}

impl TextWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &Record) -> Result<(), CodecError> {
        if self.entry_added {
            return Err(CodecError::RecordSequence("plain text carries one value"));
        }
        self.entry_added = true;
        match &record.value {
            Value::Null => {}
            Value::Int(v) => self.out.extend_from_slice(v.to_string().as_bytes()),
            Value::Uint(v) => self.out.extend_from_slice(v.to_string().as_bytes()),
            Value::Time(v) => self.out.extend_from_slice(v.to_string().as_bytes()),
            Value::Double(v) => self.out.extend_from_slice(format_double(*v).as_bytes()),
            Value::Bool(v) => self.out.push(if *v { b'1' } else { b'0' }),
            Value::Objlnk(objlnk) => self.out.extend_from_slice(objlnk.to_string().as_bytes()),
            Value::Text(chunk) => {
                if !chunk.is_complete() {
                    return Err(CodecError::RecordSequence("partial chunk in output"));
                }
                self.out.extend_from_slice(&chunk.data);
            }
            Value::Bytes(chunk) => {
                if !chunk.is_complete() {
                    return Err(CodecError::RecordSequence("partial chunk in output"));
                }
                self.out
                    .extend_from_slice(BASE64.encode(&chunk.data).as_bytes());
            }
            Value::External(ext) => {
                let mut data = Vec::with_capacity(ext.length);
                let mut buf = [0u8; EXTERNAL_PULL_CHUNK];
                let mut offset = 0usize;
                while offset < ext.length {
                    let take = (ext.length - offset).min(EXTERNAL_PULL_CHUNK);
                    ext.read(offset, &mut buf[..take])?;
                    data.extend_from_slice(&buf[..take]);
                    offset += take;
                }
                match ext.kind {
                    mote_core::value::ExternalKind::Text => self.out.extend_from_slice(&data),
                    mote_core::value::ExternalKind::Bytes => self
                        .out
                        .extend_from_slice(BASE64.encode(&data).as_bytes()),
                }
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), CodecError> {
        if !self.entry_added {
            return Err(CodecError::RecordSequence("plain text needs one value"));
        }
        Ok(())
    }

    pub fn output_mut(&mut self) -> &mut Vec<u8> {
        &mut self.out
    }
}

pub(crate) fn format_double(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e17 {
        // integral doubles print without an exponent or trailing ".0"
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug)]
pub struct TextReader {
    base: Path,
    expected: ResourceType,
    buf: Vec<u8>,
    ended: bool,
    produced: bool,
    decoded_offset: usize,
}

impl TextReader {
    pub fn new(base: Path, expected: ResourceType) -> Self {
        Self {
            base,
            expected,
            buf: Vec::new(),
            ended: false,
            produced: false,
            decoded_offset: 0,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn next(&mut self) -> Result<Parsed, CodecError> {
        if self.expected == ResourceType::Bytes {
            return self.next_base64_chunk();
        }

        // Scalars need the whole text before parsing.
        if !self.ended {
            return Ok(Parsed::Pending);
        }
        if self.produced {
            return Ok(Parsed::Done);
        }
        self.produced = true;

        let text = std::str::from_utf8(&self.buf)
            .map_err(|_| CodecError::Malformed("payload is not UTF-8"))?;
        let value = parse_scalar(text, self.expected)?;
        Ok(Parsed::Record(Record::new(self.base, value)))
    }

    fn next_base64_chunk(&mut self) -> Result<Parsed, CodecError> {
        let usable = if self.ended {
            if self.buf.len() % 4 != 0 {
                return Err(CodecError::Malformed("base64 length not a multiple of 4"));
            }
            self.buf.len()
        } else {
            self.buf.len() - self.buf.len() % 4
        };

        if usable == 0 {
            if !self.ended {
                return Ok(Parsed::Pending);
            }
            if self.produced {
                return Ok(Parsed::Done);
            }
            // zero-length opaque value
            self.produced = true;
            return Ok(Parsed::Record(Record::new(
                self.base,
                Value::Bytes(Chunk::complete(Vec::new())),
            )));
        }

        let decoded = BASE64
            .decode(&self.buf[..usable])
            .map_err(|_| CodecError::Malformed("invalid base64"))?;
        self.buf.drain(..usable);
        let offset = self.decoded_offset;
        self.decoded_offset += decoded.len();
        self.produced = true;

        let total = if self.ended && self.buf.is_empty() {
            Some(self.decoded_offset)
        } else {
            None
        };
        Ok(Parsed::Record(Record::new(
            self.base,
            Value::Bytes(Chunk::part(decoded, offset, total)),
        )))
    }
}

fn parse_scalar(text: &str, expected: ResourceType) -> Result<Value, CodecError> {
    let bad = CodecError::Malformed("unparsable plain text value");
    Ok(match expected {
        ResourceType::Int => Value::Int(text.parse().map_err(|_| bad)?),
        ResourceType::Uint => Value::Uint(text.parse().map_err(|_| bad)?),
        ResourceType::Time => Value::Time(text.parse().map_err(|_| bad)?),
        ResourceType::Double => Value::Double(text.parse().map_err(|_| bad)?),
        ResourceType::Bool => match text {
            "0" => Value::Bool(false),
            "1" => Value::Bool(true),
            _ => return Err(bad),
        },
        ResourceType::Objlnk => Value::Objlnk(text.parse().map_err(CodecError::Value)?),
        ResourceType::Text => Value::text(text),
        ResourceType::Bytes => return Err(CodecError::Malformed("bytes handled as stream")),
    })
}

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;
