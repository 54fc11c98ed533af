// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque stream (content format 42): raw bytes for a single resource.

use mote_core::{Chunk, Path, Value};

use crate::error::CodecError;
use crate::input::Parsed;
use crate::record::Record;

const EXTERNAL_PULL_CHUNK: usize = 512;

#[derive(Debug, Default)]
pub struct OpaqueWriter {
    out: Vec<u8>,
    entry_added: bool,
}

impl OpaqueWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &Record) -> Result<(), CodecError> {
        if self.entry_added {
            return Err(CodecError::RecordSequence("opaque stream carries one value"));
        }
        self.entry_added = true;
        match &record.value {
            Value::Bytes(chunk) => {
                if !chunk.is_complete() {
                    return Err(CodecError::RecordSequence("partial chunk in output"));
                }
                self.out.extend_from_slice(&chunk.data);
                Ok(())
            }
            Value::External(ext)
                if ext.kind == mote_core::value::ExternalKind::Bytes =>
            {
                let mut buf = [0u8; EXTERNAL_PULL_CHUNK];
                let mut offset = 0usize;
                while offset < ext.length {
                    let take = (ext.length - offset).min(EXTERNAL_PULL_CHUNK);
                    ext.read(offset, &mut buf[..take])?;
                    self.out.extend_from_slice(&buf[..take]);
                    offset += take;
                }
                Ok(())
            }
            other => Err(CodecError::Value(mote_core::ValueError::TypeMismatch {
                expected: mote_core::ResourceType::Bytes,
                found: other.type_name(),
            })),
        }
    }

    pub fn finish(&mut self) -> Result<(), CodecError> {
        if !self.entry_added {
            return Err(CodecError::RecordSequence("opaque stream needs one value"));
        }
        Ok(())
    }

    pub fn output_mut(&mut self) -> &mut Vec<u8> {
        &mut self.out
    }
}

#[derive(Debug)]
pub struct OpaqueReader {
    base: Path,
    buf: Vec<u8>,
    offset: usize,
    ended: bool,
    produced: bool,
}

impl OpaqueReader {
    pub fn new(base: Path) -> Self {
        Self {
            base,
            buf: Vec::new(),
            offset: 0,
            ended: false,
            produced: false,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn next(&mut self) -> Result<Parsed, CodecError> {
        if self.buf.is_empty() {
            if !self.ended {
                return Ok(Parsed::Pending);
            }
            if self.produced {
                return Ok(Parsed::Done);
            }
            self.produced = true;
            return Ok(Parsed::Record(Record::new(
                self.base,
                Value::Bytes(Chunk::complete(Vec::new())),
            )));
        }

        let data = std::mem::take(&mut self.buf);
        let offset = self.offset;
        self.offset += data.len();
        self.produced = true;
        let total = self.ended.then_some(self.offset);
        Ok(Parsed::Record(Record::new(
            self.base,
            Value::Bytes(Chunk::part(data, offset, total)),
        )))
    }
}

#[cfg(test)]
#[path = "opaque_tests.rs"]
mod tests;
