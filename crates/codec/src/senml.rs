// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SenML-CBOR (content format 112): an array of record maps.
//!
//! Recognized labels: `-2` bn, `-3` bt, `0` n, `6` t, `2` v, `3` vs,
//! `4` vb, `8` vd and the text label `"vlo"` for objlnk. The writer emits
//! the base name once on the first record and relative names afterwards;
//! the reader reconstructs absolute paths by concatenating `bn + n`.

use mote_core::{Path, Value};

use crate::cbor::dec::{Decoder, Event};
use crate::cbor::enc;
use crate::cbor::value::encode_value;
use crate::error::CodecError;
use crate::input::Parsed;
use crate::record::Record;

const LABEL_BASE_NAME: i64 = -2;
const LABEL_BASE_TIME: i64 = -3;
const LABEL_NAME: i64 = 0;
const LABEL_TIME: i64 = 6;
const LABEL_VALUE: i64 = 2;
const LABEL_STRING: i64 = 3;
const LABEL_BOOL: i64 = 4;
const LABEL_DATA: i64 = 8;
const LABEL_OBJLNK: &str = "vlo";

#[derive(Debug)]
pub struct SenmlWriter {
    out: Vec<u8>,
    base: Path,
    declared: usize,
    added: usize,
    last: Option<Path>,
}

impl SenmlWriter {
    /// `count` is the exact number of records that will be added; the
    /// array header is definite-length.
    pub fn new(base: Path, count: usize) -> Self {
        let mut out = Vec::new();
        enc::array(&mut out, count);
        Self { out, base, declared: count, added: 0, last: None }
    }

    pub fn add(&mut self, record: &Record) -> Result<(), CodecError> {
        if self.added == self.declared {
            return Err(CodecError::RecordSequence("more records than declared"));
        }
        if let Some(last) = &self.last {
            if !Path::increasing(last, &record.path) {
                return Err(CodecError::RecordSequence("paths not ascending"));
            }
        }

        let first = self.added == 0;
        let base_name = if self.base.is_root() {
            String::new()
        } else {
            self.base.to_string()
        };
        let full = record.path.to_string();
        let suffix = full
            .strip_prefix(base_name.as_str())
            .ok_or(CodecError::RecordSequence("record outside base path"))?;

        let emit_bn = first && !base_name.is_empty();
        let emit_n = !suffix.is_empty();
        let emit_value = !matches!(record.value, Value::Null);
        let pairs = usize::from(emit_bn) + usize::from(emit_n) + usize::from(emit_value);

        enc::map(&mut self.out, pairs);
        if emit_bn {
            enc::int(&mut self.out, LABEL_BASE_NAME);
            enc::text(&mut self.out, &base_name);
        }
        if emit_n {
            enc::int(&mut self.out, LABEL_NAME);
            enc::text(&mut self.out, suffix);
        }
        if emit_value {
            self.value_pair(&record.value)?;
        }

        self.added += 1;
        self.last = Some(record.path);
        Ok(())
    }

    fn value_pair(&mut self, value: &Value) -> Result<(), CodecError> {
        use mote_core::value::ExternalKind;
        let label = match value {
            Value::Int(_) | Value::Uint(_) | Value::Double(_) | Value::Time(_) => LABEL_VALUE,
            Value::Bool(_) => LABEL_BOOL,
            Value::Text(_) => LABEL_STRING,
            Value::Bytes(_) => LABEL_DATA,
            Value::Objlnk(_) => {
                enc::text(&mut self.out, LABEL_OBJLNK);
                enc::text(&mut self.out, &value_objlnk_string(value));
                return Ok(());
            }
            Value::External(ext) => match ext.kind {
                ExternalKind::Bytes => LABEL_DATA,
                ExternalKind::Text => LABEL_STRING,
            },
            Value::Null => return Ok(()),
        };
        enc::int(&mut self.out, label);
        match value {
            // Time travels as a plain numeric v, not tag 1.
            Value::Time(v) => {
                enc::int(&mut self.out, *v);
                Ok(())
            }
            other => encode_value(&mut self.out, other),
        }
    }

    pub fn finish(&mut self) -> Result<(), CodecError> {
        if self.added != self.declared {
            return Err(CodecError::RecordSequence("fewer records than declared"));
        }
        Ok(())
    }

    pub fn output_mut(&mut self) -> &mut Vec<u8> {
        &mut self.out
    }
}

fn value_objlnk_string(value: &Value) -> String {
    match value {
        Value::Objlnk(objlnk) => objlnk.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Label {
    BaseName,
    BaseTime,
    Name,
    Time,
    Value,
    String,
    Bool,
    Data,
    Objlnk,
    Unknown,
}

impl Label {
    fn from_int(label: i64) -> Label {
        match label {
            LABEL_BASE_NAME => Label::BaseName,
            LABEL_BASE_TIME => Label::BaseTime,
            LABEL_NAME => Label::Name,
            LABEL_TIME => Label::Time,
            LABEL_VALUE => Label::Value,
            LABEL_STRING => Label::String,
            LABEL_BOOL => Label::Bool,
            LABEL_DATA => Label::Data,
            _ => Label::Unknown,
        }
    }
}

#[derive(Debug, Default)]
struct RecordState {
    pairs_left: Option<u64>,
    label: Option<Label>,
    name: Option<String>,
    value: Option<Value>,
}

#[derive(Debug)]
pub struct SenmlReader {
    decoder: Decoder,
    base: Path,
    entered: bool,
    indefinite: bool,
    records_left: u64,
    record: Option<RecordState>,
    basename: String,
    done: bool,
}

impl SenmlReader {
    pub fn new(base: Path) -> Self {
        Self {
            decoder: Decoder::new(),
            base,
            entered: false,
            indefinite: false,
            records_left: 0,
            record: None,
            basename: String::new(),
            done: false,
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
                return Err(CodecError::Malformed("items after senml array"));
            }

            if !self.entered {
                match event {
                    Event::Array(Some(n)) => {
                        self.entered = true;
                        self.records_left = n;
                        if n == 0 {
                            self.done = true;
                        }
                        continue;
                    }
                    Event::Array(None) => {
                        self.entered = true;
                        self.indefinite = true;
                        continue;
                    }
                    _ => return Err(CodecError::Malformed("senml payload is not an array")),
                }
            }

            let Some(record) = self.record.as_mut() else {
                match event {
                    Event::Map(len) => {
                        self.record = Some(RecordState { pairs_left: len, ..Default::default() });
                        continue;
                    }
                    Event::Break if self.indefinite => {
                        self.done = true;
                        continue;
                    }
                    _ => return Err(CodecError::Malformed("senml record is not a map")),
                }
            };

            if record.label.is_none() {
                match event {
                    Event::Int(label) => record.label = Some(Label::from_int(label)),
                    Event::Uint(label) => {
                        let label = i64::try_from(label)
                            .map_err(|_| CodecError::Malformed("senml label out of range"))?;
                        record.label = Some(Label::from_int(label));
                    }
                    Event::Text(label) => {
                        record.label = Some(if label == LABEL_OBJLNK {
                            Label::Objlnk
                        } else {
                            Label::Unknown
                        });
                    }
                    Event::Break => {
                        // end of indefinite-length record map
                        return self.finalize_record();
                    }
                    _ => return Err(CodecError::Malformed("unexpected senml label")),
                }
                continue;
            }

            self.apply_pair(event)?;
            let record = self.record.as_mut().ok_or(CodecError::Malformed("no record"))?;
            record.label = None;
            if let Some(pairs) = record.pairs_left.as_mut() {
                *pairs -= 1;
                if *pairs == 0 {
                    return self.finalize_record();
                }
            }
        }
    }

    fn apply_pair(&mut self, event: Event) -> Result<(), CodecError> {
        let record = self.record.as_mut().ok_or(CodecError::Malformed("no record"))?;
        let label = record.label.ok_or(CodecError::Malformed("no label"))?;
        match (label, event) {
            (Label::BaseName, Event::Text(text)) => self.basename = text,
            (Label::Name, Event::Text(text)) => record.name = Some(text),
            (Label::BaseTime | Label::Time, Event::Int(_) | Event::Uint(_) | Event::Float(_)) => {}
            (Label::Value, Event::Int(v)) => record.value = Some(Value::Int(v)),
            (Label::Value, Event::Uint(v)) => record.value = Some(Value::Uint(v)),
            (Label::Value, Event::Float(v)) => record.value = Some(Value::Double(v)),
            (Label::String, Event::Text(text)) => record.value = Some(Value::text(text)),
            (Label::Bool, Event::Bool(v)) => record.value = Some(Value::Bool(v)),
            (Label::Data, Event::Bytes(data)) => record.value = Some(Value::bytes(data)),
            (Label::Objlnk, Event::Text(text)) => {
                record.value = Some(Value::Objlnk(text.parse().map_err(CodecError::Value)?));
            }
            (Label::Unknown, Event::Array(_) | Event::Map(_)) => {
                return Err(CodecError::Malformed("nested container in senml record"));
            }
            (Label::Unknown, _) => {}
            _ => return Err(CodecError::Malformed("senml value does not match label")),
        }
        Ok(())
    }

    fn finalize_record(&mut self) -> Result<Parsed, CodecError> {
        let record = self.record.take().ok_or(CodecError::Malformed("no record"))?;
        let mut full = self.basename.clone();
        if let Some(name) = &record.name {
            full.push_str(name);
        }
        let path: Path = full
            .parse()
            .map_err(|_| CodecError::Malformed("senml name is not a valid path"))?;
        if !path.starts_with(&self.base) {
            return Err(CodecError::Malformed("senml record outside request path"));
        }

        if !self.indefinite {
            self.records_left = self
                .records_left
                .checked_sub(1)
                .ok_or(CodecError::Malformed("more records than declared"))?;
            if self.records_left == 0 {
                self.done = true;
            }
        }

        Ok(Parsed::Record(Record::new(path, record.value.unwrap_or(Value::Null))))
    }
}

#[cfg(test)]
#[path = "senml_tests.rs"]
mod tests;
