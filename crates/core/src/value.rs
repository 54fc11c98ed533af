// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed resource values.
//!
//! A [`Value`] is what flows between the data model and the content-format
//! codecs. Bytes and strings travel as [`Chunk`]s so a single large value
//! can span several payload blocks; [`ExternalValue`] wraps a pull source
//! for values that are produced on demand instead of stored.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("value type {found} cannot be stored in a {expected} resource")]
    TypeMismatch { expected: ResourceType, found: &'static str },

    #[error("numeric value out of range for {0}")]
    OutOfRange(ResourceType),

    #[error("invalid objlnk text '{0}'")]
    BadObjlnk(String),

    #[error("external source read failed at offset {offset}")]
    ExternalRead { offset: usize },
}

/// An Object Instance reference, carried on the wire as `OID:IID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Objlnk {
    pub oid: u16,
    pub iid: u16,
}

impl fmt::Display for Objlnk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.oid, self.iid)
    }
}

impl FromStr for Objlnk {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ValueError::BadObjlnk(s.to_string());
        let (oid, iid) = s.split_once(':').ok_or_else(bad)?;
        Ok(Objlnk {
            oid: oid.parse().map_err(|_| bad())?,
            iid: iid.parse().map_err(|_| bad())?,
        })
    }
}

/// A slice of a byte or text value.
///
/// `offset` is where this chunk sits within the whole value; `total` is the
/// full length once known. A chunk with `offset == 0` and
/// `total == Some(data.len())` is a complete value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chunk {
    pub data: Vec<u8>,
    pub offset: usize,
    pub total: Option<usize>,
}

impl Chunk {
    /// A chunk holding an entire value.
    pub fn complete(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let total = Some(data.len());
        Self { data, offset: 0, total }
    }

    /// A partial chunk at `offset`; `total` stays unknown until the final
    /// chunk reports it.
    pub fn part(data: impl Into<Vec<u8>>, offset: usize, total: Option<usize>) -> Self {
        Self { data: data.into(), offset, total }
    }

    /// True once the end of the value is known to be reached.
    pub fn is_final(&self) -> bool {
        self.total == Some(self.offset + self.data.len())
    }

    pub fn is_complete(&self) -> bool {
        self.offset == 0 && self.is_final()
    }
}

/// Pull source for values produced on demand (large firmware blobs,
/// generated reports). The codec asks for ranges; the source must be able
/// to serve any offset, since block transfers may re-request a range.
pub trait ExternalSource: Send + Sync {
    /// Fill `buf` with bytes starting at `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), ValueError>;
}

impl<F> ExternalSource for F
where
    F: Fn(usize, &mut [u8]) -> Result<(), ValueError> + Send + Sync,
{
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), ValueError> {
        self(offset, buf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Bytes,
    Text,
}

/// An output-only value served by an [`ExternalSource`].
#[derive(Clone)]
pub struct ExternalValue {
    source: Arc<dyn ExternalSource>,
    pub kind: ExternalKind,
    pub length: usize,
}

impl ExternalValue {
    pub fn bytes(source: Arc<dyn ExternalSource>, length: usize) -> Self {
        Self { source, kind: ExternalKind::Bytes, length }
    }

    pub fn text(source: Arc<dyn ExternalSource>, length: usize) -> Self {
        Self { source, kind: ExternalKind::Text, length }
    }

    pub fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), ValueError> {
        self.source.read(offset, buf)
    }
}

impl fmt::Debug for ExternalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalValue")
            .field("kind", &self.kind)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ExternalValue {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.length == other.length
            && Arc::ptr_eq(&self.source, &other.source)
    }
}

/// The value slot of a data model entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value: aggregate markers in composite payloads and resource
    /// instance removal requests.
    #[default]
    Null,
    Bytes(Chunk),
    Text(Chunk),
    Int(i64),
    Uint(u64),
    Double(f64),
    Bool(bool),
    Objlnk(Objlnk),
    Time(i64),
    External(ExternalValue),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(Chunk::complete(s.into().into_bytes()))
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(Chunk::complete(b))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "string",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Objlnk(_) => "objlnk",
            Value::Time(_) => "time",
            Value::External(_) => "external",
        }
    }

    /// Numeric view used by threshold evaluation (`lt`/`gt`/`st`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Uint(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Time(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Coerce this value into the resource's declared type, range-checking
    /// numeric conversions. Identity for already-matching values.
    pub fn coerce_to(self, ty: ResourceType) -> Result<Value, ValueError> {
        let mismatch = |v: &Value| ValueError::TypeMismatch { expected: ty, found: v.type_name() };
        match (ty, self) {
            (ResourceType::Bytes, v @ Value::Bytes(_)) => Ok(v),
            (ResourceType::Text, v @ Value::Text(_)) => Ok(v),
            (ResourceType::Int, v @ Value::Int(_)) => Ok(v),
            (ResourceType::Int, Value::Uint(u)) => i64::try_from(u)
                .map(Value::Int)
                .map_err(|_| ValueError::OutOfRange(ty)),
            (ResourceType::Uint, v @ Value::Uint(_)) => Ok(v),
            (ResourceType::Uint, Value::Int(i)) => u64::try_from(i)
                .map(Value::Uint)
                .map_err(|_| ValueError::OutOfRange(ty)),
            (ResourceType::Double, v @ Value::Double(_)) => Ok(v),
            (ResourceType::Double, Value::Int(i)) => Ok(Value::Double(i as f64)),
            (ResourceType::Double, Value::Uint(u)) => Ok(Value::Double(u as f64)),
            (ResourceType::Bool, v @ Value::Bool(_)) => Ok(v),
            (ResourceType::Objlnk, v @ Value::Objlnk(_)) => Ok(v),
            // CBOR-based formats carry objlnk as "OID:IID" text
            (ResourceType::Objlnk, Value::Text(chunk)) => {
                let text = std::str::from_utf8(&chunk.data)
                    .map_err(|_| ValueError::BadObjlnk(String::new()))?;
                text.parse().map(Value::Objlnk)
            }
            (ResourceType::Time, v @ Value::Time(_)) => Ok(v),
            (ResourceType::Time, Value::Int(i)) => Ok(Value::Time(i)),
            (ResourceType::Time, Value::Uint(u)) => i64::try_from(u)
                .map(Value::Time)
                .map_err(|_| ValueError::OutOfRange(ty)),
            (_, other) => Err(mismatch(&other)),
        }
    }
}

/// Declared type of a resource; fixed for the resource's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Bytes,
    Text,
    Int,
    Uint,
    Double,
    Bool,
    Objlnk,
    Time,
}

impl ResourceType {
    /// The zero value written when an absent mandatory resource is reset.
    pub fn zero(&self) -> Value {
        match self {
            ResourceType::Bytes => Value::bytes(Vec::new()),
            ResourceType::Text => Value::text(""),
            ResourceType::Int => Value::Int(0),
            ResourceType::Uint => Value::Uint(0),
            ResourceType::Double => Value::Double(0.0),
            ResourceType::Bool => Value::Bool(false),
            ResourceType::Objlnk => Value::Objlnk(Objlnk { oid: 0, iid: 0 }),
            ResourceType::Time => Value::Time(0),
        }
    }
}

crate::simple_display! {
    ResourceType {
        Bytes => "bytes",
        Text => "string",
        Int => "int",
        Uint => "uint",
        Double => "double",
        Bool => "bool",
        Objlnk => "objlnk",
        Time => "time",
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
