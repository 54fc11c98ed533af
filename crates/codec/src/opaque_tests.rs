// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mote_core::{Chunk, Path, Value};

use super::*;
use crate::input::Parsed;

#[test]
fn writer_copies_bytes_through() {
    let mut writer = OpaqueWriter::new();
    writer
        .add(&Record::new(Path::resource(5, 0, 0), Value::bytes(vec![1, 2, 3])))
        .unwrap();
    writer.finish().unwrap();
    assert_eq!(writer.output_mut().as_slice(), &[1, 2, 3]);
}

#[test]
fn writer_rejects_non_bytes() {
    let mut writer = OpaqueWriter::new();
    assert!(writer.add(&Record::new(Path::resource(5, 0, 0), Value::Int(1))).is_err());
}

#[test]
fn reader_streams_chunks_with_offsets() {
    let mut reader = OpaqueReader::new(Path::resource(5, 0, 0));
    reader.feed(&[1, 2, 3]);
    let Parsed::Record(first) = reader.next().unwrap() else {
        panic!("expected chunk");
    };
    assert_eq!(first.value, Value::Bytes(Chunk::part(vec![1, 2, 3], 0, None)));

    reader.feed(&[4, 5]);
    reader.end();
    let Parsed::Record(second) = reader.next().unwrap() else {
        panic!("expected final chunk");
    };
    assert_eq!(second.value, Value::Bytes(Chunk::part(vec![4, 5], 3, Some(5))));
    assert_eq!(reader.next().unwrap(), Parsed::Done);
}

#[test]
fn empty_stream_is_empty_value() {
    let mut reader = OpaqueReader::new(Path::resource(5, 0, 0));
    reader.end();
    let Parsed::Record(record) = reader.next().unwrap() else {
        panic!("expected record");
    };
    assert_eq!(record.value, Value::Bytes(Chunk::complete(Vec::new())));
    assert_eq!(reader.next().unwrap(), Parsed::Done);
}
