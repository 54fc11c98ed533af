// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mote_core::{Chunk, Objlnk, Path, ResourceType, Value};

use super::*;
use crate::input::Parsed;

fn write_text(value: Value) -> Vec<u8> {
    let mut writer = TextWriter::new();
    writer.add(&Record::new(Path::resource(3, 0, 9), value)).unwrap();
    writer.finish().unwrap();
    std::mem::take(writer.output_mut())
}

#[yare::parameterized(
    int = { Value::Int(-42), "-42" },
    uint = { Value::Uint(19), "19" },
    time = { Value::Time(1363896240), "1363896240" },
    double_integral = { Value::Double(45.0), "45" },
    double_fraction = { Value::Double(4.5), "4.5" },
    bool_false = { Value::Bool(false), "0" },
    bool_true = { Value::Bool(true), "1" },
    objlnk = { Value::Objlnk(Objlnk { oid: 1, iid: 3 }), "1:3" },
    string = { Value::text("hello"), "hello" },
)]
fn scalar_emission(value: Value, expected: &str) {
    assert_eq!(write_text(value), expected.as_bytes());
}

#[test]
fn bytes_emit_base64() {
    assert_eq!(write_text(Value::bytes(vec![0xde, 0xad, 0xbe, 0xef])), b"3q2+7w==");
}

fn read_scalar(text: &str, expected: ResourceType) -> Value {
    let mut reader = TextReader::new(Path::resource(3, 0, 9), expected);
    reader.feed(text.as_bytes());
    reader.end();
    let Parsed::Record(record) = reader.next().unwrap() else {
        panic!("expected record");
    };
    assert_eq!(reader.next().unwrap(), Parsed::Done);
    record.value
}

#[yare::parameterized(
    int = { "-42", ResourceType::Int, Value::Int(-42) },
    uint = { "7", ResourceType::Uint, Value::Uint(7) },
    double = { "4.5", ResourceType::Double, Value::Double(4.5) },
    bool_true = { "1", ResourceType::Bool, Value::Bool(true) },
    time = { "60", ResourceType::Time, Value::Time(60) },
    objlnk = { "3:0", ResourceType::Objlnk, Value::Objlnk(Objlnk { oid: 3, iid: 0 }) },
    string = { "abc", ResourceType::Text, Value::text("abc") },
)]
fn scalar_parsing(text: &str, expected_type: ResourceType, expected: Value) {
    assert_eq!(read_scalar(text, expected_type), expected);
}

#[yare::parameterized(
    int_garbage = { "4x", ResourceType::Int },
    bool_two = { "2", ResourceType::Bool },
    double_empty = { "", ResourceType::Double },
)]
fn scalar_parse_failures(text: &str, expected_type: ResourceType) {
    let mut reader = TextReader::new(Path::resource(3, 0, 9), expected_type);
    reader.feed(text.as_bytes());
    reader.end();
    assert!(reader.next().is_err());
}

#[test]
fn base64_streams_in_chunks() {
    // "3q2+7w==" decodes to de ad be ef; feed it split mid-group.
    let mut reader = TextReader::new(Path::resource(5, 0, 0), ResourceType::Bytes);
    reader.feed(b"3q2");
    assert_eq!(reader.next().unwrap(), Parsed::Pending);

    reader.feed(b"+7w");
    // One whole group is available: decodes to the first 3 bytes.
    let Parsed::Record(record) = reader.next().unwrap() else {
        panic!("expected chunk");
    };
    assert_eq!(
        record.value,
        Value::Bytes(Chunk::part(vec![0xde, 0xad, 0xbe], 0, None))
    );

    reader.feed(b"==");
    reader.end();
    let Parsed::Record(record) = reader.next().unwrap() else {
        panic!("expected final chunk");
    };
    assert_eq!(record.value, Value::Bytes(Chunk::part(vec![0xef], 3, Some(4))));
    assert_eq!(reader.next().unwrap(), Parsed::Done);
}

#[test]
fn empty_base64_is_empty_value() {
    let mut reader = TextReader::new(Path::resource(5, 0, 0), ResourceType::Bytes);
    reader.end();
    let Parsed::Record(record) = reader.next().unwrap() else {
        panic!("expected record");
    };
    assert_eq!(record.value, Value::Bytes(Chunk::complete(Vec::new())));
    assert_eq!(reader.next().unwrap(), Parsed::Done);
}

#[test]
fn ragged_base64_rejected() {
    let mut reader = TextReader::new(Path::resource(5, 0, 0), ResourceType::Bytes);
    reader.feed(b"3q2+7");
    reader.end();
    assert!(reader.next().is_err());
}
