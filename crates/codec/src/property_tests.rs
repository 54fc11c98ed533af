// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codec round-trip properties: reading back a written payload yields the
//! original records.

use mote_core::{ContentFormat, Objlnk, Path, Value};
use proptest::prelude::*;

use crate::input::{decoder_for, Parsed};
use crate::out::encoder_for;
use crate::record::Record;

fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::Uint),
        any::<f64>().prop_filter("finite", |v| v.is_finite()).prop_map(Value::Double),
        any::<bool>().prop_map(Value::Bool),
        "[a-zA-Z0-9 ]{0,24}".prop_map(Value::text),
        prop::collection::vec(any::<u8>(), 0..24).prop_map(Value::bytes),
        (0u16..65535, 0u16..65535).prop_map(|(oid, iid)| Value::Objlnk(Objlnk { oid, iid })),
    ]
}

fn record_set_strategy() -> impl Strategy<Value = Vec<Record>> {
    // distinct ascending resource paths under one instance
    (
        prop::collection::btree_set(0u16..100, 1..8),
        prop::collection::vec(scalar_value_strategy(), 8),
    )
        .prop_map(|(rids, values)| {
            rids.into_iter()
                .zip(values)
                .map(|(rid, value)| Record::new(Path::resource(4, 0, rid), value))
                .collect()
        })
}

fn normalize(value: &Value) -> Value {
    match value {
        // SenML carries time as numeric v; readers return the raw integer,
        // and non-negative integers surface as Uint until coerced by the
        // data model.
        Value::Time(v) if *v >= 0 => Value::Uint(*v as u64),
        Value::Time(v) => Value::Int(*v),
        Value::Int(v) if *v >= 0 => Value::Uint(*v as u64),
        other => other.clone(),
    }
}

proptest! {
    #[test]
    fn senml_roundtrip(records in record_set_strategy()) {
        let base = Path::instance(4, 0);
        let mut writer = encoder_for(ContentFormat::SenmlCbor, base, records.len()).unwrap();
        for record in &records {
            writer.add(record).unwrap();
        }
        writer.finish().unwrap();
        let wire = std::mem::take(writer.output_mut());

        let decoder = decoder_for(112, base, None).unwrap();
        let read = decoder.read_all(&wire).unwrap();

        prop_assert_eq!(read.len(), records.len());
        for (got, want) in read.iter().zip(&records) {
            prop_assert_eq!(got.path, want.path);
            prop_assert_eq!(&got.value, &normalize(&want.value));
        }
    }

    #[test]
    fn lwm2m_cbor_roundtrip(records in record_set_strategy()) {
        let base = Path::instance(4, 0);
        let mut writer = encoder_for(ContentFormat::Lwm2mCbor, base, records.len()).unwrap();
        for record in &records {
            writer.add(record).unwrap();
        }
        writer.finish().unwrap();
        let wire = std::mem::take(writer.output_mut());

        let decoder = decoder_for(11544, base, None).unwrap();
        let read = decoder.read_all(&wire).unwrap();

        prop_assert_eq!(read.len(), records.len());
        for (got, want) in read.iter().zip(&records) {
            prop_assert_eq!(got.path, want.path);
        }
    }

    /// Incremental feeding yields the same records as one-shot feeding,
    /// no matter where the payload is split.
    #[test]
    fn senml_split_invariance(records in record_set_strategy(), split in 0usize..64) {
        let base = Path::instance(4, 0);
        let mut writer = encoder_for(ContentFormat::SenmlCbor, base, records.len()).unwrap();
        for record in &records {
            writer.add(record).unwrap();
        }
        writer.finish().unwrap();
        let wire = std::mem::take(writer.output_mut());

        let whole = decoder_for(112, base, None).unwrap().read_all(&wire).unwrap();

        let split = split.min(wire.len());
        let mut decoder = decoder_for(112, base, None).unwrap();
        decoder.feed(&wire[..split]);
        let mut chunked = Vec::new();
        loop {
            match decoder.next().unwrap() {
                Parsed::Record(record) => chunked.push(record),
                Parsed::Pending => break,
                Parsed::Done => break,
            }
        }
        decoder.feed(&wire[split..]);
        decoder.end();
        loop {
            match decoder.next().unwrap() {
                Parsed::Record(record) => chunked.push(record),
                Parsed::Pending => {}
                Parsed::Done => break,
            }
        }
        prop_assert_eq!(chunked, whole);
    }
}
