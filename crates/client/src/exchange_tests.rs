// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Block pagination and exchange expiry.

use std::time::{Duration, Instant};

use mote_core::{ContentFormat, Path, Value};
use mote_codec::{encoder_for, Record};

use super::*;

fn token(byte: u8) -> Token {
    Token::from_slice(&[byte]).unwrap()
}

fn big_outbound(now: Instant) -> OutboundBlock {
    // Ten 30-byte string resources: comfortably more than two 64-byte
    // blocks of SenML output.
    let records: Vec<Record> = (0..10)
        .map(|rid| Record::new(Path::resource(3, 0, rid), Value::text("x".repeat(30))))
        .collect();
    let encoder = encoder_for(ContentFormat::SenmlCbor, Path::instance(3, 0), records.len())
        .unwrap();
    OutboundBlock::paged(ContentFormat::SenmlCbor, records, encoder, now + EXCHANGE_LIFETIME)
}

#[test]
fn byte_payloads_slice_directly() {
    let now = Instant::now();
    let mut outbound = OutboundBlock::bytes(
        ContentFormat::LinkFormat,
        (0u8..200).collect(),
        now + EXCHANGE_LIFETIME,
    );

    let first = outbound.slice(0, 64).unwrap();
    assert_eq!(first.data.len(), 64);
    assert!(first.more);

    let last = outbound.slice(3, 64).unwrap();
    assert_eq!(last.data.len(), 8);
    assert!(!last.more);
}

#[test]
fn blocks_concatenate_to_full_payload() {
    let now = Instant::now();
    let mut outbound = big_outbound(now);

    let mut assembled = Vec::new();
    let mut number = 0u32;
    loop {
        let slice = outbound.slice(number, 64).unwrap();
        assembled.extend_from_slice(&slice.data);
        if !slice.more {
            break;
        }
        number += 1;
    }
    assert!(number >= 2, "expected at least three blocks, got {}", number + 1);

    let mut reference = big_outbound(now);
    let whole = reference.slice(0, 1024).unwrap();
    assert!(!whole.more);
    assert_eq!(assembled, whole.data);
}

#[test]
fn earlier_blocks_can_be_served_again() {
    let now = Instant::now();
    let mut outbound = big_outbound(now);
    let first = outbound.slice(0, 64).unwrap().data.clone();
    let _second = outbound.slice(1, 64).unwrap();
    let again = outbound.slice(0, 64).unwrap();
    assert_eq!(again.data, first);
}

#[test]
fn block_past_end_is_an_error() {
    let now = Instant::now();
    let mut outbound = big_outbound(now);
    assert!(outbound.slice(1000, 64).is_err());
}

#[test]
fn eviction_honors_deadlines() {
    let now = Instant::now();
    let mut table = ExchangeTable::new();
    table.start_inbound(0, token(1), now);
    table.cache_response(0, 77, vec![1, 2, 3], now);

    assert!(table.inbound_mut(0, token(1)).is_some());
    assert!(table.cached_response(0, 77).is_some());

    table.evict(now + EXCHANGE_LIFETIME + Duration::from_secs(1));
    assert!(table.inbound_mut(0, token(1)).is_none());
    assert!(table.cached_response(0, 77).is_none());
}

#[test]
fn next_deadline_is_the_earliest() {
    let now = Instant::now();
    let mut table = ExchangeTable::new();
    assert_eq!(table.next_deadline(), None);
    table.cache_response(0, 1, vec![], now);
    assert_eq!(table.next_deadline(), Some(now + EXCHANGE_LIFETIME));
}

#[test]
fn inbound_reassembly_accumulates() {
    let now = Instant::now();
    let mut table = ExchangeTable::new();
    table.start_inbound(0, token(9), now);
    {
        let entry = table.inbound_mut(0, token(9)).unwrap();
        entry.buf.extend_from_slice(b"abc");
        entry.last_number = 0;
    }
    {
        let entry = table.inbound_mut(0, token(9)).unwrap();
        entry.buf.extend_from_slice(b"def");
        entry.last_number = 1;
    }
    assert_eq!(table.finish_inbound(0, token(9)), Some(b"abcdef".to_vec()));
    assert_eq!(table.finish_inbound(0, token(9)), None);
}
