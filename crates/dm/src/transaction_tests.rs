// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-object atomic commit and rollback.

use mote_core::{ResourceType, Value};

use super::*;
use crate::object::{DmOperation, ObjectHandler, Ops};
use crate::registry::Registry;
use crate::static_object::{ResourceSpec, StaticObject};

fn counter_object(oid: u16, reject_negative: bool) -> StaticObject {
    let builder = StaticObject::builder(oid)
        .resource(ResourceSpec::single(0, Ops::ReadWrite, ResourceType::Int));
    let builder = if reject_negative {
        builder.validator(|object| match object.value(0, 0, None) {
            Some(Value::Int(v)) if v < 0 => Err(DmError::ValidationFailed("negative")),
            _ => Ok(()),
        })
    } else {
        builder
    };
    let mut object = builder.build();
    object.add_instance(0).unwrap();
    object.set(0, 0, Value::Int(10)).unwrap();
    object
}

fn registry(reject_negative_in_7: bool) -> Registry {
    let mut registry = Registry::new();
    registry.register(5, Box::new(counter_object(5, false))).unwrap();
    registry.register(7, Box::new(counter_object(7, reject_negative_in_7))).unwrap();
    registry
}

fn write(registry: &mut Registry, oid: u16, value: i64) {
    registry
        .handler_mut(oid)
        .unwrap()
        .write(0, 0, None, Value::Int(value))
        .unwrap();
}

fn value(registry: &Registry, oid: u16) -> Value {
    registry.handler(oid).unwrap().read(0, 0, None).unwrap()
}

#[test]
fn join_is_idempotent_per_object() {
    let mut registry = registry(false);
    let mut tx = Transaction::new();
    tx.join(&mut registry, 5, DmOperation::Write).unwrap();
    tx.join(&mut registry, 5, DmOperation::Write).unwrap();
    tx.join(&mut registry, 7, DmOperation::Write).unwrap();
    assert_eq!(tx.participants(), &[5, 7]);
}

#[test]
fn participants_stay_sorted_by_oid() {
    let mut registry = registry(false);
    let mut tx = Transaction::new();
    tx.join(&mut registry, 7, DmOperation::Write).unwrap();
    tx.join(&mut registry, 5, DmOperation::Write).unwrap();
    assert_eq!(tx.participants(), &[5, 7]);
}

#[test]
fn commit_applies_across_objects() {
    let mut registry = registry(false);
    let mut tx = Transaction::new();
    tx.join(&mut registry, 5, DmOperation::Write).unwrap();
    tx.join(&mut registry, 7, DmOperation::Write).unwrap();
    write(&mut registry, 5, 50);
    write(&mut registry, 7, 70);

    tx.commit(&mut registry).unwrap();
    assert_eq!(value(&registry, 5), Value::Int(50));
    assert_eq!(value(&registry, 7), Value::Int(70));
}

#[test]
fn validate_failure_rolls_back_every_participant() {
    let mut registry = registry(true);
    let mut tx = Transaction::new();
    tx.join(&mut registry, 5, DmOperation::Write).unwrap();
    tx.join(&mut registry, 7, DmOperation::Write).unwrap();
    write(&mut registry, 5, 50);
    write(&mut registry, 7, -1);

    let error = tx.commit(&mut registry).unwrap_err();
    assert_eq!(error, DmError::ValidationFailed("negative"));
    // object 5 was valid but must roll back with the rest
    assert_eq!(value(&registry, 5), Value::Int(10));
    assert_eq!(value(&registry, 7), Value::Int(10));
}

#[test]
fn validate_phase_visits_every_participant() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let validated = Arc::new(AtomicUsize::new(0));

    let mut registry = Registry::new();
    for (oid, fail) in [(5u16, true), (7u16, false)] {
        let seen = Arc::clone(&validated);
        let mut object = StaticObject::builder(oid)
            .resource(ResourceSpec::single(0, Ops::ReadWrite, ResourceType::Int))
            .validator(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(DmError::ValidationFailed("no"))
                } else {
                    Ok(())
                }
            })
            .build();
        object.add_instance(0).unwrap();
        object.set(0, 0, Value::Int(10)).unwrap();
        registry.register(oid, Box::new(object)).unwrap();
    }

    let mut tx = Transaction::new();
    tx.join(&mut registry, 5, DmOperation::Write).unwrap();
    tx.join(&mut registry, 7, DmOperation::Write).unwrap();
    write(&mut registry, 5, 50);
    write(&mut registry, 7, 70);

    // object 5 fails first, but object 7 still sees its validate phase
    assert!(tx.commit(&mut registry).is_err());
    assert_eq!(validated.load(Ordering::SeqCst), 2);
    assert_eq!(value(&registry, 5), Value::Int(10));
    assert_eq!(value(&registry, 7), Value::Int(10));
}

#[test]
fn explicit_rollback_restores_state() {
    let mut registry = registry(false);
    let mut tx = Transaction::new();
    tx.join(&mut registry, 5, DmOperation::Write).unwrap();
    write(&mut registry, 5, 99);

    tx.rollback(&mut registry);
    assert_eq!(value(&registry, 5), Value::Int(10));
}

#[test]
fn join_unknown_object_fails() {
    let mut registry = registry(false);
    let mut tx = Transaction::new();
    assert_eq!(
        tx.join(&mut registry, 42, DmOperation::Write),
        Err(DmError::NotFound)
    );
}
