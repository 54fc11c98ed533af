// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A storage-backed object: declared resource schema, sparse instance
//! table, typed value slots and snapshot-based transactions.
//!
//! Most objects in a client are plain data holders; this implementation
//! covers them without custom handler code. Objects with side effects
//! implement [`ObjectHandler`] directly instead.

use std::collections::BTreeMap;
use std::collections::HashMap;

use mote_core::{Chunk, ObjectVersion, ResourceType, Value, ID_INVALID};

use crate::error::DmError;
use crate::object::{DmOperation, ObjectHandler, Ops, ResourceInfo};

/// Schema of one declared resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSpec {
    pub rid: u16,
    pub ops: Ops,
    pub multiple: bool,
    /// `None` only for executable resources.
    pub ty: Option<ResourceType>,
    pub mandatory: bool,
}

impl ResourceSpec {
    pub fn single(rid: u16, ops: Ops, ty: ResourceType) -> Self {
        Self { rid, ops, multiple: false, ty: Some(ty), mandatory: false }
    }

    pub fn multiple(rid: u16, ops: Ops, ty: ResourceType) -> Self {
        Self { rid, ops, multiple: true, ty: Some(ty), mandatory: false }
    }

    pub fn executable(rid: u16) -> Self {
        Self { rid, ops: Ops::Execute, multiple: false, ty: None, mandatory: false }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Single(Option<Value>),
    Multiple(BTreeMap<u16, Value>),
}

#[derive(Debug, Clone, PartialEq)]
struct InstanceState {
    slots: Vec<Slot>,
}

type ExecHandler = Box<dyn FnMut(u16, &[u8]) -> Result<(), DmError> + Send>;
type Validator = Box<dyn Fn(&StaticObject) -> Result<(), DmError> + Send>;

pub struct StaticObject {
    oid: u16,
    version: Option<ObjectVersion>,
    max_instances: Option<usize>,
    specs: Vec<ResourceSpec>,
    instances: BTreeMap<u16, InstanceState>,
    snapshot: Option<BTreeMap<u16, InstanceState>>,
    exec_handlers: HashMap<u16, ExecHandler>,
    validator: Option<Validator>,
}

impl std::fmt::Debug for StaticObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticObject")
            .field("oid", &self.oid)
            .field("version", &self.version)
            .field("instances", &self.instances.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

pub struct StaticObjectBuilder {
    object: StaticObject,
}

impl StaticObject {
    pub fn builder(oid: u16) -> StaticObjectBuilder {
        StaticObjectBuilder {
            object: StaticObject {
                oid,
                version: None,
                max_instances: None,
                specs: Vec::new(),
                instances: BTreeMap::new(),
                snapshot: None,
                exec_handlers: HashMap::new(),
                validator: None,
            },
        }
    }

    pub fn oid(&self) -> u16 {
        self.oid
    }

    /// Host-side instance creation during setup; ignores capacity checks
    /// meant for server-initiated Create.
    pub fn add_instance(&mut self, iid: u16) -> Result<(), DmError> {
        if iid == ID_INVALID {
            return Err(DmError::BadRequest("reserved instance id"));
        }
        if self.instances.contains_key(&iid) {
            return Err(DmError::BadRequest("instance already exists"));
        }
        self.instances.insert(iid, self.blank_instance());
        Ok(())
    }

    /// Host-side write, bypassing the operation-set check so read-only
    /// resources can be populated.
    pub fn set(&mut self, iid: u16, rid: u16, value: Value) -> Result<(), DmError> {
        self.store(iid, rid, None, value, false)
    }

    pub fn set_multi(&mut self, iid: u16, rid: u16, riid: u16, value: Value) -> Result<(), DmError> {
        self.store(iid, rid, Some(riid), value, false)
    }

    /// Current value, for hosts and tests.
    pub fn value(&self, iid: u16, rid: u16, riid: Option<u16>) -> Option<Value> {
        self.read(iid, rid, riid).ok()
    }

    fn blank_instance(&self) -> InstanceState {
        InstanceState {
            slots: self
                .specs
                .iter()
                .map(|spec| {
                    if spec.multiple {
                        Slot::Multiple(BTreeMap::new())
                    } else {
                        Slot::Single(None)
                    }
                })
                .collect(),
        }
    }

    fn spec_index(&self, rid: u16) -> Result<usize, DmError> {
        self.specs
            .iter()
            .position(|spec| spec.rid == rid)
            .ok_or(DmError::NotFound)
    }

    fn store(
        &mut self,
        iid: u16,
        rid: u16,
        riid: Option<u16>,
        value: Value,
        check_ops: bool,
    ) -> Result<(), DmError> {
        let index = self.spec_index(rid)?;
        let spec = self.specs[index];
        if check_ops && !spec.ops.writable() {
            return Err(DmError::MethodNotAllowed);
        }
        let ty = spec.ty.ok_or(DmError::MethodNotAllowed)?;

        let instance = self.instances.get_mut(&iid).ok_or(DmError::NotFound)?;
        let slot = &mut instance.slots[index];
        match (slot, spec.multiple, riid) {
            (Slot::Single(stored), false, None) => {
                *stored = Some(merge_value(stored.take(), value, ty)?);
                Ok(())
            }
            (Slot::Multiple(map), true, Some(riid)) => {
                if riid == ID_INVALID {
                    return Err(DmError::BadRequest("reserved resource instance id"));
                }
                let previous = map.remove(&riid);
                map.insert(riid, merge_value(previous, value, ty)?);
                Ok(())
            }
            (Slot::Multiple(_), true, None) => {
                Err(DmError::BadRequest("multi-instance resource needs a riid"))
            }
            _ => Err(DmError::BadRequest("riid on a single-instance resource")),
        }
    }
}

/// Apply a (possibly chunked) incoming value on top of the stored one.
fn merge_value(stored: Option<Value>, incoming: Value, ty: ResourceType) -> Result<Value, DmError> {
    let offset = match &incoming {
        Value::Bytes(chunk) | Value::Text(chunk) => chunk.offset,
        _ => 0,
    };
    if offset == 0 {
        return Ok(incoming.coerce_to(ty)?);
    }

    // continuation chunk: append to what the earlier chunks built up
    let (mut data, incoming_chunk, text) = match (stored, incoming) {
        (Some(Value::Bytes(stored)), Value::Bytes(chunk)) => (stored.data, chunk, false),
        (Some(Value::Text(stored)), Value::Text(chunk)) => (stored.data, chunk, true),
        _ => return Err(DmError::BadRequest("continuation chunk without a start")),
    };
    if data.len() != incoming_chunk.offset {
        return Err(DmError::BadRequest("continuation chunk out of sequence"));
    }
    data.extend_from_slice(&incoming_chunk.data);
    let chunk = Chunk::complete(data);
    Ok(if text { Value::Text(chunk) } else { Value::Bytes(chunk) })
}

impl ObjectHandler for StaticObject {
    fn version(&self) -> Option<ObjectVersion> {
        self.version
    }

    fn operation_begin(&mut self, op: DmOperation) -> Result<(), DmError> {
        if op.is_mutating() {
            self.transaction_begin()?;
        }
        Ok(())
    }

    fn operation_end(&mut self, success: bool) {
        if self.snapshot.is_some() {
            if success {
                self.snapshot = None;
            } else {
                let _ = self.transaction_rollback();
            }
        }
    }

    fn transaction_begin(&mut self) -> Result<(), DmError> {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.instances.clone());
        }
        Ok(())
    }

    fn transaction_validate(&mut self) -> Result<(), DmError> {
        if let Some(validator) = self.validator.take() {
            let result = validator(self);
            self.validator = Some(validator);
            return result;
        }
        Ok(())
    }

    fn transaction_commit(&mut self) -> Result<(), DmError> {
        self.snapshot = None;
        Ok(())
    }

    fn transaction_rollback(&mut self) -> Result<(), DmError> {
        if let Some(snapshot) = self.snapshot.take() {
            self.instances = snapshot;
        }
        Ok(())
    }

    fn instances(&self) -> Vec<u16> {
        self.instances.keys().copied().collect()
    }

    fn create_instance(&mut self, iid: Option<u16>) -> Result<u16, DmError> {
        if let Some(max) = self.max_instances {
            if self.instances.len() >= max {
                return Err(DmError::Forbidden("instance capacity reached"));
            }
        }
        let iid = match iid {
            Some(iid) => {
                if iid == ID_INVALID {
                    return Err(DmError::BadRequest("reserved instance id"));
                }
                if self.instances.contains_key(&iid) {
                    return Err(DmError::BadRequest("instance already exists"));
                }
                iid
            }
            None => smallest_free_id(&self.instances)?,
        };
        self.instances.insert(iid, self.blank_instance());
        Ok(iid)
    }

    fn delete_instance(&mut self, iid: u16) -> Result<(), DmError> {
        self.instances.remove(&iid).map(|_| ()).ok_or(DmError::NotFound)
    }

    fn reset_instance(&mut self, iid: u16) -> Result<(), DmError> {
        let blank = self.blank_instance();
        let specs = self.specs.clone();
        let instance = self.instances.get_mut(&iid).ok_or(DmError::NotFound)?;
        *instance = blank;
        for (index, spec) in specs.iter().enumerate() {
            if !spec.mandatory {
                continue;
            }
            match (&mut instance.slots[index], spec.ty) {
                (Slot::Single(slot), Some(ty)) => *slot = Some(ty.zero()),
                // a mandatory multi-instance resource keeps one
                // zero-valued instance rather than going absent
                (Slot::Multiple(map), Some(ty)) => {
                    map.insert(0, ty.zero());
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn resources(&self, iid: u16) -> Result<Vec<ResourceInfo>, DmError> {
        let instance = self.instances.get(&iid).ok_or(DmError::NotFound)?;
        Ok(self
            .specs
            .iter()
            .enumerate()
            .map(|(index, spec)| ResourceInfo {
                rid: spec.rid,
                ops: spec.ops,
                multiple: spec.multiple,
                ty: spec.ty,
                mandatory: spec.mandatory,
                present: match &instance.slots[index] {
                    Slot::Single(value) => spec.ops.executable() || value.is_some(),
                    Slot::Multiple(map) => !map.is_empty(),
                },
            })
            .collect())
    }

    fn resource_instances(&self, iid: u16, rid: u16) -> Result<Vec<u16>, DmError> {
        let index = self.spec_index(rid)?;
        let instance = self.instances.get(&iid).ok_or(DmError::NotFound)?;
        match &instance.slots[index] {
            Slot::Multiple(map) => Ok(map.keys().copied().collect()),
            Slot::Single(_) => Err(DmError::BadRequest("not a multi-instance resource")),
        }
    }

    fn read(&self, iid: u16, rid: u16, riid: Option<u16>) -> Result<Value, DmError> {
        let index = self.spec_index(rid)?;
        let instance = self.instances.get(&iid).ok_or(DmError::NotFound)?;
        match (&instance.slots[index], riid) {
            (Slot::Single(value), None) => value.clone().ok_or(DmError::NotFound),
            (Slot::Multiple(map), Some(riid)) => map.get(&riid).cloned().ok_or(DmError::NotFound),
            (Slot::Multiple(_), None) => {
                Err(DmError::BadRequest("multi-instance resource needs a riid"))
            }
            (Slot::Single(_), Some(_)) => Err(DmError::NotFound),
        }
    }

    fn write(
        &mut self,
        iid: u16,
        rid: u16,
        riid: Option<u16>,
        value: Value,
    ) -> Result<(), DmError> {
        self.store(iid, rid, riid, value, true)
    }

    fn write_unrestricted(
        &mut self,
        iid: u16,
        rid: u16,
        riid: Option<u16>,
        value: Value,
    ) -> Result<(), DmError> {
        self.store(iid, rid, riid, value, false)
    }

    fn clear_resource(&mut self, iid: u16, rid: u16) -> Result<(), DmError> {
        let index = self.spec_index(rid)?;
        let instance = self.instances.get_mut(&iid).ok_or(DmError::NotFound)?;
        match &mut instance.slots[index] {
            Slot::Multiple(map) => {
                map.clear();
                Ok(())
            }
            Slot::Single(value) => {
                *value = None;
                Ok(())
            }
        }
    }

    fn delete_resource_instance(&mut self, iid: u16, rid: u16, riid: u16) -> Result<(), DmError> {
        let index = self.spec_index(rid)?;
        let instance = self.instances.get_mut(&iid).ok_or(DmError::NotFound)?;
        match &mut instance.slots[index] {
            Slot::Multiple(map) => map.remove(&riid).map(|_| ()).ok_or(DmError::NotFound),
            Slot::Single(_) => Err(DmError::BadRequest("not a multi-instance resource")),
        }
    }

    fn execute(&mut self, iid: u16, rid: u16, args: &[u8]) -> Result<(), DmError> {
        let index = self.spec_index(rid)?;
        if !self.specs[index].ops.executable() {
            return Err(DmError::MethodNotAllowed);
        }
        if !self.instances.contains_key(&iid) {
            return Err(DmError::NotFound);
        }
        match self.exec_handlers.get_mut(&rid) {
            Some(handler) => handler(iid, args),
            None => Err(DmError::MethodNotAllowed),
        }
    }
}

fn smallest_free_id(instances: &BTreeMap<u16, InstanceState>) -> Result<u16, DmError> {
    let mut candidate = 0u16;
    for &iid in instances.keys() {
        if iid > candidate {
            break;
        }
        candidate = iid
            .checked_add(1)
            .ok_or(DmError::Internal("instance id space exhausted"))?;
    }
    if candidate == ID_INVALID {
        return Err(DmError::Internal("instance id space exhausted"));
    }
    Ok(candidate)
}

impl StaticObjectBuilder {
    pub fn version(mut self, major: u8, minor: u8) -> Self {
        self.object.version = Some(ObjectVersion::new(major, minor));
        self
    }

    pub fn max_instances(mut self, max: usize) -> Self {
        self.object.max_instances = Some(max);
        self
    }

    /// Declare a resource; keeps the schema sorted by RID.
    pub fn resource(mut self, spec: ResourceSpec) -> Self {
        let at = self
            .object
            .specs
            .partition_point(|existing| existing.rid < spec.rid);
        self.object.specs.insert(at, spec);
        self
    }

    pub fn on_execute(
        mut self,
        rid: u16,
        handler: impl FnMut(u16, &[u8]) -> Result<(), DmError> + Send + 'static,
    ) -> Self {
        self.object.exec_handlers.insert(rid, Box::new(handler));
        self
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&StaticObject) -> Result<(), DmError> + Send + 'static,
    ) -> Self {
        self.object.validator = Some(Box::new(validator));
        self
    }

    pub fn build(self) -> StaticObject {
        self.object
    }
}

#[cfg(test)]
#[path = "static_object_tests.rs"]
mod tests;
