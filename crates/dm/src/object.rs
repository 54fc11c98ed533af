// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The object handler capability set.
//!
//! Every method has a default that refuses the operation, so an object
//! implements only the slots it supports; the engine turns the refusal
//! into a 4.05 response.

use mote_core::{ObjectVersion, ResourceType, Value};

use crate::error::DmError;

/// What kind of data model operation is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmOperation {
    Read,
    Discover,
    Write,
    Create,
    Delete,
    Execute,
    Register,
}

impl DmOperation {
    pub fn is_mutating(&self) -> bool {
        matches!(self, DmOperation::Write | DmOperation::Create | DmOperation::Delete)
    }
}

/// A resource's operation set, the `R/W/RW/E` part of its spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ops {
    Read,
    Write,
    ReadWrite,
    Execute,
}

impl Ops {
    pub fn readable(&self) -> bool {
        matches!(self, Ops::Read | Ops::ReadWrite)
    }

    pub fn writable(&self) -> bool {
        matches!(self, Ops::Write | Ops::ReadWrite)
    }

    pub fn executable(&self) -> bool {
        matches!(self, Ops::Execute)
    }
}

/// One row of `list-resources`: the schema entry plus presence in the
/// queried instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceInfo {
    pub rid: u16,
    pub ops: Ops,
    pub multiple: bool,
    /// `None` for executable resources, which carry no value.
    pub ty: Option<ResourceType>,
    pub mandatory: bool,
    pub present: bool,
}

/// The dispatch surface of one registered object.
pub trait ObjectHandler {
    /// Object version advertised in Register and Discover payloads.
    fn version(&self) -> Option<ObjectVersion> {
        None
    }

    /// Called once before the first handler call of an operation.
    fn operation_begin(&mut self, _op: DmOperation) -> Result<(), DmError> {
        Ok(())
    }

    /// Called once after the operation finished. Must not fail; on
    /// `success == false` the object must be back in its pre-operation
    /// state by the time this returns.
    fn operation_end(&mut self, _success: bool) {}

    fn transaction_begin(&mut self) -> Result<(), DmError> {
        Ok(())
    }

    fn transaction_validate(&mut self) -> Result<(), DmError> {
        Ok(())
    }

    fn transaction_commit(&mut self) -> Result<(), DmError> {
        Ok(())
    }

    fn transaction_rollback(&mut self) -> Result<(), DmError> {
        Ok(())
    }

    /// Live instance ids, ascending.
    fn instances(&self) -> Vec<u16>;

    /// Create an instance; `None` asks the object to pick the smallest
    /// free id. Returns the id actually used.
    fn create_instance(&mut self, _iid: Option<u16>) -> Result<u16, DmError> {
        Err(DmError::MethodNotAllowed)
    }

    fn delete_instance(&mut self, _iid: u16) -> Result<(), DmError> {
        Err(DmError::MethodNotAllowed)
    }

    /// Reset an instance to its post-create state: optional resources
    /// absent, mandatory resources at their type's zero.
    fn reset_instance(&mut self, _iid: u16) -> Result<(), DmError> {
        Err(DmError::MethodNotAllowed)
    }

    /// Schema plus presence for every resource of `iid`, ascending RID.
    fn resources(&self, iid: u16) -> Result<Vec<ResourceInfo>, DmError>;

    /// Live resource-instance ids of a multi-instance resource, ascending.
    fn resource_instances(&self, _iid: u16, _rid: u16) -> Result<Vec<u16>, DmError> {
        Ok(Vec::new())
    }

    fn read(&self, iid: u16, rid: u16, riid: Option<u16>) -> Result<Value, DmError>;

    fn write(
        &mut self,
        _iid: u16,
        _rid: u16,
        _riid: Option<u16>,
        _value: Value,
    ) -> Result<(), DmError> {
        Err(DmError::MethodNotAllowed)
    }

    /// Write that ignores the resource's operation set. Used for Create
    /// payloads and bootstrap writes, which may populate read-only
    /// resources.
    fn write_unrestricted(
        &mut self,
        iid: u16,
        rid: u16,
        riid: Option<u16>,
        value: Value,
    ) -> Result<(), DmError> {
        self.write(iid, rid, riid, value)
    }

    /// Remove every resource instance of a multi-instance resource
    /// (the first half of Write-Replace).
    fn clear_resource(&mut self, _iid: u16, _rid: u16) -> Result<(), DmError> {
        Err(DmError::MethodNotAllowed)
    }

    /// Remove a single resource instance.
    fn delete_resource_instance(&mut self, _iid: u16, _rid: u16, _riid: u16) -> Result<(), DmError> {
        Err(DmError::MethodNotAllowed)
    }

    fn execute(&mut self, _iid: u16, _rid: u16, _args: &[u8]) -> Result<(), DmError> {
        Err(DmError::MethodNotAllowed)
    }
}
