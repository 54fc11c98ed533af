// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The object registry: single owner of every registered object, path
//! resolution and the ordered walks behind Read, Register and Discover.

use std::collections::BTreeMap;

use mote_core::{ObjectVersion, Path, Value};

use crate::error::DmError;
use crate::object::{ObjectHandler, ResourceInfo};

/// One readable `(path, value)` pair produced by a subtree walk, in
/// ascending `(OID, IID, RID, RIID)` order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadEntry {
    pub path: Path,
    pub value: Value,
}

#[derive(Default)]
pub struct Registry {
    objects: BTreeMap<u16, Box<dyn ObjectHandler>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("oids", &self.oids())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, oid: u16, handler: Box<dyn ObjectHandler>) -> Result<(), DmError> {
        if oid == mote_core::ID_INVALID {
            return Err(DmError::BadRequest("reserved object id"));
        }
        if self.objects.contains_key(&oid) {
            return Err(DmError::BadRequest("object id already registered"));
        }
        tracing::debug!(oid, "object registered");
        self.objects.insert(oid, handler);
        Ok(())
    }

    pub fn unregister(&mut self, oid: u16) -> Result<Box<dyn ObjectHandler>, DmError> {
        let handler = self.objects.remove(&oid).ok_or(DmError::NotFound)?;
        tracing::debug!(oid, "object unregistered");
        Ok(handler)
    }

    pub fn contains(&self, oid: u16) -> bool {
        self.objects.contains_key(&oid)
    }

    /// Registered object ids, ascending.
    pub fn oids(&self) -> Vec<u16> {
        self.objects.keys().copied().collect()
    }

    pub fn handler(&self, oid: u16) -> Option<&dyn ObjectHandler> {
        self.objects.get(&oid).map(Box::as_ref)
    }

    pub fn handler_mut(&mut self, oid: u16) -> Option<&mut Box<dyn ObjectHandler>> {
        self.objects.get_mut(&oid)
    }

    /// Schema row for a resource path.
    pub fn resource_info(&self, path: &Path) -> Result<ResourceInfo, DmError> {
        let (oid, iid, rid) = match (path.oid(), path.iid(), path.rid()) {
            (Some(oid), Some(iid), Some(rid)) => (oid, iid, rid),
            _ => return Err(DmError::BadRequest("not a resource path")),
        };
        let handler = self.objects.get(&oid).ok_or(DmError::NotFound)?;
        handler
            .resources(iid)?
            .into_iter()
            .find(|info| info.rid == rid)
            .ok_or(DmError::NotFound)
    }

    /// Presence check: does the addressed entity exist right now?
    pub fn exists(&self, path: &Path) -> bool {
        let Some(oid) = path.oid() else {
            return true; // root
        };
        let Some(handler) = self.objects.get(&oid) else {
            return false;
        };
        let Some(iid) = path.iid() else {
            return true;
        };
        if !handler.instances().contains(&iid) {
            return false;
        }
        let Some(rid) = path.rid() else {
            return true;
        };
        let Ok(resources) = handler.resources(iid) else {
            return false;
        };
        let Some(info) = resources.into_iter().find(|info| info.rid == rid) else {
            return false;
        };
        if !info.present {
            return false;
        }
        match path.riid() {
            None => true,
            Some(riid) => handler
                .resource_instances(iid, rid)
                .map(|riids| riids.contains(&riid))
                .unwrap_or(false),
        }
    }

    /// Collect every readable entry at and below `path`, ascending.
    ///
    /// Fails with `NotFound` when the addressed entity is absent, and
    /// with `MethodNotAllowed` when it exists but nothing under it may
    /// be read (a write-only or executable target).
    pub fn collect_readable(&self, path: &Path) -> Result<Vec<ReadEntry>, DmError> {
        let mut entries = Vec::new();
        match path.oid() {
            None => {
                for (&oid, handler) in &self.objects {
                    collect_object(handler.as_ref(), oid, &mut entries)?;
                }
            }
            Some(oid) => {
                let handler = self.objects.get(&oid).ok_or(DmError::NotFound)?;
                match path.iid() {
                    None => collect_object(handler.as_ref(), oid, &mut entries)?,
                    Some(iid) => {
                        if !handler.instances().contains(&iid) {
                            return Err(DmError::NotFound);
                        }
                        match path.rid() {
                            None => collect_instance(handler.as_ref(), oid, iid, &mut entries)?,
                            Some(rid) => {
                                collect_resource(
                                    handler.as_ref(),
                                    oid,
                                    iid,
                                    rid,
                                    path.riid(),
                                    &mut entries,
                                )?;
                            }
                        }
                    }
                }
            }
        }
        Ok(entries)
    }

    /// Number of readable entries under `path`; sizes definite-length
    /// payload headers.
    pub fn readable_count(&self, path: &Path) -> Result<usize, DmError> {
        Ok(self.collect_readable(path)?.len())
    }

    /// Register payload source: every object with its version and live
    /// instances, ascending OID then IID.
    pub fn register_entries(&self) -> Vec<(u16, Option<ObjectVersion>, Vec<u16>)> {
        self.objects
            .iter()
            .map(|(&oid, handler)| (oid, handler.version(), handler.instances()))
            .collect()
    }
}

fn collect_object(
    handler: &dyn ObjectHandler,
    oid: u16,
    entries: &mut Vec<ReadEntry>,
) -> Result<(), DmError> {
    for iid in handler.instances() {
        collect_instance(handler, oid, iid, entries)?;
    }
    Ok(())
}

fn collect_instance(
    handler: &dyn ObjectHandler,
    oid: u16,
    iid: u16,
    entries: &mut Vec<ReadEntry>,
) -> Result<(), DmError> {
    for info in handler.resources(iid)? {
        if !info.ops.readable() || !info.present {
            continue;
        }
        push_resource_entries(handler, oid, iid, &info, None, entries)?;
    }
    Ok(())
}

fn collect_resource(
    handler: &dyn ObjectHandler,
    oid: u16,
    iid: u16,
    rid: u16,
    riid: Option<u16>,
    entries: &mut Vec<ReadEntry>,
) -> Result<(), DmError> {
    let info = handler
        .resources(iid)?
        .into_iter()
        .find(|info| info.rid == rid)
        .ok_or(DmError::NotFound)?;
    if !info.present {
        return Err(DmError::NotFound);
    }
    if !info.ops.readable() {
        return Err(DmError::MethodNotAllowed);
    }
    push_resource_entries(handler, oid, iid, &info, riid, entries)
}

fn push_resource_entries(
    handler: &dyn ObjectHandler,
    oid: u16,
    iid: u16,
    info: &ResourceInfo,
    only_riid: Option<u16>,
    entries: &mut Vec<ReadEntry>,
) -> Result<(), DmError> {
    if info.multiple {
        let riids = handler.resource_instances(iid, info.rid)?;
        if let Some(only) = only_riid {
            if !riids.contains(&only) {
                return Err(DmError::NotFound);
            }
        }
        for riid in riids {
            if only_riid.is_some_and(|only| only != riid) {
                continue;
            }
            entries.push(ReadEntry {
                path: Path::resource_instance(oid, iid, info.rid, riid),
                value: handler.read(iid, info.rid, Some(riid))?,
            });
        }
    } else {
        if only_riid.is_some() {
            return Err(DmError::NotFound);
        }
        entries.push(ReadEntry {
            path: Path::resource(oid, iid, info.rid),
            value: handler.read(iid, info.rid, None)?,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
