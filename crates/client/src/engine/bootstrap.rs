// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bootstrap-interface specifics: Discover decoration and the Delete
//! preservation rules.
//!
//! On Bootstrap-Delete `/` exactly three things survive: the Security
//! instance flagged as bootstrap server, every Device instance, and any
//! OSCORE instance referenced by a preserved Security instance.

use std::time::Instant;

use mote_coap::Code;
use mote_core::{
    ContentFormat, Path, Value, OID_DEVICE, OID_OSCORE, OID_SECURITY, OID_SERVER,
};
use mote_codec::BootstrapDiscoverPayload;
use mote_dm::{DmOperation, ObjectHandler, Transaction};

use crate::client::Client;
use crate::engine::Outcome;
use crate::error::dm_status;

// Security object resource ids
const SEC_SERVER_URI: u16 = 0;
const SEC_IS_BOOTSTRAP: u16 = 1;
const SEC_SSID: u16 = 10;
const SEC_OSCORE_LINK: u16 = 17;

// Server object resource ids
const SRV_SSID: u16 = 0;

#[derive(Debug, Clone)]
struct SecurityInfo {
    iid: u16,
    uri: Option<String>,
    is_bootstrap: bool,
    ssid: Option<u16>,
    oscore_iid: Option<u16>,
}

impl Client {
    pub(super) fn op_bootstrap_discover(&mut self, path: Path) -> Result<Outcome, Code> {
        if let Some(oid) = path.oid() {
            if !self.registry.contains(oid) {
                return Err(Code::NOT_FOUND);
            }
        }

        let security = self.security_infos();
        let mut payload = BootstrapDiscoverPayload::new(self.config.version);

        for (oid, version, iids) in self.registry.register_entries() {
            if path.oid().is_some_and(|only| only != oid) {
                continue;
            }
            if iids.is_empty() {
                payload.add(Path::object(oid), version, None, None);
                continue;
            }
            for iid in iids {
                let instance = Path::instance(oid, iid);
                let (ssid, uri) = match oid {
                    OID_SECURITY => {
                        let info = security.iter().find(|info| info.iid == iid);
                        match info {
                            Some(info) if !info.is_bootstrap => {
                                (info.ssid, info.uri.clone())
                            }
                            _ => (None, None),
                        }
                    }
                    OID_SERVER => (self.read_u16(Path::resource(oid, iid, SRV_SSID)), None),
                    OID_OSCORE => {
                        let ssid = security
                            .iter()
                            .find(|info| info.oscore_iid == Some(iid) && !info.is_bootstrap)
                            .and_then(|info| info.ssid);
                        (ssid, None)
                    }
                    _ => (None, None),
                };
                payload.add(instance, version, ssid, uri.as_deref());
            }
        }

        let bytes = std::mem::take(payload.output_mut());
        Ok(Outcome::bytes(Code::CONTENT, ContentFormat::LinkFormat, bytes))
    }

    pub(super) fn op_bootstrap_delete(&mut self, now: Instant, path: Path) -> Result<Outcome, Code> {
        if path.rid().is_some() {
            return Err(Code::METHOD_NOT_ALLOWED);
        }
        if let (Some(_), Some(_)) = (path.oid(), path.iid()) {
            // instance-level bootstrap delete behaves like a plain delete
            return self.op_delete(now, path);
        }

        let security = self.security_infos();
        let preserved_security: Vec<u16> = security
            .iter()
            .filter(|info| info.is_bootstrap)
            .map(|info| info.iid)
            .collect();
        let preserved_oscore: Vec<u16> = security
            .iter()
            .filter(|info| info.is_bootstrap)
            .filter_map(|info| info.oscore_iid)
            .collect();

        let root = path.is_root();
        let targets: Vec<u16> = match path.oid() {
            Some(oid) => vec![oid],
            None => self.registry.oids(),
        };

        let mut tx = Transaction::new();
        let mut doomed: Vec<Path> = Vec::new();
        for &oid in &targets {
            if root && oid == OID_DEVICE {
                continue;
            }
            let Some(handler) = self.registry.handler(oid) else {
                continue;
            };
            for iid in handler.instances() {
                let keep = match oid {
                    OID_SECURITY => preserved_security.contains(&iid),
                    OID_OSCORE => preserved_oscore.contains(&iid),
                    _ => false,
                };
                if !keep {
                    doomed.push(Path::instance(oid, iid));
                }
            }
        }

        for target in &doomed {
            let Some(oid) = target.oid() else { continue };
            tx.join(&mut self.registry, oid, DmOperation::Delete)
                .map_err(|error| dm_status(&error))?;
        }

        let mut result = Ok(());
        for target in &doomed {
            let (Some(oid), Some(iid)) = (target.oid(), target.iid()) else {
                continue;
            };
            let Some(handler) = self.registry.handler_mut(oid) else {
                continue;
            };
            if let Err(error) = handler.delete_instance(iid) {
                result = Err(dm_status(&error));
                break;
            }
        }

        match result {
            Ok(()) => {
                tx.commit(&mut self.registry).map_err(|error| dm_status(&error))?;
            }
            Err(code) => {
                tx.rollback(&mut self.registry);
                return Err(code);
            }
        }

        for target in doomed {
            self.bootstrap_target_deleted(&target);
        }
        Ok(Outcome::code(Code::DELETED))
    }

    fn bootstrap_target_deleted(&mut self, path: &Path) {
        for observation in self.observations.cancel_under(path) {
            self.notices.push(crate::client::Notice::ObservationCancelled {
                token: observation.token,
                path: observation.path,
            });
        }
        self.attrs.remove_subtree(path);
    }

    fn security_infos(&self) -> Vec<SecurityInfo> {
        let Some(handler) = self.registry.handler(OID_SECURITY) else {
            return Vec::new();
        };
        handler
            .instances()
            .into_iter()
            .map(|iid| SecurityInfo {
                iid,
                uri: self.read_text(Path::resource(OID_SECURITY, iid, SEC_SERVER_URI)),
                is_bootstrap: self
                    .read_bool(Path::resource(OID_SECURITY, iid, SEC_IS_BOOTSTRAP))
                    .unwrap_or(false),
                ssid: self.read_u16(Path::resource(OID_SECURITY, iid, SEC_SSID)),
                oscore_iid: self.read_objlnk_iid(Path::resource(OID_SECURITY, iid, SEC_OSCORE_LINK)),
            })
            .collect()
    }

    fn read_value(&self, path: Path) -> Option<Value> {
        let handler = self.registry.handler(path.oid()?)?;
        handler.read(path.iid()?, path.rid()?, path.riid()).ok()
    }

    fn read_text(&self, path: Path) -> Option<String> {
        match self.read_value(path)? {
            Value::Text(chunk) => String::from_utf8(chunk.data).ok(),
            _ => None,
        }
    }

    fn read_bool(&self, path: Path) -> Option<bool> {
        match self.read_value(path)? {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    fn read_u16(&self, path: Path) -> Option<u16> {
        match self.read_value(path)? {
            Value::Int(value) => u16::try_from(value).ok(),
            Value::Uint(value) => u16::try_from(value).ok(),
            _ => None,
        }
    }

    fn read_objlnk_iid(&self, path: Path) -> Option<u16> {
        match self.read_value(path)? {
            Value::Objlnk(objlnk) if objlnk.oid == OID_OSCORE => Some(objlnk.iid),
            _ => None,
        }
    }
}
