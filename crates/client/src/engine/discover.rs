// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discover: CoRE-Link subtree listing with attached attributes.

use mote_coap::Code;
use mote_core::{ContentFormat, Path};
use mote_codec::{DiscoverLine, DiscoverPayload};
use mote_dm::ObjectHandler;

use crate::client::Client;
use crate::engine::Outcome;
use crate::error::dm_status;
use crate::servers::ServerHandle;

impl Client {
    pub(super) fn op_discover(
        &mut self,
        server: ServerHandle,
        path: Path,
        depth: Option<u8>,
    ) -> Result<Outcome, Code> {
        let ssid = self.servers.get(server.0).map(|conn| conn.ssid).unwrap_or_default();
        let oid = match path.oid() {
            Some(oid) => oid,
            None => return Err(Code::METHOD_NOT_ALLOWED),
        };
        if !self.registry.exists(&path) {
            return Err(Code::NOT_FOUND);
        }
        let handler = self.registry.handler(oid).ok_or(Code::NOT_FOUND)?;

        // Depth of the deepest emitted level, relative to the whole tree.
        let max_len = depth
            .map(|depth| (path.len() + depth as usize).min(4))
            .unwrap_or(4);

        let mut payload = DiscoverPayload::new();
        let mut emit = |line: &DiscoverLine| payload.add(line);

        match (path.iid(), path.rid()) {
            (None, _) => {
                // whole object: object line carries the object-level attrs
                emit(&DiscoverLine {
                    path: Path::object(oid),
                    version: handler.version(),
                    dim: None,
                    attrs: self.attrs.at(ssid, &Path::object(oid)),
                });
                if max_len >= 2 {
                    for iid in handler.instances() {
                        emit(&DiscoverLine {
                            path: Path::instance(oid, iid),
                            attrs: self.attrs.at(ssid, &Path::instance(oid, iid)),
                            ..Default::default()
                        });
                        if max_len >= 3 {
                            self.resource_lines(ssid, oid, iid, max_len, &mut emit)
                                .map_err(|error| dm_status(&error))?;
                        }
                    }
                }
            }
            (Some(iid), None) => {
                emit(&DiscoverLine {
                    path,
                    attrs: self.attrs.at(ssid, &path),
                    ..Default::default()
                });
                if max_len >= 3 {
                    self.resource_lines(ssid, oid, iid, max_len, &mut emit)
                        .map_err(|error| dm_status(&error))?;
                }
            }
            (Some(iid), Some(rid)) => {
                // resource target: merged (inherited ⊕ explicit) attrs,
                // plus one line per resource instance
                let info = self
                    .registry
                    .resource_info(&path.truncated(3))
                    .map_err(|error| dm_status(&error))?;
                let riids = if info.multiple {
                    self.registry
                        .handler(oid)
                        .ok_or(Code::NOT_FOUND)?
                        .resource_instances(iid, rid)
                        .map_err(|error| dm_status(&error))?
                } else {
                    Vec::new()
                };
                emit(&DiscoverLine {
                    path: path.truncated(3),
                    dim: info.multiple.then_some(riids.len() as u16),
                    attrs: self.attrs.effective(ssid, &path.truncated(3)),
                    ..Default::default()
                });
                if max_len >= 4 {
                    for riid in riids {
                        emit(&DiscoverLine {
                            path: Path::resource_instance(oid, iid, rid, riid),
                            attrs: self
                                .attrs
                                .at(ssid, &Path::resource_instance(oid, iid, rid, riid)),
                            ..Default::default()
                        });
                    }
                }
            }
        }

        let bytes = std::mem::take(payload.output_mut());
        Ok(Outcome::bytes(Code::CONTENT, ContentFormat::LinkFormat, bytes))
    }

    fn resource_lines(
        &self,
        ssid: u16,
        oid: u16,
        iid: u16,
        max_len: usize,
        emit: &mut impl FnMut(&DiscoverLine),
    ) -> Result<(), mote_dm::DmError> {
        let handler = self.registry.handler(oid).ok_or(mote_dm::DmError::NotFound)?;
        for info in handler.resources(iid)? {
            if !info.present {
                continue;
            }
            let resource_path = Path::resource(oid, iid, info.rid);
            let dim = if info.multiple {
                Some(handler.resource_instances(iid, info.rid)?.len() as u16)
            } else {
                None
            };
            emit(&DiscoverLine {
                path: resource_path,
                dim,
                attrs: self.attrs.at(ssid, &resource_path),
                ..Default::default()
            });
            if max_len >= 4 && info.multiple {
                for riid in handler.resource_instances(iid, info.rid)? {
                    emit(&DiscoverLine {
                        path: Path::resource_instance(oid, iid, info.rid, riid),
                        ..Default::default()
                    });
                }
            }
        }
        Ok(())
    }
}
