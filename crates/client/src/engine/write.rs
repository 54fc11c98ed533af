// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutating operations: Write (replace/partial/composite), Create,
//! Delete, Execute and Write-Attributes. Every mutation runs inside a
//! transaction; the first error rolls the whole operation back.

use std::time::Instant;

use mote_coap::Code;
use mote_core::{NotificationAttrs, Path, Value};
use mote_codec::{decoder_for, Parsed, PayloadDecoder, Record};
use mote_dm::{DmOperation, ObjectHandler, Transaction};

use crate::client::{Client, Notice};
use crate::engine::Outcome;
use crate::error::{codec_status, dm_status};
use crate::servers::ServerHandle;

impl Client {
    pub(super) fn op_write(
        &mut self,
        now: Instant,
        path: Path,
        replace: bool,
        content_format: Option<u16>,
        payload: &[u8],
    ) -> Result<Outcome, Code> {
        let oid = path.oid().ok_or(Code::METHOD_NOT_ALLOWED)?;
        let iid = path.iid().ok_or(Code::METHOD_NOT_ALLOWED)?;
        if !self.registry.exists(&path.truncated(2)) {
            return Err(Code::NOT_FOUND);
        }

        let records = self.decode_payload(&path, content_format, payload)?;

        let mut tx = Transaction::new();
        tx.join(&mut self.registry, oid, DmOperation::Write)
            .map_err(|error| dm_status(&error))?;

        let result = self.apply_write(&path, replace, iid, &records);
        self.resolve(now, tx, result, path)?;
        Ok(Outcome::code(Code::CHANGED))
    }

    fn apply_write(
        &mut self,
        path: &Path,
        replace: bool,
        iid: u16,
        records: &[Record],
    ) -> Result<(), Code> {
        let oid = path.oid().ok_or(Code::METHOD_NOT_ALLOWED)?;

        if replace {
            match (path.rid(), path.riid()) {
                (Some(rid), None) => {
                    let info = self
                        .registry
                        .resource_info(&path.truncated(3))
                        .map_err(|error| dm_status(&error))?;
                    if !info.ops.writable() {
                        return Err(Code::METHOD_NOT_ALLOWED);
                    }
                    if info.multiple {
                        self.handler_mut(oid)?
                            .clear_resource(iid, rid)
                            .map_err(|error| dm_status(&error))?;
                    }
                }
                (Some(_), Some(_)) => {}
                (None, _) => {
                    self.handler_mut(oid)?
                        .reset_instance(iid)
                        .map_err(|error| dm_status(&error))?;
                }
            }
        }

        for record in records {
            self.apply_record(path, record, false)?;
        }
        Ok(())
    }

    /// Apply one decoded record to the data model.
    fn apply_record(
        &mut self,
        base: &Path,
        record: &Record,
        unrestricted: bool,
    ) -> Result<(), Code> {
        if !record.path.starts_with(base) {
            return Err(Code::BAD_REQUEST);
        }
        let (oid, iid, rid) = match (record.path.oid(), record.path.iid(), record.path.rid()) {
            (Some(oid), Some(iid), Some(rid)) => (oid, iid, rid),
            // aggregate markers without a value are ignorable
            _ if record.value == Value::Null => return Ok(()),
            _ => return Err(Code::BAD_REQUEST),
        };
        let riid = record.path.riid();

        let info = self
            .registry
            .resource_info(&record.path.truncated(3))
            .map_err(|error| dm_status(&error))?;
        if record.value == Value::Null {
            // SenML-ETCH removal of a resource instance
            if let Some(riid) = riid {
                return self
                    .handler_mut(oid)?
                    .delete_resource_instance(iid, rid, riid)
                    .map_err(|error| dm_status(&error));
            }
            return Ok(());
        }
        if info.multiple && riid.is_none() {
            return Err(Code::BAD_REQUEST);
        }
        if !info.multiple && riid.is_some() {
            return Err(Code::NOT_FOUND);
        }
        if !unrestricted && !info.ops.writable() {
            return Err(Code::METHOD_NOT_ALLOWED);
        }

        let handler = self.handler_mut(oid)?;
        let value = record.value.clone();
        let result = if unrestricted {
            handler.write_unrestricted(iid, rid, riid, value)
        } else {
            handler.write(iid, rid, riid, value)
        };
        result.map_err(|error| dm_status(&error))
    }

    pub(super) fn op_write_composite(
        &mut self,
        now: Instant,
        content_format: Option<u16>,
        payload: &[u8],
    ) -> Result<Outcome, Code> {
        let records = self.decode_payload(&Path::root(), content_format, payload)?;

        let mut tx = Transaction::new();
        for record in &records {
            let oid = record.path.oid().ok_or(Code::BAD_REQUEST)?;
            tx.join(&mut self.registry, oid, DmOperation::Write)
                .map_err(|error| dm_status(&error))?;
        }

        let mut result = Ok(());
        for record in &records {
            // each supplied path behaves as a partial update; nothing is
            // implicitly deleted
            if let Err(code) = self.apply_record(&Path::root(), record, false) {
                result = Err(code);
                break;
            }
        }
        self.resolve(now, tx, result, Path::root())?;
        Ok(Outcome::code(Code::CHANGED))
    }

    pub(super) fn op_create(
        &mut self,
        now: Instant,
        path: Path,
        content_format: Option<u16>,
        payload: &[u8],
    ) -> Result<Outcome, Code> {
        let oid = path.oid().ok_or(Code::METHOD_NOT_ALLOWED)?;
        if !self.registry.contains(oid) {
            return Err(Code::NOT_FOUND);
        }

        let records = if payload.is_empty() {
            Vec::new()
        } else {
            self.decode_payload(&path, content_format, payload)?
        };

        // The payload names the instance id, or the object picks one.
        let mut explicit = None;
        for record in &records {
            match (explicit, record.path.iid()) {
                (None, Some(iid)) => explicit = Some(iid),
                (Some(seen), Some(iid)) if seen != iid => return Err(Code::BAD_REQUEST),
                _ => {}
            }
        }

        let mut tx = Transaction::new();
        tx.join(&mut self.registry, oid, DmOperation::Create)
            .map_err(|error| dm_status(&error))?;

        let result = self.apply_create(oid, explicit, &records);
        match result {
            Ok(iid) => {
                tx.commit(&mut self.registry).map_err(|error| dm_status(&error))?;
                self.changed_paths.push(Path::instance(oid, iid));
                Ok(Outcome::code(Code::CREATED))
            }
            Err(code) => {
                tx.rollback(&mut self.registry);
                Err(code)
            }
        }
    }

    fn apply_create(
        &mut self,
        oid: u16,
        explicit: Option<u16>,
        records: &[Record],
    ) -> Result<u16, Code> {
        let iid = self
            .handler_mut(oid)?
            .create_instance(explicit)
            .map_err(|error| dm_status(&error))?;

        for record in records {
            if record.path.iid() != Some(iid) {
                return Err(Code::BAD_REQUEST);
            }
            self.apply_record(&Path::instance(oid, iid), record, true)?;
        }

        // every mandatory value-carrying resource must be present now
        let missing = self
            .handler_mut(oid)?
            .resources(iid)
            .map_err(|error| dm_status(&error))?
            .into_iter()
            .any(|info| info.mandatory && info.ty.is_some() && !info.present);
        if missing {
            return Err(Code::BAD_REQUEST);
        }
        Ok(iid)
    }

    pub(super) fn op_delete(&mut self, now: Instant, path: Path) -> Result<Outcome, Code> {
        match (path.oid(), path.iid(), path.rid(), path.riid()) {
            (Some(oid), Some(iid), None, None) => {
                if !self.registry.exists(&path) {
                    return Err(Code::NOT_FOUND);
                }
                let mut tx = Transaction::new();
                tx.join(&mut self.registry, oid, DmOperation::Delete)
                    .map_err(|error| dm_status(&error))?;
                let result = self
                    .handler_mut(oid)?
                    .delete_instance(iid)
                    .map_err(|error| dm_status(&error));
                self.resolve(now, tx, result, path)?;
                self.target_deleted(&path);
                Ok(Outcome::code(Code::DELETED))
            }
            (Some(oid), Some(iid), Some(rid), Some(riid)) => {
                if !self.registry.exists(&path) {
                    return Err(Code::NOT_FOUND);
                }
                let mut tx = Transaction::new();
                tx.join(&mut self.registry, oid, DmOperation::Delete)
                    .map_err(|error| dm_status(&error))?;
                let result = self
                    .handler_mut(oid)?
                    .delete_resource_instance(iid, rid, riid)
                    .map_err(|error| dm_status(&error));
                self.resolve(now, tx, result, path)?;
                self.target_deleted(&path);
                Ok(Outcome::code(Code::DELETED))
            }
            _ => Err(Code::METHOD_NOT_ALLOWED),
        }
    }

    pub(super) fn op_execute(
        &mut self,
        _now: Instant,
        path: Path,
        payload: &[u8],
    ) -> Result<Outcome, Code> {
        let (oid, iid, rid) = match (path.oid(), path.iid(), path.rid()) {
            (Some(oid), Some(iid), Some(rid)) => (oid, iid, rid),
            _ => return Err(Code::METHOD_NOT_ALLOWED),
        };
        if !valid_execute_args(payload) {
            return Err(Code::BAD_REQUEST);
        }
        if !self.registry.exists(&path.truncated(2)) {
            return Err(Code::NOT_FOUND);
        }

        let handler = self.handler_mut(oid)?;
        handler
            .operation_begin(DmOperation::Execute)
            .map_err(|error| dm_status(&error))?;
        let result = handler.execute(iid, rid, payload);
        let success = result.is_ok();
        handler.operation_end(success);
        result.map_err(|error| dm_status(&error))?;
        Ok(Outcome::code(Code::CHANGED))
    }

    pub(super) fn op_write_attributes(
        &mut self,
        server: ServerHandle,
        path: Path,
        attrs: &NotificationAttrs,
    ) -> Result<Outcome, Code> {
        if path.oid().is_none() {
            return Err(Code::METHOD_NOT_ALLOWED);
        }
        if !self.registry.exists(&path) {
            return Err(Code::NOT_FOUND);
        }
        let merged = attrs.overlaid_on(&self.attrs.at(self.ssid_of(server), &path));
        if let (Some(lt), Some(gt)) = (merged.lt, merged.gt) {
            if lt >= gt {
                return Err(Code::BAD_REQUEST);
            }
            if let Some(st) = merged.st {
                if lt + 2.0 * st >= gt {
                    return Err(Code::BAD_REQUEST);
                }
            }
        }
        let ssid = self.ssid_of(server);
        self.attrs.write(ssid, path, attrs);
        Ok(Outcome::code(Code::CHANGED))
    }

    // --- helpers ---

    pub(super) fn ssid_of(&self, server: ServerHandle) -> u16 {
        self.servers.get(server.0).map(|conn| conn.ssid).unwrap_or_default()
    }

    fn handler_mut(&mut self, oid: u16) -> Result<&mut Box<dyn mote_dm::ObjectHandler>, Code> {
        self.registry.handler_mut(oid).ok_or(Code::NOT_FOUND)
    }

    /// Decode a write payload into records, with the expected resource
    /// type resolved for untyped formats.
    fn decode_payload(
        &self,
        path: &Path,
        content_format: Option<u16>,
        payload: &[u8],
    ) -> Result<Vec<Record>, Code> {
        let number = content_format.ok_or(Code::UNSUPPORTED_CONTENT_FORMAT)?;
        let expected = if path.len() >= 3 {
            self.registry
                .resource_info(&path.truncated(3))
                .map_err(|error| dm_status(&error))?
                .ty
        } else {
            None
        };
        let mut decoder: PayloadDecoder = decoder_for(number, *path, expected)
            .map_err(|error| codec_status(&error))?;
        decoder.feed(payload);
        decoder.end();

        let mut records = Vec::new();
        loop {
            match decoder.next().map_err(|error| codec_status(&error))? {
                Parsed::Record(record) => records.push(record),
                Parsed::Done => return Ok(records),
                Parsed::Pending => return Err(Code::BAD_REQUEST),
            }
        }
    }

    /// Commit-or-rollback bookkeeping shared by the mutating operations.
    fn resolve(
        &mut self,
        _now: Instant,
        tx: Transaction,
        result: Result<(), Code>,
        changed: Path,
    ) -> Result<(), Code> {
        match result {
            Ok(()) => match tx.commit(&mut self.registry) {
                Ok(()) => {
                    self.changed_paths.push(changed);
                    Ok(())
                }
                Err(error) => Err(dm_status(&error)),
            },
            Err(code) => {
                tx.rollback(&mut self.registry);
                Err(code)
            }
        }
    }

    /// Cleanup after a successful delete: cancel observations under the
    /// target and drop its stored attributes.
    fn target_deleted(&mut self, path: &Path) {
        for observation in self.observations.cancel_under(path) {
            self.notices.push(Notice::ObservationCancelled {
                token: observation.token,
                path: observation.path,
            });
        }
        self.attrs.remove_subtree(path);
    }
}

/// The Execute argument grammar: `<digit>[='<text>'][,<digit>[='<text>']…]`.
pub(crate) fn valid_execute_args(payload: &[u8]) -> bool {
    if payload.is_empty() {
        return true;
    }
    let Ok(text) = std::str::from_utf8(payload) else {
        return false;
    };
    text.split(',').all(|argument| {
        let mut chars = argument.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        if !first.is_ascii_digit() {
            return false;
        }
        let rest = chars.as_str();
        if rest.is_empty() {
            return true;
        }
        let Some(quoted) = rest.strip_prefix("='") else {
            return false;
        };
        let Some(inner) = quoted.strip_suffix('\'') else {
            return false;
        };
        !inner.contains('\'')
    })
}

#[cfg(test)]
mod tests {
    use super::valid_execute_args;

    #[yare::parameterized(
        empty = { b"" },
        bare_digit = { b"5" },
        quoted = { b"0='reset'" },
        pair = { b"0='reset',1='hard'" },
        mixed = { b"2,3='x'" },
    )]
    fn accepts(payload: &[u8]) {
        assert!(valid_execute_args(payload));
    }

    #[yare::parameterized(
        letter = { b"a" },
        missing_quotes = { b"0=reset" },
        unterminated = { b"0='reset" },
        embedded_quote = { b"0='re'set'" },
        trailing_comma = { b"1," },
        multi_digit_ok_but_non_digit = { b"1x" },
    )]
    fn rejects(payload: &[u8]) {
        assert!(!valid_execute_args(payload));
    }
}
