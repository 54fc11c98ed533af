// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read, Read-Composite and the observation endpoints.

use std::time::{Duration, Instant};

use mote_coap::{Code, Request};
use mote_core::{ContentFormat, NotificationAttrs, Path};
use mote_codec::{decoder_for, default_format, encoder_for, Parsed, Record};

use crate::client::{Client, Notice};
use crate::engine::Outcome;
use crate::error::dm_status;
use crate::observe::Observation;
use crate::servers::ServerHandle;

/// Content formats a value payload may be served in.
fn is_value_format(format: ContentFormat) -> bool {
    matches!(
        format,
        ContentFormat::PlainText
            | ContentFormat::Opaque
            | ContentFormat::Cbor
            | ContentFormat::SenmlCbor
            | ContentFormat::Lwm2mCbor
    )
}

impl Client {
    pub(super) fn op_read(
        &mut self,
        _now: Instant,
        _server: ServerHandle,
        path: Path,
        accept: Option<u16>,
    ) -> Result<Outcome, Code> {
        let (format, records) = self.read_records(&path, accept)?;
        Ok(Outcome::paged(Code::CONTENT, format, path, records))
    }

    /// Resolve the subtree under `path` and pick the response format.
    pub(super) fn read_records(
        &self,
        path: &Path,
        accept: Option<u16>,
    ) -> Result<(ContentFormat, Vec<Record>), Code> {
        let entries = self
            .registry
            .collect_readable(path)
            .map_err(|error| dm_status(&error))?;
        let records: Vec<Record> = entries
            .into_iter()
            .map(|entry| Record::new(entry.path, entry.value))
            .collect();

        let single = if path.len() >= 3 {
            self.registry
                .resource_info(&path.truncated(3))
                .ok()
                .filter(|info| !info.multiple)
                .and_then(|info| info.ty)
        } else {
            None
        };

        let format = match accept {
            None => default_format(path, single),
            Some(number) => {
                let format =
                    ContentFormat::from_number(number).ok_or(Code::NOT_ACCEPTABLE)?;
                if !is_value_format(format) {
                    return Err(Code::NOT_ACCEPTABLE);
                }
                if !format.is_multi_record() && records.len() != 1 {
                    return Err(Code::NOT_ACCEPTABLE);
                }
                if format == ContentFormat::Opaque
                    && single != Some(mote_core::ResourceType::Bytes)
                {
                    return Err(Code::NOT_ACCEPTABLE);
                }
                format
            }
        };
        Ok((format, records))
    }

    pub(super) fn op_observe_start(
        &mut self,
        now: Instant,
        server: ServerHandle,
        path: Path,
        query_attrs: NotificationAttrs,
        request: &Request,
    ) -> Result<Outcome, Code> {
        let ssid = self.servers.get(server.0).map(|conn| conn.ssid).unwrap_or_default();
        let attrs = query_attrs.overlaid_on(&self.attrs.effective(ssid, &path));
        let (format, records) = self.read_records(&path, request.accept)?;

        let payload = encode_all(format, path, &records)?;
        let numeric = (records.len() == 1)
            .then(|| records[0].value.as_f64())
            .flatten();

        let pmin = Duration::from_secs(u64::from(attrs.pmin.unwrap_or(0)));
        self.observations.insert(Observation {
            server: server.0,
            token: request.token,
            path,
            attrs,
            format,
            observe_number: 0,
            last_payload: payload.clone(),
            last_numeric: numeric,
            last_sent_at: now,
            next_eligible_at: now + pmin,
            pending: false,
            last_message_id: None,
            awaiting_ack: None,
        });

        Ok(Outcome::bytes(Code::CONTENT, format, payload).with_observe(0))
    }

    pub(super) fn op_observe_cancel(
        &mut self,
        _now: Instant,
        server: ServerHandle,
        path: Path,
        request: &Request,
    ) -> Result<Outcome, Code> {
        if let Some(observation) = self.observations.remove(server.0, request.token) {
            self.notice(Notice::ObservationCancelled {
                token: observation.token,
                path: observation.path,
            });
        }
        let (format, records) = self.read_records(&path, request.accept)?;
        Ok(Outcome::paged(Code::CONTENT, format, path, records))
    }

    /// FETCH: the payload lists paths; the response carries every
    /// readable entry under the paths that exist.
    pub(super) fn op_read_composite(
        &mut self,
        request: &Request,
        payload: &[u8],
    ) -> Result<Outcome, Code> {
        let format_number = request.content_format.ok_or(Code::BAD_REQUEST)?;
        let mut decoder = decoder_for(format_number, Path::root(), None)
            .map_err(|_| Code::UNSUPPORTED_CONTENT_FORMAT)?;
        decoder.feed(payload);
        decoder.end();

        let mut requested = Vec::new();
        loop {
            match decoder.next().map_err(|_| Code::BAD_REQUEST)? {
                Parsed::Record(record) => requested.push(record.path),
                Parsed::Done => break,
                Parsed::Pending => return Err(Code::BAD_REQUEST),
            }
        }
        if requested.is_empty() {
            return Err(Code::BAD_REQUEST);
        }

        let response_format = match request.accept {
            None => ContentFormat::SenmlCbor,
            Some(number) => {
                let format =
                    ContentFormat::from_number(number).ok_or(Code::NOT_ACCEPTABLE)?;
                if format != ContentFormat::SenmlCbor {
                    return Err(Code::NOT_ACCEPTABLE);
                }
                format
            }
        };

        let mut records = Vec::new();
        for path in requested {
            match self.registry.collect_readable(&path) {
                Ok(entries) => {
                    records.extend(entries.into_iter().map(|e| Record::new(e.path, e.value)));
                }
                Err(_) => continue,
            }
        }
        if records.is_empty() {
            return Err(Code::NOT_FOUND);
        }
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records.dedup_by(|a, b| a.path == b.path);

        Ok(Outcome::paged(Code::CONTENT, response_format, Path::root(), records))
    }
}

/// Eagerly encode a record set (observation seed bodies).
pub(super) fn encode_all(
    format: ContentFormat,
    base: Path,
    records: &[Record],
) -> Result<Vec<u8>, Code> {
    let mut encoder = encoder_for(format, base, records.len()).map_err(|_| Code::NOT_ACCEPTABLE)?;
    for record in records {
        encoder.add(record).map_err(|_| Code::INTERNAL_SERVER_ERROR)?;
    }
    encoder.finish().map_err(|_| Code::INTERNAL_SERVER_ERROR)?;
    Ok(std::mem::take(encoder.output_mut()))
}
