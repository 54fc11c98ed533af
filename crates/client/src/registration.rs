// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-initiated requests: Bootstrap-Request, Register, Update,
//! Deregister and Send, with RFC 7252 confirmable retransmission.

use std::time::{Duration, Instant};

use mote_coap::{classify_response, Code, Message, MsgType, Response, Token};
use mote_core::{ContentFormat, Path, OID_OSCORE, OID_SECURITY};
use mote_codec::{encoder_for, Record, RegisterPayload};

use crate::client::{Client, Datagram, Notice};
use crate::error::ClientError;
use crate::scheduler::Job;
use crate::servers::ServerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingKind {
    Bootstrap,
    Register,
    Update,
    Deregister,
    Send,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
    pub kind: PendingKind,
    pub server: usize,
    pub bytes: Vec<u8>,
    pub attempt: u32,
    pub timeout: Duration,
}

impl Client {
    /// Queue a Bootstrap-Request (`POST /bs?ep=…`) on a bootstrap server.
    pub fn request_bootstrap(&mut self, now: Instant, server: ServerHandle) -> Result<(), ClientError> {
        let mut message = self.start_request(server)?;
        message.code = Code::POST;
        message.push_uri_path("bs");
        message.push_uri_query(&format!("ep={}", self.config.endpoint));
        self.submit(now, server, PendingKind::Bootstrap, message)
    }

    /// Queue a Register (`POST /rd`) carrying the CoRE-Link object list.
    pub fn request_register(&mut self, now: Instant, server: ServerHandle) -> Result<(), ClientError> {
        let mut message = self.start_request(server)?;
        message.code = Code::POST;
        message.push_uri_path("rd");
        message.push_uri_query(&format!("ep={}", self.config.endpoint));
        message.push_uri_query(&format!("lt={}", self.config.lifetime));
        message.push_uri_query(&format!("lwm2m={}", self.config.version));
        if let Some(binding) = &self.config.binding {
            message.push_uri_query(&format!("b={binding}"));
        }
        if self.config.queue_mode {
            message.push_uri_query("Q");
        }
        message.set_content_format(ContentFormat::LinkFormat);
        message.payload = self.register_payload();
        self.submit(now, server, PendingKind::Register, message)
    }

    /// Queue a registration Update (`POST` to the captured location).
    pub fn request_update(&mut self, now: Instant, server: ServerHandle) -> Result<(), ClientError> {
        let location = {
            let conn = self.servers.get(server.0).ok_or(ClientError::UnknownServer)?;
            if !conn.registered {
                return Err(ClientError::NotRegistered);
            }
            conn.location.clone()
        };
        let mut message = self.start_request(server)?;
        message.code = Code::POST;
        for segment in &location {
            message.push_uri_path(segment);
        }
        self.submit(now, server, PendingKind::Update, message)
    }

    /// Queue a Deregister (`DELETE` on the captured location).
    pub fn request_deregister(&mut self, now: Instant, server: ServerHandle) -> Result<(), ClientError> {
        let location = {
            let conn = self.servers.get(server.0).ok_or(ClientError::UnknownServer)?;
            if !conn.registered {
                return Err(ClientError::NotRegistered);
            }
            conn.location.clone()
        };
        let mut message = self.start_request(server)?;
        message.code = Code::DELETE;
        for segment in &location {
            message.push_uri_path(segment);
        }
        self.submit(now, server, PendingKind::Deregister, message)
    }

    /// Queue a Send (`POST /dp`) reporting the current values under the
    /// given paths.
    pub fn send_data(
        &mut self,
        now: Instant,
        server: ServerHandle,
        paths: &[Path],
    ) -> Result<(), ClientError> {
        let mut records: Vec<Record> = Vec::new();
        for path in paths {
            for entry in self.registry.collect_readable(path)? {
                records.push(Record::new(entry.path, entry.value));
            }
        }
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records.dedup_by(|a, b| a.path == b.path);

        let mut encoder = encoder_for(ContentFormat::SenmlCbor, Path::root(), records.len())?;
        for record in &records {
            encoder.add(record)?;
        }
        encoder.finish()?;
        let payload = std::mem::take(encoder.output_mut());

        let mut message = self.start_request(server)?;
        message.code = Code::POST;
        message.push_uri_path("dp");
        message.set_content_format(ContentFormat::SenmlCbor);
        message.payload = payload;
        self.submit(now, server, PendingKind::Send, message)
    }

    /// The Register payload lists every object except Security and
    /// OSCORE, objects ascending, instances ascending within each.
    pub(crate) fn register_payload(&self) -> Vec<u8> {
        let mut payload = RegisterPayload::new();
        for (oid, version, iids) in self.registry.register_entries() {
            if oid == OID_SECURITY || oid == OID_OSCORE {
                continue;
            }
            payload.add_object(oid, version);
            for iid in iids {
                payload.add_instance(oid, iid);
            }
        }
        std::mem::take(payload.output_mut())
    }

    fn start_request(&mut self, server: ServerHandle) -> Result<Message, ClientError> {
        let message_id = {
            let conn = self.servers.get_mut(server.0).ok_or(ClientError::UnknownServer)?;
            conn.take_message_id()
        };
        let pending = &self.pending;
        let token = self.token_gen.next(|candidate| pending.contains_key(candidate));
        Ok(Message::new(MsgType::Confirmable, Code::EMPTY, message_id, token))
    }

    fn submit(
        &mut self,
        now: Instant,
        server: ServerHandle,
        kind: PendingKind,
        message: Message,
    ) -> Result<(), ClientError> {
        let bytes = message.encode();
        let factor = self.token_gen.backoff_factor(self.config.transmission.ack_random_factor);
        let timeout = self.config.transmission.ack_timeout.mul_f64(factor);

        self.pending.insert(
            message.token,
            PendingRequest { kind, server: server.0, bytes: bytes.clone(), attempt: 0, timeout },
        );
        self.scheduler
            .schedule(now + timeout, Job::Retransmit { token: message.token });
        self.outbox.push(Datagram { server, bytes });
        Ok(())
    }

    pub(crate) fn retransmit(&mut self, now: Instant, token: Token, out: &mut Vec<Datagram>) {
        let Some(pending) = self.pending.get_mut(&token) else {
            return;
        };
        pending.attempt += 1;
        if pending.attempt > self.config.transmission.max_retransmit {
            let pending = match self.pending.remove(&token) {
                Some(pending) => pending,
                None => return,
            };
            self.request_failed(pending);
            return;
        }
        pending.timeout *= 2;
        let deadline = now + pending.timeout;
        let server = ServerHandle(pending.server);
        let bytes = pending.bytes.clone();
        tracing::debug!(attempt = pending.attempt, "retransmitting request");
        out.push(Datagram { server, bytes });
        self.scheduler.schedule(deadline, Job::Retransmit { token });
    }

    fn request_failed(&mut self, pending: PendingRequest) {
        let server = ServerHandle(pending.server);
        tracing::warn!(server = pending.server, kind = ?pending.kind, "request timed out");
        match pending.kind {
            PendingKind::Register | PendingKind::Bootstrap => {
                self.notice(Notice::RegistrationFailed { server });
            }
            PendingKind::Update => {
                if let Some(conn) = self.servers.get_mut(pending.server) {
                    conn.registered = false;
                }
                self.notice(Notice::RegistrationFailed { server });
            }
            PendingKind::Deregister => self.notice(Notice::DeregisterComplete { server }),
            PendingKind::Send => self.notice(Notice::SendFailed { server }),
        }
    }

    /// Periodic registration refresh at half the lifetime.
    pub(crate) fn refresh_registration(
        &mut self,
        now: Instant,
        server: usize,
        _out: &mut [Datagram],
    ) {
        let handle = ServerHandle(server);
        let registered = self.servers.get(server).is_some_and(|conn| conn.registered);
        if registered {
            if let Err(error) = self.request_update(now, handle) {
                tracing::warn!(%error, "update request failed");
            }
        }
    }

    pub(crate) fn queue_updates(&mut self, now: Instant, _out: &mut [Datagram]) {
        let registered: Vec<usize> = self
            .servers
            .iter()
            .filter(|(_, conn)| conn.registered)
            .map(|(index, _)| index)
            .collect();
        for server in registered {
            if let Err(error) = self.request_update(now, ServerHandle(server)) {
                tracing::warn!(%error, "update request failed");
            }
        }
    }

    /// A response, ACK or RST arrived.
    pub(crate) fn handle_response_frame(
        &mut self,
        now: Instant,
        server: usize,
        msg: Message,
        _out: &mut [Datagram],
    ) {
        let response = match classify_response(msg) {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(%error, "unclassifiable response frame");
                return;
            }
        };

        match response.kind {
            MsgType::Reset => {
                self.notify_reset(server, response.message_id);
                // a reset aimed at one of our requests aborts it
                let aborted = self
                    .pending
                    .iter()
                    .find(|(_, pending)| {
                        pending.server == server
                            && message_id_of(&pending.bytes) == Some(response.message_id)
                    })
                    .map(|(token, _)| *token);
                if let Some(token) = aborted {
                    if let Some(pending) = self.pending.remove(&token) {
                        self.scheduler.cancel(
                            |job| matches!(job, Job::Retransmit { token: t } if *t == token),
                        );
                        self.request_failed(pending);
                    }
                }
                return;
            }
            MsgType::Acknowledgement if response.code.is_empty() => {
                self.notify_acked(server, response.message_id);
                return;
            }
            _ => {}
        }

        let Some(pending) = self.pending.remove(&response.token) else {
            tracing::debug!("response with no pending request");
            return;
        };
        let token = response.token;
        self.scheduler
            .cancel(|job| matches!(job, Job::Retransmit { token: t } if *t == token));
        self.complete_request(now, pending, response);
    }

    fn complete_request(&mut self, now: Instant, pending: PendingRequest, response: Response) {
        let server = ServerHandle(pending.server);
        match pending.kind {
            PendingKind::Bootstrap => {
                if response.code == Code::CHANGED {
                    tracing::info!(server = pending.server, "bootstrap request accepted");
                } else {
                    self.notice(Notice::RegistrationFailed { server });
                }
            }
            PendingKind::Register => {
                if response.code == Code::CREATED {
                    if let Some(conn) = self.servers.get_mut(pending.server) {
                        conn.registered = true;
                        conn.location = response.location.clone();
                    }
                    self.schedule_refresh(now, pending.server);
                    self.notice(Notice::RegistrationComplete {
                        server,
                        location: response.location,
                    });
                } else {
                    self.notice(Notice::RegistrationFailed { server });
                }
            }
            PendingKind::Update => {
                if response.code == Code::CHANGED {
                    self.schedule_refresh(now, pending.server);
                    self.notice(Notice::UpdateComplete { server });
                } else {
                    if let Some(conn) = self.servers.get_mut(pending.server) {
                        conn.registered = false;
                    }
                    self.notice(Notice::RegistrationFailed { server });
                }
            }
            PendingKind::Deregister => {
                if let Some(conn) = self.servers.get_mut(pending.server) {
                    conn.registered = false;
                    conn.location.clear();
                }
                self.scheduler
                    .cancel(|job| matches!(job, Job::RegistrationRefresh { server: s } if *s == pending.server));
                self.notice(Notice::DeregisterComplete { server });
            }
            PendingKind::Send => {
                if response.code == Code::CHANGED {
                    self.notice(Notice::SendComplete { server });
                } else {
                    self.notice(Notice::SendFailed { server });
                }
            }
        }
    }

    pub(crate) fn schedule_refresh(&mut self, now: Instant, server: usize) {
        let half_life = Duration::from_secs(u64::from(self.config.lifetime.max(2)) / 2).max(Duration::from_secs(1));
        self.scheduler
            .schedule(now + half_life, Job::RegistrationRefresh { server });
    }
}

fn message_id_of(bytes: &[u8]) -> Option<u16> {
    Some(u16::from_be_bytes([*bytes.get(2)?, *bytes.get(3)?]))
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;
