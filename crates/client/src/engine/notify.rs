// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification emission: change evaluation, pmin deferral, pmax
//! heartbeats, confirmable delivery tracking and implicit cancellation.

use std::time::{Duration, Instant};

use mote_coap::{Code, Message, MsgType, Token};

use crate::client::{Client, Datagram, Notice};
use crate::engine::read::encode_all;
use crate::observe::Decision;
use crate::scheduler::Job;
use crate::servers::ServerHandle;

/// MAX_TRANSMIT_WAIT with the default RFC 7252 parameters.
const NOTIFY_ACK_WAIT: Duration = Duration::from_secs(93);

impl Client {
    /// Evaluate queued change triggers and time-based dues, emitting
    /// whatever notifications are eligible.
    pub(crate) fn notify_tick(&mut self, now: Instant, out: &mut Vec<Datagram>) {
        let mut due: Vec<(usize, Token)> = Vec::new();

        for path in std::mem::take(&mut self.changed_paths) {
            for observation in self.observations.affected_by(&path) {
                due.push((observation.server, observation.token));
            }
        }
        for observation in self.observations.iter() {
            if observation.next_deadline().is_some_and(|deadline| deadline <= now) {
                due.push((observation.server, observation.token));
            }
        }
        due.sort();
        due.dedup();

        for (server, token) in due {
            self.evaluate_observation(now, server, token, out);
        }
    }

    fn evaluate_observation(
        &mut self,
        now: Instant,
        server: usize,
        token: Token,
        out: &mut Vec<Datagram>,
    ) {
        let Some(observation) = self.observations.get_mut(server, token) else {
            return;
        };
        let path = observation.path;
        let format = observation.format;

        // Re-read the target; a failed read becomes an error notify and
        // implicitly ends the observation.
        let body = self
            .registry
            .collect_readable(&path)
            .map_err(|error| crate::error::dm_status(&error))
            .and_then(|entries| {
                let records: Vec<mote_codec::Record> = entries
                    .into_iter()
                    .map(|entry| mote_codec::Record::new(entry.path, entry.value))
                    .collect();
                let numeric = (records.len() == 1)
                    .then(|| records[0].value.as_f64())
                    .flatten();
                encode_all(format, path, &records).map(|payload| (payload, numeric))
            });

        match body {
            Ok((payload, numeric)) => {
                let Some(observation) = self.observations.get_mut(server, token) else {
                    return;
                };
                let changed = payload != observation.last_payload;
                match observation.evaluate(now, numeric, changed) {
                    Decision::Skip => observation.pending = false,
                    Decision::Defer(_) => observation.pending = true,
                    Decision::Send => self.send_notify(now, server, token, payload, numeric, out),
                }
            }
            Err(code) => {
                self.send_error_notify(now, server, token, code, out);
            }
        }
    }

    fn send_notify(
        &mut self,
        now: Instant,
        server: usize,
        token: Token,
        payload: Vec<u8>,
        numeric: Option<f64>,
        out: &mut Vec<Datagram>,
    ) {
        let message_id = self.next_message_id(ServerHandle(server));
        let Some(observation) = self.observations.get_mut(server, token) else {
            return;
        };

        let confirmable = observation.attrs.con == Some(true);
        let kind = if confirmable { MsgType::Confirmable } else { MsgType::NonConfirmable };
        let number = observation.bump_number();
        let format = observation.format;
        observation.mark_sent(now, payload.clone(), numeric);
        observation.last_message_id = Some(message_id);
        if confirmable {
            observation.awaiting_ack = Some(message_id);
            self.scheduler
                .schedule(now + NOTIFY_ACK_WAIT, Job::NotifyTimeout { server, token, message_id });
        }

        let mut message = Message::new(kind, Code::CONTENT, message_id, token);
        message.set_observe(number);
        message.set_content_format(format);
        message.payload = payload;
        self.push_message(ServerHandle(server), &message, out);
    }

    /// A 4.xx/5.xx notify ends the observation (invariant: an error code
    /// emitted as a Notify cancels immediately).
    fn send_error_notify(
        &mut self,
        _now: Instant,
        server: usize,
        token: Token,
        code: Code,
        out: &mut Vec<Datagram>,
    ) {
        let message_id = self.next_message_id(ServerHandle(server));
        let Some(observation) = self.observations.remove(server, token) else {
            return;
        };
        let number = (observation.observe_number + 1) % crate::observe::OBSERVE_NUMBER_MODULUS;

        let mut message = Message::new(MsgType::Confirmable, code, message_id, token);
        message.set_observe(number);
        self.push_message(ServerHandle(server), &message, out);
        self.notice(Notice::ObservationCancelled {
            token: observation.token,
            path: observation.path,
        });
    }

    /// An empty ACK matched a confirmable notification.
    pub(crate) fn notify_acked(&mut self, server: usize, message_id: u16) {
        let token = match self.observations.by_message_id(server, message_id) {
            Some(observation) if observation.awaiting_ack == Some(message_id) => {
                observation.awaiting_ack = None;
                observation.token
            }
            _ => return,
        };
        self.notice(Notice::NotifyDelivered { token });
    }

    /// An RST matched a notification: the peer no longer wants it.
    pub(crate) fn notify_reset(&mut self, server: usize, message_id: u16) {
        let Some(token) = self
            .observations
            .by_message_id(server, message_id)
            .map(|observation| observation.token)
        else {
            return;
        };
        if let Some(observation) = self.observations.remove(server, token) {
            self.notice(Notice::NotifyFailed { token, timeout: false });
            self.notice(Notice::ObservationCancelled {
                token: observation.token,
                path: observation.path,
            });
        }
    }

    /// The ACK wait elapsed for a confirmable notification.
    pub(crate) fn notify_timeout(&mut self, server: usize, token: Token, message_id: u16) {
        let fired = match self.observations.get_mut(server, token) {
            Some(observation) if observation.awaiting_ack == Some(message_id) => {
                observation.awaiting_ack = None;
                true
            }
            _ => false,
        };
        if fired {
            self.notice(Notice::NotifyFailed { token, timeout: true });
        }
    }
}
