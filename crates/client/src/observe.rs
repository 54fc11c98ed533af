// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observation registry and notification eligibility (C8).
//!
//! Attribute evaluation order per value change: numeric threshold
//! conditions first, then the pmax deadline, with pmin only ever
//! deferring a send, never cancelling it.

use std::time::{Duration, Instant};

use mote_coap::Token;
use mote_core::{ContentFormat, NotificationAttrs, Path};

pub(crate) const OBSERVE_NUMBER_MODULUS: u32 = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Send,
    Defer(Instant),
    Skip,
}

#[derive(Debug, Clone)]
pub(crate) struct Observation {
    pub server: usize,
    pub token: Token,
    pub path: Path,
    pub attrs: NotificationAttrs,
    pub format: ContentFormat,
    pub observe_number: u32,
    pub last_payload: Vec<u8>,
    pub last_numeric: Option<f64>,
    pub last_sent_at: Instant,
    pub next_eligible_at: Instant,
    /// A change fired while pmin was still running.
    pub pending: bool,
    /// Message id of the most recent notification, for RST correlation.
    pub last_message_id: Option<u16>,
    /// Message id of an unacknowledged confirmable notification.
    pub awaiting_ack: Option<u16>,
}

impl Observation {
    /// Advance the 24-bit observe sequence number.
    pub fn bump_number(&mut self) -> u32 {
        self.observe_number = (self.observe_number + 1) % OBSERVE_NUMBER_MODULUS;
        self.observe_number
    }

    /// Record a sent notification body.
    pub fn mark_sent(&mut self, now: Instant, payload: Vec<u8>, numeric: Option<f64>) {
        self.last_payload = payload;
        self.last_numeric = numeric;
        self.last_sent_at = now;
        self.next_eligible_at = now + Duration::from_secs(u64::from(self.attrs.pmin.unwrap_or(0)));
        self.pending = false;
    }

    /// Decide whether the freshly read state should go out now.
    pub fn evaluate(&self, now: Instant, numeric: Option<f64>, payload_changed: bool) -> Decision {
        let value_trigger = if self.attrs.has_numeric_conditions() {
            match (self.last_numeric, numeric) {
                (Some(last), Some(new)) => {
                    let lt = self.attrs.lt.is_some_and(|t| crossed(last, new, t));
                    let gt = self.attrs.gt.is_some_and(|t| crossed(last, new, t));
                    let st = self.attrs.st.is_some_and(|s| (new - last).abs() >= s);
                    lt || gt || st
                }
                _ => payload_changed,
            }
        } else {
            payload_changed
        };

        let pmax_due = self
            .attrs
            .pmax
            .is_some_and(|pmax| now >= self.last_sent_at + Duration::from_secs(u64::from(pmax)));

        if !value_trigger && !pmax_due {
            return Decision::Skip;
        }
        if now < self.next_eligible_at {
            return Decision::Defer(self.next_eligible_at);
        }
        Decision::Send
    }

    /// When this observation next needs attention with no further input.
    pub fn next_deadline(&self) -> Option<Instant> {
        let pmin_release = self.pending.then_some(self.next_eligible_at);
        let heartbeat = self
            .attrs
            .pmax
            .map(|pmax| self.last_sent_at + Duration::from_secs(u64::from(pmax)));
        match (pmin_release, heartbeat) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

fn crossed(last: f64, new: f64, threshold: f64) -> bool {
    (last < threshold) != (new < threshold)
}

#[derive(Debug, Default)]
pub(crate) struct ObserveTable {
    entries: Vec<Observation>,
}

impl ObserveTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, observation: Observation) {
        self.remove(observation.server, observation.token);
        self.entries.push(observation);
    }

    pub fn remove(&mut self, server: usize, token: Token) -> Option<Observation> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.server == server && entry.token == token)?;
        Some(self.entries.remove(index))
    }

    pub fn get_mut(&mut self, server: usize, token: Token) -> Option<&mut Observation> {
        self.entries
            .iter_mut()
            .find(|entry| entry.server == server && entry.token == token)
    }

    pub fn by_message_id(&mut self, server: usize, message_id: u16) -> Option<&mut Observation> {
        self.entries
            .iter_mut()
            .find(|entry| entry.server == server && entry.last_message_id == Some(message_id))
    }

    /// Observations whose target overlaps a changed path: the target
    /// contains the change, or the change contains the target.
    pub fn affected_by(&mut self, path: &Path) -> impl Iterator<Item = &mut Observation> {
        let path = *path;
        self.entries
            .iter_mut()
            .filter(move |entry| path.starts_with(&entry.path) || entry.path.starts_with(&path))
    }

    /// Cancel every observation under a deleted subtree; returns them for
    /// final notices.
    pub fn cancel_under(&mut self, path: &Path) -> Vec<Observation> {
        let path = *path;
        let (cancelled, kept): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|entry| entry.path.starts_with(&path));
        self.entries = kept;
        cancelled
    }

    pub fn references_object(&self, oid: u16) -> bool {
        self.entries.iter().any(|entry| entry.path.oid() == Some(oid))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Observation> {
        self.entries.iter_mut()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().filter_map(Observation::next_deadline).min()
    }
}

#[cfg(test)]
#[path = "observe_tests.rs"]
mod tests;
