// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The client value: all protocol state in one place, driven by `step`.

use std::collections::HashMap;
use std::time::Instant;

use mote_coap::{Message, Token};
use mote_core::Path;
use mote_dm::{ObjectHandler, Registry};

use crate::attrs::AttrStore;
use crate::config::Config;
use crate::error::ClientError;
use crate::events::{EventHandle, EventQueue, HostEvent};
use crate::exchange::ExchangeTable;
use crate::observe::ObserveTable;
use crate::registration::PendingRequest;
use crate::scheduler::{Job, Scheduler};
use crate::servers::{ServerConn, ServerHandle, ServerRole, ServerTable};
use crate::token::TokenGen;

/// One UDP payload tagged with the server connection it belongs to.
/// Sockets and DTLS stay in the host; the engine only sees bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub server: ServerHandle,
    pub bytes: Vec<u8>,
}

/// Engine-to-host notifications, drained with [`Client::take_notices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    RegistrationComplete { server: ServerHandle, location: Vec<String> },
    RegistrationFailed { server: ServerHandle },
    UpdateComplete { server: ServerHandle },
    DeregisterComplete { server: ServerHandle },
    BootstrapFinished { server: ServerHandle },
    SendComplete { server: ServerHandle },
    SendFailed { server: ServerHandle },
    /// A confirmable notification was acknowledged.
    NotifyDelivered { token: Token },
    /// A confirmable notification timed out or was reset.
    NotifyFailed { token: Token, timeout: bool },
    /// An observation ended (cancel, reset or target deletion). Emitted
    /// exactly once per observation.
    ObservationCancelled { token: Token, path: Path },
}

pub struct Client {
    pub(crate) config: Config,
    pub(crate) registry: Registry,
    pub(crate) scheduler: Scheduler,
    pub(crate) observations: ObserveTable,
    pub(crate) exchanges: ExchangeTable,
    pub(crate) attrs: AttrStore,
    pub(crate) servers: ServerTable,
    pub(crate) token_gen: TokenGen,
    pub(crate) events: EventQueue,
    pub(crate) pending: HashMap<Token, PendingRequest>,
    pub(crate) notices: Vec<Notice>,
    pub(crate) changed_paths: Vec<Path>,
    /// Client-initiated messages built between steps, emitted on the
    /// next `step`.
    pub(crate) outbox: Vec<Datagram>,
}

impl Client {
    pub fn new(config: Config) -> Self {
        let token_gen = TokenGen::new(config.seed);
        Self {
            config,
            registry: Registry::new(),
            scheduler: Scheduler::new(),
            observations: ObserveTable::new(),
            exchanges: ExchangeTable::new(),
            attrs: AttrStore::new(),
            servers: ServerTable::new(),
            token_gen,
            events: EventQueue::new(),
            pending: HashMap::new(),
            notices: Vec::new(),
            changed_paths: Vec::new(),
            outbox: Vec::new(),
        }
    }

    /// Declare a server connection. The host owns the socket for it and
    /// tags inbound datagrams with the returned handle.
    pub fn add_server(&mut self, ssid: u16, role: ServerRole) -> ServerHandle {
        let initial_mid = self.token_gen.initial_message_id();
        self.servers.add(ServerConn::new(ssid, role, initial_mid))
    }

    pub fn register_object(
        &mut self,
        oid: u16,
        handler: Box<dyn ObjectHandler>,
    ) -> Result<(), ClientError> {
        Ok(self.registry.register(oid, handler)?)
    }

    /// Remove an object. Refused while an observation still targets it.
    pub fn unregister_object(&mut self, oid: u16) -> Result<Box<dyn ObjectHandler>, ClientError> {
        if self.observations.references_object(oid) {
            return Err(ClientError::ObjectInUse(oid));
        }
        Ok(self.registry.unregister(oid)?)
    }

    /// Direct data model access for host-side setup and reads.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Thread-safe handle for posting events from outside the loop.
    pub fn event_handle(&self) -> EventHandle {
        self.events.handle()
    }

    /// Tell the engine a value changed outside of it (same-thread form
    /// of [`EventHandle::resource_changed`]).
    pub fn trigger_notification(&mut self, path: Path) {
        self.changed_paths.push(path);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// When the host must call [`Client::step`] again even without
    /// traffic.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.scheduler.next_deadline(),
            self.observations.next_deadline(),
            self.exchanges.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// The single entry point of the embedding contract: feed the
    /// current time and at most one received datagram, get back the
    /// datagrams to send.
    pub fn step(
        &mut self,
        now: Instant,
        inbound: Option<Datagram>,
    ) -> Result<Vec<Datagram>, ClientError> {
        let mut out = std::mem::take(&mut self.outbox);

        for event in self.events.drain() {
            match event {
                HostEvent::ResourceChanged { path } => self.changed_paths.push(path),
                HostEvent::UpdateTrigger => self.queue_updates(now, &mut out),
            }
        }

        self.exchanges.evict(now);

        if let Some(datagram) = inbound {
            self.handle_datagram(now, datagram, &mut out);
        }

        for job in self.scheduler.take_due(now) {
            self.run_job(now, job, &mut out);
        }

        self.notify_tick(now, &mut out);

        // client requests queued by jobs or events during this step
        out.extend(std::mem::take(&mut self.outbox));

        Ok(out)
    }

    fn run_job(&mut self, now: Instant, job: Job, out: &mut Vec<Datagram>) {
        match job {
            Job::Retransmit { token } => self.retransmit(now, token, out),
            Job::RegistrationRefresh { server } => self.refresh_registration(now, server, out),
            Job::NotifyTimeout { server, token, message_id } => {
                self.notify_timeout(server, token, message_id);
            }
        }
    }

    pub(crate) fn notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub(crate) fn push_message(
        &mut self,
        server: ServerHandle,
        message: &Message,
        out: &mut Vec<Datagram>,
    ) {
        out.push(Datagram { server, bytes: message.encode() });
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
