// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Block transfer state and the duplicate-response cache (C9).
//!
//! Inbound block1 requests reassemble into a buffer keyed by peer token;
//! outbound block2 responses keep the payload encoder and its pending
//! records so later blocks are produced on demand. Entries expire after
//! `EXCHANGE_LIFETIME` without traffic.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use mote_coap::Token;
use mote_codec::{CodecError, PayloadEncoder, Record};
use mote_core::ContentFormat;

#[derive(Debug)]
pub(crate) struct InboundBlock {
    pub buf: Vec<u8>,
    pub last_number: u32,
    pub deadline: Instant,
}

/// A paginated response produced on demand. Either a pre-built byte
/// payload (link-format responses) or records still to be encoded plus
/// the running encoder; the encoder's output buffer is retained so any
/// already-produced block can be served again.
pub(crate) struct OutboundBlock {
    source: Source,
    pub format: ContentFormat,
    pub deadline: Instant,
}

enum Source {
    Bytes(Vec<u8>),
    Paged {
        records: Vec<Record>,
        next_record: usize,
        encoder: PayloadEncoder,
        finished: bool,
    },
}

impl std::fmt::Debug for OutboundBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Source::Bytes(bytes) => f
                .debug_struct("OutboundBlock")
                .field("bytes", &bytes.len())
                .finish(),
            Source::Paged { next_record, finished, .. } => f
                .debug_struct("OutboundBlock")
                .field("next_record", next_record)
                .field("finished", finished)
                .finish_non_exhaustive(),
        }
    }
}

pub(crate) struct BlockSlice {
    pub data: Vec<u8>,
    pub more: bool,
}

impl OutboundBlock {
    pub fn paged(
        format: ContentFormat,
        records: Vec<Record>,
        encoder: PayloadEncoder,
        deadline: Instant,
    ) -> Self {
        Self {
            source: Source::Paged { records, next_record: 0, encoder, finished: false },
            format,
            deadline,
        }
    }

    pub fn bytes(format: ContentFormat, bytes: Vec<u8>, deadline: Instant) -> Self {
        Self { source: Source::Bytes(bytes), format, deadline }
    }

    /// Drive the source until block `number` of `size` bytes can be
    /// served, then return that slice.
    pub fn slice(&mut self, number: u32, size: u16) -> Result<BlockSlice, CodecError> {
        let start = number as usize * size as usize;
        let end = start + size as usize;

        let (produced, finished) = match &mut self.source {
            Source::Bytes(bytes) => (&*bytes, true),
            Source::Paged { records, next_record, encoder, finished } => {
                while !*finished && encoder.output_mut().len() < end {
                    match records.get(*next_record) {
                        Some(record) => {
                            encoder.add(record)?;
                            *next_record += 1;
                        }
                        None => {
                            encoder.finish()?;
                            *finished = true;
                        }
                    }
                }
                (&*encoder.output_mut(), *finished)
            }
        };

        if start > produced.len() {
            return Err(CodecError::RecordSequence("block beyond end of payload"));
        }
        let end_clamped = end.min(produced.len());
        let data = produced[start..end_clamped].to_vec();
        let more = !finished || produced.len() > end;
        Ok(BlockSlice { data, more })
    }
}

#[derive(Debug)]
pub(crate) struct CachedResponse {
    pub bytes: Vec<u8>,
    pub deadline: Instant,
}

#[derive(Debug, Default)]
pub(crate) struct ExchangeTable {
    inbound: HashMap<(usize, Token), InboundBlock>,
    outbound: HashMap<(usize, Token), OutboundBlock>,
    responses: HashMap<(usize, u16), CachedResponse>,
}

pub(crate) const EXCHANGE_LIFETIME: Duration = Duration::from_secs(247);

impl ExchangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inbound_mut(&mut self, server: usize, token: Token) -> Option<&mut InboundBlock> {
        self.inbound.get_mut(&(server, token))
    }

    pub fn start_inbound(&mut self, server: usize, token: Token, now: Instant) {
        self.inbound.insert(
            (server, token),
            InboundBlock { buf: Vec::new(), last_number: 0, deadline: now + EXCHANGE_LIFETIME },
        );
    }

    pub fn finish_inbound(&mut self, server: usize, token: Token) -> Option<Vec<u8>> {
        self.inbound.remove(&(server, token)).map(|entry| entry.buf)
    }

    pub fn put_outbound(&mut self, server: usize, token: Token, block: OutboundBlock) {
        self.outbound.insert((server, token), block);
    }

    pub fn outbound_mut(&mut self, server: usize, token: Token) -> Option<&mut OutboundBlock> {
        self.outbound.get_mut(&(server, token))
    }

    pub fn drop_outbound(&mut self, server: usize, token: Token) {
        self.outbound.remove(&(server, token));
    }

    pub fn cache_response(&mut self, server: usize, message_id: u16, bytes: Vec<u8>, now: Instant) {
        self.responses.insert(
            (server, message_id),
            CachedResponse { bytes, deadline: now + EXCHANGE_LIFETIME },
        );
    }

    pub fn cached_response(&self, server: usize, message_id: u16) -> Option<&[u8]> {
        self.responses
            .get(&(server, message_id))
            .map(|cached| cached.bytes.as_slice())
    }

    /// Drop everything whose deadline has passed.
    pub fn evict(&mut self, now: Instant) {
        self.inbound.retain(|_, entry| entry.deadline > now);
        self.outbound.retain(|_, entry| entry.deadline > now);
        self.responses.retain(|_, entry| entry.deadline > now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        let inbound = self.inbound.values().map(|entry| entry.deadline);
        let outbound = self.outbound.values().map(|entry| entry.deadline);
        let responses = self.responses.values().map(|entry| entry.deadline);
        inbound.chain(outbound).chain(responses).min()
    }
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;
