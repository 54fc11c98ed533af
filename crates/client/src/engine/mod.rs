// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-initiated operation handling (C7): decode → classify →
//! dispatch → respond, with block reassembly and pagination around it.

mod bootstrap;
mod discover;
mod notify;
mod read;
mod write;

use std::time::Instant;

use mote_coap::{
    classify_request, Block, BlockKind, ClassifyError, CoapError, Code, Message, MsgType,
    Operation, Request, Token,
};
use mote_core::{ContentFormat, Path};
use mote_codec::Record;

use crate::client::{Client, Datagram, Notice};
use crate::exchange::{OutboundBlock, EXCHANGE_LIFETIME};
use crate::servers::{ServerHandle, ServerRole};

/// What an operation wants sent back.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub code: Code,
    pub format: Option<ContentFormat>,
    pub body: Body,
    pub observe: Option<u32>,
}

#[derive(Debug)]
pub(crate) enum Body {
    None,
    Bytes(Vec<u8>),
    Paged { base: Path, records: Vec<Record> },
}

impl Outcome {
    pub fn code(code: Code) -> Self {
        Self { code, format: None, body: Body::None, observe: None }
    }

    pub fn bytes(code: Code, format: ContentFormat, bytes: Vec<u8>) -> Self {
        Self { code, format: Some(format), body: Body::Bytes(bytes), observe: None }
    }

    pub fn paged(code: Code, format: ContentFormat, base: Path, records: Vec<Record>) -> Self {
        Self { code, format: Some(format), body: Body::Paged { base, records }, observe: None }
    }

    pub fn with_observe(mut self, number: u32) -> Self {
        self.observe = Some(number);
        self
    }
}

impl Client {
    pub(crate) fn handle_datagram(&mut self, now: Instant, datagram: Datagram, out: &mut Vec<Datagram>) {
        let server = datagram.server;
        if self.servers.get(server.0).is_none() {
            tracing::warn!(server = server.0, "datagram for unknown server slot");
            return;
        }

        match Message::decode(&datagram.bytes) {
            Ok(msg) if msg.code.is_request() => self.handle_request(now, server, msg, out),
            Ok(msg) => self.handle_response_frame(now, server.0, msg, out),
            Err(CoapError::UnrecognizedCriticalOption { number }) => {
                tracing::debug!(number, "rejecting unknown critical option");
                if let Some((message_id, token)) = peek_header(&datagram.bytes) {
                    let reply =
                        Message::new(MsgType::Acknowledgement, Code::BAD_OPTION, message_id, token);
                    self.push_message(server, &reply, out);
                }
            }
            Err(error) => {
                tracing::debug!(%error, "malformed frame");
                if let Some((message_id, _)) = peek_header(&datagram.bytes) {
                    self.push_message(server, &Message::reset_for(message_id), out);
                }
            }
        }
    }

    fn handle_request(
        &mut self,
        now: Instant,
        server: ServerHandle,
        msg: Message,
        out: &mut Vec<Datagram>,
    ) {
        let message_id = msg.message_id;
        let token = msg.token;
        let confirmable = msg.kind == MsgType::Confirmable;

        // Retransmissions of an already-answered request replay the
        // cached response bytes.
        if confirmable {
            if let Some(bytes) = self.exchanges.cached_response(server.0, message_id) {
                out.push(Datagram { server, bytes: bytes.to_vec() });
                return;
            }
        }

        let request = match classify_request(msg) {
            Ok(request) => request,
            Err(error) => {
                let code = classify_status(&error);
                let reply = self.bare_response(server, confirmable, message_id, token, code);
                self.finish_response(now, server, confirmable, message_id, reply, out);
                return;
            }
        };

        // A continuation block2 request resumes a paginated response.
        if let Some(block2) = request.block2 {
            if block2.number > 0 {
                let reply = self.continue_block2(server, &request, block2);
                self.finish_response(now, server, confirmable, message_id, reply, out);
                return;
            }
        }

        // Block1 reassembly buffers the body until the final block.
        let payload = match request.block1 {
            Some(block1) => match self.reassemble(now, server.0, &request, block1) {
                Reassembly::Reply(reply) => {
                    self.finish_response(now, server, confirmable, message_id, reply, out);
                    return;
                }
                Reassembly::Complete(payload) => payload,
            },
            None => request.payload.clone(),
        };

        let outcome = self
            .dispatch(now, server, &request, &payload)
            .unwrap_or_else(Outcome::code);
        let reply = self.build_response(now, server, &request, outcome);
        self.finish_response(now, server, confirmable, message_id, reply, out);
    }

    fn dispatch(
        &mut self,
        now: Instant,
        server: ServerHandle,
        request: &Request,
        payload: &[u8],
    ) -> Result<Outcome, Code> {
        let bootstrap = self
            .servers
            .get(server.0)
            .is_some_and(|conn| conn.role == ServerRole::Bootstrap);

        match &request.operation {
            Operation::Read { path } => self.op_read(now, server, *path, request.accept),
            Operation::ObserveStart { path, attrs } => {
                self.op_observe_start(now, server, *path, *attrs, request)
            }
            Operation::ObserveCancel { path } => {
                self.op_observe_cancel(now, server, *path, request)
            }
            Operation::Discover { path, attrs } => {
                if bootstrap {
                    self.op_bootstrap_discover(*path)
                } else {
                    self.op_discover(server, *path, attrs.depth)
                }
            }
            Operation::ReadComposite => self.op_read_composite(request, payload),
            Operation::WriteReplace { path } => {
                self.op_write(now, *path, true, request.content_format, payload)
            }
            Operation::WritePartialUpdate { path } => {
                self.op_write(now, *path, false, request.content_format, payload)
            }
            Operation::WriteComposite => {
                self.op_write_composite(now, request.content_format, payload)
            }
            Operation::WriteAttributes { path, attrs } => {
                self.op_write_attributes(server, *path, attrs)
            }
            Operation::Execute { path } => self.op_execute(now, *path, payload),
            Operation::Create { path } => {
                self.op_create(now, *path, request.content_format, payload)
            }
            Operation::Delete { path } => {
                if bootstrap {
                    self.op_bootstrap_delete(now, *path)
                } else {
                    self.op_delete(now, *path)
                }
            }
            Operation::BootstrapFinish => {
                self.notice(Notice::BootstrapFinished { server });
                Ok(Outcome::code(Code::CHANGED))
            }
            Operation::BootstrapPack => self.op_read(now, server, Path::root(), request.accept),
            Operation::BootstrapRequest(_)
            | Operation::Register(_)
            | Operation::Update { .. }
            | Operation::Deregister { .. }
            | Operation::Send => Err(Code::METHOD_NOT_ALLOWED),
        }
    }

    fn bare_response(
        &mut self,
        server: ServerHandle,
        confirmable: bool,
        message_id: u16,
        token: Token,
        code: Code,
    ) -> Message {
        let (kind, message_id) = if confirmable {
            (MsgType::Acknowledgement, message_id)
        } else {
            (MsgType::NonConfirmable, self.next_message_id(server))
        };
        Message::new(kind, code, message_id, token)
    }

    /// Turn an operation outcome into the response frame, paginating the
    /// body when it exceeds one block.
    fn build_response(
        &mut self,
        now: Instant,
        server: ServerHandle,
        request: &Request,
        outcome: Outcome,
    ) -> Message {
        let confirmable = request.kind == MsgType::Confirmable;
        let mut reply =
            self.bare_response(server, confirmable, request.message_id, request.token, outcome.code);
        if let Some(observe) = outcome.observe {
            reply.set_observe(observe);
        }
        if let Some(block1) = request.block1 {
            reply.set_block(block1);
        }

        let format = outcome.format.unwrap_or(ContentFormat::PlainText);
        let mut source = match outcome.body {
            Body::None => return reply,
            Body::Bytes(bytes) => OutboundBlock::bytes(format, bytes, now + EXCHANGE_LIFETIME),
            Body::Paged { base, records } => {
                let count = records.len();
                match mote_codec::encoder_for(format, base, count) {
                    Ok(encoder) => {
                        OutboundBlock::paged(format, records, encoder, now + EXCHANGE_LIFETIME)
                    }
                    Err(error) => {
                        tracing::debug!(%error, "response encoder unavailable");
                        reply.code = Code::NOT_ACCEPTABLE;
                        return reply;
                    }
                }
            }
        };

        let size = request
            .block2
            .map(|block| block.size.min(self.config.preferred_block_size()))
            .unwrap_or_else(|| self.config.preferred_block_size());

        match source.slice(0, size) {
            Ok(slice) => {
                reply.set_content_format(format);
                if slice.more {
                    if let Ok(block) = Block::new(BlockKind::Block2, 0, true, size) {
                        reply.set_block(block);
                    }
                    self.exchanges.put_outbound(server.0, request.token, source);
                } else if request.block2.is_some() {
                    if let Ok(block) = Block::new(BlockKind::Block2, 0, false, size) {
                        reply.set_block(block);
                    }
                }
                reply.payload = slice.data;
            }
            Err(error) => {
                tracing::warn!(%error, "payload emission failed");
                reply.code = Code::INTERNAL_SERVER_ERROR;
                reply.payload = Vec::new();
            }
        }
        reply
    }

    /// Serve block `number > 0` of an earlier paginated response.
    fn continue_block2(
        &mut self,
        server: ServerHandle,
        request: &Request,
        block2: Block,
    ) -> Message {
        let confirmable = request.kind == MsgType::Confirmable;
        let Some(outbound) = self.exchanges.outbound_mut(server.0, request.token) else {
            return self.bare_response(
                server,
                confirmable,
                request.message_id,
                request.token,
                Code::REQUEST_ENTITY_INCOMPLETE,
            );
        };
        let format = outbound.format;
        let size = block2.size.min(self.config.preferred_block_size());
        match outbound.slice(block2.number, size) {
            Ok(slice) => {
                let more = slice.more;
                let data = slice.data;
                let mut reply = self.bare_response(
                    server,
                    confirmable,
                    request.message_id,
                    request.token,
                    Code::CONTENT,
                );
                reply.set_content_format(format);
                if let Ok(block) = Block::new(BlockKind::Block2, block2.number, more, size) {
                    reply.set_block(block);
                }
                reply.payload = data;
                if !more {
                    self.exchanges.drop_outbound(server.0, request.token);
                }
                reply
            }
            Err(_) => self.bare_response(
                server,
                confirmable,
                request.message_id,
                request.token,
                Code::BAD_OPTION,
            ),
        }
    }

    /// Cache (for CON requests) and emit the response.
    fn finish_response(
        &mut self,
        now: Instant,
        server: ServerHandle,
        confirmable: bool,
        request_message_id: u16,
        reply: Message,
        out: &mut Vec<Datagram>,
    ) {
        let bytes = reply.encode();
        if confirmable {
            self.exchanges
                .cache_response(server.0, request_message_id, bytes.clone(), now);
        }
        out.push(Datagram { server, bytes });
    }

    fn next_message_id(&mut self, server: ServerHandle) -> u16 {
        self.servers
            .get_mut(server.0)
            .map(|conn| conn.take_message_id())
            .unwrap_or_default()
    }

    fn reassemble(
        &mut self,
        now: Instant,
        server: usize,
        request: &Request,
        block1: Block,
    ) -> Reassembly {
        let token = request.token;
        let handle = ServerHandle(server);
        let confirmable = request.kind == MsgType::Confirmable;

        if block1.number == 0 {
            self.exchanges.start_inbound(server, token, now);
        }

        let cap = self.config.max_inbound_payload;
        let status = match self.exchanges.inbound_mut(server, token) {
            None => Status::BadSequence,
            Some(entry) => {
                if block1.number != 0 && block1.number != entry.last_number + 1 {
                    Status::BadSequence
                } else {
                    entry.buf.extend_from_slice(&request.payload);
                    entry.last_number = block1.number;
                    entry.deadline = now + EXCHANGE_LIFETIME;
                    if entry.buf.len() > cap {
                        Status::TooLarge
                    } else if block1.more {
                        Status::Continue
                    } else {
                        Status::Final
                    }
                }
            }
        };

        let reply_code = match status {
            Status::BadSequence => {
                self.exchanges.finish_inbound(server, token);
                Code::REQUEST_ENTITY_INCOMPLETE
            }
            Status::TooLarge => {
                self.exchanges.finish_inbound(server, token);
                Code::REQUEST_ENTITY_TOO_LARGE
            }
            Status::Continue => Code::CONTINUE,
            Status::Final => {
                return match self.exchanges.finish_inbound(server, token) {
                    Some(payload) => Reassembly::Complete(payload),
                    None => Reassembly::Reply(self.bare_response(
                        handle,
                        confirmable,
                        request.message_id,
                        token,
                        Code::REQUEST_ENTITY_INCOMPLETE,
                    )),
                };
            }
        };

        let mut reply =
            self.bare_response(handle, confirmable, request.message_id, token, reply_code);
        if reply_code == Code::CONTINUE {
            reply.set_block(block1);
        }
        Reassembly::Reply(reply)
    }
}

enum Status {
    BadSequence,
    TooLarge,
    Continue,
    Final,
}

enum Reassembly {
    Reply(Message),
    Complete(Vec<u8>),
}

fn classify_status(error: &ClassifyError) -> Code {
    match error {
        ClassifyError::MethodNotAllowed(_) => Code::METHOD_NOT_ALLOWED,
        ClassifyError::BadPath
        | ClassifyError::BadQuery(_)
        | ClassifyError::NotARequest
        | ClassifyError::NotAResponse
        | ClassifyError::TooManyLocationSegments => Code::BAD_REQUEST,
        ClassifyError::Coap(CoapError::UnrecognizedCriticalOption { .. }) => Code::BAD_OPTION,
        ClassifyError::Coap(_) => Code::BAD_REQUEST,
    }
}

fn peek_header(bytes: &[u8]) -> Option<(u16, Token)> {
    if bytes.len() < 4 {
        return None;
    }
    let message_id = u16::from_be_bytes([bytes[2], bytes[3]]);
    let token_length = (bytes[0] & 0x0f) as usize;
    let token = bytes
        .get(4..4 + token_length)
        .and_then(|slice| Token::from_slice(slice).ok())
        .unwrap_or(Token::EMPTY);
    Some((message_id, token))
}
