// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The CoAP-over-UDP frame: 4-byte header, token, option stream, payload.

use std::fmt;

use mote_core::ContentFormat;

use crate::block::{Block, BlockKind};
use crate::code::Code;
use crate::error::CoapError;
use crate::option::{opt, Options};

pub const MAX_TOKEN_LENGTH: usize = 8;
pub const MAX_ETAG_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    Confirmable,
    NonConfirmable,
    Acknowledgement,
    Reset,
}

impl MsgType {
    fn bits(self) -> u8 {
        match self {
            MsgType::Confirmable => 0,
            MsgType::NonConfirmable => 1,
            MsgType::Acknowledgement => 2,
            MsgType::Reset => 3,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => MsgType::Confirmable,
            1 => MsgType::NonConfirmable,
            2 => MsgType::Acknowledgement,
            _ => MsgType::Reset,
        }
    }
}

/// A 0..=8 byte token, used verbatim as the exchange identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token {
    len: u8,
    bytes: [u8; MAX_TOKEN_LENGTH],
}

impl Token {
    pub const EMPTY: Token = Token { len: 0, bytes: [0; MAX_TOKEN_LENGTH] };

    pub fn from_slice(slice: &[u8]) -> Result<Self, CoapError> {
        if slice.len() > MAX_TOKEN_LENGTH {
            return Err(CoapError::Malformed("token longer than 8 bytes"));
        }
        let mut bytes = [0u8; MAX_TOKEN_LENGTH];
        bytes[..slice.len()].copy_from_slice(slice);
        Ok(Token { len: slice.len() as u8, bytes })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(")?;
        for byte in self.as_slice() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// A decoded (or to-be-encoded) CoAP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MsgType,
    pub code: Code,
    pub message_id: u16,
    pub token: Token,
    pub options: Options,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(kind: MsgType, code: Code, message_id: u16, token: Token) -> Self {
        Self {
            kind,
            code,
            message_id,
            token,
            options: Options::new(),
            payload: Vec::new(),
        }
    }

    /// An ACK carrying a piggybacked response to `request`.
    pub fn ack_for(request: &Message, code: Code) -> Self {
        Self::new(MsgType::Acknowledgement, code, request.message_id, request.token)
    }

    /// An RST for an unprocessable message.
    pub fn reset_for(message_id: u16) -> Self {
        Self::new(MsgType::Reset, Code::EMPTY, message_id, Token::EMPTY)
    }

    /// An empty ACK (separate-response pattern and CON notification acks).
    pub fn empty_ack(message_id: u16) -> Self {
        Self::new(MsgType::Acknowledgement, Code::EMPTY, message_id, Token::EMPTY)
    }

    pub fn decode(buf: &[u8]) -> Result<Message, CoapError> {
        if buf.len() < 4 {
            return Err(CoapError::Malformed("frame shorter than 4 bytes"));
        }
        let version = buf[0] >> 6;
        if version != 1 {
            return Err(CoapError::Malformed("unsupported version"));
        }
        let kind = MsgType::from_bits(buf[0] >> 4);
        let token_length = (buf[0] & 0x0f) as usize;
        if token_length > MAX_TOKEN_LENGTH {
            return Err(CoapError::Malformed("token length nibble over 8"));
        }
        let code = Code::from_byte(buf[1]);
        let message_id = u16::from_be_bytes([buf[2], buf[3]]);

        if buf.len() < 4 + token_length {
            return Err(CoapError::Malformed("token truncated"));
        }
        let token = Token::from_slice(&buf[4..4 + token_length])?;

        let rest = &buf[4 + token_length..];
        let (options, consumed) = Options::decode(rest)?;

        // The option parser stops only at a payload marker or end of buffer.
        let payload = if consumed < rest.len() {
            let payload = &rest[consumed + 1..];
            if payload.is_empty() {
                return Err(CoapError::PayloadMarkerWithoutPayload);
            }
            payload.to_vec()
        } else {
            Vec::new()
        };

        Ok(Message { kind, code, message_id, token, options, payload })
    }

    /// Canonical emission: sorted options, shortest uint forms, payload
    /// marker only when payload is present.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.token.len() + 16 + self.payload.len());
        out.push(0x40 | (self.kind.bits() << 4) | self.token.len() as u8);
        out.push(self.code.byte());
        out.extend_from_slice(&self.message_id.to_be_bytes());
        out.extend_from_slice(self.token.as_slice());
        self.options.encode(&mut out);
        if !self.payload.is_empty() {
            out.push(0xff);
            out.extend_from_slice(&self.payload);
        }
        out
    }

    // --- typed option accessors ---

    pub fn uri_path(&self) -> Result<Vec<&str>, CoapError> {
        self.options.strings(opt::URI_PATH)
    }

    pub fn uri_queries(&self) -> Result<Vec<&str>, CoapError> {
        self.options.strings(opt::URI_QUERY)
    }

    pub fn location_path(&self) -> Result<Vec<&str>, CoapError> {
        self.options.strings(opt::LOCATION_PATH)
    }

    pub fn content_format_raw(&self) -> Result<Option<u16>, CoapError> {
        Ok(self.options.uint(opt::CONTENT_FORMAT)?.map(|v| v as u16))
    }

    pub fn accept_raw(&self) -> Result<Option<u16>, CoapError> {
        Ok(self.options.uint(opt::ACCEPT)?.map(|v| v as u16))
    }

    pub fn observe(&self) -> Result<Option<u32>, CoapError> {
        Ok(self.options.uint(opt::OBSERVE)?.map(|v| v as u32))
    }

    pub fn block1(&self) -> Result<Option<Block>, CoapError> {
        self.block(opt::BLOCK1, BlockKind::Block1)
    }

    pub fn block2(&self) -> Result<Option<Block>, CoapError> {
        self.block(opt::BLOCK2, BlockKind::Block2)
    }

    fn block(&self, number: u16, kind: BlockKind) -> Result<Option<Block>, CoapError> {
        match self.options.uint(number)? {
            None => Ok(None),
            Some(raw) => Block::from_raw(kind, raw as u32).map(Some),
        }
    }

    pub fn etag(&self) -> Result<Option<&[u8]>, CoapError> {
        match self.options.first(opt::ETAG) {
            None => Ok(None),
            Some(raw) if (1..=MAX_ETAG_LENGTH).contains(&raw.len()) => Ok(Some(raw)),
            Some(_) => Err(CoapError::BadOptionValue { number: opt::ETAG }),
        }
    }

    // --- typed option setters ---

    pub fn set_content_format(&mut self, format: ContentFormat) {
        self.options.remove(opt::CONTENT_FORMAT);
        self.options.push_uint(opt::CONTENT_FORMAT, u64::from(format.number()));
    }

    pub fn set_accept(&mut self, format: ContentFormat) {
        self.options.remove(opt::ACCEPT);
        self.options.push_uint(opt::ACCEPT, u64::from(format.number()));
    }

    pub fn set_observe(&mut self, value: u32) {
        self.options.remove(opt::OBSERVE);
        self.options.push_uint(opt::OBSERVE, u64::from(value));
    }

    pub fn set_block(&mut self, block: Block) {
        let number = match block.kind {
            BlockKind::Block1 => opt::BLOCK1,
            BlockKind::Block2 => opt::BLOCK2,
        };
        self.options.remove(number);
        self.options.push_uint(number, u64::from(block.to_raw()));
    }

    pub fn push_uri_path(&mut self, segment: &str) {
        self.options.push_str(opt::URI_PATH, segment);
    }

    pub fn push_uri_query(&mut self, query: &str) {
        self.options.push_str(opt::URI_QUERY, query);
    }
}

#[cfg(test)]
#[path = "msg_tests.rs"]
mod tests;
