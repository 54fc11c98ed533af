// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental CBOR event decoder.
//!
//! Bytes arrive through [`Decoder::feed`]; [`Decoder::next`] yields one
//! event per data item head (with strings fully buffered) and returns
//! `Ok(None)` while an item is still incomplete. After [`Decoder::end`],
//! a dangling partial item is a [`CodecError::Truncated`] error.

use crate::error::CodecError;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Uint(u64),
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    /// `None` length means indefinite; terminated by [`Event::Break`].
    Array(Option<u64>),
    /// `None` length means indefinite; terminated by [`Event::Break`].
    Map(Option<u64>),
    Tag(u64),
    Bool(bool),
    Null,
    Undefined,
    Float(f64),
    Break,
}

#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
    pos: usize,
    ended: bool,
}

enum Step {
    Event(Event),
    NeedMore,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        if self.pos > 4096 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Mark end of input; any incomplete item becomes an error.
    pub fn end(&mut self) {
        self.ended = true;
    }

    /// True when the input is finished and fully consumed.
    pub fn at_end(&self) -> bool {
        self.ended && self.pos >= self.buf.len()
    }

    pub fn next(&mut self) -> Result<Option<Event>, CodecError> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        let start = self.pos;
        match self.step()? {
            Step::Event(event) => Ok(Some(event)),
            Step::NeedMore => {
                self.pos = start;
                if self.ended {
                    Err(CodecError::Truncated)
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn step(&mut self) -> Result<Step, CodecError> {
        let Some(&head) = self.buf.get(self.pos) else {
            return Ok(Step::NeedMore);
        };
        self.pos += 1;
        let major = head >> 5;
        let info = head & 0x1f;

        if info == 31 {
            return match major {
                2 | 3 => Err(CodecError::Malformed("indefinite-length string")),
                4 => Ok(Step::Event(Event::Array(None))),
                5 => Ok(Step::Event(Event::Map(None))),
                7 => Ok(Step::Event(Event::Break)),
                _ => Err(CodecError::Malformed("reserved additional info 31")),
            };
        }

        if major == 7 {
            return self.simple(info);
        }

        let argument = match self.argument(info)? {
            Some(argument) => argument,
            None => return Ok(Step::NeedMore),
        };

        match major {
            0 => Ok(Step::Event(Event::Uint(argument))),
            1 => {
                let value = i64::try_from(argument)
                    .map_err(|_| CodecError::Malformed("negative integer below i64::MIN"))?;
                Ok(Step::Event(Event::Int(-1 - value)))
            }
            2 => self.string_body(argument, false),
            3 => self.string_body(argument, true),
            4 => Ok(Step::Event(Event::Array(Some(argument)))),
            5 => Ok(Step::Event(Event::Map(Some(argument)))),
            6 => Ok(Step::Event(Event::Tag(argument))),
            _ => Err(CodecError::Malformed("unknown major type")),
        }
    }

    fn simple(&mut self, info: u8) -> Result<Step, CodecError> {
        match info {
            20 => Ok(Step::Event(Event::Bool(false))),
            21 => Ok(Step::Event(Event::Bool(true))),
            22 => Ok(Step::Event(Event::Null)),
            23 => Ok(Step::Event(Event::Undefined)),
            24 => {
                if self.take(1).is_none() {
                    return Ok(Step::NeedMore);
                }
                Ok(Step::Event(Event::Undefined))
            }
            25 => match self.take(2) {
                None => Ok(Step::NeedMore),
                Some(raw) => {
                    let bits = u16::from_be_bytes([raw[0], raw[1]]);
                    Ok(Step::Event(Event::Float(f64::from(super::enc::f16_bits_to_f32(bits)))))
                }
            },
            26 => match self.take(4) {
                None => Ok(Step::NeedMore),
                Some(raw) => {
                    let bits = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
                    Ok(Step::Event(Event::Float(f64::from(f32::from_bits(bits)))))
                }
            },
            27 => match self.take(8) {
                None => Ok(Step::NeedMore),
                Some(raw) => {
                    let mut bits = [0u8; 8];
                    bits.copy_from_slice(raw);
                    Ok(Step::Event(Event::Float(f64::from_bits(u64::from_be_bytes(bits)))))
                }
            },
            _ => Err(CodecError::Malformed("reserved simple value")),
        }
    }

    fn argument(&mut self, info: u8) -> Result<Option<u64>, CodecError> {
        let width = match info {
            0..=23 => return Ok(Some(u64::from(info))),
            24 => 1usize,
            25 => 2,
            26 => 4,
            27 => 8,
            _ => return Err(CodecError::Malformed("reserved additional info")),
        };
        let Some(raw) = self.take(width) else {
            return Ok(None);
        };
        let mut argument = 0u64;
        for byte in raw {
            argument = argument << 8 | u64::from(*byte);
        }
        Ok(Some(argument))
    }

    fn string_body(&mut self, length: u64, utf8: bool) -> Result<Step, CodecError> {
        let length = usize::try_from(length)
            .map_err(|_| CodecError::Malformed("string length exceeds usize"))?;
        let Some(raw) = self.take(length) else {
            return Ok(Step::NeedMore);
        };
        if utf8 {
            let text = std::str::from_utf8(raw)
                .map_err(|_| CodecError::Malformed("text string is not UTF-8"))?
                .to_string();
            Ok(Step::Event(Event::Text(text)))
        } else {
            Ok(Step::Event(Event::Bytes(raw.to_vec())))
        }
    }

    fn take(&mut self, count: usize) -> Option<&[u8]> {
        if self.buf.len() - self.pos < count {
            return None;
        }
        let slice = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Some(slice)
    }
}

#[cfg(test)]
#[path = "dec_tests.rs"]
mod tests;
