// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Format-keyed decoder dispatch.

use mote_core::{ContentFormat, Path, ResourceType};

use crate::cbor::value::CborValueReader;
use crate::error::CodecError;
use crate::lwm2m_cbor::Lwm2mCborReader;
use crate::opaque::OpaqueReader;
use crate::record::Record;
use crate::senml::SenmlReader;
use crate::text::TextReader;

/// One step of reading a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Record(Record),
    /// More input is needed before the next record is available.
    Pending,
    /// The payload is fully consumed.
    Done,
}

#[derive(Debug)]
pub enum PayloadDecoder {
    Text(TextReader),
    Opaque(OpaqueReader),
    Cbor(CborValueReader),
    Senml(SenmlReader),
    Lwm2m(Lwm2mCborReader),
}

/// Build a decoder for the raw Content-Format number of a request.
///
/// `expected` is the declared type of the addressed resource, required by
/// the formats whose wire form is untyped (Plain Text, Opaque).
pub fn decoder_for(
    format: u16,
    base: Path,
    expected: Option<ResourceType>,
) -> Result<PayloadDecoder, CodecError> {
    let known = ContentFormat::from_number(format).ok_or(CodecError::UnsupportedFormat(format))?;
    Ok(match known {
        ContentFormat::PlainText => {
            let expected = expected.ok_or(CodecError::Malformed(
                "plain text requires a resource-level target",
            ))?;
            PayloadDecoder::Text(TextReader::new(base, expected))
        }
        ContentFormat::Opaque => PayloadDecoder::Opaque(OpaqueReader::new(base)),
        ContentFormat::Cbor => PayloadDecoder::Cbor(CborValueReader::new(base, expected)),
        ContentFormat::SenmlCbor | ContentFormat::SenmlEtchCbor => {
            PayloadDecoder::Senml(SenmlReader::new(base))
        }
        ContentFormat::Lwm2mCbor => PayloadDecoder::Lwm2m(Lwm2mCborReader::new(base)),
        other => return Err(CodecError::UnsupportedFormat(other.number())),
    })
}

impl PayloadDecoder {
    pub fn feed(&mut self, bytes: &[u8]) {
        match self {
            PayloadDecoder::Text(reader) => reader.feed(bytes),
            PayloadDecoder::Opaque(reader) => reader.feed(bytes),
            PayloadDecoder::Cbor(reader) => reader.feed(bytes),
            PayloadDecoder::Senml(reader) => reader.feed(bytes),
            PayloadDecoder::Lwm2m(reader) => reader.feed(bytes),
        }
    }

    pub fn end(&mut self) {
        match self {
            PayloadDecoder::Text(reader) => reader.end(),
            PayloadDecoder::Opaque(reader) => reader.end(),
            PayloadDecoder::Cbor(reader) => reader.end(),
            PayloadDecoder::Senml(reader) => reader.end(),
            PayloadDecoder::Lwm2m(reader) => reader.end(),
        }
    }

    pub fn next(&mut self) -> Result<Parsed, CodecError> {
        match self {
            PayloadDecoder::Text(reader) => reader.next(),
            PayloadDecoder::Opaque(reader) => reader.next(),
            PayloadDecoder::Cbor(reader) => reader.next(),
            PayloadDecoder::Senml(reader) => reader.next(),
            PayloadDecoder::Lwm2m(reader) => reader.next(),
        }
    }

    /// Convenience for tests and single-shot payloads: feed everything,
    /// close, and collect the records.
    pub fn read_all(mut self, payload: &[u8]) -> Result<Vec<Record>, CodecError> {
        self.feed(payload);
        self.end();
        let mut records = Vec::new();
        loop {
            match self.next()? {
                Parsed::Record(record) => records.push(record),
                Parsed::Done => return Ok(records),
                Parsed::Pending => return Err(CodecError::Truncated),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tlv_and_json_are_rejected() {
        for number in [110u16, 320, 11542, 11543] {
            assert_eq!(
                decoder_for(number, Path::root(), None).err(),
                Some(CodecError::UnsupportedFormat(number))
            );
        }
    }

    #[test]
    fn unknown_number_rejected() {
        assert!(decoder_for(9999, Path::root(), None).is_err());
    }

    #[test]
    fn plain_text_requires_expected_type() {
        assert!(decoder_for(0, Path::resource(3, 0, 9), None).is_err());
        assert!(decoder_for(0, Path::resource(3, 0, 9), Some(ResourceType::Int)).is_ok());
    }
}
