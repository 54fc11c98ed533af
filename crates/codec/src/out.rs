// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Format-keyed encoder dispatch.

use mote_core::{ContentFormat, Path, ResourceType};

use crate::cbor::value::CborValueWriter;
use crate::error::CodecError;
use crate::lwm2m_cbor::Lwm2mCborWriter;
use crate::opaque::OpaqueWriter;
use crate::record::Record;
use crate::senml::SenmlWriter;
use crate::text::TextWriter;

/// A running payload emission for one response. The exchange layer drains
/// [`PayloadEncoder::output_mut`] in block-sized chunks; keeping the
/// encoder in the exchange is all the state block2 resumption needs.
#[derive(Debug)]
pub enum PayloadEncoder {
    Text(TextWriter),
    Opaque(OpaqueWriter),
    Cbor(CborValueWriter),
    Senml(SenmlWriter),
    Lwm2m(Lwm2mCborWriter),
}

/// Build an encoder for `format`. `count` is the number of records the
/// caller will add (used by formats with definite-length headers).
pub fn encoder_for(
    format: ContentFormat,
    base: Path,
    count: usize,
) -> Result<PayloadEncoder, CodecError> {
    Ok(match format {
        ContentFormat::PlainText => PayloadEncoder::Text(TextWriter::new()),
        ContentFormat::Opaque => PayloadEncoder::Opaque(OpaqueWriter::new()),
        ContentFormat::Cbor => PayloadEncoder::Cbor(CborValueWriter::new()),
        ContentFormat::SenmlCbor => PayloadEncoder::Senml(SenmlWriter::new(base, count)),
        ContentFormat::Lwm2mCbor => PayloadEncoder::Lwm2m(Lwm2mCborWriter::new(base)),
        other => return Err(CodecError::UnsupportedFormat(other.number())),
    })
}

impl PayloadEncoder {
    pub fn add(&mut self, record: &Record) -> Result<(), CodecError> {
        match self {
            PayloadEncoder::Text(writer) => writer.add(record),
            PayloadEncoder::Opaque(writer) => writer.add(record),
            PayloadEncoder::Cbor(writer) => writer.add(record),
            PayloadEncoder::Senml(writer) => writer.add(record),
            PayloadEncoder::Lwm2m(writer) => writer.add(record),
        }
    }

    pub fn finish(&mut self) -> Result<(), CodecError> {
        match self {
            PayloadEncoder::Text(writer) => writer.finish(),
            PayloadEncoder::Opaque(writer) => writer.finish(),
            PayloadEncoder::Cbor(writer) => writer.finish(),
            PayloadEncoder::Senml(writer) => writer.finish(),
            PayloadEncoder::Lwm2m(writer) => writer.finish(),
        }
    }

    pub fn output_mut(&mut self) -> &mut Vec<u8> {
        match self {
            PayloadEncoder::Text(writer) => writer.output_mut(),
            PayloadEncoder::Opaque(writer) => writer.output_mut(),
            PayloadEncoder::Cbor(writer) => writer.output_mut(),
            PayloadEncoder::Senml(writer) => writer.output_mut(),
            PayloadEncoder::Lwm2m(writer) => writer.output_mut(),
        }
    }
}

/// The response format when the request carries no `Accept`: SenML-CBOR
/// for any object- or instance-depth read, Plain Text for a single
/// readable resource, Opaque for a single bytes resource. `single` is the
/// target's type when the read addresses exactly one scalar.
pub fn default_format(base: &Path, single: Option<ResourceType>) -> ContentFormat {
    if base.len() < 3 {
        return ContentFormat::SenmlCbor;
    }
    match single {
        Some(ResourceType::Bytes) => ContentFormat::Opaque,
        Some(_) => ContentFormat::PlainText,
        None => ContentFormat::SenmlCbor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_rules() {
        assert_eq!(default_format(&Path::root(), None), ContentFormat::SenmlCbor);
        assert_eq!(default_format(&Path::object(3), None), ContentFormat::SenmlCbor);
        assert_eq!(default_format(&Path::instance(3, 0), None), ContentFormat::SenmlCbor);
        assert_eq!(
            default_format(&Path::resource(3, 0, 9), Some(ResourceType::Double)),
            ContentFormat::PlainText
        );
        assert_eq!(
            default_format(&Path::resource(5, 0, 0), Some(ResourceType::Bytes)),
            ContentFormat::Opaque
        );
        // multi-instance resource read: several records, so SenML
        assert_eq!(default_format(&Path::resource(3, 0, 7), None), ContentFormat::SenmlCbor);
    }

    #[test]
    fn unsupported_formats_rejected() {
        assert!(encoder_for(ContentFormat::Lwm2mTlv, Path::root(), 1).is_err());
        assert!(encoder_for(ContentFormat::SenmlJson, Path::root(), 1).is_err());
    }
}
