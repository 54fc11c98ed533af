// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CoAP Content-Format numbers understood by the client, from the IANA
//! CoRE Parameters registry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentFormat {
    PlainText,
    LinkFormat,
    Opaque,
    Cbor,
    SenmlJson,
    SenmlCbor,
    SenmlEtchJson,
    SenmlEtchCbor,
    /// Legacy LwM2M 1.0 TLV; recognized on input only, never emitted.
    Lwm2mTlv,
    Lwm2mJson,
    Lwm2mCbor,
}

impl ContentFormat {
    pub fn number(self) -> u16 {
        match self {
            ContentFormat::PlainText => 0,
            ContentFormat::LinkFormat => 40,
            ContentFormat::Opaque => 42,
            ContentFormat::Cbor => 60,
            ContentFormat::SenmlJson => 110,
            ContentFormat::SenmlCbor => 112,
            ContentFormat::SenmlEtchJson => 320,
            ContentFormat::SenmlEtchCbor => 322,
            ContentFormat::Lwm2mTlv => 11542,
            ContentFormat::Lwm2mJson => 11543,
            ContentFormat::Lwm2mCbor => 11544,
        }
    }

    pub fn from_number(number: u16) -> Option<Self> {
        Some(match number {
            0 => ContentFormat::PlainText,
            40 => ContentFormat::LinkFormat,
            42 => ContentFormat::Opaque,
            60 => ContentFormat::Cbor,
            110 => ContentFormat::SenmlJson,
            112 => ContentFormat::SenmlCbor,
            320 => ContentFormat::SenmlEtchJson,
            322 => ContentFormat::SenmlEtchCbor,
            11542 => ContentFormat::Lwm2mTlv,
            11543 => ContentFormat::Lwm2mJson,
            11544 => ContentFormat::Lwm2mCbor,
            _ => return None,
        })
    }

    /// SenML family formats, which may carry multiple records per payload.
    pub fn is_senml(self) -> bool {
        matches!(
            self,
            ContentFormat::SenmlJson
                | ContentFormat::SenmlCbor
                | ContentFormat::SenmlEtchJson
                | ContentFormat::SenmlEtchCbor
        )
    }

    /// Formats that can encode more than one entry in a single payload.
    pub fn is_multi_record(self) -> bool {
        self.is_senml() || matches!(self, ContentFormat::Lwm2mCbor | ContentFormat::Lwm2mTlv)
    }
}

crate::simple_display! {
    ContentFormat {
        PlainText => "text/plain",
        LinkFormat => "application/link-format",
        Opaque => "application/octet-stream",
        Cbor => "application/cbor",
        SenmlJson => "application/senml+json",
        SenmlCbor => "application/senml+cbor",
        SenmlEtchJson => "application/senml-etch+json",
        SenmlEtchCbor => "application/senml-etch+cbor",
        Lwm2mTlv => "application/vnd.oma.lwm2m+tlv",
        Lwm2mJson => "application/vnd.oma.lwm2m+json",
        Lwm2mCbor => "application/vnd.oma.lwm2m+cbor",
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
