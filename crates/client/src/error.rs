// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mote_coap::{ClassifyError, CoapError, Code};
use mote_codec::CodecError;
use mote_dm::DmError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    #[error(transparent)]
    Coap(#[from] CoapError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Dm(#[from] DmError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("unknown server handle")]
    UnknownServer,

    #[error("server is not registered")]
    NotRegistered,

    #[error("object {0} is referenced by a live observation or exchange")]
    ObjectInUse(u16),

    #[error("persisted state is invalid: {0}")]
    Persist(&'static str),
}

/// CoAP response code for a data model failure.
pub(crate) fn dm_status(error: &DmError) -> Code {
    match error {
        DmError::BadRequest(_) | DmError::Value(_) | DmError::ValidationFailed(_) => {
            Code::BAD_REQUEST
        }
        DmError::Unauthorized => Code::UNAUTHORIZED,
        DmError::Forbidden(_) => Code::FORBIDDEN,
        DmError::NotFound => Code::NOT_FOUND,
        DmError::MethodNotAllowed => Code::METHOD_NOT_ALLOWED,
        DmError::Internal(_) => Code::INTERNAL_SERVER_ERROR,
    }
}

/// CoAP response code for a payload codec failure.
pub(crate) fn codec_status(error: &CodecError) -> Code {
    match error {
        CodecError::UnsupportedFormat(_) => Code::UNSUPPORTED_CONTENT_FORMAT,
        CodecError::Truncated
        | CodecError::Malformed(_)
        | CodecError::RecordSequence(_)
        | CodecError::Value(_)
        | CodecError::Path(_) => Code::BAD_REQUEST,
    }
}
