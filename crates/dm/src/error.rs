// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mote_core::ValueError;
use thiserror::Error;

/// Data model failures. Each variant maps to one CoAP response class in
/// the engine; handlers pick the variant, never the wire code.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DmError {
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("target not found")]
    NotFound,

    #[error("operation not allowed on target")]
    MethodNotAllowed,

    #[error("validation failed: {0}")]
    ValidationFailed(&'static str),

    #[error("internal handler error: {0}")]
    Internal(&'static str),

    #[error(transparent)]
    Value(#[from] ValueError),
}
