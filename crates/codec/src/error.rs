// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mote_core::{PathError, ValueError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Content-Format number with no usable codec behind it.
    #[error("unsupported content format {0}")]
    UnsupportedFormat(u16),

    /// The input ended inside an item after end-of-stream was signalled.
    #[error("payload truncated")]
    Truncated,

    #[error("malformed payload: {0}")]
    Malformed(&'static str),

    /// A writer was fed records out of ascending path order, or more
    /// records than it declared up front.
    #[error("record sequence violation: {0}")]
    RecordSequence(&'static str),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Path(#[from] PathError),
}
