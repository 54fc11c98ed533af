// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RFC 8949 core subset shared by the CBOR-based content formats.
//!
//! [`enc`] holds the canonical (smallest-form) primitive emitters, [`dec`]
//! the incremental event decoder, and [`value`] the mapping between CBOR
//! items and data model [`Value`](mote_core::Value)s.

pub mod dec;
pub mod enc;
pub mod value;

pub use dec::{Decoder, Event};
pub use value::{CborValueReader, CborValueWriter};
