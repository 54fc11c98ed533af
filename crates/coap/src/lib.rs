// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mote-coap: CoAP-over-UDP framing and LwM2M request classification.
//!
//! [`Message`] is the bit-exact RFC 7252 frame codec; [`classify`] turns a
//! decoded request frame into a typed LwM2M operation descriptor and a
//! response frame into a [`Response`] summary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod block;
mod classify;
mod code;
mod error;
mod msg;
mod option;

pub use block::{preferred_size, Block, BlockKind, MAX_BLOCK_NUMBER};
pub use classify::{
    classify_request, classify_response, ClassifyError, Operation, Request, Response,
    MAX_LOCATION_SEGMENTS,
};
pub use code::Code;
pub use error::CoapError;
pub use msg::{Message, MsgType, Token, MAX_ETAG_LENGTH, MAX_TOKEN_LENGTH};
pub use option::{opt, Options};

#[cfg(test)]
mod property_tests;
