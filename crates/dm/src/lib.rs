// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mote-dm: the in-memory data model.
//!
//! [`Registry`] owns every registered object and is the single root of
//! lifetime. Objects are reached through the [`ObjectHandler`] trait; the
//! bundled [`StaticObject`] is a storage-backed implementation with typed
//! resource slots, instance capacity and snapshot-based transactions.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod object;
mod registry;
mod static_object;
mod transaction;

pub use error::DmError;
pub use object::{DmOperation, ObjectHandler, Ops, ResourceInfo};
pub use registry::{ReadEntry, Registry};
pub use static_object::{ResourceSpec, StaticObject, StaticObjectBuilder};
pub use transaction::Transaction;
