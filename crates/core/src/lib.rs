// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mote-core: shared vocabulary of the mote LwM2M client.
//!
//! Paths, typed resource values, notification attributes, content formats
//! and object/protocol version markers. No I/O, no protocol logic.

pub mod macros;

pub mod attr;
pub mod format;
pub mod path;
pub mod value;
pub mod version;

pub use attr::{BootstrapAttrs, DiscoverAttrs, NotificationAttrs, RegisterAttrs};
pub use format::ContentFormat;
pub use path::{Path, PathError, ID_INVALID};
pub use path::{OID_ACCESS_CONTROL, OID_DEVICE, OID_OSCORE, OID_SECURITY, OID_SERVER};
pub use value::{
    Chunk, ExternalKind, ExternalSource, ExternalValue, Objlnk, ResourceType, Value, ValueError,
};
pub use version::{Lwm2mVersion, ObjectVersion, VersionError};
