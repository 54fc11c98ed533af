// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mote_core::{Path, Value};

/// One `(path, value)` entry flowing through a payload codec.
///
/// On the read side a [`Value::Null`] marks an entry without a value:
/// composite-read path lists and resource-instance removal requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub path: Path,
    pub value: Value,
}

impl Record {
    pub fn new(path: Path, value: Value) -> Self {
        Self { path, value }
    }
}
