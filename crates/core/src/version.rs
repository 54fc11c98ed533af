// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version markers: object versions (`ver=X.Y` in Register and Discover
//! payloads) and the protocol version advertised during Register.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("object version '{0}' is not of the form <digit>.<digit>")]
    BadObjectVersion(String),
}

/// An object version `X.Y`, single digit on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectVersion {
    pub major: u8,
    pub minor: u8,
}

impl ObjectVersion {
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ObjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ObjectVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        match bytes {
            [major @ b'0'..=b'9', b'.', minor @ b'0'..=b'9'] => Ok(ObjectVersion {
                major: major - b'0',
                minor: minor - b'0',
            }),
            _ => Err(VersionError::BadObjectVersion(s.to_string())),
        }
    }
}

/// Protocol version the client enables and advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Lwm2mVersion {
    V1_1,
    #[default]
    V1_2,
}

impl Lwm2mVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lwm2mVersion::V1_1 => "1.1",
            Lwm2mVersion::V1_2 => "1.2",
        }
    }
}

impl fmt::Display for Lwm2mVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
