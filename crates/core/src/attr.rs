// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attribute structs carried in Uri-Query options.

use serde::{Deserialize, Serialize};

/// Notification attributes (`<NOTIFICATION>` class of LwM2M 1.2).
///
/// Attached to observations and to Write-Attributes targets. `None` means
/// "not set at this level"; inheritance across depths is resolved with
/// [`NotificationAttrs::overlaid_on`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NotificationAttrs {
    pub pmin: Option<u32>,
    pub pmax: Option<u32>,
    pub epmin: Option<u32>,
    pub epmax: Option<u32>,
    pub gt: Option<f64>,
    pub lt: Option<f64>,
    pub st: Option<f64>,
    pub con: Option<bool>,
    pub hqmax: Option<u32>,
    pub edge: Option<bool>,
}

impl NotificationAttrs {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Resolve inheritance: values set on `self` win over `inherited`.
    pub fn overlaid_on(&self, inherited: &NotificationAttrs) -> NotificationAttrs {
        NotificationAttrs {
            pmin: self.pmin.or(inherited.pmin),
            pmax: self.pmax.or(inherited.pmax),
            epmin: self.epmin.or(inherited.epmin),
            epmax: self.epmax.or(inherited.epmax),
            gt: self.gt.or(inherited.gt),
            lt: self.lt.or(inherited.lt),
            st: self.st.or(inherited.st),
            con: self.con.or(inherited.con),
            hqmax: self.hqmax.or(inherited.hqmax),
            edge: self.edge.or(inherited.edge),
        }
    }

    /// True if any of the numeric change conditions is set.
    pub fn has_numeric_conditions(&self) -> bool {
        self.gt.is_some() || self.lt.is_some() || self.st.is_some()
    }
}

/// Uri-Query attributes of a Register request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterAttrs {
    pub endpoint: Option<String>,
    pub lifetime: Option<u32>,
    pub lwm2m: Option<String>,
    pub binding: Option<String>,
    pub sms: Option<String>,
    pub queue_mode: bool,
}

/// Uri-Query attributes of a Bootstrap-Request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BootstrapAttrs {
    pub endpoint: Option<String>,
    /// Preferred content format for Bootstrap-Read responses.
    pub preferred_format: Option<u16>,
}

/// Uri-Query attributes of a Discover request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscoverAttrs {
    pub depth: Option<u8>,
}

#[cfg(test)]
#[path = "attr_tests.rs"]
mod tests;
