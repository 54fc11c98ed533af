// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration. File loading stays in the host; everything here
//! is serde-derivable so any format can be layered on top.

use std::time::Duration;

use mote_core::Lwm2mVersion;
use serde::{Deserialize, Serialize};

/// RFC 7252 §4.8 transmission parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransmissionParams {
    pub ack_timeout: Duration,
    pub ack_random_factor: f64,
    pub max_retransmit: u32,
    pub nstart: u8,
}

impl Default for TransmissionParams {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(2),
            ack_random_factor: 1.5,
            max_retransmit: 4,
            nstart: 1,
        }
    }
}

impl TransmissionParams {
    /// Upper bound on how long an exchange identity stays valid
    /// (EXCHANGE_LIFETIME; 247 s with the default parameters).
    pub fn exchange_lifetime(&self) -> Duration {
        Duration::from_secs(247)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub endpoint: String,
    /// Registration lifetime in seconds (`lt=`).
    pub lifetime: u32,
    pub version: Lwm2mVersion,
    /// Binding advertised at Register (`b=`), e.g. `"U"`.
    pub binding: Option<String>,
    pub queue_mode: bool,
    /// Incoming MTU hint; bounds the preferred block2 size.
    pub mtu: usize,
    /// Cap on a reassembled request body; beyond it the engine answers
    /// 4.13.
    pub max_inbound_payload: usize,
    pub transmission: TransmissionParams,
    /// Seed for the token/message-id PRNG.
    pub seed: u64,
}

impl Config {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            lifetime: 86400,
            version: Lwm2mVersion::default(),
            binding: None,
            queue_mode: false,
            mtu: 1152,
            max_inbound_payload: 64 * 1024,
            transmission: TransmissionParams::default(),
            seed: 0,
        }
    }

    mote_core::setters! {
        set {
            lifetime: u32,
            version: Lwm2mVersion,
            queue_mode: bool,
            mtu: usize,
            max_inbound_payload: usize,
            transmission: TransmissionParams,
            seed: u64,
        }
        option {
            binding: String,
        }
    }

    /// Block size used when paginating responses, derived from the MTU
    /// hint minus framing headroom.
    pub fn preferred_block_size(&self) -> u16 {
        mote_coap::preferred_size(self.mtu.saturating_sub(64))
    }
}
