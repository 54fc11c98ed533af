// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token and message-id generation, seeded per client instance.

use mote_coap::Token;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[derive(Debug)]
pub(crate) struct TokenGen {
    rng: SmallRng,
}

impl TokenGen {
    pub fn new(seed: u64) -> Self {
        Self { rng: SmallRng::seed_from_u64(seed) }
    }

    /// An 8-byte token not currently in `active`.
    pub fn next(&mut self, active: impl Fn(&Token) -> bool) -> Token {
        loop {
            let bytes: [u8; 8] = self.rng.gen();
            if let Ok(token) = Token::from_slice(&bytes) {
                if !active(&token) {
                    return token;
                }
            }
        }
    }

    /// Initial message id for a fresh server connection.
    pub fn initial_message_id(&mut self) -> u16 {
        self.rng.gen()
    }

    /// Randomized retransmission backoff factor in
    /// `1.0..=ack_random_factor`.
    pub fn backoff_factor(&mut self, ack_random_factor: f64) -> f64 {
        if ack_random_factor <= 1.0 {
            return 1.0;
        }
        self.rng.gen_range(1.0..=ack_random_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_a_seed() {
        let mut a = TokenGen::new(7);
        let mut b = TokenGen::new(7);
        assert_eq!(a.next(|_| false), b.next(|_| false));
        assert_eq!(a.initial_message_id(), b.initial_message_id());
    }

    #[test]
    fn collision_retries() {
        let mut reference = TokenGen::new(3);
        let first = reference.next(|_| false);

        let mut gen = TokenGen::new(3);
        let second = gen.next(|token| *token == first);
        assert_ne!(second, first);
        assert_eq!(second.len(), 8);
    }

    #[test]
    fn backoff_stays_in_range() {
        let mut gen = TokenGen::new(1);
        for _ in 0..32 {
            let factor = gen.backoff_factor(1.5);
            assert!((1.0..=1.5).contains(&factor));
        }
        assert_eq!(gen.backoff_factor(1.0), 1.0);
    }
}
