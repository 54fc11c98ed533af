// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-object transaction bookkeeping.
//!
//! The engine joins every object an operation touches, then resolves the
//! whole set with one `commit` or `rollback`. Each participant sees each
//! phase exactly once, in ascending OID order.

use crate::error::DmError;
use crate::object::{DmOperation, ObjectHandler};
use crate::registry::Registry;

#[derive(Debug, Default)]
pub struct Transaction {
    participants: Vec<u16>,
    op: Option<DmOperation>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn participants(&self) -> &[u16] {
        &self.participants
    }

    /// Add an object to the transaction, running its `operation_begin`
    /// and `transaction_begin` on first contact.
    pub fn join(
        &mut self,
        registry: &mut Registry,
        oid: u16,
        op: DmOperation,
    ) -> Result<(), DmError> {
        if self.participants.contains(&oid) {
            return Ok(());
        }
        let handler = registry.handler_mut(oid).ok_or(DmError::NotFound)?;
        handler.operation_begin(op)?;
        if op.is_mutating() {
            if let Err(error) = handler.transaction_begin() {
                handler.operation_end(false);
                return Err(error);
            }
        }
        let at = self.participants.partition_point(|&existing| existing < oid);
        self.participants.insert(at, oid);
        self.op = self.op.or(Some(op));
        Ok(())
    }

    /// Validate every participant, then commit all of them. On any
    /// validation failure the whole set is rolled back and the first
    /// error is returned. Every participant sees the validate phase,
    /// even after an earlier one has already failed.
    pub fn commit(self, registry: &mut Registry) -> Result<(), DmError> {
        let mut failed = None;
        for &oid in &self.participants {
            let Some(handler) = registry.handler_mut(oid) else {
                continue;
            };
            if let Err(error) = handler.transaction_validate() {
                tracing::debug!(oid, %error, "transaction validation failed");
                failed.get_or_insert(error);
            }
        }
        if let Some(error) = failed {
            self.rollback(registry);
            return Err(error);
        }
        for &oid in &self.participants {
            if let Some(handler) = registry.handler_mut(oid) {
                handler.transaction_commit()?;
                handler.operation_end(true);
            }
        }
        Ok(())
    }

    /// Roll every participant back to its pre-operation state.
    pub fn rollback(self, registry: &mut Registry) {
        for &oid in &self.participants {
            if let Some(handler) = registry.handler_mut(oid) {
                if let Err(error) = handler.transaction_rollback() {
                    tracing::warn!(oid, %error, "rollback failed");
                }
                handler.operation_end(false);
            }
        }
    }
}

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;
