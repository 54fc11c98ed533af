// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-server connection state: role, SSID, message-id counter and the
//! Location-Path captured from a Register response.

use serde::{Deserialize, Serialize};

/// Opaque index of a server slot, returned by `Client::add_server`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerHandle(pub(crate) usize);

impl ServerHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerRole {
    Bootstrap,
    Regular,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerConn {
    pub ssid: u16,
    pub role: ServerRole,
    pub next_message_id: u16,
    pub registered: bool,
    pub location: Vec<String>,
}

impl ServerConn {
    pub fn new(ssid: u16, role: ServerRole, initial_message_id: u16) -> Self {
        Self {
            ssid,
            role,
            next_message_id: initial_message_id,
            registered: false,
            location: Vec::new(),
        }
    }

    pub fn take_message_id(&mut self) -> u16 {
        let id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub(crate) struct ServerTable {
    servers: Vec<ServerConn>,
}

impl ServerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conn: ServerConn) -> ServerHandle {
        self.servers.push(conn);
        ServerHandle(self.servers.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&ServerConn> {
        self.servers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ServerConn> {
        self.servers.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ServerConn)> {
        self.servers.iter().enumerate()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut ServerConn)> {
        self.servers.iter_mut().enumerate()
    }

    pub fn by_ssid_mut(&mut self, ssid: u16) -> Option<&mut ServerConn> {
        self.servers.iter_mut().find(|server| server.ssid == ssid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_increment_and_wrap() {
        let mut conn = ServerConn::new(101, ServerRole::Regular, u16::MAX);
        assert_eq!(conn.take_message_id(), u16::MAX);
        assert_eq!(conn.take_message_id(), 0);
        assert_eq!(conn.take_message_id(), 1);
    }

    #[test]
    fn lookup_by_ssid() {
        let mut table = ServerTable::new();
        table.add(ServerConn::new(1, ServerRole::Bootstrap, 0));
        let handle = table.add(ServerConn::new(101, ServerRole::Regular, 0));
        assert_eq!(handle.index(), 1);
        assert!(table.by_ssid_mut(101).is_some());
        assert!(table.by_ssid_mut(9).is_none());
    }
}
