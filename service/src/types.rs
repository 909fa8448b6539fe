//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Identifiers and status views shared between workers and the manager

use crate::Phase;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Identifier handed out by the manager, in accept order, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw sequence number
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw sequence number
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a worker is in driving its socket
///
/// Kept as a `u8` inside [`crate::ConnectionStatus`] so the manager can read
/// it without locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Registered, the welcome line has not gone out yet
    Greeting = 0,
    /// Welcome sent, lines are being served
    Serving = 1,
    /// Socket is being shut down
    Closing = 2,
    /// Worker is done with the socket
    Closed = 3,
}

impl ConnectionState {
    /// Decode a stored state; unknown values read as [`ConnectionState::Closed`]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Greeting,
            1 => Self::Serving,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Encode for storage in an atomic
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Greeting => "greeting",
            Self::Serving => "serving",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of one connection, as returned by the manager
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Worker progress
    pub state: ConnectionState,
    /// Login or command phase of the session
    pub phase: Phase,
    /// Authenticated username, once logged in
    pub user: Option<String>,
    /// Peer address
    pub peer_addr: SocketAddr,
    /// When the socket was accepted
    pub created_at: Instant,
    /// Lines handed to the session
    pub lines_received: u64,
    /// Reply lines written
    pub replies_sent: u64,
}

impl ConnectionInfo {
    /// Time since the socket was accepted
    pub fn duration(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Check whether the client has logged in
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display_and_order() {
        let ids: Vec<_> = [3, 1, 2].into_iter().map(ConnectionId::new).collect();
        let mut sorted = ids.clone();
        sorted.sort();

        assert_eq!(sorted.iter().map(ConnectionId::as_u64).collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(ids[0].to_string(), "conn-3");
    }

    #[test]
    fn test_connection_state_survives_atomic_storage() {
        let stored = std::sync::atomic::AtomicU8::new(ConnectionState::Greeting.as_u8());
        for state in [ConnectionState::Serving, ConnectionState::Closing, ConnectionState::Closed] {
            stored.store(state.as_u8(), std::sync::atomic::Ordering::Relaxed);
            let loaded = ConnectionState::from_u8(stored.load(std::sync::atomic::Ordering::Relaxed));
            assert_eq!(loaded, state);
            assert_eq!(loaded.to_string(), state.to_string());
        }
        assert_eq!(ConnectionState::from_u8(u8::MAX), ConnectionState::Closed);
    }

    #[test]
    fn test_connection_info_authentication() {
        let mut info = ConnectionInfo {
            id: ConnectionId::new(7),
            state: ConnectionState::Serving,
            phase: Phase::AwaitingPassword,
            user: None,
            peer_addr: "127.0.0.1:4000".parse().unwrap(),
            created_at: Instant::now(),
            lines_received: 1,
            replies_sent: 1,
        };
        assert!(!info.is_authenticated());

        info.phase = Phase::AwaitingCommand;
        info.user = Some("alice".to_string());
        assert!(info.is_authenticated());
    }
}
