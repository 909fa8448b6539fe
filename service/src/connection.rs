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

//! Per-socket connection record
//!
//! A [`Connection`] bundles the framed socket (whose read buffer is the
//! connection's inbound byte buffer), the protocol [`Session`], and the peer
//! address. It is owned by exactly one worker. The manager only ever sees the
//! [`ConnectionStatus`] the connection publishes.

use crate::{
    Action, ConnectionId, ConnectionInfo, ConnectionState, CredentialStore, LineCodec, ParleyError,
    Phase, Result, ServerConfig, Session,
};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, trace};

/// Connection status shared between a worker and the connection manager
///
/// Written only by the owning worker, read by anyone holding the `Arc`.
#[derive(Debug)]
pub struct ConnectionStatus {
    id: ConnectionId,
    peer_addr: SocketAddr,
    created_at: Instant,
    state: AtomicU8,
    phase: AtomicU8,
    user: RwLock<Option<String>>,
    lines_received: AtomicU64,
    replies_sent: AtomicU64,
}

impl ConnectionStatus {
    fn new(id: ConnectionId, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            created_at: Instant::now(),
            state: AtomicU8::new(ConnectionState::Greeting.as_u8()),
            phase: AtomicU8::new(Phase::AwaitingUsername.as_u8()),
            user: RwLock::new(None),
            lines_received: AtomicU64::new(0),
            replies_sent: AtomicU64::new(0),
        }
    }

    /// Get the current lifecycle state
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Set the lifecycle state
    pub fn set_state(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Get the current protocol phase
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Get the authenticated username
    pub fn user(&self) -> Option<String> {
        self.user.read().ok().and_then(|user| user.clone())
    }

    /// Get a point-in-time view of the connection
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            state: self.state(),
            phase: self.phase(),
            user: self.user(),
            peer_addr: self.peer_addr,
            created_at: self.created_at,
            lines_received: self.lines_received.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
        }
    }

    fn publish(&self, session: &Session) {
        self.phase.store(session.phase().as_u8(), Ordering::Release);
        if let Some(user) = session.user() {
            if let Ok(mut slot) = self.user.write() {
                if slot.as_deref() != Some(user) {
                    *slot = Some(user.to_string());
                }
            }
        }
    }
}

/// A client connection
pub struct Connection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    framed: Framed<TcpStream, LineCodec>,
    session: Session,
    status: Arc<ConnectionStatus>,
    write_timeout: Duration,
}

impl Connection {
    /// Wrap an accepted socket into a connection in [`Phase::AwaitingUsername`]
    #[instrument(skip(socket, credentials, config), fields(connection_id = %id))]
    pub fn wrap(
        socket: TcpStream,
        id: ConnectionId,
        credentials: Arc<CredentialStore>,
        config: &ServerConfig,
    ) -> Result<Self> {
        let peer_addr = socket.peer_addr()?;

        info!(peer_addr = %peer_addr, "Creating new connection");
        counter!("parley.connections.total").increment(1);
        gauge!("parley.connections.active").increment(1.0);

        let codec = LineCodec::with_max_length(config.max_line_length);
        Ok(Self {
            id,
            peer_addr,
            framed: Framed::with_capacity(socket, codec, config.buffer_capacity),
            session: Session::new(credentials),
            status: Arc::new(ConnectionStatus::new(id, peer_addr)),
            write_timeout: config.write_timeout,
        })
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the protocol session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get the shared status handle
    pub fn status(&self) -> Arc<ConnectionStatus> {
        self.status.clone()
    }

    /// Receive the next complete line
    ///
    /// Returns `Ok(None)` once the peer has closed its side. Lines already
    /// buffered are returned before the end of stream is reported.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        match self.framed.next().await {
            Some(Ok(line)) => {
                self.status.lines_received.fetch_add(1, Ordering::Relaxed);
                counter!("parley.lines.received").increment(1);
                trace!(connection_id = %self.id, line = %line, "Line received");
                Ok(Some(line))
            }
            Some(Err(err)) => {
                counter!("parley.errors.receive").increment(1);
                Err(err)
            }
            None => {
                debug!(connection_id = %self.id, "Peer closed connection");
                Ok(None)
            }
        }
    }

    /// Run one line through the protocol session
    pub fn handle_line(&mut self, line: &str) -> Action {
        let action = self.session.handle_line(line);
        self.status.publish(&self.session);
        action
    }

    /// Write one reply line, bounded by the write timeout
    #[instrument(skip(self, line), fields(connection_id = %self.id))]
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let start = Instant::now();
        match timeout(self.write_timeout, self.framed.send(line)).await {
            Ok(Ok(())) => {
                self.status.replies_sent.fetch_add(1, Ordering::Relaxed);
                counter!("parley.replies.sent").increment(1);
                histogram!("parley.reply.send_duration").record(start.elapsed().as_secs_f64());
                Ok(())
            }
            Ok(Err(err)) => {
                counter!("parley.errors.send").increment(1);
                Err(err)
            }
            Err(_) => {
                counter!("parley.errors.send").increment(1);
                Err(ParleyError::Timeout)
            }
        }
    }

    /// Shut down the write side of the socket
    ///
    /// Best effort: the peer may already be gone.
    pub async fn close(&mut self) {
        if let Err(err) = self.framed.get_mut().shutdown().await {
            trace!(connection_id = %self.id, error = %err, "Socket shutdown failed");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Also runs when an aborted worker never reaches `close`
        gauge!("parley.connections.active").decrement(1.0);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("phase", &self.session.phase())
            .field("buffered", &self.framed.read_buffer().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn connection_pair(config: &ServerConfig) -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (server, _) = listener.accept().await.unwrap();
        let client = client_task.await.unwrap();

        let credentials: CredentialStore = [("alice", "secret")].into_iter().collect();
        let connection =
            Connection::wrap(server, ConnectionId::new(1), Arc::new(credentials), config).unwrap();
        (connection, client)
    }

    #[tokio::test]
    async fn test_lines_split_across_writes() {
        let (mut connection, mut client) = connection_pair(&ServerConfig::default()).await;

        client.write_all(b"User: al").await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(b"ice\r\nPassword: secret\n").await.unwrap();

        assert_eq!(connection.next_line().await.unwrap().as_deref(), Some("User: alice"));
        assert_eq!(
            connection.next_line().await.unwrap().as_deref(),
            Some("Password: secret")
        );
        assert_eq!(connection.status().info().lines_received, 2);
    }

    #[tokio::test]
    async fn test_handle_line_publishes_status() {
        let (mut connection, _client) = connection_pair(&ServerConfig::default()).await;
        let status = connection.status();

        connection.handle_line("User: alice");
        assert_eq!(status.phase(), Phase::AwaitingPassword);
        assert_eq!(status.user(), None);

        connection.handle_line("Password: secret");
        assert_eq!(status.phase(), Phase::AwaitingCommand);
        assert_eq!(status.user().as_deref(), Some("alice"));
        assert!(status.info().is_authenticated());
    }

    #[tokio::test]
    async fn test_send_line_and_eof() {
        let (mut connection, mut client) = connection_pair(&ServerConfig::default()).await;

        connection.send_line("the lcm is: 12").await.unwrap();
        let mut buf = [0u8; 32];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"the lcm is: 12\n");

        client.write_all(b"quit\npartial").await.unwrap();
        client.shutdown().await.unwrap();
        assert_eq!(connection.next_line().await.unwrap().as_deref(), Some("quit"));
        assert_eq!(connection.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let config = ServerConfig::default().with_max_line_length(8);
        let (mut connection, mut client) = connection_pair(&config).await;

        client.write_all(b"0123456789abcdef").await.unwrap();
        let err = connection.next_line().await.unwrap_err();
        assert!(err.is_protocol_violation());
    }
}
