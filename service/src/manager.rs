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

//! Connection manager implementation
//!
//! The ConnectionManager is responsible for:
//! - Assigning connection IDs
//! - Spawning and tracking connection workers
//! - Answering introspection queries about live connections
//! - Graceful shutdown coordination

use crate::{
    Connection, ConnectionId, ConnectionInfo, ConnectionStatus, ConnectionWorker, ControlMessage,
    CredentialStore, ParleyError, Result, ServerConfig, ServerMetrics,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Interval at which shutdown polls for workers to finish
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Managed connection entry
struct ManagedConnection {
    /// Status published by the worker
    status: Arc<ConnectionStatus>,
    /// Control channel sender
    control_tx: mpsc::Sender<ControlMessage>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

/// Connection manager
pub struct ConnectionManager {
    /// Live connections (lock-free concurrent map)
    connections: Arc<DashMap<ConnectionId, ManagedConnection>>,
    /// Next connection ID (monotonically increasing)
    next_id: AtomicU64,
    metrics: Arc<ServerMetrics>,
    credentials: Arc<CredentialStore>,
    config: Arc<ServerConfig>,
}

impl ConnectionManager {
    /// Create a new connection manager
    pub fn new(
        metrics: Arc<ServerMetrics>,
        credentials: Arc<CredentialStore>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            metrics,
            credentials,
            config,
        }
    }

    fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register an accepted socket and spawn its worker
    ///
    /// The entry is in the map before the worker starts, so a worker that
    /// finishes immediately still finds its own entry to remove.
    pub fn add_connection(&self, socket: TcpStream) -> Result<ConnectionId> {
        let id = self.next_connection_id();
        let connection = Connection::wrap(socket, id, self.credentials.clone(), &self.config)?;
        let status = connection.status();
        let (worker, control_tx) = ConnectionWorker::new(id, connection, self.metrics.clone());

        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        let connections = self.connections.clone();
        let metrics = self.metrics.clone();
        let worker_handle = tokio::spawn(async move {
            if ready_rx.await.is_err() {
                return;
            }
            let start = Instant::now();
            worker.run().await;

            // Shutdown may already have reaped this entry and counted it
            if connections.remove(&id).is_some() {
                metrics.connection_closed(start.elapsed());
            }
        });

        self.connections.insert(
            id,
            ManagedConnection {
                status,
                control_tx,
                worker_handle,
            },
        );
        self.metrics.connection_opened();
        let _ = ready_tx.send(());

        debug!(connection_id = %id, "Connection registered");
        Ok(id)
    }

    /// Ask a connection to close
    ///
    /// The worker removes the entry itself once the socket is closed.
    pub async fn close_connection(&self, id: ConnectionId) -> Result<()> {
        let control_tx = self
            .connections
            .get(&id)
            .map(|entry| entry.control_tx.clone())
            .ok_or(ParleyError::ConnectionNotFound(id))?;

        control_tx
            .send(ControlMessage::Close)
            .await
            .map_err(|_| ParleyError::ConnectionClosed)
    }

    /// Get connection info
    pub fn connection_info(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.connections.get(&id).map(|entry| entry.status.info())
    }

    /// Get all connection IDs
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    /// Get info for every live connection
    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        self.connections
            .iter()
            .map(|entry| entry.status.info())
            .collect()
    }

    /// Get the number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Close every connection
    ///
    /// Workers get `shutdown_timeout` to close their sockets. Any still
    /// running afterwards are aborted.
    pub async fn shutdown(&self) {
        let live = self.connection_infos();
        info!(connections = live.len(), "Closing all connections");
        for info in &live {
            debug!(
                connection_id = %info.id,
                peer_addr = %info.peer_addr,
                phase = ?info.phase,
                user = ?info.user,
                duration = ?info.duration(),
                "Closing connection"
            );
        }

        let senders: Vec<_> = self
            .connections
            .iter()
            .map(|entry| entry.control_tx.clone())
            .collect();

        for tx in senders {
            let _ = tx.try_send(ControlMessage::Close);
        }

        let deadline = Instant::now() + self.config.shutdown_timeout;
        while !self.connections.is_empty() && Instant::now() < deadline {
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }

        let stragglers = self.connection_ids();
        if !stragglers.is_empty() {
            warn!(
                stragglers = stragglers.len(),
                "Aborting workers that did not finish in time"
            );
        }
        for id in stragglers {
            if let Some((_, managed)) = self.connections.remove(&id) {
                managed.worker_handle.abort();
                self.metrics.connection_closed(managed.status.info().duration());
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connection_count", &self.connection_count())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnectionState, Phase};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn manager() -> ConnectionManager {
        let credentials: CredentialStore = [("alice", "secret")].into_iter().collect();
        ConnectionManager::new(
            Arc::new(ServerMetrics::new()),
            Arc::new(credentials),
            Arc::new(ServerConfig::default()),
        )
    }

    async fn create_test_connection() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });

        let (server, _) = listener.accept().await.unwrap();
        let client = client_task.await.unwrap();

        (server, client)
    }

    async fn wait_for_count(manager: &ConnectionManager, count: usize) {
        for _ in 0..500 {
            if manager.connection_count() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("connection count never reached {count}");
    }

    #[tokio::test]
    async fn test_manager_add_close() {
        let manager = manager();

        let (server, mut client) = create_test_connection().await;
        let id = manager.add_connection(server).unwrap();

        assert_eq!(manager.connection_count(), 1);
        assert_eq!(manager.connection_ids(), vec![id]);
        let info = manager.connection_info(id).unwrap();
        assert_eq!(info.phase, Phase::AwaitingUsername);
        assert_ne!(info.state, ConnectionState::Closed);

        manager.close_connection(id).await.unwrap();
        wait_for_count(&manager, 0).await;
        assert!(manager.connection_info(id).is_none());

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"Welcome! Please log in.\n");
    }

    #[tokio::test]
    async fn test_manager_removes_finished_worker() {
        let manager = manager();

        let (server, client) = create_test_connection().await;
        manager.add_connection(server).unwrap();
        drop(client);

        wait_for_count(&manager, 0).await;
        assert_eq!(manager.metrics.active_connections(), 0);
        assert_eq!(manager.metrics.total_connections(), 1);
    }

    #[tokio::test]
    async fn test_manager_unique_ids() {
        let manager = manager();
        let mut clients = Vec::new();
        let mut ids = Vec::new();

        for _ in 0..3 {
            let (server, client) = create_test_connection().await;
            ids.push(manager.add_connection(server).unwrap());
            clients.push(client);
        }

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert_eq!(manager.connection_count(), 3);

        manager.shutdown().await;
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_manager_tracks_login() {
        let manager = manager();

        let (server, mut client) = create_test_connection().await;
        let id = manager.add_connection(server).unwrap();
        client
            .write_all(b"User: alice\nPassword: secret\n")
            .await
            .unwrap();

        for _ in 0..500 {
            if manager.connection_info(id).and_then(|info| info.user).is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let info = manager.connection_info(id).unwrap();
        assert_eq!(info.user.as_deref(), Some("alice"));
        assert_eq!(info.phase, Phase::AwaitingCommand);

        manager.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_counts_each_connection_once() {
        let config = ServerConfig::default().with_shutdown_timeout(Duration::from_millis(1));
        let credentials: CredentialStore = [("alice", "secret")].into_iter().collect();
        let manager = ConnectionManager::new(
            Arc::new(ServerMetrics::new()),
            Arc::new(credentials),
            Arc::new(config),
        );

        let mut clients = Vec::new();
        for _ in 0..20 {
            let (server, client) = create_test_connection().await;
            manager.add_connection(server).unwrap();
            clients.push(client);
        }

        manager.shutdown().await;
        drop(clients);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(manager.connection_count(), 0);
        assert_eq!(manager.metrics.active_connections(), 0);
        assert_eq!(manager.metrics.total_connections(), 20);
    }

    #[tokio::test]
    async fn test_close_unknown_connection() {
        let manager = manager();
        let err = manager
            .close_connection(ConnectionId::new(42))
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::ConnectionNotFound(_)));
    }
}
