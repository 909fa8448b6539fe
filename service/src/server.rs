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

//! Parley server
//!
//! The ParleyServer owns the listening socket, runs the accept loop, and
//! hands every accepted socket to the ConnectionManager.

use crate::{
    ConnectionManager, CredentialStore, ParleyError, Result, ServerConfig, ServerMetrics,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Parley server
///
/// # Example
///
/// ```no_run
/// use parley_service::{CredentialStore, ParleyServer, ServerConfig};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let credentials = Arc::new(CredentialStore::load("users.tsv")?);
///     let server = ParleyServer::new(ServerConfig::default(), credentials).await?;
///
///     server.start().await?;
///     tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///
///     Ok(())
/// }
/// ```
pub struct ParleyServer {
    config: Arc<ServerConfig>,
    manager: Arc<ConnectionManager>,
    metrics: Arc<ServerMetrics>,
    /// Listening socket, taken by the accept loop when the server starts
    listener: Mutex<Option<TcpListener>>,
    /// Actual bind address
    bind_address: SocketAddr,
    running: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    accept_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ParleyServer {
    /// Create a new server and bind its listening socket
    ///
    /// Connections are not accepted until [`ParleyServer::start`] is called,
    /// but the kernel queues up to `backlog` of them in the meantime.
    pub async fn new(config: ServerConfig, credentials: Arc<CredentialStore>) -> Result<Self> {
        config.validate()?;

        let listener = bind(&config)?;
        let bind_address = listener.local_addr()?;
        info!(
            bind_address = %bind_address,
            users = credentials.len(),
            "Parley server bound"
        );

        let config = Arc::new(config);
        let metrics = Arc::new(ServerMetrics::new());
        let manager = Arc::new(ConnectionManager::new(
            metrics.clone(),
            credentials,
            config.clone(),
        ));

        Ok(Self {
            config,
            manager,
            metrics,
            listener: Mutex::new(Some(listener)),
            bind_address,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            accept_handle: Mutex::new(None),
        })
    }

    /// Start accepting connections
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ParleyError::ServerAlreadyRunning);
        }

        let Some(listener) = self.listener.lock().await.take() else {
            self.running.store(false, Ordering::SeqCst);
            return Err(ParleyError::Config(
                "server cannot be restarted after shutdown".to_string(),
            ));
        };

        info!(bind_address = %self.bind_address, "Starting Parley server");
        let handle = self.spawn_accept_loop(listener);
        *self.accept_handle.lock().await = Some(handle);

        Ok(())
    }

    fn spawn_accept_loop(&self, listener: TcpListener) -> JoinHandle<()> {
        let manager = self.manager.clone();
        let metrics = self.metrics.clone();
        let max_connections = self.config.max_connections;
        let running = self.running.clone();
        let shutdown_notify = self.shutdown_notify.clone();

        tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                let accept_result = tokio::select! {
                    result = listener.accept() => result,
                    _ = shutdown_notify.notified() => break,
                };

                match accept_result {
                    Ok((socket, peer_addr)) => {
                        debug!(peer_addr = %peer_addr, "Accepted connection");

                        if manager.connection_count() >= max_connections {
                            warn!(
                                peer_addr = %peer_addr,
                                max_connections,
                                "Connection limit reached, rejecting connection"
                            );
                            metrics.connection_rejected();
                            drop(socket);
                            continue;
                        }

                        match manager.add_connection(socket) {
                            Ok(id) => {
                                info!(connection_id = %id, peer_addr = %peer_addr, "Connection established");
                            }
                            Err(err) => {
                                error!(peer_addr = %peer_addr, error = %err, "Failed to add connection");
                                metrics.transport_error();
                            }
                        }
                    }
                    Err(err) => {
                        error!(error = %err, "Failed to accept connection");
                        metrics.transport_error();
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }

            info!("Accept loop terminated");
        })
    }

    /// Shut the server down
    ///
    /// Stops accepting, closes the listening socket, then closes every live
    /// connection within the configured shutdown timeout.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ParleyError::ServerNotRunning);
        }

        info!("Shutting down Parley server");
        self.shutdown_notify.notify_one();

        if let Some(handle) = self.accept_handle.lock().await.take() {
            if tokio::time::timeout(self.config.shutdown_timeout, handle)
                .await
                .is_err()
            {
                warn!("Accept loop did not stop in time");
            }
        }

        self.manager.shutdown().await;
        info!("Parley server shutdown complete");

        Ok(())
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the address the server is actually bound to
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the number of live connections
    pub fn connection_count(&self) -> usize {
        self.manager.connection_count()
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the connection manager
    pub fn manager(&self) -> Arc<ConnectionManager> {
        self.manager.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Bind the listening socket with address reuse and the configured backlog
fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let socket = if config.bind_address.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(config.bind_address)?;
    Ok(socket.listen(config.backlog)?)
}

impl std::fmt::Debug for ParleyServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParleyServer")
            .field("bind_address", &self.bind_address)
            .field("running", &self.is_running())
            .field("connection_count", &self.connection_count())
            .field("uptime", &self.metrics.snapshot().uptime)
            .finish()
    }
}

impl Drop for ParleyServer {
    fn drop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            warn!("ParleyServer dropped while still running");
            self.shutdown_notify.notify_one();
        }
    }
}
