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

//! Connection worker implementation
//!
//! The ConnectionWorker drives a single connection from greeting to close:
//! - Sends the welcome line
//! - Feeds every framed line through the session, one at a time, in order
//! - Writes replies and hangs up when the session says so
//! - Honors close requests from the manager
//! - Records per-connection outcomes in the server metrics

use crate::{
    Action, Connection, ConnectionId, ConnectionState, INVALID_INPUT, Phase, Result, ServerMetrics,
    WELCOME,
};
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Control channel depth for each worker
const CONTROL_BUFFER_SIZE: usize = 8;

/// Control messages for the worker
#[derive(Debug)]
pub enum ControlMessage {
    /// Close the connection without sending anything further
    Close,
}

/// Why the serve loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// Peer closed its side
    PeerClosed,
    /// Client sent `quit`
    Quit,
    /// Client broke the protocol and was told so
    Violation,
    /// Manager asked the worker to stop
    Requested,
}

/// Connection worker that manages a single connection's lifecycle
pub struct ConnectionWorker {
    id: ConnectionId,
    connection: Connection,
    metrics: Arc<ServerMetrics>,
    control_rx: mpsc::Receiver<ControlMessage>,
}

impl ConnectionWorker {
    /// Create a new connection worker
    pub fn new(
        id: ConnectionId,
        connection: Connection,
        metrics: Arc<ServerMetrics>,
    ) -> (Self, mpsc::Sender<ControlMessage>) {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER_SIZE);

        let worker = Self {
            id,
            connection,
            metrics,
            control_rx,
        };

        (worker, control_tx)
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        self.connection.status().state()
    }

    fn set_state(&self, state: ConnectionState) {
        self.connection.status().set_state(state);
    }

    /// Run the worker until the connection ends
    ///
    /// Never fails: errors end this connection only and are logged.
    #[instrument(skip(self), fields(connection_id = %self.id, peer_addr = %self.connection.peer_addr()))]
    pub async fn run(mut self) {
        self.set_state(ConnectionState::Serving);

        match self.serve().await {
            Ok(exit) => debug!(?exit, "Connection finished"),
            Err(err) if err.is_protocol_violation() => {
                warn!(error = %err, "Protocol violation");
                self.metrics.protocol_violation();
                if let Err(err) = self.send(INVALID_INPUT).await {
                    debug!(error = %err, "Could not report protocol violation");
                }
            }
            Err(err) => {
                info!(error = %err, "Connection error");
                self.metrics.transport_error();
            }
        }

        self.cleanup().await;
    }

    async fn serve(&mut self) -> Result<Exit> {
        self.send(WELCOME).await?;

        loop {
            select! {
                line = self.connection.next_line() => {
                    let Some(line) = line? else {
                        return Ok(Exit::PeerClosed);
                    };
                    self.metrics.line_received();
                    if let Some(exit) = self.dispatch(&line).await? {
                        return Ok(exit);
                    }
                }

                msg = self.control_rx.recv() => {
                    match msg {
                        Some(ControlMessage::Close) | None => return Ok(Exit::Requested),
                    }
                }
            }
        }
    }

    /// Handle one line; returns the exit reason if the connection must end
    async fn dispatch(&mut self, line: &str) -> Result<Option<Exit>> {
        let before = self.connection.session().phase();
        let action = self.connection.handle_line(line);
        let after = self.connection.session().phase();

        match (before, after, &action) {
            (Phase::AwaitingPassword, Phase::AwaitingCommand, _) => self.metrics.login_succeeded(),
            (Phase::AwaitingPassword, Phase::AwaitingUsername, Action::Reply(_)) => {
                self.metrics.login_failed()
            }
            (Phase::AwaitingCommand, _, Action::Reply(_)) => self.metrics.command_executed(),
            (_, _, Action::ReplyAndClose(_)) => self.metrics.protocol_violation(),
            _ => {}
        }

        if let Some(reply) = action.reply() {
            self.send(reply).await?;
        }

        Ok(match action {
            Action::Silent | Action::Reply(_) => None,
            Action::Close => Some(Exit::Quit),
            Action::ReplyAndClose(_) => Some(Exit::Violation),
        })
    }

    async fn send(&mut self, line: &str) -> Result<()> {
        self.connection.send_line(line).await?;
        self.metrics.reply_sent();
        Ok(())
    }

    async fn cleanup(&mut self) {
        self.set_state(ConnectionState::Closing);

        self.connection.close().await;
        self.control_rx.close();
        while self.control_rx.try_recv().is_ok() {}

        self.set_state(ConnectionState::Closed);
        debug!(connection_id = %self.id, "Connection closed");
    }
}

impl std::fmt::Debug for ConnectionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionWorker")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("phase", &self.connection.session().phase())
            .finish()
    }
}
