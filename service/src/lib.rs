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

//! Parley Service
//!
//! An authenticated, line-oriented TCP service. Clients log in with a
//! username and password taken from a tab-separated credential file, then
//! issue simple computational commands, one per line:
//!
//! - `parentheses: <expr>` checks whether a string of `(` and `)` is balanced
//! - `lcm: <a> <b>` computes the least common multiple of two integers
//! - `caesar: <text> <shift>` applies a Caesar shift to letters and spaces
//! - `quit` ends the session
//!
//! Any input that does not fit the protocol earns `error: invalid input`
//! and the connection is closed. Every connection is handled independently.
//!
//! # Architecture
//!
//! ```text
//! ParleyServer          accept loop, listening socket
//!     ↓
//! ConnectionManager     registry of live connections
//!     ↓
//! ConnectionWorker      one task per connection
//!     ↓
//! Connection            framed socket (LineCodec) + Session
//!     ↓
//! Session → Request     login state machine, command evaluation
//! ```
//!
//! # Example
//!
//! ```no_run
//! use parley_service::{CredentialStore, ParleyServer, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Arc::new(CredentialStore::parse("alice\tsecret\n"));
//!     let config = ServerConfig::new("127.0.0.1:1337".parse()?);
//!     let server = ParleyServer::new(config, credentials).await?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

mod codec;
mod command;
mod config;
mod connection;
mod credentials;
mod error;
mod manager;
mod metrics;
mod server;
mod session;
mod types;
mod worker;

pub use codec::LineCodec;
pub use command::{Balance, CommandError, Request, caesar_shift, check_balance, gcd, lcm};
pub use config::{DEFAULT_PORT, ServerConfig};
pub use connection::{Connection, ConnectionStatus};
pub use credentials::CredentialStore;
pub use error::{ParleyError, Result};
pub use manager::ConnectionManager;
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use num_bigint::BigInt;
pub use server::ParleyServer;
pub use session::{Action, INVALID_INPUT, LOGIN_FAILED, Phase, Session, WELCOME};
pub use types::{ConnectionId, ConnectionInfo, ConnectionState};
pub use worker::{ConnectionWorker, ControlMessage};
