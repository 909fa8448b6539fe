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

//! Server configuration

use crate::{ParleyError, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Port the server listens on when none is given
pub const DEFAULT_PORT: u16 = 1337;

/// Server configuration
///
/// This structure contains all configuration options for the Parley server.
/// It is built once at startup and handed to the components that need it.
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use parley_service::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::default()
///     .with_port(4000)
///     .with_max_connections(500)
///     .with_write_timeout(Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of bytes taken from a socket in a single read
    pub buffer_capacity: usize,

    /// Maximum number of bytes a client may send without a line terminator
    pub max_line_length: usize,

    /// Maximum number of concurrent connections
    pub max_connections: usize,

    /// Listen backlog for the bound socket
    pub backlog: u32,

    /// Timeout for write operations
    ///
    /// A reply that cannot be written within this duration closes the connection.
    pub write_timeout: Duration,

    /// Timeout for graceful shutdown
    ///
    /// The server will wait this long for connections to close gracefully before
    /// aborting them.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            buffer_capacity: 4096,
            max_line_length: 8192,
            max_connections: 1000,
            backlog: 128,
            write_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given bind address
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set the port while keeping the bind host
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_address.set_port(port);
        self
    }

    /// Set the per-read buffer capacity
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the maximum line length
    pub fn with_max_line_length(mut self, length: usize) -> Self {
        self.max_line_length = length;
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the listen backlog
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Set the write timeout duration
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the shutdown timeout duration
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Validate the configuration
    ///
    /// Returns [`ParleyError::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(ParleyError::Config(
                "buffer_capacity must be greater than 0".to_string(),
            ));
        }

        if self.max_line_length == 0 {
            return Err(ParleyError::Config(
                "max_line_length must be greater than 0".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(ParleyError::Config(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if self.backlog == 0 {
            return Err(ParleyError::Config(
                "backlog must be greater than 0".to_string(),
            ));
        }

        if self.write_timeout.is_zero() {
            return Err(ParleyError::Config(
                "write_timeout must be greater than 0".to_string(),
            ));
        }

        if self.shutdown_timeout.is_zero() {
            return Err(ParleyError::Config(
                "shutdown_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
