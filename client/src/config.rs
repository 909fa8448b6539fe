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

//! Client configuration

use crate::{ClientError, Result, is_valid_host};
use parley_service::DEFAULT_PORT;
use std::time::Duration;

/// Default server host
pub const DEFAULT_HOST: &str = "localhost";

/// Parley client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Reply timeout (None for no timeout)
    pub read_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration with the given host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the reply timeout
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Reject hosts that are not IP literals or hostnames
    pub fn validate(&self) -> Result<()> {
        if is_valid_host(&self.host) {
            Ok(())
        } else {
            Err(ClientError::InvalidHost(self.host.clone()))
        }
    }

    /// Get the server address as a string
    ///
    /// IPv6 literals are bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.address(), "localhost:1337");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_address() {
        assert_eq!(ClientConfig::new("10.0.0.1", 80).address(), "10.0.0.1:80");
        assert_eq!(ClientConfig::new("::1", 1337).address(), "[::1]:1337");
    }

    #[test]
    fn test_validate() {
        assert!(ClientConfig::new("fe80::1", 1).validate().is_ok());
        assert!(matches!(
            ClientConfig::new("not a host", 1).validate(),
            Err(ClientError::InvalidHost(_))
        ));
    }
}
