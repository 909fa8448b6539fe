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

//! Error types for the Parley service

use crate::types::ConnectionId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ParleyError>;

/// Parley service error types
#[derive(Debug, Error)]
pub enum ParleyError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid server configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The credential file could not be opened or read
    #[error("Unable to read credential file {}: {source}", path.display())]
    CredentialFile {
        /// Path that was being loaded
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A client sent more than `limit` bytes without a line terminator
    #[error("Line exceeds maximum length of {limit} bytes")]
    LineTooLong {
        /// Configured maximum line length
        limit: usize,
    },

    /// A client sent a line that is not valid UTF-8
    #[error("Line is not valid UTF-8")]
    InvalidUtf8,

    /// Connection with the given ID was not found
    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// Server was started twice
    #[error("Server already running")]
    ServerAlreadyRunning,
}

impl ParleyError {
    /// Check if the error was caused by malformed client input
    ///
    /// Protocol violations are answered with the error line before the
    /// connection is closed. Every other per-connection error closes the
    /// connection silently.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ParleyError::LineTooLong { .. } | ParleyError::InvalidUtf8
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_protocol_violation() {
        assert!(ParleyError::LineTooLong { limit: 16 }.is_protocol_violation());
        assert!(ParleyError::InvalidUtf8.is_protocol_violation());
        assert!(!ParleyError::Timeout.is_protocol_violation());
        assert!(!ParleyError::ConnectionClosed.is_protocol_violation());
    }

    #[test]
    fn test_error_display() {
        let err = ParleyError::ConnectionNotFound(ConnectionId::new(42));
        assert_eq!(err.to_string(), "Connection conn-42 not found");

        let err = ParleyError::LineTooLong { limit: 8192 };
        assert_eq!(err.to_string(), "Line exceeds maximum length of 8192 bytes");

        let err = ParleyError::CredentialFile {
            path: PathBuf::from("/nonexistent/users.tsv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(
            err.to_string(),
            "Unable to read credential file /nonexistent/users.tsv: not found"
        );
    }
}
