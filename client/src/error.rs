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

//! Client error types

use parley_service::ParleyError;
use std::io;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Reply framing error
    #[error("protocol error: {0}")]
    Codec(#[from] ParleyError),

    /// Host argument is neither an IP literal nor a hostname
    #[error("invalid host: {0}")]
    InvalidHost(String),

    /// Connection attempt did not complete in time
    #[error("connection timeout")]
    ConnectionTimeout,

    /// Server did not reply in time
    #[error("read timeout")]
    ReadTimeout,

    /// Connection closed by server
    #[error("server closed connection")]
    ConnectionClosed,

    /// Server rejected the input and closed the connection
    #[error("server rejected input: {0}")]
    InvalidInput(String),

    /// Server sent a reply the client does not understand
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl ClientError {
    /// Check whether the server ended the conversation
    pub fn is_closed(&self) -> bool {
        match self {
            Self::ConnectionClosed | Self::InvalidInput(_) => true,
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;
