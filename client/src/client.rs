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

//! Line-oriented Parley client

use crate::{ClientConfig, ClientError, Result};
use futures_util::{SinkExt, StreamExt};
use parley_service::{INVALID_INPUT, LOGIN_FAILED, LineCodec};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument};

/// Prefix of the greeting sent after a successful login
const GREETING_PREFIX: &str = "Hi ";

/// Server answer to a username/password pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginReply {
    /// Logged in; carries the greeting
    Accepted(String),
    /// Wrong credentials; the server waits for another attempt
    Rejected(String),
    /// Login lines were malformed; the server is closing the connection
    Invalid(String),
    /// Anything else
    Unexpected(String),
}

impl LoginReply {
    /// Classify a reply line received during login
    pub fn classify(line: &str) -> Self {
        let line = line.to_string();
        if line.starts_with(GREETING_PREFIX) {
            Self::Accepted(line)
        } else if line.starts_with(LOGIN_FAILED.trim_end_matches('.')) {
            Self::Rejected(line)
        } else if line.starts_with(INVALID_INPUT) {
            Self::Invalid(line)
        } else {
            Self::Unexpected(line)
        }
    }

    /// The reply line as received
    pub fn line(&self) -> &str {
        match self {
            Self::Accepted(line)
            | Self::Rejected(line)
            | Self::Invalid(line)
            | Self::Unexpected(line) => line,
        }
    }
}

/// A connection to a Parley server
pub struct LineClient {
    config: ClientConfig,
    framed: Framed<TcpStream, LineCodec>,
}

impl LineClient {
    /// Validate the host and connect
    #[instrument(skip(config), fields(address = %config.address()))]
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let stream = timeout(
            config.connect_timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| ClientError::ConnectionTimeout)??;
        info!(peer_addr = %stream.peer_addr()?, "Connected");

        Ok(Self {
            config,
            framed: Framed::new(stream, LineCodec::new()),
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Receive the next reply line
    ///
    /// Returns `Ok(None)` once the server has closed the connection.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let next = match self.config.read_timeout {
            Some(limit) => timeout(limit, self.framed.next())
                .await
                .map_err(|_| ClientError::ReadTimeout)?,
            None => self.framed.next().await,
        };
        match next {
            Some(Ok(line)) => {
                debug!(line = %line, "Received");
                Ok(Some(line))
            }
            Some(Err(err)) => Err(err.into()),
            None => Ok(None),
        }
    }

    /// Receive the next reply line, treating end of stream as an error
    pub async fn expect_line(&mut self) -> Result<String> {
        self.read_line().await?.ok_or(ClientError::ConnectionClosed)
    }

    /// Send one line
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        debug!(line = %line, "Sending");
        self.framed.send(line).await?;
        Ok(())
    }

    /// Send the two login lines verbatim and classify the answer
    pub async fn login(&mut self, user_line: &str, password_line: &str) -> Result<LoginReply> {
        self.send_line(user_line).await?;
        self.send_line(password_line).await?;
        Ok(LoginReply::classify(&self.expect_line().await?))
    }

    /// Send a command and wait for its reply
    ///
    /// `quit` is sent without waiting, and yields `None`.
    pub async fn request(&mut self, command: &str) -> Result<Option<String>> {
        self.send_line(command).await?;
        if command == "quit" {
            return Ok(None);
        }
        let reply = self.expect_line().await?;
        if reply == INVALID_INPUT {
            return Err(ClientError::InvalidInput(command.to_string()));
        }
        Ok(Some(reply))
    }
}

impl std::fmt::Debug for LineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineClient")
            .field("address", &self.config.address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_login_reply() {
        assert_eq!(
            LoginReply::classify("Hi alice, good to see you."),
            LoginReply::Accepted("Hi alice, good to see you.".to_string())
        );
        assert_eq!(
            LoginReply::classify("Failed to login."),
            LoginReply::Rejected("Failed to login.".to_string())
        );
        assert_eq!(
            LoginReply::classify("error: invalid input"),
            LoginReply::Invalid("error: invalid input".to_string())
        );
        assert!(matches!(
            LoginReply::classify("Welcome! Please log in."),
            LoginReply::Unexpected(_)
        ));
        assert_eq!(LoginReply::classify("Failed to login.").line(), "Failed to login.");
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_host() {
        let err = LineClient::connect(ClientConfig::new("bad host", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidHost(_)));
    }
}
