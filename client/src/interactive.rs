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

//! Interactive terminal session
//!
//! Drives a [`LineClient`] from line-oriented input, echoing every server
//! reply to the output. Generic over the streams so it can be exercised
//! without a terminal.

use crate::{ClientError, LineClient, LoginReply, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Printed when the server hangs up
pub const SERVER_CLOSED: &str = "server closed connection";

/// How an interactive session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// User sent `quit`
    Quit,
    /// Input ran out
    EndOfInput,
    /// Server closed the connection during the command phase
    ServerClosed,
}

/// Run the banner, login loop and command loop
///
/// Login-phase failures are errors; once logged in, the server closing the
/// connection ends the session normally.
pub async fn run<R, W>(client: &mut LineClient, input: R, mut output: W) -> Result<Outcome>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    let banner = match client.read_line().await? {
        Some(banner) => banner,
        None => return closed(&mut output).await,
    };
    print_line(&mut output, &banner).await?;

    loop {
        let Some(user_line) = lines.next_line().await? else {
            return Ok(Outcome::EndOfInput);
        };
        let Some(password_line) = lines.next_line().await? else {
            return Ok(Outcome::EndOfInput);
        };

        let reply = match client.login(&user_line, &password_line).await {
            Ok(reply) => reply,
            Err(err) if err.is_closed() => return closed(&mut output).await,
            Err(err) => return Err(err),
        };
        print_line(&mut output, reply.line()).await?;

        match reply {
            LoginReply::Accepted(_) => break,
            LoginReply::Rejected(_) => continue,
            LoginReply::Invalid(line) => return Err(ClientError::InvalidInput(line)),
            LoginReply::Unexpected(line) => return Err(ClientError::UnexpectedReply(line)),
        }
    }

    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        match client.request(command).await {
            Ok(Some(reply)) => print_line(&mut output, &reply).await?,
            Ok(None) => {
                debug!("Quit sent");
                return Ok(Outcome::Quit);
            }
            Err(ClientError::InvalidInput(_)) => {
                print_line(&mut output, parley_service::INVALID_INPUT).await?;
                print_line(&mut output, SERVER_CLOSED).await?;
                return Ok(Outcome::ServerClosed);
            }
            Err(err) if err.is_closed() => {
                print_line(&mut output, SERVER_CLOSED).await?;
                return Ok(Outcome::ServerClosed);
            }
            Err(err) => return Err(err),
        }
    }

    Ok(Outcome::EndOfInput)
}

async fn closed<W>(output: &mut W) -> Result<Outcome>
where
    W: AsyncWrite + Unpin,
{
    print_line(output, SERVER_CLOSED).await?;
    Err(ClientError::ConnectionClosed)
}

async fn print_line<W>(output: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}
