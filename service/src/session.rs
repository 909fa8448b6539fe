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

//! Per-connection protocol state machine
//!
//! A [`Session`] consumes one framed line at a time and answers with an
//! [`Action`] telling the worker what to write and whether to hang up.
//!
//! ```text
//!                 User: <name>                Password: <ok>
//! AwaitingUsername ──────────► AwaitingPassword ─────────────► AwaitingCommand
//!        ▲                            │                          │   ▲
//!        └──── Failed to login. ──────┘                          └───┘
//!                                                               commands
//! ```
//!
//! Any line that does not fit the current phase is a protocol violation:
//! the client receives `error: invalid input` and the connection closes.
//! A wrong password is not a violation and returns to the username phase.

use crate::{CommandError, CredentialStore, Request};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Line sent to every client once accepted
pub const WELCOME: &str = "Welcome! Please log in.";
/// Reply to a wrong username/password pair
pub const LOGIN_FAILED: &str = "Failed to login.";
/// Reply to a protocol violation, sent just before closing
pub const INVALID_INPUT: &str = "error: invalid input";

const USER_PREFIX: &str = "User: ";
const PASSWORD_PREFIX: &str = "Password: ";

/// Protocol phase of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Waiting for `User: <name>`
    AwaitingUsername = 0,
    /// Waiting for `Password: <password>`
    AwaitingPassword = 1,
    /// Logged in, waiting for commands
    AwaitingCommand = 2,
}

impl Phase {
    /// Convert from u8 (for atomic operations)
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::AwaitingPassword,
            2 => Self::AwaitingCommand,
            _ => Self::AwaitingUsername,
        }
    }

    /// Convert to u8 (for atomic operations)
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingUsername => write!(f, "awaiting-username"),
            Self::AwaitingPassword => write!(f, "awaiting-password"),
            Self::AwaitingCommand => write!(f, "awaiting-command"),
        }
    }
}

/// What the worker must do after a line has been handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing to send, keep reading
    Silent,
    /// Send the line and keep reading
    Reply(String),
    /// Send the line, then close the connection
    ReplyAndClose(String),
    /// Close the connection without a reply
    Close,
}

impl Action {
    /// The reply line to send, if any
    pub fn reply(&self) -> Option<&str> {
        match self {
            Action::Reply(line) | Action::ReplyAndClose(line) => Some(line),
            Action::Silent | Action::Close => None,
        }
    }

    /// Check whether the connection must be closed after this action
    pub fn closes(&self) -> bool {
        matches!(self, Action::ReplyAndClose(_) | Action::Close)
    }

    fn violation() -> Self {
        Action::ReplyAndClose(INVALID_INPUT.to_string())
    }
}

/// Authentication and command state of a single connection
#[derive(Debug)]
pub struct Session {
    credentials: Arc<CredentialStore>,
    phase: Phase,
    pending_username: Option<String>,
    user: Option<String>,
}

impl Session {
    /// Start a session in [`Phase::AwaitingUsername`]
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self {
            credentials,
            phase: Phase::AwaitingUsername,
            pending_username: None,
            user: None,
        }
    }

    /// Current protocol phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Username received but not yet verified
    pub fn pending_username(&self) -> Option<&str> {
        self.pending_username.as_deref()
    }

    /// Username the client logged in as
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Handle one framed line and decide the transition
    pub fn handle_line(&mut self, line: &str) -> Action {
        match self.phase {
            Phase::AwaitingUsername => self.handle_username(line),
            Phase::AwaitingPassword => self.handle_password(line),
            Phase::AwaitingCommand => self.handle_command(line),
        }
    }

    fn handle_username(&mut self, line: &str) -> Action {
        let username = line
            .strip_prefix(USER_PREFIX)
            .map(str::trim)
            .filter(|name| !name.is_empty());

        match username {
            Some(username) => {
                debug!(username, "Username received");
                self.pending_username = Some(username.to_string());
                self.phase = Phase::AwaitingPassword;
                Action::Silent
            }
            None => {
                warn!("Expected username line");
                Action::violation()
            }
        }
    }

    fn handle_password(&mut self, line: &str) -> Action {
        let Some(password) = line.strip_prefix(PASSWORD_PREFIX) else {
            warn!("Expected password line");
            return Action::violation();
        };

        let username = self.pending_username.take().unwrap_or_default();
        if self.credentials.verify(&username, password.trim()) {
            info!(username = %username, "Login succeeded");
            let greeting = format!("Hi {username}, good to see you.");
            self.user = Some(username);
            self.phase = Phase::AwaitingCommand;
            Action::Reply(greeting)
        } else {
            info!(username = %username, "Login failed");
            self.phase = Phase::AwaitingUsername;
            Action::Reply(LOGIN_FAILED.to_string())
        }
    }

    fn handle_command(&mut self, line: &str) -> Action {
        let outcome = Request::parse(line).and_then(|request| {
            if request.is_quit() {
                return Ok(None);
            }
            request.execute().map(Some)
        });

        match outcome {
            Ok(Some(reply)) => Action::Reply(reply),
            Ok(None) => {
                debug!("Client quit");
                Action::Close
            }
            Err(err @ CommandError::UnknownCommand) => {
                warn!(error = %err, "Rejected command line");
                Action::violation()
            }
            Err(err) => {
                warn!(error = %err, "Rejected command arguments");
                Action::violation()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let store: CredentialStore = [("alice", "secret"), ("bob", "hunter2")]
            .into_iter()
            .collect();
        Session::new(Arc::new(store))
    }

    fn logged_in() -> Session {
        let mut session = session();
        assert_eq!(session.handle_line("User: alice"), Action::Silent);
        assert_eq!(
            session.handle_line("Password: secret"),
            Action::Reply("Hi alice, good to see you.".to_string())
        );
        session
    }

    #[test]
    fn test_initial_phase() {
        let session = session();
        assert_eq!(session.phase(), Phase::AwaitingUsername);
        assert_eq!(session.pending_username(), None);
        assert_eq!(session.user(), None);
    }

    #[test]
    fn test_successful_login() {
        let session = logged_in();
        assert_eq!(session.phase(), Phase::AwaitingCommand);
        assert_eq!(session.user(), Some("alice"));
        assert_eq!(session.pending_username(), None);
    }

    #[test]
    fn test_username_is_trimmed() {
        let mut session = session();
        assert_eq!(session.handle_line("User:   alice  "), Action::Silent);
        assert_eq!(session.pending_username(), Some("alice"));
        assert_eq!(session.phase(), Phase::AwaitingPassword);
    }

    #[test]
    fn test_failed_login_returns_to_username() {
        let mut session = session();
        session.handle_line("User: alice");
        let action = session.handle_line("Password: wrong");
        assert_eq!(action, Action::Reply(LOGIN_FAILED.to_string()));
        assert!(!action.closes());
        assert_eq!(session.phase(), Phase::AwaitingUsername);
        assert_eq!(session.pending_username(), None);

        assert_eq!(session.handle_line("User: alice"), Action::Silent);
        assert_eq!(
            session.handle_line("Password: secret"),
            Action::Reply("Hi alice, good to see you.".to_string())
        );
    }

    #[test]
    fn test_unknown_user_fails_login() {
        let mut session = session();
        session.handle_line("User: mallory");
        assert_eq!(
            session.handle_line("Password: secret"),
            Action::Reply(LOGIN_FAILED.to_string())
        );
    }

    #[test]
    fn test_password_of_other_user_fails_login() {
        let mut session = session();
        session.handle_line("User: alice");
        assert_eq!(
            session.handle_line("Password: hunter2"),
            Action::Reply(LOGIN_FAILED.to_string())
        );
    }

    #[test]
    fn test_bad_username_line_is_fatal() {
        for line in ["alice", "User:", "User:    ", "user: alice", "Password: secret"] {
            let mut session = session();
            let action = session.handle_line(line);
            assert_eq!(action, Action::ReplyAndClose(INVALID_INPUT.to_string()), "{line}");
            assert!(action.closes());
        }
    }

    #[test]
    fn test_bad_password_line_is_fatal() {
        let mut session = session();
        session.handle_line("User: alice");
        assert_eq!(
            session.handle_line("secret"),
            Action::ReplyAndClose(INVALID_INPUT.to_string())
        );
    }

    #[test]
    fn test_commands_after_login() {
        let mut session = logged_in();
        assert_eq!(
            session.handle_line("parentheses: (()())"),
            Action::Reply("the parentheses are balanced: yes".to_string())
        );
        assert_eq!(
            session.handle_line("parentheses: (()"),
            Action::Reply("the parentheses are balanced: no".to_string())
        );
        assert_eq!(
            session.handle_line("lcm: 4 6"),
            Action::Reply("the lcm is: 12".to_string())
        );
        assert_eq!(
            session.handle_line("lcm: 0 5"),
            Action::Reply("the lcm is: 0".to_string())
        );
        assert_eq!(
            session.handle_line("caesar: Hello World 3"),
            Action::Reply("the ciphertext is: khoor zruog".to_string())
        );
        assert_eq!(session.phase(), Phase::AwaitingCommand);
    }

    #[test]
    fn test_integers_beyond_64_bits_are_accepted() {
        let mut session = logged_in();
        assert_eq!(
            session.handle_line("lcm: 99999999999999999999 2"),
            Action::Reply("the lcm is: 199999999999999999998".to_string())
        );
        assert_eq!(
            session.handle_line("caesar: abc 100000000000000000001"),
            Action::Reply("the ciphertext is: xyz".to_string())
        );
        assert_eq!(
            session.handle_line("caesar: abc -100000000000000000001"),
            Action::Reply("the ciphertext is: def".to_string())
        );
        assert_eq!(session.phase(), Phase::AwaitingCommand);
    }

    #[test]
    fn test_invalid_commands_are_fatal() {
        for line in [
            "parentheses: (a)",
            "lcm: 4",
            "lcm: x 6",
            "caesar: abc xyz",
            "caesar: a1b 3",
            "hello",
            "User: alice",
        ] {
            let mut session = logged_in();
            assert_eq!(
                session.handle_line(line),
                Action::ReplyAndClose(INVALID_INPUT.to_string()),
                "{line}"
            );
        }
    }

    #[test]
    fn test_quit_closes_without_reply() {
        let mut session = logged_in();
        let action = session.handle_line("quit");
        assert_eq!(action, Action::Close);
        assert_eq!(action.reply(), None);
        assert!(action.closes());
    }

    #[test]
    fn test_quit_before_login_is_a_violation() {
        let mut session = session();
        assert_eq!(
            session.handle_line("quit"),
            Action::ReplyAndClose(INVALID_INPUT.to_string())
        );
    }

    #[test]
    fn test_phase_conversion() {
        for phase in [
            Phase::AwaitingUsername,
            Phase::AwaitingPassword,
            Phase::AwaitingCommand,
        ] {
            assert_eq!(Phase::from_u8(phase.as_u8()), phase);
        }
    }
}
