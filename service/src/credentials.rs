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

//! Credential store
//!
//! An immutable username to password table, loaded once at startup from a
//! file with one `username<TAB>password` record per line. The store is
//! shared read-only between all connections.

use crate::{ParleyError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Immutable username to password lookup table
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    /// Load a credential table from a tab-separated file
    ///
    /// Fails with [`ParleyError::CredentialFile`] if the file cannot be read.
    /// Malformed records are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ParleyError::CredentialFile {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self::parse(&text);
        info!(path = %path.display(), users = store.len(), "Loaded credential table");
        Ok(store)
    }

    /// Parse a credential table from text
    ///
    /// Each line is trimmed, then must split into exactly two non-empty
    /// tab-separated fields. Blank and malformed lines are skipped. A later
    /// record for the same username replaces an earlier one.
    pub fn parse(text: &str) -> Self {
        let mut users = HashMap::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split('\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(username), Some(password), None)
                    if !username.is_empty() && !password.is_empty() =>
                {
                    users.insert(username.to_string(), password.to_string());
                }
                _ => {
                    debug!(line = index + 1, "Skipping malformed credential record");
                }
            }
        }
        Self { users }
    }

    /// Look up the password stored for a username
    pub fn lookup(&self, username: &str) -> Option<&str> {
        self.users.get(username).map(String::as_str)
    }

    /// Check a username/password pair by exact match
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.lookup(username) == Some(password)
    }

    /// Number of known users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check if the table has no users
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl<U, P> FromIterator<(U, P)> for CredentialStore
where
    U: Into<String>,
    P: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (U, P)>>(iter: I) -> Self {
        Self {
            users: iter
                .into_iter()
                .map(|(user, password)| (user.into(), password.into()))
                .collect(),
        }
    }
}
