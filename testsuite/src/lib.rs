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

//! Shared fixtures for end-to-end Parley tests

use parley_client::{ClientConfig, LineClient, LoginReply};
use parley_service::{CredentialStore, ParleyServer, ServerConfig, WELCOME};
use std::sync::Arc;
use std::time::Duration;

/// Credential file contents used by every fixture server
pub const CREDENTIALS: &str = "alice\tsecret\nbob\thunter2\n# comment line\ncarol\t\n";

/// Reply timeout for fixture clients
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a server on an ephemeral loopback port
pub async fn spawn_server() -> ParleyServer {
    spawn_server_with(ServerConfig::new(([127, 0, 0, 1], 0).into())).await
}

/// Start a server with the given configuration and the fixture credentials
pub async fn spawn_server_with(config: ServerConfig) -> ParleyServer {
    let credentials = Arc::new(CredentialStore::parse(CREDENTIALS));
    let server = ParleyServer::new(config, credentials)
        .await
        .expect("server should bind");
    server.start().await.expect("server should start");
    server
}

/// Client configuration pointing at a fixture server
pub fn client_config(server: &ParleyServer) -> ClientConfig {
    ClientConfig::new("127.0.0.1", server.bind_address().port())
        .with_read_timeout(Some(REPLY_TIMEOUT))
}

/// Connect and consume the welcome line
pub async fn connect(server: &ParleyServer) -> LineClient {
    let mut client = LineClient::connect(client_config(server))
        .await
        .expect("client should connect");
    let banner = client.expect_line().await.expect("welcome line");
    assert_eq!(banner, WELCOME);
    client
}

/// Connect and log in, panicking unless the login is accepted
pub async fn login(server: &ParleyServer, user: &str, password: &str) -> LineClient {
    let mut client = connect(server).await;
    let reply = client
        .login(&format!("User: {user}"), &format!("Password: {password}"))
        .await
        .expect("login reply");
    assert_eq!(
        reply,
        LoginReply::Accepted(format!("Hi {user}, good to see you."))
    );
    client
}

/// Poll until the server reports the given number of live connections
pub async fn wait_for_connections(server: &ParleyServer, count: usize) {
    let deadline = tokio::time::Instant::now() + REPLY_TIMEOUT;
    while server.connection_count() != count {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {count} connections, have {}",
            server.connection_count()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
