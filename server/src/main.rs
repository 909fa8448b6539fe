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

//! Parley server binary

mod cli;

use clap::Parser;
use cli::Args;
use parley_service::{CredentialStore, ParleyServer};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let credentials = Arc::new(CredentialStore::load(&args.credentials)?);
    let server = ParleyServer::new(args.server_config(), credentials).await?;
    server.start().await?;
    info!(bind_address = %server.bind_address(), "Listening; press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");
    server.shutdown().await?;

    let metrics = server.metrics().snapshot();
    info!(
        total_connections = metrics.total_connections,
        logins_succeeded = metrics.logins_succeeded,
        commands_executed = metrics.commands_executed,
        lines_per_sec = metrics.lines_per_sec(),
        errors = metrics.total_errors(),
        uptime = ?metrics.uptime,
        "Server stopped"
    );

    Ok(())
}
