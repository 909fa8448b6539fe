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

//! Parley interactive client binary

use clap::Parser;
use parley_client::{ClientConfig, DEFAULT_HOST, LineClient, interactive};
use parley_service::DEFAULT_PORT;
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Interactive client for the Parley line protocol
#[derive(Parser, Debug)]
#[command(name = "parley-client", author, version, about)]
struct Args {
    /// Server IP address or hostname
    #[arg(default_value = DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = ClientConfig::new(args.host, args.port);
    let result = async {
        let mut client = LineClient::connect(config).await?;
        interactive::run(&mut client, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
    .await;

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
