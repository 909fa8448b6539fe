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

//! Command line interface

use clap::Parser;
use parley_service::{DEFAULT_PORT, ServerConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Authenticated line-protocol server
#[derive(Parser, Debug)]
#[command(name = "parley-server", author, version, about)]
pub struct Args {
    /// Tab-separated credential file, one `username<TAB>password` per line
    pub credentials: PathBuf,

    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind to
    #[arg(short = 'H', long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Maximum number of simultaneous connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Initial per-connection read buffer size in bytes
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Longest accepted line in bytes
    #[arg(long)]
    pub max_line_length: Option<usize>,
}

impl Args {
    /// Build the server configuration from the parsed arguments
    pub fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::new(SocketAddr::new(self.host, self.port));
        if let Some(max) = self.max_connections {
            config = config.with_max_connections(max);
        }
        if let Some(size) = self.buffer_size {
            config = config.with_buffer_capacity(size);
        }
        if let Some(length) = self.max_line_length {
            config = config.with_max_line_length(length);
        }
        config
    }
}
