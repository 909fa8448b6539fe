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

//! # Parley Client
//!
//! Client library and interactive terminal for the Parley line protocol.
//!
//! ## Quick Start
//!
//! ```no_run
//! use parley_client::{ClientConfig, LineClient, LoginReply};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = LineClient::connect(ClientConfig::new("localhost", 1337)).await?;
//!     println!("{}", client.expect_line().await?);
//!
//!     if let LoginReply::Accepted(greeting) =
//!         client.login("User: alice", "Password: secret").await?
//!     {
//!         println!("{greeting}");
//!         println!("{:?}", client.request("lcm: 4 6").await?);
//!         client.request("quit").await?;
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod host;
pub mod interactive;

pub use client::{LineClient, LoginReply};
pub use config::{ClientConfig, DEFAULT_HOST};
pub use error::{ClientError, Result};
pub use host::{is_hostname, is_ipv4, is_ipv6, is_valid_host};
