// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use clap::Parser;
use opcua_test_server::prelude::*;
use std::env;
use std::path::PathBuf;

/// OPC UA server exposing a bulk test namespace and simulated devices
#[derive(Parser)]
#[command(version)]
struct Args {
    /// toml configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), StatusCode> {
    let args = Args::parse();
    if env::var("RUST_OPCUA_LOG").is_err() {
        env::set_var("RUST_OPCUA_LOG", "INFO");
    }
    opcua_console_logging::init();
    let configuration = Configuration::load(args.config.as_deref()).map_err(NamespaceError::from)?;
    let server = TestServer::new(configuration)?;
    // Run the server. This does not ordinarily exit so you must Ctrl+C to terminate
    server.run();
    Ok(())
}
