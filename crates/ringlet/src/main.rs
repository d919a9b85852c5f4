// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ringlet - an AI call-orchestration service.
//!
//! This is the binary entry point for the Ringlet server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;

/// Ringlet - an AI call-orchestration service.
#[derive(Parser, Debug)]
#[command(name = "ringlet", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Ringlet server.
    Serve,
    /// Load and validate configuration, then print a summary.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match ringlet_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            ringlet_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("ringlet serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            println!("ringlet: configuration valid");
            println!("  service.name           = {}", config.service.name);
            println!("  gateway                = {}:{}", config.gateway.host, config.gateway.port);
            println!("  storage.database_path  = {}", config.storage.database_path);
            println!("  dispatch.prefer_flow   = {}", config.dispatch.prefer_flow);
            println!("  dispatch.strict_flow   = {}", config.dispatch.strict_flow);
            println!("  dispatch.max_concurrent = {}", config.dispatch.max_concurrent);
            println!("  dispatch.test_mode     = {}", config.dispatch.test_mode);
            println!(
                "  flow.base_url          = {}",
                if config.flow.base_url.is_empty() {
                    "(disabled)"
                } else {
                    config.flow.base_url.as_str()
                }
            );
        }
        None => {
            println!("ringlet: use --help for available commands");
        }
    }
}
