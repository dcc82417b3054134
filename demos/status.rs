//! Example: Check that the server is up
//!
//! Usage:
//!   cargo run --example status -- [--url BASE_URL] [--proxy PROXY]

mod cli;

use cli::{init_tracing, usage_and_exit, ArgParser};
use nickcloud::{ApiClient, CloudApi};

const USAGE: &str = "Usage: cargo run --example status -- [--url BASE_URL] [--proxy PROXY]";

#[tokio::main]
async fn main() {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let config = parser.config();
    if !parser.remaining().is_empty() {
        usage_and_exit(USAGE);
    }

    let api = match ApiClient::new(&config) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    println!("Checking {} ...", api.base_url());
    match api.status().await {
        Ok(status) => {
            println!("Service: {} {}", status.service, status.version);
            println!("Status:  {}", status.status);
            if let Some(path) = &status.storage_path {
                println!("Storage: {}", path);
            }
            if !status.is_online() {
                std::process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", e.user_message(), e);
            std::process::exit(1);
        }
    }
}
