//! Example: Register a new volume
//!
//! Usage:
//!   cargo run --example register -- --name VM_NAME --email EMAIL --password PASSWORD [--storage MB] [--state FILE]
//!
//! The pending registration is written to the state file (default
//! `pending_registration.json`) for the `confirm` example.

mod cli;

use cli::{init_tracing, print_form_messages, usage_and_exit, ArgParser};
use nickcloud::{Controller, FormId};

const USAGE: &str = "Usage: cargo run --example register -- --name VM_NAME --email EMAIL --password PASSWORD [--storage MB] [--state FILE]";
const DEFAULT_STATE: &str = "pending_registration.json";

#[tokio::main]
async fn main() {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let config = parser.config();
    let name = parser.take_required(&["--name", "-n"]);
    let email = parser.take_required(&["--email", "-e"]);
    let password = parser.take_required(&["--password", "-p"]);
    let storage_mb = match parser.take_value(&["--storage", "-s"]) {
        Some(v) => v.parse::<u32>().unwrap_or_else(|_| usage_and_exit(USAGE)),
        None => 500,
    };
    let state_path = parser
        .take_value(&["--state"])
        .unwrap_or_else(|| DEFAULT_STATE.to_string());
    if !parser.remaining().is_empty() {
        usage_and_exit(USAGE);
    }

    let mut ctl = match Controller::connect(config) {
        Ok(ctl) => ctl,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    print_form_messages(ctl.subscribe(), FormId::Register);

    println!("Registering volume: {} ({}MB)", name, storage_mb);
    let sent = match ctl.register(&name, &email, &password, storage_mb).await {
        Ok(sent) => sent,
        Err(e) => {
            eprintln!("Registration failed: {}", e.user_message());
            std::process::exit(1);
        }
    };

    let Some(pending) = ctl.pending() else {
        eprintln!("Registration state missing");
        std::process::exit(1);
    };
    let state = match pending.serialize() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Could not serialize state: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = std::fs::write(&state_path, state) {
        eprintln!("Could not write {}: {}", state_path, e);
        std::process::exit(1);
    }

    println!("Confirmation code sent to {}", email);
    if let Some(code) = sent.test_code {
        println!("Server is in test mode, code: {}", code);
    }
    println!();
    println!("Pending registration saved to {}", state_path);
    println!("Next, run:");
    println!(
        "  cargo run --example confirm -- --state {} --code CODE",
        state_path
    );
}
