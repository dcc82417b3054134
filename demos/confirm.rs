//! Example: Confirm a pending registration
//!
//! Usage:
//!   cargo run --example confirm -- --code CODE [--state FILE]

mod cli;

use cli::{init_tracing, print_form_messages, usage_and_exit, ArgParser};
use nickcloud::{ClientConfig, Controller, FormId, PendingRegistration};

const USAGE: &str = "Usage: cargo run --example confirm -- --code CODE [--state FILE] [--url BASE_URL]";
const DEFAULT_STATE: &str = "pending_registration.json";

#[tokio::main]
async fn main() {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let config: ClientConfig = parser.config().without_delays();
    let code = parser.take_required(&["--code", "-c"]);
    let state_path = parser
        .take_value(&["--state"])
        .unwrap_or_else(|| DEFAULT_STATE.to_string());
    if !parser.remaining().is_empty() {
        usage_and_exit(USAGE);
    }

    let pending = match std::fs::read_to_string(&state_path)
        .map_err(nickcloud::CloudError::from)
        .and_then(|s| PendingRegistration::deserialize(&s))
    {
        Ok(pending) => pending,
        Err(e) => {
            eprintln!("Could not load {}: {}", state_path, e);
            std::process::exit(1);
        }
    };

    let mut ctl = match Controller::connect(config) {
        Ok(ctl) => ctl,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    print_form_messages(ctl.subscribe(), FormId::Confirm);
    ctl.restore_pending(pending);

    match ctl.confirm(&code).await {
        Ok(name) => {
            let _ = std::fs::remove_file(&state_path);
            println!("Volume created: {}", name);
            println!("Log in with:");
            println!("  cargo run --example login -- --name {} --password PASSWORD", name);
        }
        Err(e) => {
            eprintln!("Confirmation failed: {}", e.user_message());
            std::process::exit(1);
        }
    }
}
