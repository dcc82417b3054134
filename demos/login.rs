//! Example: Log in and show the dashboard
//!
//! Usage:
//!   cargo run --example login -- --name VM_NAME --password PASSWORD [--url BASE_URL] [--proxy PROXY]

mod cli;

use cli::{init_tracing, parse_credentials, usage_and_exit};
use nickcloud::UsageLevel;

const USAGE: &str =
    "Usage: cargo run --example login -- --name VM_NAME --password PASSWORD [--url BASE_URL] [--proxy PROXY]";

#[tokio::main]
async fn main() {
    init_tracing();
    let creds = parse_credentials(USAGE);
    if !creds.positionals.is_empty() {
        usage_and_exit(USAGE);
    }

    println!("Logging in to: {}", creds.name);
    println!();

    let mut ctl = match creds.login().await {
        Ok(ctl) => ctl,
        Err(e) => {
            eprintln!("Login failed: {}", e.user_message());
            std::process::exit(1);
        }
    };

    let session = ctl.session().clone();
    println!("Login successful!");
    println!();
    println!("VM:       {}", session.identity.as_deref().unwrap_or("?"));
    println!("Email:    {}", session.email.as_deref().unwrap_or("(not set)"));
    println!("Capacity: {}", session.storage_limit);
    if let Some(storage) = session.storage {
        let marker = match storage.level() {
            UsageLevel::Normal => "",
            UsageLevel::Warning => " (almost full)",
            UsageLevel::Critical => " (full!)",
        };
        println!(
            "Usage:    {} {}%{}",
            storage.summary(),
            storage.usage_percent(),
            marker
        );
    }
    println!();
    println!("{}:", session.file_count_label());
    for file in &session.files {
        println!(
            "  [{}] {:<40} {:>10}  {}",
            file.kind().icon(),
            file.name,
            file.size_display,
            file.modified_or_unknown()
        );
    }

    for notice in ctl.notices() {
        eprintln!("{:?}: {}", notice.level, notice.message);
    }
}
