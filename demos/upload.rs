//! Example: Upload a file
//!
//! Usage:
//!   cargo run --example upload -- --name VM_NAME --password PASSWORD [--option store_only|share_only|store_and_share] <LOCAL_FILE>

mod cli;

use std::time::Duration;

use cli::{credentials_from_parser, init_tracing, usage_and_exit, ArgParser};
use indicatif::{ProgressBar, ProgressStyle};
use nickcloud::{FormId, MessageKind, UiEvent, UploadOption};

const USAGE: &str = "Usage: cargo run --example upload -- --name VM_NAME --password PASSWORD [--option store_only|share_only|store_and_share] <LOCAL_FILE>";

#[tokio::main]
async fn main() {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let creds = credentials_from_parser(&mut parser);
    let option = match parser.take_value(&["--option", "-o"]) {
        Some(v) => v.parse::<UploadOption>().unwrap_or_else(|_| usage_and_exit(USAGE)),
        None => UploadOption::default(),
    };
    let positionals = parser.remaining();
    if positionals.len() != 1 {
        usage_and_exit(USAGE);
    }
    let local_file = &positionals[0];

    println!("Logging in...");
    let mut ctl = match creds.login().await {
        Ok(ctl) => ctl,
        Err(e) => {
            eprintln!("Login failed: {}", e.user_message());
            std::process::exit(1);
        }
    };
    if let Some(storage) = ctl.session().storage {
        println!("{}", storage.summary());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut rx = ctl.subscribe();
    let spinner_for_events = spinner.clone();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let UiEvent::FormMessage {
                form: FormId::Upload,
                kind,
                text,
            } = event
            {
                match kind {
                    MessageKind::Clear => {}
                    MessageKind::Loading => spinner_for_events.set_message(text),
                    _ => spinner_for_events.println(text),
                }
            }
        }
    });

    let res = ctl.upload_file(local_file, option).await;
    spinner.finish_and_clear();
    match res {
        Ok(stored) => {
            println!("Upload complete: {}", stored);
            if let Some(storage) = ctl.session().storage {
                println!("{}", storage.summary());
            }
        }
        Err(e) => {
            eprintln!("Upload failed: {}", e.user_message());
            std::process::exit(1);
        }
    }
}
