//! Example: Keep the dashboard open and print updates
//!
//! Logs in through the actor runtime and prints every event until Ctrl-C.
//!
//! Usage:
//!   cargo run --example watch -- --name VM_NAME --password PASSWORD [--interval SECS]

mod cli;

use std::time::Duration;

use cli::{credentials_from_parser, init_tracing, usage_and_exit, ArgParser};
use nickcloud::{CloudHandle, UiEvent};

const USAGE: &str =
    "Usage: cargo run --example watch -- --name VM_NAME --password PASSWORD [--interval SECS]";

#[tokio::main]
async fn main() -> nickcloud::Result<()> {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let mut creds = credentials_from_parser(&mut parser);
    if let Some(secs) = parser.take_value(&["--interval", "-i"]) {
        let secs = secs.parse::<u64>().unwrap_or_else(|_| usage_and_exit(USAGE));
        creds.config = creds
            .config
            .with_refresh_interval(Duration::from_secs(secs));
    }
    if !parser.remaining().is_empty() {
        usage_and_exit(USAGE);
    }

    let cloud = CloudHandle::connect(creds.config.clone())?;
    let mut events = cloud.subscribe();
    cloud.login(&creds.name, &creds.password).await?;

    let snap = cloud.snapshot().await?;
    println!(
        "Watching {} ({}), Ctrl-C to stop",
        snap.session.identity.as_deref().unwrap_or("?"),
        snap.session.file_count_label()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                match event {
                    Ok(UiEvent::SessionUpdated) => {
                        let snap = cloud.snapshot().await?;
                        println!(
                            "{} | {}",
                            snap.session.storage_used,
                            snap.session.file_count_label()
                        );
                    }
                    Ok(UiEvent::Notice(notice)) => {
                        println!("{:?}: {}", notice.level, notice.message)
                    }
                    Ok(UiEvent::ViewChanged { view, .. }) => println!("view: {}", view),
                    Ok(UiEvent::FormMessage { .. }) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        println!("missed {} events", n);
                    }
                    Err(_) => break,
                }
            }
        }
    }

    cloud.logout().await?;
    cloud.shutdown().await;
    Ok(())
}
