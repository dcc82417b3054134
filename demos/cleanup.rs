//! Example: Remove ghost entries (listed but missing on disk)
//!
//! Usage:
//!   cargo run --example cleanup -- --name VM_NAME --password PASSWORD [--yes]

mod cli;

use cli::{ask, credentials_from_parser, init_tracing, usage_and_exit, ArgParser};

const USAGE: &str =
    "Usage: cargo run --example cleanup -- --name VM_NAME --password PASSWORD [--yes]";

#[tokio::main]
async fn main() -> nickcloud::Result<()> {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let creds = credentials_from_parser(&mut parser);
    let assume_yes = parser.take_flag(&["--yes", "-y"]);
    if !parser.remaining().is_empty() {
        usage_and_exit(USAGE);
    }

    let mut ctl = creds.login().await?;
    ctl.set_confirmer(move |prompt: &str| assume_yes || ask(prompt));

    match ctl.cleanup_ghost_files().await? {
        Some(count) => println!(
            "{} ghost files cleaned, {} listed",
            count,
            ctl.session().files.len()
        ),
        None => println!("Cancelled"),
    }

    Ok(())
}
