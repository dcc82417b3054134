//! Example: Download a file
//!
//! Usage:
//!   cargo run --example download -- --name VM_NAME --password PASSWORD <FILENAME> [DEST_DIR]

mod cli;

use cli::{init_tracing, parse_credentials, usage_and_exit};

const USAGE: &str = "Usage: cargo run --example download -- --name VM_NAME --password PASSWORD <FILENAME> [DEST_DIR]";

#[tokio::main]
async fn main() -> nickcloud::Result<()> {
    init_tracing();
    let creds = parse_credentials(USAGE);
    let (filename, dest_dir) = match creds.positionals.as_slice() {
        [file] => (file.clone(), ".".to_string()),
        [file, dir] => (file.clone(), dir.clone()),
        _ => usage_and_exit(USAGE),
    };

    println!("Logging in...");
    let mut ctl = creds.login().await?;

    if !ctl.session().files.iter().any(|f| f.name == filename) {
        println!("Note: {} is not in the current listing", filename);
    }

    println!("Downloading {} to {}...", filename, dest_dir);
    let path = ctl.download(&filename, &dest_dir).await?;
    println!("Saved to {}", path.display());

    Ok(())
}
