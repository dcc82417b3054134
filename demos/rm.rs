//! Example: Delete a file
//!
//! Usage:
//!   cargo run --example rm -- --name VM_NAME --password PASSWORD [--yes] <FILENAME>

mod cli;

use cli::{ask, credentials_from_parser, init_tracing, usage_and_exit, ArgParser};

const USAGE: &str =
    "Usage: cargo run --example rm -- --name VM_NAME --password PASSWORD [--yes] <FILENAME>";

#[tokio::main]
async fn main() -> nickcloud::Result<()> {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let creds = credentials_from_parser(&mut parser);
    let assume_yes = parser.take_flag(&["--yes", "-y"]);
    let positionals = parser.remaining();
    if positionals.len() != 1 {
        usage_and_exit(USAGE);
    }
    let filename = &positionals[0];

    let mut ctl = creds.login().await?;
    if assume_yes {
        ctl.set_confirmer(|_: &str| true);
    } else {
        ctl.set_confirmer(|prompt: &str| ask(prompt));
    }

    if ctl.delete_file(filename).await? {
        println!("Deleted {}", filename);
        println!("{} remaining", ctl.session().file_count_label());
    } else {
        println!("Cancelled");
    }

    Ok(())
}
