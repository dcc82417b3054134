use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use nickcloud::{ClientConfig, Controller, FormId, MessageKind, UiEvent};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

pub fn usage_and_exit(usage: &str) -> ! {
    eprintln!("{usage}");
    process::exit(1);
}

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nickcloud=debug"));
    fmt().with_env_filter(filter).with_target(false).init();
}

pub struct ArgParser {
    args: Vec<String>,
    usage: &'static str,
}

impl ArgParser {
    pub fn new(usage: &'static str) -> Self {
        let args: Vec<String> = env::args().skip(1).collect();

        if args.iter().any(|a| a == "--help" || a == "-h") {
            println!("{usage}");
            process::exit(0);
        }

        Self { args, usage }
    }

    pub fn take_value(&mut self, names: &[&str]) -> Option<String> {
        let mut i = 0;
        while i < self.args.len() {
            if names.contains(&self.args[i].as_str()) {
                let value = self.args.get(i + 1).cloned();
                if value.is_none() {
                    usage_and_exit(self.usage);
                }
                self.args.drain(i..=i + 1);
                return value;
            }
            i += 1;
        }
        None
    }

    pub fn take_required(&mut self, names: &[&str]) -> String {
        self.take_value(names)
            .unwrap_or_else(|| usage_and_exit(self.usage))
    }

    #[allow(dead_code)]
    pub fn take_flag(&mut self, names: &[&str]) -> bool {
        match self.args.iter().position(|a| names.contains(&a.as_str())) {
            Some(i) => {
                self.args.remove(i);
                true
            }
            None => false,
        }
    }

    /// `--url` / `--proxy` layered over the `NICKCLOUD_*` environment.
    pub fn config(&mut self) -> ClientConfig {
        let mut config = match ClientConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Invalid environment: {}", e);
                process::exit(1);
            }
        };
        if let Some(url) = self.take_value(&["--url", "-u"]) {
            config = config.with_base_url(url);
        }
        if let Some(proxy) = self.take_value(&["--proxy"]) {
            config = config.with_proxy(proxy);
        }
        config
    }

    pub fn remaining(self) -> Vec<String> {
        self.args
    }
}

#[allow(dead_code)] // Some demos only need ArgParser/usage helpers.
pub struct Credentials {
    pub name: String,
    pub password: String,
    pub config: ClientConfig,
    pub positionals: Vec<String>,
}

#[allow(dead_code)]
pub fn parse_credentials(usage: &'static str) -> Credentials {
    let mut parser = ArgParser::new(usage);
    let mut credentials = credentials_from_parser(&mut parser);
    credentials.positionals = parser.remaining();
    credentials
}

#[allow(dead_code)]
pub fn credentials_from_parser(parser: &mut ArgParser) -> Credentials {
    let config = parser.config();
    let name = parser.take_required(&["--name", "-n"]);
    let password = parser.take_required(&["--password", "-p"]);

    Credentials {
        name,
        password,
        config,
        positionals: Vec::new(),
    }
}

impl Credentials {
    /// Connect and log in, opening the dashboard.
    #[allow(dead_code)]
    pub async fn login(&self) -> nickcloud::Result<Controller<nickcloud::ApiClient>> {
        let mut ctl = Controller::connect(self.config.clone())?;
        ctl.login(&self.name, &self.password).await?;
        Ok(ctl)
    }
}

/// Ask a yes/no question on stdin.
#[allow(dead_code)]
pub fn ask(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes")
}

/// Print inline form messages as they are published.
#[allow(dead_code)]
pub fn print_form_messages(mut rx: broadcast::Receiver<UiEvent>, only: FormId) {
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let UiEvent::FormMessage { form, kind, text } = event {
                if form != only || kind == MessageKind::Clear {
                    continue;
                }
                println!("[{:?}] {}", kind, text);
            }
        }
    });
}
