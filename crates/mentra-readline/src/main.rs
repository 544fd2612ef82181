use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mentra_core::builtin;
use mentra_core::config::ShellConfig;
use mentra_core::phone;
use mentra_core::result::OutputKind;
use mentra_core::{Shell, ShellReply, ShellServices};
use mentra_infrastructure::{
    ConfigService, MentraPaths, SimulatedCarrier, SimulatedDevice, SimulatedDeviceInfo,
    SimulatedMessageStore, TomlContactAliasRepository, TomlContactDirectory,
};

#[derive(Parser)]
#[command(name = "mentra")]
#[command(about = "Mentra - a conversational shell for calls, texts and service codes", long_about = None)]
struct Cli {
    /// Directory holding config.toml, aliases.toml and contacts.toml
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Number of simulated SIM cards
    #[arg(long, default_value_t = 2)]
    sims: usize,

    /// Run these lines and exit instead of starting the REPL
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,

    /// Write a default config and sample contacts, then exit
    #[arg(long)]
    init_config: bool,
}

/// Rustyline helper with completion and hints over the built-in words.
struct ShellHelper {
    words: Vec<&'static str>,
}

impl ShellHelper {
    fn new() -> Self {
        Self {
            words: builtin::completion_words(),
        }
    }
}

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        // Only the first word is completed.
        if line.contains(' ') {
            return Ok((0, vec![]));
        }
        let candidates = self
            .words
            .iter()
            .filter(|w| w.starts_with(line))
            .map(|w| Pair {
                display: w.to_string(),
                replacement: w.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let first = line.split_whitespace().next().unwrap_or("");
        if phone::is_service_code(line) {
            Owned(line.bright_yellow().to_string())
        } else if !first.is_empty() && self.words.contains(&first) {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.len() < 2 || line.contains(' ') {
            return None;
        }
        self.words
            .iter()
            .find(|w| w.starts_with(line) && w.len() > line.len())
            .map(|w| w[line.len()..].to_string())
    }
}

impl Validator for ShellHelper {}

fn init_tracing(config: &ShellConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_shell(paths: &MentraPaths, config: &ShellConfig, sims: usize) -> Shell {
    let services = ShellServices {
        carrier: Arc::new(SimulatedCarrier::new(sims)),
        contacts: Arc::new(TomlContactDirectory::new(paths.contacts_file())),
        aliases: Arc::new(TomlContactAliasRepository::new(paths.aliases_file())),
        messages: Arc::new(SimulatedMessageStore::seeded()),
        device: Arc::new(SimulatedDevice::new()),
        info: Arc::new(SimulatedDeviceInfo),
    };
    Shell::new(services, config)
}

fn init_config(paths: &MentraPaths, service: &ConfigService) -> Result<()> {
    std::fs::create_dir_all(paths.config_dir())?;
    if service.write_defaults()? {
        println!("Wrote {}", paths.config_file().display());
    } else {
        println!("Kept existing {}", paths.config_file().display());
    }
    if paths.contacts_file().exists() {
        println!("Kept existing {}", paths.contacts_file().display());
    } else {
        TomlContactDirectory::new(paths.contacts_file())
            .save_contacts(TomlContactDirectory::sample_contacts())?;
        println!("Wrote {}", paths.contacts_file().display());
    }
    Ok(())
}

fn print_reply(reply: &ShellReply) {
    if reply.clear_screen {
        print!("\x1B[2J\x1B[1;1H");
    }
    for output in &reply.outputs {
        for line in output.text.lines() {
            let styled = match output.kind {
                OutputKind::Success => line.green(),
                OutputKind::Error => line.red(),
                OutputKind::Warning => line.yellow(),
                OutputKind::Info => line.normal(),
                OutputKind::Prompt => line.cyan(),
                OutputKind::Command => line.bright_black(),
            };
            println!("{}", styled);
        }
    }
}

/// Runs one line, cancelling a pending carrier request on Ctrl-C.
async fn submit(shell: &mut Shell, line: &str) -> ShellReply {
    let canceller = shell.canceller();
    let pending = shell.submit(line);
    tokio::pin!(pending);
    loop {
        tokio::select! {
            reply = &mut pending => return reply,
            _ = tokio::signal::ctrl_c() => {
                if canceller.cancel() {
                    debug!("Cancelled in-flight service code");
                } else {
                    println!("{}", "Nothing to cancel, waiting for the current command.".yellow());
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = MentraPaths::new(cli.config_dir)?;
    let config_service = ConfigService::new(paths.config_file());
    if cli.init_config {
        return init_config(&paths, &config_service);
    }

    let config = config_service.get_config();
    init_tracing(&config);
    info!(config_dir = %paths.config_dir().display(), sims = cli.sims, "Starting shell");

    let mut shell = build_shell(&paths, &config, cli.sims);

    if !cli.commands.is_empty() {
        for line in &cli.commands {
            let reply = submit(&mut shell, line).await;
            print_reply(&reply);
        }
        return Ok(());
    }

    let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ShellHelper::new()));

    println!("{}", "=== Mentra ===".bright_magenta().bold());
    println!(
        "{}",
        "Type 'help' for commands, 'call', 'text' or a service code like *144#, 'quit' to exit."
            .bright_black()
    );
    println!();

    loop {
        let prompt = shell.prompt().to_string();
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if matches!(trimmed, "quit" | "exit") && !shell.is_in_conversation().await {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                let _ = rl.add_history_entry(trimmed);

                let reply = submit(&mut shell, trimmed).await;
                print_reply(&reply);
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                if shell.is_in_conversation().await {
                    shell.reset_conversations().await;
                    println!("{}", "Cancelled.".yellow());
                } else {
                    println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                }
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
