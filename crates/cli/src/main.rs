use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use vaultline_accounts::RandomNumberSource;
use vaultline_cli::{deliver_outbox, run_script};
use vaultline_infra::{InMemoryAccountStore, LedgerConfig, LogMailer, OutboxRelay, RelayConfig};
use vaultline_ledger::Ledger;

#[derive(Parser, Debug)]
#[command(name = "vaultline", version, about = "Replay ledger operations against an in-memory ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a JSON-lines script, one response per line on stdout
    Run {
        /// Script file ("-" for stdin)
        #[arg(short = 's', long = "script")]
        script: PathBuf,

        /// TOML config file (defaults plus VAULTLINE_* variables otherwise)
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,

        /// Deliver queued notifications through the log mailer
        #[arg(long = "relay")]
        relay: bool,

        /// Seed for account-number generation, for reproducible runs
        #[arg(long = "seed")]
        seed: Option<u64>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<LedgerConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Ok(LedgerConfig::from_toml_str(&raw)?)
        }
        None => Ok(LedgerConfig::from_env()?),
    }
}

fn open_script(path: &PathBuf) -> anyhow::Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("opening script {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn main() -> anyhow::Result<()> {
    vaultline_observability::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            script,
            config,
            relay,
            seed,
        } => {
            let config = load_config(config.as_ref())?;
            let store = InMemoryAccountStore::from_config(&config);
            let numbers = match seed {
                Some(seed) => RandomNumberSource::seeded(seed),
                None => RandomNumberSource::new(),
            };
            let relay_config = RelayConfig::from(&config);
            let mail_sender = config.mail_sender.clone();

            let handle = relay.then(|| {
                OutboxRelay::new(store.clone(), LogMailer::new(&mail_sender), relay_config.clone())
                    .spawn()
            });

            let ledger = Ledger::new(store.clone(), numbers, config);
            let input = open_script(&script)?;
            let stdout = io::stdout();
            let summary = run_script(&ledger, input, stdout.lock())?;
            tracing::info!(
                executed = summary.executed,
                failed = summary.failed,
                "run complete"
            );

            if relay {
                let report = deliver_outbox(handle, &store, LogMailer::new(&mail_sender), relay_config)?;
                let mut out = stdout.lock();
                serde_json::to_writer(&mut out, &serde_json::json!({ "relay": report }))?;
                out.write_all(b"\n")?;
            }
        }
    }

    Ok(())
}
