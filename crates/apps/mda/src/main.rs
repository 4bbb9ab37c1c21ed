//! mda - deliver one inbound message into a kvmail store
//!
//! Reads a raw RFC 5322 message from stdin (or a file), parses it, and
//! stores it in the recipient's mailbox under All and Inbox. Exit codes
//! follow sysexits so an MTA can tell a bounce from a retry.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use mailstore::{KvMailStore, MailError, MessageId, ParsedEmail, StoreConfig, deliver};

/// Addressee unknown
const EX_NOUSER: u8 = 67;
/// Temporary failure, the MTA should retry
const EX_TEMPFAIL: u8 = 75;

#[derive(Parser)]
#[command(name = "mda", version, about = "Deliver a message into a kvmail mailbox")]
struct Cli {
    /// Envelope recipient; selects the mailbox
    #[arg(short, long, env = "KVMAIL_RECIPIENT")]
    recipient: String,

    /// Store config file (defaults to ~/.config/kvmail/kvmail.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read the message from FILE instead of stdin
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(id) => {
            println!("{}", id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("[MDA] Delivery to {} failed: {:#}", cli.recipient, e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<MessageId> {
    if cli.config.is_none()
        && let Err(e) = config::init()
    {
        warn!("[MDA] Failed to initialize config directory: {}", e);
    }

    let store_config = StoreConfig::load(cli.config.as_deref())?;
    let store = KvMailStore::open(&store_config)
        .with_context(|| format!("Failed to open store at {:?}", store_config.data_dir))?;

    let raw = read_message(cli.input.as_ref())?;
    let parsed = ParsedEmail::parse(&raw)?;
    info!(
        "[MDA] Parsed message for {} ({} bytes, {} attachments)",
        cli.recipient,
        raw.len(),
        parsed.attachments.len()
    );

    let id = deliver(&store, &cli.recipient, parsed, raw.len() as u64)?;
    Ok(id)
}

fn read_message(input: Option<&PathBuf>) -> Result<Vec<u8>> {
    match input {
        Some(path) => std::fs::read(path).with_context(|| format!("Failed to read {:?}", path)),
        None => {
            let mut raw = Vec::new();
            std::io::stdin()
                .read_to_end(&mut raw)
                .context("Failed to read message from stdin")?;
            Ok(raw)
        }
    }
}

/// A recipient without a mailbox bounces; everything else is retried
fn exit_code(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<MailError>() {
        Some(MailError::MalformedAddress(_)) => EX_NOUSER,
        _ => EX_TEMPFAIL,
    }
}
