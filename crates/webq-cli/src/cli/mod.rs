//! CLI for the webq request dispatcher.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use webq_core::config;
use webq_core::{Priority, Verb};

use commands::{run_batch, run_probe, run_send, SendArgs};

/// Top-level CLI for webq.
#[derive(Debug, Parser)]
#[command(name = "webq")]
#[command(about = "webq: prioritized outbound request dispatcher", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/webq/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VerbArg {
    Get,
    Delete,
    Post,
    Put,
}

impl From<VerbArg> for Verb {
    fn from(v: VerbArg) -> Self {
        match v {
            VerbArg::Get => Verb::Get,
            VerbArg::Delete => Verb::Delete,
            VerbArg::Post => Verb::Post,
            VerbArg::Put => Verb::Put,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    High,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(p: PriorityArg) -> Self {
        match p {
            PriorityArg::High => Priority::High,
            PriorityArg::Low => Priority::Low,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send one request and print its lifecycle events.
    Send {
        verb: VerbArg,
        /// Base URL, or an alias from the [endpoints] config table.
        base: String,
        /// Endpoint name appended to the base.
        endpoint: String,
        /// String parameter, `key=value` (repeatable).
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        /// JSON-valued parameter, `key=<json>` (repeatable).
        #[arg(short = 'j', long = "json", value_name = "KEY=JSON")]
        json_params: Vec<String>,
        /// Request header, `Name: value` (repeatable).
        #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,
        #[arg(long, value_enum, default_value = "low")]
        priority: PriorityArg,
        /// Offline retries before giving up (negative counts as 0).
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        retries: i64,
        /// Request timeout in seconds, at least 1 (default from config).
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
        /// Skip the connectivity probe and assume the network is up.
        #[arg(long)]
        assume_online: bool,
    },

    /// Submit every request in a TOML file, in order, and print all events.
    Batch {
        /// Path to the batch file (`[[request]]` tables).
        path: PathBuf,
        /// Skip the connectivity probe and assume the network is up.
        #[arg(long)]
        assume_online: bool,
    },

    /// Run the configured connectivity probe.
    Probe,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::WebqConfig::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Send {
                verb,
                base,
                endpoint,
                params,
                json_params,
                headers,
                priority,
                retries,
                timeout,
                assume_online,
            } => {
                let args = SendArgs {
                    verb: verb.into(),
                    base,
                    endpoint,
                    params,
                    json_params,
                    headers,
                    priority: priority.into(),
                    retries,
                    timeout,
                };
                run_send(&cfg, args, assume_online).await?
            }
            CliCommand::Batch {
                path,
                assume_online,
            } => run_batch(&cfg, &path, assume_online).await?,
            CliCommand::Probe => run_probe(&cfg).await?,
        }

        Ok(())
    }
}
