use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use pricegate::core::log::init_logging;
use pricegate::core::validator::{PriceAmountProposal, parse_timestamp};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn parse_now(value: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(value).ok_or_else(|| format!("invalid timestamp: {value}"))
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Validate a proposal from a file without contacting the Billing API
    Check {
        /// YAML file with currencies, history and proposal
        #[arg(short, long)]
        file: PathBuf,
        /// Validate as of this instant instead of the current time
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
    },
    /// List supported currencies
    Currencies,
    /// Show the amount history of a price
    Amounts {
        price_id: String,
        /// Derive statuses as of this instant instead of the current time
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
    },
    /// Append a new amount version to a price
    Add {
        price_id: String,
        #[arg(long)]
        currency: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        effective_from: String,
        /// Confirm that this creates a new version and does not edit history
        #[arg(short, long)]
        yes: bool,
        /// Validate as of this instant instead of the current time
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
    },
}

impl From<Commands> for pricegate::AppCommand {
    fn from(cmd: Commands) -> pricegate::AppCommand {
        match cmd {
            Commands::Setup => unreachable!("Setup command should be handled separately"),
            Commands::Check { file, now } => pricegate::AppCommand::Check { file, now },
            Commands::Currencies => pricegate::AppCommand::Currencies,
            Commands::Amounts { price_id, now } => pricegate::AppCommand::Amounts { price_id, now },
            Commands::Add {
                price_id,
                currency,
                amount,
                effective_from,
                yes,
                now,
            } => pricegate::AppCommand::Add {
                price_id,
                proposal: PriceAmountProposal {
                    currency,
                    amount,
                    effective_from,
                },
                confirmed: yes,
                now,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => pricegate::cli::setup::setup(),
        Some(cmd) => pricegate::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
