pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::validator::PriceAmountProposal;
use crate::providers::{BillingApiClient, CachingCurrencyProvider, CachingPriceAmountStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Check {
        file: PathBuf,
        now: Option<DateTime<Utc>>,
    },
    Currencies,
    Amounts {
        price_id: String,
        now: Option<DateTime<Utc>>,
    },
    Add {
        price_id: String,
        proposal: PriceAmountProposal,
        confirmed: bool,
        now: Option<DateTime<Utc>>,
    },
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

type Backend = (
    CachingCurrencyProvider<BillingApiClient>,
    CachingPriceAmountStore<BillingApiClient>,
);

fn connect(config_path: Option<&str>) -> Result<Backend> {
    let config = load_config(config_path)?;
    let client = BillingApiClient::new(&config.api.base_url, config.api.api_key.as_deref())?;
    Ok((
        CachingCurrencyProvider::new(client.clone(), config.cache.currencies_ttl()),
        CachingPriceAmountStore::new(client, config.cache.amounts_ttl()),
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("pricegate starting...");

    match command {
        // Offline validation needs no configuration
        AppCommand::Check { file, now } => cli::check::run(file, now.unwrap_or_else(Utc::now)),
        AppCommand::Currencies => {
            let (currency_provider, _) = connect(config_path)?;
            cli::currencies::run(&currency_provider).await
        }
        AppCommand::Amounts { price_id, now } => {
            let (currency_provider, store) = connect(config_path)?;
            cli::amounts::run(
                &store,
                &currency_provider,
                &price_id,
                now.unwrap_or_else(Utc::now),
            )
            .await
        }
        AppCommand::Add {
            price_id,
            proposal,
            confirmed,
            now,
        } => {
            let (currency_provider, store) = connect(config_path)?;
            cli::add::run(
                &store,
                &currency_provider,
                &price_id,
                &proposal,
                confirmed,
                now.unwrap_or_else(Utc::now),
            )
            .await
        }
    }
}
