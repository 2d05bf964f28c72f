use super::ui;
use crate::core::currency::{Currency, format_amount, resolve_currency};
use crate::core::price_amount::{PriceAmount, latest_effective_from};
use crate::core::validator::{AcceptedPriceAmount, PriceAmountProposal, ValidationError, validate};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Offline validation input: reference data, history and one proposal.
#[derive(Debug, Deserialize)]
pub struct CheckInput {
    #[serde(default)]
    pub currencies: Vec<Currency>,
    #[serde(default)]
    pub history: Vec<PriceAmount>,
    pub proposal: PriceAmountProposal,
}

impl CheckInput {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read input file: {}", path.as_ref().display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse input file: {}", path.as_ref().display()))
    }
}

pub fn run<P: AsRef<Path>>(path: P, now: DateTime<Utc>) -> Result<()> {
    let input = CheckInput::load_from_path(path)?;
    debug!(
        currencies = input.currencies.len(),
        history = input.history.len(),
        "Loaded check input"
    );

    let outcome = validate(&input.proposal, &input.currencies, &input.history, now);
    println!(
        "{}",
        render_outcome(&outcome, &input.proposal, &input.currencies, &input.history)
    );

    match outcome {
        Ok(_) => {
            info!("Proposal accepted");
            Ok(())
        }
        Err(errors) => bail!("Proposal rejected with {} error(s)", errors.len()),
    }
}

/// Renders a validation outcome the way the add dialog reports it.
pub fn render_outcome(
    outcome: &Result<AcceptedPriceAmount, Vec<ValidationError>>,
    proposal: &PriceAmountProposal,
    currencies: &[Currency],
    history: &[PriceAmount],
) -> String {
    let mut lines = Vec::new();

    if let Some(latest) = latest_effective_from(history, &proposal.currency) {
        lines.push(ui::style_text(
            &format!(
                "Latest version starts on {}.",
                ui::format_timestamp(Some(latest))
            ),
            ui::StyleType::Subtle,
        ));
    }

    match outcome {
        Ok(accepted) => {
            let currency = resolve_currency(currencies, &accepted.currency);
            lines.push(ui::style_text(
                &format!(
                    "Accepted: {} {} effective from {}",
                    accepted.currency,
                    format_amount(accepted.amount, currency),
                    ui::format_timestamp(Some(accepted.effective_from))
                ),
                ui::StyleType::Success,
            ));
            if accepted.scheduled {
                lines.push(ui::style_text(
                    &format!(
                        "This price will activate on {}.",
                        ui::format_timestamp(Some(accepted.effective_from))
                    ),
                    ui::StyleType::Warning,
                ));
            }
        }
        Err(errors) => {
            lines.push(ui::style_text("Rejected:", ui::StyleType::Title));
            for error in errors {
                lines.push(ui::style_text(
                    &format!("  {} [{}]: {}", error.field().as_str(), error.code(), error),
                    ui::StyleType::Error,
                ));
            }
        }
    }

    lines.join("\n")
}
