use super::{amounts, check, ui};
use crate::core::currency::{CurrencyProvider, format_amount, resolve_currency};
use crate::core::price_amount::PriceAmountStore;
use crate::core::validator::{PriceAmountProposal, validate};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use tracing::info;

const VERSIONING_NOTICE: &str =
    "This will create a new price version. Existing invoices and past usage will NOT be affected.";

/// Validates a proposal against live data and appends it when accepted.
pub async fn run(
    store: &dyn PriceAmountStore,
    currency_provider: &dyn CurrencyProvider,
    price_id: &str,
    proposal: &PriceAmountProposal,
    confirmed: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    if price_id.trim().is_empty() {
        bail!("Missing price context.");
    }

    let pb = ui::new_spinner("Fetching price amounts...");
    let result = futures::try_join!(
        store.list_amounts(price_id),
        currency_provider.list_currencies()
    );
    pb.finish_and_clear();
    let (history, currencies) = result?;

    let outcome = validate(proposal, &currencies, &history, now);
    println!(
        "{}",
        check::render_outcome(&outcome, proposal, &currencies, &history)
    );
    let accepted = match outcome {
        Ok(accepted) => accepted,
        Err(errors) => bail!("Proposal rejected with {} error(s)", errors.len()),
    };

    println!("{}", ui::style_text(VERSIONING_NOTICE, ui::StyleType::Subtle));
    if !confirmed {
        bail!("Please confirm to continue (pass --yes).");
    }

    let created = store
        .create_amount(price_id, &accepted.to_request())
        .await
        .context("Unable to add price amount")?;
    info!(id = %created.id, price_id, "Created price amount");

    let currency = resolve_currency(&currencies, &created.currency);
    println!(
        "{}",
        ui::style_text(
            &format!(
                "Created price amount {}: {} effective from {}",
                created.id,
                format_amount(created.amount, currency),
                ui::format_timestamp(Some(created.effective_from))
            ),
            ui::StyleType::Success,
        )
    );

    let refreshed = store.list_amounts(price_id).await?;
    println!(
        "{}",
        amounts::render_history(price_id, &refreshed, &currencies, now)
    );
    Ok(())
}
