use super::ui;
use crate::core::currency::{Currency, CurrencyProvider, format_amount, resolve_currency};
use crate::core::price_amount::{
    AmountStatus, PriceAmount, PriceAmountStore, currencies_with_multiple_active,
    latest_effective_from, sorted_newest_first,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Table};
use std::collections::BTreeSet;
use tracing::warn;

/// History table, newest version first.
pub fn history_table(history: &[PriceAmount], currencies: &[Currency], now: DateTime<Utc>) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Amount"),
        ui::header_cell("Effective from"),
        ui::header_cell("Effective to"),
        ui::header_cell("Status"),
    ]);

    for amount in sorted_newest_first(history) {
        let currency = resolve_currency(currencies, &amount.currency);
        table.add_row(vec![
            Cell::new(amount.currency.to_uppercase()),
            ui::amount_cell(format_amount(amount.amount, currency)),
            Cell::new(ui::format_timestamp(Some(amount.effective_from))),
            Cell::new(ui::format_timestamp(amount.effective_to)),
            ui::status_cell(AmountStatus::at(&amount, now)),
        ]);
    }
    table
}

/// One line per currency naming where its latest version starts.
pub fn latest_by_currency(history: &[PriceAmount]) -> Vec<String> {
    let codes: BTreeSet<String> = history
        .iter()
        .map(|a| a.currency.trim().to_uppercase())
        .collect();
    codes
        .into_iter()
        .filter_map(|code| {
            latest_effective_from(history, &code).map(|latest| {
                format!(
                    "{code}: latest version starts on {}.",
                    ui::format_timestamp(Some(latest))
                )
            })
        })
        .collect()
}

pub fn render_history(
    price_id: &str,
    history: &[PriceAmount],
    currencies: &[Currency],
    now: DateTime<Utc>,
) -> String {
    if history.is_empty() {
        return format!("No amounts recorded for price {price_id}.");
    }

    let mut lines = vec![
        ui::style_text(&format!("Price {price_id}"), ui::StyleType::Title),
        history_table(history, currencies, now).to_string(),
    ];
    for line in latest_by_currency(history) {
        lines.push(ui::style_text(&line, ui::StyleType::Subtle));
    }

    let conflicting = currencies_with_multiple_active(history, now);
    if !conflicting.is_empty() {
        warn!(currencies = ?conflicting, "Multiple active amounts detected");
        lines.push(ui::style_text(
            &format!(
                "Multiple active amounts detected for {}. Only one active version should exist per currency.",
                conflicting.join(", ")
            ),
            ui::StyleType::Warning,
        ));
    }
    lines.join("\n")
}

pub async fn run(
    store: &dyn PriceAmountStore,
    currency_provider: &dyn CurrencyProvider,
    price_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching price amounts...");
    let result = futures::try_join!(
        store.list_amounts(price_id),
        currency_provider.list_currencies()
    );
    pb.finish_and_clear();
    let (history, currencies) = result?;

    println!("{}", render_history(price_id, &history, &currencies, now));
    Ok(())
}
