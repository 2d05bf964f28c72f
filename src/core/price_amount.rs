//! Price amount history and derived display state

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// One immutable version of a price's amount in a single currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAmount {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub price_id: Option<String>,
    pub currency: String,
    pub amount: Decimal,
    pub effective_from: DateTime<Utc>,
    #[serde(default)]
    pub effective_to: Option<DateTime<Utc>>,
}

impl PriceAmount {
    pub fn is_currency(&self, code: &str) -> bool {
        self.currency.trim().eq_ignore_ascii_case(code.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmountStatus {
    Active,
    Scheduled,
    Expired,
    Unknown,
}

impl AmountStatus {
    pub fn at(amount: &PriceAmount, now: DateTime<Utc>) -> Self {
        if amount.effective_to.is_some_and(|to| to <= now) {
            return AmountStatus::Expired;
        }
        if amount.effective_from > now {
            return AmountStatus::Scheduled;
        }
        if amount.effective_to.is_none() {
            return AmountStatus::Active;
        }
        AmountStatus::Unknown
    }
}

impl Display for AmountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AmountStatus::Active => "Active",
                AmountStatus::Scheduled => "Scheduled",
                AmountStatus::Expired => "Expired",
                AmountStatus::Unknown => "Unknown",
            }
        )
    }
}

/// Latest `effective_from` among entries for `currency`, open or closed.
pub fn latest_effective_from(history: &[PriceAmount], currency: &str) -> Option<DateTime<Utc>> {
    history
        .iter()
        .filter(|a| a.is_currency(currency))
        .map(|a| a.effective_from)
        .max()
}

pub fn sorted_newest_first(history: &[PriceAmount]) -> Vec<PriceAmount> {
    let mut sorted = history.to_vec();
    sorted.sort_by(|a, b| b.effective_from.cmp(&a.effective_from));
    sorted
}

/// Counts active amounts per upper-cased currency code.
pub fn active_count_by_currency(
    history: &[PriceAmount],
    now: DateTime<Utc>,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for amount in history {
        if AmountStatus::at(amount, now) != AmountStatus::Active {
            continue;
        }
        *counts
            .entry(amount.currency.trim().to_uppercase())
            .or_insert(0) += 1;
    }
    counts
}

pub fn currencies_with_multiple_active(history: &[PriceAmount], now: DateTime<Utc>) -> Vec<String> {
    active_count_by_currency(history, now)
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(code, _)| code)
        .collect()
}

/// Request body for appending a new amount version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPriceAmount {
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub effective_from: DateTime<Utc>,
}

#[async_trait]
pub trait PriceAmountStore: Send + Sync {
    async fn list_amounts(&self, price_id: &str) -> Result<Vec<PriceAmount>>;
    async fn create_amount(&self, price_id: &str, amount: &NewPriceAmount) -> Result<PriceAmount>;
}
