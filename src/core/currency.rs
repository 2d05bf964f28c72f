//! Currency reference data and lookups

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places assumed when the reference data omits one.
pub const DEFAULT_MINOR_UNIT: u32 = 2;

// Largest scale a Decimal can carry.
const MAX_MINOR_UNIT: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub minor_unit: Option<u32>,
}

impl Currency {
    pub fn minor_unit(&self) -> u32 {
        self.minor_unit
            .unwrap_or(DEFAULT_MINOR_UNIT)
            .min(MAX_MINOR_UNIT)
    }

    /// Smallest representable increment, e.g. `0.01` for two decimal places.
    pub fn amount_step(&self) -> Decimal {
        Decimal::new(1, self.minor_unit())
    }
}

/// Finds a currency by code, ignoring case and surrounding whitespace.
pub fn resolve_currency<'a>(currencies: &'a [Currency], code: &str) -> Option<&'a Currency> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    currencies
        .iter()
        .find(|c| c.code.trim().eq_ignore_ascii_case(code))
}

/// Renders an amount rounded to the currency's minor unit.
///
/// Uses the symbol as a prefix when one is known, otherwise appends the code.
pub fn format_amount(amount: Decimal, currency: Option<&Currency>) -> String {
    let places = currency.map_or(DEFAULT_MINOR_UNIT, Currency::minor_unit);
    let rounded = amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{rounded:.prec$}", prec = places as usize);

    match currency {
        Some(Currency {
            symbol: Some(symbol),
            ..
        }) if !symbol.is_empty() => format!("{symbol}{text}"),
        Some(c) => format!("{text} {}", c.code.to_uppercase()),
        None => text,
    }
}

#[async_trait]
pub trait CurrencyProvider: Send + Sync {
    async fn list_currencies(&self) -> Result<Vec<Currency>>;
}
