//! Pre-submission gate for appending a new price amount version.
//!
//! Validation is pure: the caller supplies the currency reference set, the
//! existing history for the price and the instant to validate against. The
//! Billing API remains the authority; this only stops obviously conflicting
//! proposals before they are sent.

use super::currency::{Currency, resolve_currency};
use super::price_amount::{NewPriceAmount, PriceAmount, latest_effective_from};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Operator input exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAmountProposal {
    #[serde(default)]
    pub currency: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: String,
    #[serde(default)]
    pub effective_from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedPriceAmount {
    pub currency: String,
    pub amount: Decimal,
    pub effective_from: DateTime<Utc>,
    /// True when the amount only takes effect after the validation instant.
    pub scheduled: bool,
}

impl AcceptedPriceAmount {
    pub fn to_request(&self) -> NewPriceAmount {
        NewPriceAmount {
            currency: self.currency.clone(),
            amount: self.amount,
            effective_from: self.effective_from,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Currency,
    Amount,
    EffectiveFrom,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Currency => "currency",
            Field::Amount => "amount",
            Field::EffectiveFrom => "effective_from",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Currency is required.")]
    CurrencyRequired,
    #[error("Currency {0} is not a supported currency.")]
    CurrencyUnknown(String),
    #[error("Amount is required.")]
    AmountRequired,
    #[error("Amount must be greater than zero.")]
    AmountNotPositive,
    #[error("Amount allows at most {0} decimal places.")]
    AmountExceedsPrecision(u32),
    #[error("Effective from is required.")]
    EffectiveFromRequired,
    #[error("Effective from must be now or later.")]
    EffectiveFromInPast,
    #[error(
        "Effective from must be after {} to avoid overlap.",
        .0.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    )]
    EffectiveFromOverlapsExisting(DateTime<Utc>),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::CurrencyRequired => "currency-required",
            ValidationError::CurrencyUnknown(_) => "currency-unknown",
            ValidationError::AmountRequired => "amount-required",
            ValidationError::AmountNotPositive => "amount-not-positive",
            ValidationError::AmountExceedsPrecision(_) => "amount-exceeds-precision",
            ValidationError::EffectiveFromRequired => "effective-from-required",
            ValidationError::EffectiveFromInPast => "effective-from-in-past",
            ValidationError::EffectiveFromOverlapsExisting(_) => "effective-from-overlaps-existing",
        }
    }

    pub fn field(&self) -> Field {
        match self {
            ValidationError::CurrencyRequired | ValidationError::CurrencyUnknown(_) => {
                Field::Currency
            }
            ValidationError::AmountRequired
            | ValidationError::AmountNotPositive
            | ValidationError::AmountExceedsPrecision(_) => Field::Amount,
            ValidationError::EffectiveFromRequired
            | ValidationError::EffectiveFromInPast
            | ValidationError::EffectiveFromOverlapsExisting(_) => Field::EffectiveFrom,
        }
    }
}

/// Decides whether `proposal` may be appended to `history`.
///
/// Returns every field error at once, at most one per field, in the order
/// currency, amount, effective_from.
pub fn validate(
    proposal: &PriceAmountProposal,
    currencies: &[Currency],
    history: &[PriceAmount],
    now: DateTime<Utc>,
) -> Result<AcceptedPriceAmount, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let code = proposal.currency.trim();
    let currency = if code.is_empty() {
        errors.push(ValidationError::CurrencyRequired);
        None
    } else {
        let resolved = resolve_currency(currencies, code);
        if resolved.is_none() {
            errors.push(ValidationError::CurrencyUnknown(code.to_uppercase()));
        }
        resolved
    };

    let amount = match parse_amount(&proposal.amount) {
        None => {
            errors.push(ValidationError::AmountRequired);
            None
        }
        Some(value) if value <= Decimal::ZERO => {
            errors.push(ValidationError::AmountNotPositive);
            None
        }
        Some(value) => match currency {
            Some(c) if value.normalize().scale() > c.minor_unit() => {
                errors.push(ValidationError::AmountExceedsPrecision(c.minor_unit()));
                None
            }
            _ => Some(value),
        },
    };

    let effective_from = match parse_timestamp(&proposal.effective_from) {
        None => {
            errors.push(ValidationError::EffectiveFromRequired);
            None
        }
        Some(from) if from < now => {
            errors.push(ValidationError::EffectiveFromInPast);
            None
        }
        Some(from) => {
            let latest = currency.and_then(|c| latest_effective_from(history, &c.code));
            match latest {
                Some(latest) if from <= latest => {
                    errors.push(ValidationError::EffectiveFromOverlapsExisting(latest));
                    None
                }
                _ => Some(from),
            }
        }
    };

    match (currency, amount, effective_from) {
        (Some(currency), Some(amount), Some(effective_from)) if errors.is_empty() => {
            Ok(AcceptedPriceAmount {
                currency: currency.code.trim().to_uppercase(),
                amount,
                effective_from,
                scheduled: effective_from > now,
            })
        }
        _ => Err(errors),
    }
}

/// Parses a plain decimal amount; blank or non-numeric input yields `None`.
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let input = input.trim();
    if input.is_empty()
        || !input
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
    {
        return None;
    }
    Decimal::from_str(input).ok()
}

/// Parses RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS]` (as UTC) or a bare date
/// (midnight UTC).
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// YAML and JSON inputs may carry the amount as a bare number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn currencies() -> Vec<Currency> {
        vec![
            Currency {
                code: "USD".to_string(),
                name: "US Dollar".to_string(),
                symbol: Some("$".to_string()),
                minor_unit: Some(2),
            },
            Currency {
                code: "JPY".to_string(),
                name: "Yen".to_string(),
                symbol: Some("¥".to_string()),
                minor_unit: Some(0),
            },
        ]
    }

    fn existing(currency: &str, from: DateTime<Utc>) -> PriceAmount {
        PriceAmount {
            id: "pa_1".to_string(),
            price_id: Some("price_1".to_string()),
            currency: currency.to_string(),
            amount: Decimal::from(9),
            effective_from: from,
            effective_to: None,
        }
    }

    fn proposal(currency: &str, amount: &str, effective_from: &str) -> PriceAmountProposal {
        PriceAmountProposal {
            currency: currency.to_string(),
            amount: amount.to_string(),
            effective_from: effective_from.to_string(),
        }
    }

    fn codes(errors: &[ValidationError]) -> Vec<&'static str> {
        errors.iter().map(ValidationError::code).collect()
    }

    #[test]
    fn test_overlap_on_equal_effective_from() {
        let history = vec![existing("USD", ts(2024, 1, 1))];
        let result = validate(
            &proposal("USD", "10", "2024-01-01T00:00:00Z"),
            &currencies(),
            &history,
            ts(2023, 12, 1),
        );

        let errors = result.unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::EffectiveFromOverlapsExisting(ts(2024, 1, 1))]
        );
        assert!(errors[0].to_string().contains("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_accepts_after_latest_effective_from() {
        let history = vec![existing("USD", ts(2024, 1, 1))];
        let accepted = validate(
            &proposal("USD", "10", "2024-06-01T00:00:00Z"),
            &currencies(),
            &history,
            ts(2023, 12, 1),
        )
        .unwrap();

        assert_eq!(accepted.currency, "USD");
        assert_eq!(accepted.amount, Decimal::from(10));
        assert_eq!(accepted.effective_from, ts(2024, 6, 1));
        assert!(accepted.scheduled);
    }

    #[test]
    fn test_overlap_uses_latest_of_open_and_closed_entries() {
        let mut closed = existing("USD", ts(2024, 3, 1));
        closed.effective_to = Some(ts(2024, 4, 1));
        let history = vec![existing("USD", ts(2024, 1, 1)), closed];

        let result = validate(
            &proposal("USD", "10", "2024-02-01"),
            &currencies(),
            &history,
            ts(2023, 12, 1),
        );
        assert_eq!(
            result.unwrap_err(),
            vec![ValidationError::EffectiveFromOverlapsExisting(ts(2024, 3, 1))]
        );
    }

    #[test]
    fn test_history_in_other_currency_does_not_conflict() {
        let history = vec![existing("JPY", ts(2025, 1, 1))];
        let accepted = validate(
            &proposal("usd", "10.50", "2024-01-01"),
            &currencies(),
            &history,
            ts(2023, 12, 1),
        )
        .unwrap();
        assert_eq!(accepted.currency, "USD");
    }

    #[test]
    fn test_history_currency_match_ignores_case() {
        let history = vec![existing("usd", ts(2024, 1, 1))];
        let result = validate(
            &proposal("USD", "10", "2024-01-01"),
            &currencies(),
            &history,
            ts(2023, 12, 1),
        );
        assert_eq!(codes(&result.unwrap_err()), vec!["effective-from-overlaps-existing"]);
    }

    #[test]
    fn test_zero_and_negative_amounts_rejected() {
        let now = ts(2023, 12, 1);
        for amount in ["0", "0.00", "-5", "-0.01"] {
            let result = validate(
                &proposal("USD", amount, "2024-01-01"),
                &currencies(),
                &[],
                now,
            );
            assert_eq!(
                result.unwrap_err(),
                vec![ValidationError::AmountNotPositive],
                "amount {amount}"
            );
        }
    }

    #[test]
    fn test_missing_or_garbage_amount_is_required() {
        let now = ts(2023, 12, 1);
        for amount in ["", "   ", "ten", "1e3"] {
            let result = validate(
                &proposal("USD", amount, "2024-01-01"),
                &currencies(),
                &[],
                now,
            );
            assert_eq!(
                result.unwrap_err(),
                vec![ValidationError::AmountRequired],
                "amount {amount:?}"
            );
        }
    }

    #[test]
    fn test_amount_precision_follows_minor_unit() {
        let now = ts(2023, 12, 1);

        let result = validate(&proposal("JPY", "100.5", "2024-01-01"), &currencies(), &[], now);
        assert_eq!(result.unwrap_err(), vec![ValidationError::AmountExceedsPrecision(0)]);

        let result = validate(&proposal("USD", "1.005", "2024-01-01"), &currencies(), &[], now);
        assert_eq!(result.unwrap_err(), vec![ValidationError::AmountExceedsPrecision(2)]);

        // Trailing zeros do not count
        assert!(validate(&proposal("JPY", "100.00", "2024-01-01"), &currencies(), &[], now).is_ok());
    }

    #[test]
    fn test_effective_from_in_past_rejected_regardless_of_history() {
        let now = ts(2024, 1, 1);
        let one_second_early = "2023-12-31T23:59:59Z";

        let result = validate(&proposal("USD", "10", one_second_early), &currencies(), &[], now);
        assert_eq!(result.unwrap_err(), vec![ValidationError::EffectiveFromInPast]);

        let history = vec![existing("USD", ts(2025, 1, 1))];
        let result = validate(&proposal("USD", "10", one_second_early), &currencies(), &history, now);
        assert_eq!(result.unwrap_err(), vec![ValidationError::EffectiveFromInPast]);
    }

    #[test]
    fn test_effective_from_equal_to_now_accepted() {
        let now = ts(2024, 1, 1);
        let accepted =
            validate(&proposal("USD", "10", "2024-01-01T00:00:00Z"), &currencies(), &[], now)
                .unwrap();
        assert_eq!(accepted.effective_from, now);
        assert!(!accepted.scheduled);
    }

    #[test]
    fn test_no_history_accepts_any_future_date() {
        let now = ts(2023, 12, 1);
        for from in ["2023-12-01", "2024-01-01T10:30", "2030-06-15T12:00:00+02:00"] {
            assert!(
                validate(&proposal("USD", "1", from), &currencies(), &[], now).is_ok(),
                "effective_from {from}"
            );
        }
    }

    #[test]
    fn test_unparseable_effective_from_is_required() {
        let now = ts(2023, 12, 1);
        for from in ["", "tomorrow", "2024-13-01"] {
            let result = validate(&proposal("USD", "10", from), &currencies(), &[], now);
            assert_eq!(
                result.unwrap_err(),
                vec![ValidationError::EffectiveFromRequired],
                "effective_from {from:?}"
            );
        }
    }

    #[test]
    fn test_currency_required_and_unknown() {
        let now = ts(2023, 12, 1);

        let result = validate(&proposal("  ", "10", "2024-01-01"), &currencies(), &[], now);
        assert_eq!(result.unwrap_err(), vec![ValidationError::CurrencyRequired]);

        let result = validate(&proposal("eur", "10", "2024-01-01"), &currencies(), &[], now);
        assert_eq!(
            result.unwrap_err(),
            vec![ValidationError::CurrencyUnknown("EUR".to_string())]
        );
    }

    #[test]
    fn test_reports_every_field_in_order() {
        let result = validate(&PriceAmountProposal::default(), &currencies(), &[], ts(2023, 12, 1));
        let errors = result.unwrap_err();
        assert_eq!(
            codes(&errors),
            vec!["currency-required", "amount-required", "effective-from-required"]
        );
        let fields: Vec<_> = errors.iter().map(|e| e.field().as_str()).collect();
        assert_eq!(fields, vec!["currency", "amount", "effective_from"]);
    }

    #[test]
    fn test_overlap_skipped_without_valid_currency() {
        let history = vec![existing("USD", ts(2024, 1, 1))];
        let result = validate(&proposal("", "10", "2024-01-01"), &currencies(), &history, ts(2023, 12, 1));
        assert_eq!(codes(&result.unwrap_err()), vec!["currency-required"]);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let history = vec![existing("USD", ts(2024, 1, 1))];
        let input = proposal("USD", "10", "2024-01-01");
        let now = ts(2023, 12, 1);
        let first = validate(&input, &currencies(), &history, now);
        let second = validate(&input, &currencies(), &history, now);
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-01-01"), Some(ts(2024, 1, 1)));
        assert_eq!(parse_timestamp("2024-01-01T00:00"), Some(ts(2024, 1, 1)));
        assert_eq!(parse_timestamp("2024-01-01 00:00:00"), Some(ts(2024, 1, 1)));
        assert_eq!(parse_timestamp("2024-01-01T02:00:00+02:00"), Some(ts(2024, 1, 1)));
        assert_eq!(parse_timestamp("01/01/2024"), None);
    }

    #[test]
    fn test_proposal_accepts_numeric_amount_in_yaml() {
        let yaml = "currency: USD\namount: 10.5\neffective_from: 2024-01-01\n";
        let parsed: PriceAmountProposal = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.amount, "10.5");
        assert_eq!(parsed.effective_from, "2024-01-01");

        let yaml = "currency: USD\namount: 10\n";
        let parsed: PriceAmountProposal = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.amount, "10");
        assert!(parsed.effective_from.is_empty());
    }
}
