//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod log;
pub mod price_amount;
pub mod validator;

// Re-export main types for cleaner imports
pub use currency::{Currency, CurrencyProvider};
pub use price_amount::{AmountStatus, NewPriceAmount, PriceAmount, PriceAmountStore};
pub use validator::{AcceptedPriceAmount, PriceAmountProposal, ValidationError, validate};
