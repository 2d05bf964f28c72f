pub mod billing_api;
pub mod caching;
pub mod util;

pub use billing_api::BillingApiClient;
pub use caching::{CachingCurrencyProvider, CachingPriceAmountStore};
