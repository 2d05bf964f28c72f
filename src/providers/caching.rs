use crate::core::cache::Cache;
use crate::core::currency::{Currency, CurrencyProvider};
use crate::core::price_amount::{NewPriceAmount, PriceAmount, PriceAmountStore};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const CURRENCIES_KEY: &str = "currencies";

// Caching for CurrencyProvider
pub struct CachingCurrencyProvider<T: CurrencyProvider> {
    inner: T,
    cache: Cache<String, Vec<Currency>>,
    ttl: Duration,
}

impl<T: CurrencyProvider> CachingCurrencyProvider<T> {
    pub fn new(inner: T, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::new(),
            ttl,
        }
    }
}

#[async_trait]
impl<T: CurrencyProvider> CurrencyProvider for CachingCurrencyProvider<T> {
    async fn list_currencies(&self) -> Result<Vec<Currency>> {
        let key = CURRENCIES_KEY.to_string();
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }
        let currencies = self.inner.list_currencies().await?;
        self.cache.put(key, currencies.clone(), Some(self.ttl)).await;
        Ok(currencies)
    }
}

// Caching for PriceAmountStore, keyed by price id
pub struct CachingPriceAmountStore<T: PriceAmountStore> {
    inner: T,
    cache: Cache<String, Vec<PriceAmount>>,
    ttl: Duration,
}

impl<T: PriceAmountStore> CachingPriceAmountStore<T> {
    pub fn new(inner: T, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::new(),
            ttl,
        }
    }
}

#[async_trait]
impl<T: PriceAmountStore> PriceAmountStore for CachingPriceAmountStore<T> {
    async fn list_amounts(&self, price_id: &str) -> Result<Vec<PriceAmount>> {
        let key = price_id.to_string();
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }
        let amounts = self.inner.list_amounts(price_id).await?;
        self.cache.put(key, amounts.clone(), Some(self.ttl)).await;
        Ok(amounts)
    }

    async fn create_amount(&self, price_id: &str, amount: &NewPriceAmount) -> Result<PriceAmount> {
        let created = self.inner.create_amount(price_id, amount).await?;
        debug!("Invalidating cached amounts for price {}", price_id);
        self.cache.remove(&price_id.to_string()).await;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MockBackend {
        calls: Arc<AtomicUsize>,
        amounts: Mutex<Vec<PriceAmount>>,
    }

    #[async_trait]
    impl CurrencyProvider for MockBackend {
        async fn list_currencies(&self) -> Result<Vec<Currency>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Currency {
                code: "USD".to_string(),
                name: "US Dollar".to_string(),
                symbol: None,
                minor_unit: None,
            }])
        }
    }

    #[async_trait]
    impl PriceAmountStore for MockBackend {
        async fn list_amounts(&self, price_id: &str) -> Result<Vec<PriceAmount>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if price_id == "missing" {
                return Err(anyhow!("Unknown price"));
            }
            Ok(self.amounts.lock().await.clone())
        }

        async fn create_amount(&self, price_id: &str, amount: &NewPriceAmount) -> Result<PriceAmount> {
            let created = PriceAmount {
                id: format!("pa_{}", self.amounts.lock().await.len() + 1),
                price_id: Some(price_id.to_string()),
                currency: amount.currency.clone(),
                amount: amount.amount,
                effective_from: amount.effective_from,
                effective_to: None,
            };
            self.amounts.lock().await.push(created.clone());
            Ok(created)
        }
    }

    #[tokio::test]
    async fn test_caching_currency_provider() {
        let backend = MockBackend::default();
        let calls = Arc::clone(&backend.calls);
        let provider = CachingCurrencyProvider::new(backend, Duration::from_secs(60));

        assert_eq!(provider.list_currencies().await.unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Second call is served from the cache
        assert_eq!(provider.list_currencies().await.unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_caching_store_invalidates_after_create() {
        let backend = MockBackend::default();
        let calls = Arc::clone(&backend.calls);
        let store = CachingPriceAmountStore::new(backend, Duration::from_secs(60));

        assert!(store.list_amounts("price_1").await.unwrap().is_empty());
        assert!(store.list_amounts("price_1").await.unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store
            .create_amount(
                "price_1",
                &NewPriceAmount {
                    currency: "USD".to_string(),
                    amount: Decimal::from(5),
                    effective_from: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                },
            )
            .await
            .unwrap();

        let amounts = store.list_amounts("price_1").await.unwrap();
        assert_eq!(amounts.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caching_store_does_not_cache_errors() {
        let backend = MockBackend::default();
        let calls = Arc::clone(&backend.calls);
        let store = CachingPriceAmountStore::new(backend, Duration::from_secs(60));

        assert!(store.list_amounts("missing").await.is_err());
        assert!(store.list_amounts("missing").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
