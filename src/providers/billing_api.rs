use crate::core::currency::{Currency, CurrencyProvider};
use crate::core::price_amount::{NewPriceAmount, PriceAmount, PriceAmountStore};
use crate::providers::util::with_retry;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

const RETRIES: usize = 3;
const RETRY_DELAY_MS: u64 = 500;

/// Every Billing API response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct LooseEnvelope {
    #[serde(default)]
    data: Value,
}

/// REST client for the admin side of the Billing API.
#[derive(Clone)]
pub struct BillingApiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl BillingApiClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("pricegate/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            client,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn get_data(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Requesting {}", url);

        let response = with_retry(
            || async { self.authorize(self.client.get(&url)).send().await },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .with_context(|| format!("Failed to send request to {url}"))?;

        let body = read_success_body(response, &url).await?;
        let envelope: LooseEnvelope = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse response from {url}. Response: '{body}'"))?;
        Ok(envelope.data)
    }
}

async fn read_success_body(response: Response, url: &str) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to get response text from {url}"))?;
    if !status.is_success() {
        return Err(anyhow!("Billing API returned {status} for {url}: {body}"));
    }
    Ok(body)
}

fn decode_list<T: DeserializeOwned>(value: Value, what: &str) -> Result<Vec<T>> {
    serde_json::from_value(value).with_context(|| format!("Failed to decode {what}"))
}

/// The amounts endpoint has answered with a bare list as well as with a
/// list nested under `amounts` or `price_amounts`.
fn extract_amounts(data: Value) -> Result<Vec<PriceAmount>> {
    match data {
        Value::Array(_) => decode_list(data, "price amounts"),
        Value::Object(mut map) => {
            let list = map
                .remove("amounts")
                .filter(Value::is_array)
                .or_else(|| map.remove("price_amounts").filter(Value::is_array));
            match list {
                Some(list) => decode_list(list, "price amounts"),
                None => Ok(Vec::new()),
            }
        }
        _ => Ok(Vec::new()),
    }
}

#[async_trait]
impl CurrencyProvider for BillingApiClient {
    #[instrument(name = "ListCurrencies", skip(self))]
    async fn list_currencies(&self) -> Result<Vec<Currency>> {
        let data = self.get_data("/currencies").await?;
        if !data.is_array() {
            warn!("Currency list response carried no array, treating as empty");
            return Ok(Vec::new());
        }
        let currencies: Vec<Currency> = decode_list(data, "currencies")?;
        debug!("Fetched {} currencies", currencies.len());
        Ok(currencies)
    }
}

#[async_trait]
impl PriceAmountStore for BillingApiClient {
    #[instrument(name = "ListPriceAmounts", skip(self), fields(price_id = %price_id))]
    async fn list_amounts(&self, price_id: &str) -> Result<Vec<PriceAmount>> {
        let data = self.get_data(&format!("/prices/{price_id}/amounts")).await?;
        let amounts = extract_amounts(data)
            .with_context(|| format!("Failed to read amounts for price {price_id}"))?;
        debug!("Fetched {} price amounts", amounts.len());
        Ok(amounts)
    }

    #[instrument(name = "CreatePriceAmount", skip(self, amount), fields(price_id = %price_id))]
    async fn create_amount(&self, price_id: &str, amount: &NewPriceAmount) -> Result<PriceAmount> {
        let url = format!("{}/prices/{}/amounts", self.base_url, price_id);
        debug!("Posting new price amount to {}", url);

        // Not retried: a create that reached the server must not be repeated.
        let response = self
            .authorize(self.client.post(&url).json(amount))
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;

        let body = read_success_body(response, &url).await?;
        let envelope: Envelope<PriceAmount> = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse response from {url}. Response: '{body}'"))?;
        Ok(envelope.data)
    }
}
