//! HTTP adapter for the streaming-availability proxy
//!
//! Request: `POST {endpoint}` with `{"ids": [603, 155], "country": "us"}`.
//! Response: `{"results": {"603": [{"service": {"name": "Netflix"},
//! "type": "subscription", "link": "...", "price": {...}}]}}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::LookupProvider;
use crate::availability::{AccessType, AvailabilityOption, LookupResult};
use crate::config::ProviderConfig;
use crate::error::ProviderError;

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    ids: &'a [u64],
    country: &'a str,
}

/// Only the envelope is strict; each id and option is decoded on its own
#[derive(Debug, Deserialize)]
struct LookupResponse {
    results: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOption {
    service: RawService,
    #[serde(rename = "type", alias = "streamingType")]
    kind: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    price: Option<RawPrice>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawService {
    Named { name: String },
    Plain(String),
}

impl RawService {
    fn into_name(self) -> String {
        match self {
            RawService::Named { name } => name,
            RawService::Plain(name) => name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    amount: RawAmount,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(serde_json::Number),
}

impl RawAmount {
    fn into_string(self) -> String {
        match self {
            RawAmount::Text(text) => text,
            RawAmount::Number(number) => number.to_string(),
        }
    }
}

/// Lookup provider backed by the availability proxy endpoint
#[derive(Debug, Clone)]
pub struct HttpLookupProvider {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpLookupProvider {
    /// Per-call timeouts are applied by the batch fetcher, so the client
    /// itself has none.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(concat!("streamscout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LookupProvider for HttpLookupProvider {
    async fn lookup_batch(
        &self,
        subject_ids: &[u64],
        region: &str,
    ) -> Result<HashMap<u64, LookupResult>, ProviderError> {
        let mut req = self.client.post(&self.endpoint).json(&LookupRequest {
            ids: subject_ids,
            country: region,
        });

        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else if e.is_connect() {
                ProviderError::Transport(format!("failed to connect: {}", e))
            } else {
                ProviderError::Transport(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::status(status.as_u16(), body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport(format!("failed to read body: {}", e)))?;

        parse_response(&body, subject_ids)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Normalize a proxy response body into lookup results
///
/// Only requested ids are returned. An id whose value is not a list is left
/// out, so it is retried like any other missing id. Options that do not
/// decode or carry an unknown access type are skipped, and repeated
/// `(provider, access type)` pairs collapse into the first occurrence.
pub fn parse_response(
    body: &[u8],
    requested: &[u64],
) -> Result<HashMap<u64, LookupResult>, ProviderError> {
    let response: LookupResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let requested: HashSet<u64> = requested.iter().copied().collect();
    let mut results = HashMap::with_capacity(response.results.len());

    for (raw_id, raw_options) in response.results {
        let Ok(subject_id) = raw_id.trim().parse::<u64>() else {
            tracing::debug!(id = %raw_id, "Ignoring non-numeric id in provider response");
            continue;
        };
        if !requested.contains(&subject_id) {
            continue;
        }
        let serde_json::Value::Array(raw_options) = raw_options else {
            tracing::warn!(
                subject_id = subject_id,
                "Provider answer is not a list, treating as missing"
            );
            continue;
        };
        results.insert(subject_id, normalize_options(subject_id, raw_options));
    }

    Ok(results)
}

fn normalize_options(subject_id: u64, raw_options: Vec<serde_json::Value>) -> LookupResult {
    let mut seen = HashSet::new();
    let mut options = Vec::with_capacity(raw_options.len());

    for value in raw_options {
        let raw: RawOption = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(subject_id = subject_id, error = %e, "Skipping undecodable option");
                continue;
            }
        };
        let Some(access_type) = AccessType::from_upstream(&raw.kind) else {
            tracing::debug!(kind = %raw.kind, "Skipping option with unknown access type");
            continue;
        };
        let provider = raw.service.into_name();
        if !seen.insert((provider.clone(), access_type)) {
            continue;
        }

        let mut option = AvailabilityOption::new(provider, access_type);
        if let Some(link) = raw.link.filter(|l| !l.is_empty()) {
            option = option.with_link(link);
        }
        if let Some(price) = raw.price {
            option = option.with_price(price.amount.into_string(), price.currency);
        }
        options.push(option);
    }

    LookupResult::new(options)
}
