//! Upstream feed retrieval.
//!
//! Every feed is fetched in isolation: a timeout, transport error or bad
//! payload turns into an empty [`FeedResult`] with the cause reported, never
//! into an error for the caller.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use shared::models::FeedType;

use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::normalizer::{self, Normalized, ParsedFeedPayload};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Something that can hand over the raw JSON payload of a feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_payload(&self, feed: FeedType) -> Result<Value>;
}

/// Live INCOIS endpoints.
pub struct IncoisClient {
    client: reqwest::Client,
    config: Config,
}

impl IncoisClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build feed HTTP client")?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl FeedSource for IncoisClient {
    async fn fetch_payload(&self, feed: FeedType) -> Result<Value> {
        let url = self
            .config
            .feed_url(feed)
            .ok_or_else(|| anyhow!("no endpoint configured for {}", feed))?;
        let accept = match feed {
            FeedType::Rama => "application/json",
            _ => "application/json,text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        };

        log::debug!("Fetching {} from {}", feed, url);
        let body = self
            .client
            .get(url)
            .timeout(self.config.feed_timeout(feed))
            .header("Accept", accept)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .with_context(|| format!("Failed to request {}", url))?
            .error_for_status()
            .with_context(|| format!("{} answered with an error status", url))?
            .text()
            .await
            .with_context(|| format!("Failed to read {} response", feed))?;

        serde_json::from_str(&body).with_context(|| format!("{} response is not JSON", feed))
    }
}

/// Outcome of fetching and normalizing one feed.
#[derive(Clone, Debug)]
pub struct FeedResult {
    pub feed: FeedType,
    pub normalized: Normalized,
    /// Upstream payload, kept only for RAMA whose FeatureCollection is
    /// passed through to the dashboard.
    pub raw: Option<Value>,
    pub failure: Option<String>,
}

impl FeedResult {
    fn failed(feed: FeedType, cause: String) -> FeedResult {
        FeedResult {
            feed,
            normalized: Normalized {
                records: Vec::new(),
                raw_count: 0,
                excluded: 0,
            },
            raw: None,
            failure: Some(cause),
        }
    }
}

pub async fn fetch_feed(
    source: &dyn FeedSource,
    feed: FeedType,
    sink: &dyn DiagnosticSink,
) -> FeedResult {
    let payload = match source.fetch_payload(feed).await {
        Ok(payload) => payload,
        Err(e) => {
            let cause = format!("{:#}", e);
            sink.emit(Diagnostic::FeedFailed {
                feed,
                cause: cause.clone(),
            });
            return FeedResult::failed(feed, cause);
        }
    };

    let raw = (feed == FeedType::Rama).then(|| payload.clone());
    let parsed = ParsedFeedPayload::from_value(payload);
    let normalized = normalizer::normalize_payload(&parsed, feed, sink);
    sink.emit(Diagnostic::FeedFetched {
        feed,
        raw_count: normalized.raw_count,
        kept: normalized.records.len(),
    });

    FeedResult {
        feed,
        normalized,
        raw,
        failure: None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// Serves canned payloads; feeds without one fail.
    #[derive(Default)]
    pub struct StaticSource {
        payloads: HashMap<FeedType, Value>,
    }

    impl StaticSource {
        pub fn with(mut self, feed: FeedType, payload: Value) -> Self {
            self.payloads.insert(feed, payload);
            self
        }
    }

    #[async_trait]
    impl FeedSource for StaticSource {
        async fn fetch_payload(&self, feed: FeedType) -> Result<Value> {
            self.payloads
                .get(&feed)
                .cloned()
                .ok_or_else(|| anyhow!("{} is down", feed))
        }
    }
}
