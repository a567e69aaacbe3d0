//! Onboarding directory HTTP client.
//!
//! Two endpoints: the paginated listing that feeds the skip-list builder,
//! and the per-identity detail consulted by the eligibility filter via
//! the `DetailSource` trait. Every response flows through the TTL cache;
//! a rate-limited response invalidates its exact cache key, backs off,
//! and replays the same request so an eventual success produces the same
//! page with no duplicate rows.

use crate::cache::FileCache;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use skd_reconcile::{DetailFetchError, DetailLookup, DetailSource};
use skd_schemas::{OnboardingDetail, OnboardingRecord};
use std::time::Duration;

pub struct OnboardingClient {
    http: reqwest::blocking::Client,
    base_url: String,
    page_limit: u64,
    cache: FileCache,
    rate_limit_backoff: Duration,
    max_fetch_attempts: u32,
}

impl OnboardingClient {
    pub fn new(
        base_url: impl Into<String>,
        page_limit: u64,
        cache: FileCache,
        http_timeout: Duration,
        rate_limit_backoff: Duration,
        max_fetch_attempts: u32,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(http_timeout)
            .build()
            .context("build onboarding http client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_limit,
            cache,
            rate_limit_backoff,
            max_fetch_attempts: max_fetch_attempts.max(1),
        })
    }

    /// Walk the directory listing page by page until an empty `data`
    /// array. Rows that fail to parse are logged and skipped; the
    /// directory is known to be buggy and one bad row must not sink the
    /// run.
    pub fn fetch_directory(&self) -> Result<Vec<OnboardingRecord>> {
        let mut records: Vec<OnboardingRecord> = Vec::new();
        let mut page: u64 = 0;

        loop {
            let offset = page * self.page_limit;
            let cache_key = format!(
                "validators_list_all_limit_{}_offset_{}",
                self.page_limit, offset
            );
            let url = format!(
                "{}/api/validators/list?search_term=&offset={}&limit={}&order_by=name&order=asc",
                self.base_url, offset, self.page_limit
            );

            let body = self.fetch_page(&url, &cache_key)?;
            let data = body
                .get("data")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if data.is_empty() {
                tracing::debug!(page, "last directory page reached");
                break;
            }

            tracing::debug!(page, rows = data.len(), "directory page fetched");
            for row in data {
                match serde_json::from_value::<OnboardingRecord>(row.clone()) {
                    Ok(record) => records.push(record),
                    Err(err) => {
                        tracing::warn!(%err, %row, "skipping unparseable directory row");
                    }
                }
            }
            page += 1;
        }

        Ok(records)
    }

    /// One listing page, replaying on rate limiting. A body without a
    /// `data` key is the directory's rate-limit tell: the cached copy is
    /// poison and must be dropped before the retry.
    fn fetch_page(&self, url: &str, cache_key: &str) -> Result<Value> {
        for attempt in 1..=self.max_fetch_attempts {
            let body = self.fetch_cached(url, cache_key)?;
            if body.get("data").is_some() {
                return Ok(body);
            }

            tracing::warn!(
                cache_key,
                attempt,
                max = self.max_fetch_attempts,
                %body,
                "directory page without data, assuming rate limit"
            );
            self.cache.invalidate(cache_key)?;
            if attempt < self.max_fetch_attempts {
                std::thread::sleep(self.rate_limit_backoff);
            }
        }
        bail!("directory page {url} still rate limited after {} attempts", self.max_fetch_attempts)
    }

    fn detail_inner(&self, identity: &str) -> Result<DetailLookup> {
        let cache_key = format!("testnet_identity_{identity}");
        let url = format!("{}/api/validators/{}", self.base_url, identity);

        for attempt in 1..=self.max_fetch_attempts {
            let body = self.fetch_cached(&url, &cache_key)?;

            if let Some(message) = body.get("message").and_then(Value::as_str) {
                // {"message": "Validator with public key \"X\" not found"}
                if message.contains(" not found") {
                    return Ok(DetailLookup::NotFound);
                }
                if message.contains("Rate limited") {
                    tracing::warn!(
                        identity,
                        attempt,
                        max = self.max_fetch_attempts,
                        "detail lookup rate limited"
                    );
                    self.cache.invalidate(&cache_key)?;
                    if attempt < self.max_fetch_attempts {
                        std::thread::sleep(self.rate_limit_backoff);
                    }
                    continue;
                }
                bail!("directory detail for {identity} returned message: {message}");
            }

            let detail: OnboardingDetail = serde_json::from_value(body)
                .with_context(|| format!("detail record for {identity} did not parse"))?;
            return Ok(DetailLookup::Found(detail));
        }
        bail!(
            "detail for {identity} still rate limited after {} attempts",
            self.max_fetch_attempts
        )
    }

    /// Cache-through GET of a JSON body.
    fn fetch_cached(&self, url: &str, cache_key: &str) -> Result<Value> {
        if let Some(hit) = self.cache.get(cache_key) {
            tracing::debug!(cache_key, "cache hit");
            return Ok(hit);
        }

        let body: Value = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("GET {url}"))?
            .json()
            .with_context(|| format!("decode body of {url}"))?;
        self.cache.put(cache_key, &body)?;
        Ok(body)
    }
}

impl DetailSource for OnboardingClient {
    fn detail(&self, identity: &str) -> Result<DetailLookup, DetailFetchError> {
        self.detail_inner(identity)
            .map_err(|err| DetailFetchError(format!("{err:#}")))
    }
}
