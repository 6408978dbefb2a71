// src/reddit/mod.rs
//! Reddit-backed [`ListingFetcher`] and [`ExistenceProber`].
//!
//! Reddit names its pagination relative to the listing, not to time: `before`
//! a fullname means "newer than it". That translation happens here and only
//! here; callers speak in "strictly after" terms.

pub mod parse;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;

use crate::data::{Fullname, Harvest, Item, Kind, DELETED_AUTHOR};
use crate::monitor::{ExistenceProber, ListingFetcher};

pub use parse::parse_listing;

pub const DEFAULT_BASE_URL: &str = "https://oauth.reddit.com";
const PAGE_LIMIT: &str = "100";

pub struct RedditClient {
    mode: Mode,
}

enum Mode {
    // Serves the same body to every request; used by tests and demos.
    Fixture(String),
    Http {
        client: reqwest::Client,
        base_url: String,
        token: Option<String>,
    },
}

/// Query pairs for one listing page newer than `after`.
pub fn listing_query(after: Option<&Fullname>) -> Vec<(&'static str, String)> {
    let mut q = vec![
        ("raw_json", "1".to_string()),
        ("limit", PAGE_LIMIT.to_string()),
    ];
    if let Some(name) = after {
        q.push(("before", name.to_string()));
    }
    q
}

/// Lookup path + query for a point lookup. Messages are not served by
/// `/api/info`, so they go through the message thread endpoint.
pub fn lookup_request(name: &Fullname) -> (String, Vec<(&'static str, String)>) {
    match name.kind() {
        Kind::Message => (
            format!("/message/messages/{}", name.id()),
            vec![("raw_json", "1".to_string())],
        ),
        Kind::Post | Kind::Comment => (
            "/api/info".to_string(),
            vec![("raw_json", "1".to_string()), ("id", name.to_string())],
        ),
    }
}

/// True when `harvest` holds `name` with a live author.
pub fn harvest_has_live(harvest: &Harvest, name: &Fullname) -> bool {
    harvest
        .items()
        .any(|it| it.fullname() == name && it.author() != DELETED_AUTHOR)
}

impl RedditClient {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_url(base_url: &str, user_agent: &str, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("building reddit http client")?;
        Ok(Self {
            mode: Mode::Http {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                token,
            },
        })
    }

    async fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<Harvest> {
        match &self.mode {
            Mode::Fixture(body) => parse_listing(body),
            Mode::Http {
                client,
                base_url,
                token,
            } => {
                let mut req = client.get(format!("{base_url}{path}")).query(query);
                if let Some(t) = token {
                    req = req.bearer_auth(t);
                }
                let rsp = match req.send().await {
                    Ok(rsp) => rsp,
                    Err(e) => {
                        tracing::warn!(target: "reddit", error = ?e, path, "reddit http error");
                        counter!("reddit_request_errors_total").increment(1);
                        return Err(e).with_context(|| format!("reddit GET {path}"));
                    }
                };
                let rsp = match rsp.error_for_status() {
                    Ok(rsp) => rsp,
                    Err(e) => {
                        counter!("reddit_request_errors_total").increment(1);
                        return Err(e).with_context(|| format!("reddit GET {path} non-2xx"));
                    }
                };
                let body = rsp.text().await.context("reddit .text()")?;
                parse_listing(&body).with_context(|| format!("reddit GET {path}"))
            }
        }
    }
}

#[async_trait]
impl ListingFetcher for RedditClient {
    async fn fetch(&self, path: &str, after: Option<&Fullname>) -> Result<Harvest> {
        self.get(path, &listing_query(after)).await
    }
}

#[async_trait]
impl ExistenceProber for RedditClient {
    async fn exists(&self, name: &Fullname) -> Result<bool> {
        let (path, query) = lookup_request(name);
        let harvest = self.get(&path, &query).await?;
        Ok(harvest_has_live(&harvest, name))
    }
}
