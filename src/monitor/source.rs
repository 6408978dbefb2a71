// src/monitor/source.rs
use anyhow::Result;
use std::sync::Arc;

use crate::data::{Fullname, Harvest};

/// One remote listing call.
#[async_trait::async_trait]
pub trait ListingFetcher: Send + Sync {
    /// Fetch the listing at `path`, returning only items created strictly
    /// after `after`. `None` means "from the very latest".
    async fn fetch(&self, path: &str, after: Option<&Fullname>) -> Result<Harvest>;
}

/// Point lookup used by the tip health check.
#[async_trait::async_trait]
pub trait ExistenceProber: Send + Sync {
    /// `Ok(false)` when the item is gone or its author is the deleted
    /// sentinel. Transport errors are returned as errors, never as `false`.
    async fn exists(&self, name: &Fullname) -> Result<bool>;
}

pub type SharedFetcher = Arc<dyn ListingFetcher>;
pub type SharedProber = Arc<dyn ExistenceProber>;
