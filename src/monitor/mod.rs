//! # Incremental listing monitor
//! Turns a cursor-less, reverse-chronological listing into a stream of items
//! seen exactly once.
//!
//! Each [`Monitor`] owns a [`Tip`] (the watermark) and a blank counter. Every
//! call to [`Monitor::update`] is either a fetch of everything newer than the
//! tip front, or, after `blank_threshold` empty fetches in a row, a health
//! check that probes whether the tip front still exists and shaves it if not.
//!
//! State lives only in memory. After a restart the first fetch re-seeds the
//! tip, so items created while the process was down are not delivered.

pub mod source;
pub mod tip;

use anyhow::Result;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::data::{Fullname, Harvest};
use crate::sorter;
pub use source::{ExistenceProber, ListingFetcher, SharedFetcher, SharedProber};
pub use tip::Tip;

fn default_max_tip_size() -> usize {
    15
}
fn default_blank_threshold() -> u32 {
    3
}

/// Per-monitor tuning. Every monitor keeps its own copy so backoff state is
/// independent across watched resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Fullnames kept in the tip. Defaults to 15.
    #[serde(default = "default_max_tip_size")]
    pub max_tip_size: usize,
    /// Blank fetches tolerated before a health check. Defaults to 3.
    #[serde(default = "default_blank_threshold")]
    pub blank_threshold: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_tip_size: default_max_tip_size(),
            blank_threshold: default_blank_threshold(),
        }
    }
}

impl MonitorConfig {
    /// Clamp both knobs to at least 1.
    pub fn sanitized(self) -> Self {
        Self {
            max_tip_size: self.max_tip_size.max(1),
            blank_threshold: self.blank_threshold.max(1),
        }
    }
}

/// What the next `update()` will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Fetch,
    HealthCheck,
}

/// Why the next fetch only re-seeds the tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reseed {
    /// First fetch of a new monitor; existing items are history.
    Startup,
    /// The tip was shaved empty; anything on the page may already be delivered.
    Exhausted,
}

/// Result of one health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    /// Front still exists; the resource is just quiet.
    Live,
    /// Front was gone and has been shaved off.
    Shaved(Fullname),
}

pub struct Monitor {
    path: String,
    fetcher: SharedFetcher,
    prober: SharedProber,
    tip: Tip,
    blanks: u32,
    blank_threshold: u32,
    /// Last tick shaved the tip; a blank fetch right after halves the threshold.
    repaired: bool,
    /// The next fetch records names without delivering them.
    reseed: Option<Reseed>,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("path", &self.path)
            .field("tip", &self.tip)
            .field("blanks", &self.blanks)
            .field("blank_threshold", &self.blank_threshold)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Monitor with a "from latest" tip. Its first fetch is delivered as new;
    /// use [`Monitor::seed`] to skip what already exists.
    pub fn new(
        path: impl Into<String>,
        fetcher: SharedFetcher,
        prober: SharedProber,
        cfg: MonitorConfig,
    ) -> Self {
        let cfg = cfg.sanitized();
        Self {
            path: path.into(),
            fetcher,
            prober,
            tip: Tip::new(cfg.max_tip_size),
            blanks: 0,
            blank_threshold: cfg.blank_threshold,
            repaired: false,
            reseed: None,
        }
    }

    /// Build a monitor and seed its tip from one fetch, so items that already
    /// exist are never reported as new.
    pub async fn seed(
        path: impl Into<String>,
        fetcher: SharedFetcher,
        prober: SharedProber,
        cfg: MonitorConfig,
    ) -> Result<Self> {
        let mut m = Self::new(path, fetcher, prober, cfg);
        m.reseed = Some(Reseed::Startup);
        m.fetch().await?;
        Ok(m)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn tip(&self) -> &Tip {
        &self.tip
    }

    pub fn blanks(&self) -> u32 {
        self.blanks
    }

    pub fn blank_threshold(&self) -> u32 {
        self.blank_threshold
    }

    pub fn next_tick(&self) -> Tick {
        if self.blanks >= self.blank_threshold {
            Tick::HealthCheck
        } else {
            Tick::Fetch
        }
    }

    /// Advance one tick. Returns the newly observed items; a health check
    /// always returns an empty harvest. On error the monitor is unchanged.
    pub async fn update(&mut self) -> Result<Harvest> {
        match self.next_tick() {
            Tick::Fetch => self.fetch().await,
            Tick::HealthCheck => {
                self.health_check().await?;
                Ok(Harvest::default())
            }
        }
    }

    async fn fetch(&mut self) -> Result<Harvest> {
        counter!("monitor_fetch_total").increment(1);
        let mut harvest = self.fetcher.fetch(&self.path, self.tip.cursor()).await?;

        // The backend may hand back items we already hold, or list one item
        // twice on the same page. First occurrence wins.
        let tip = &self.tip;
        let mut seen: HashSet<Fullname> = HashSet::new();
        let fresh: Vec<Fullname> = sorter::sort(&harvest)
            .into_iter()
            .filter(|n| !tip.contains(n) && seen.insert(n.clone()))
            .collect();
        let mut kept: HashSet<Fullname> = HashSet::new();
        harvest.retain(|n| !tip.contains(n) && kept.insert(n.clone()));

        let repaired = std::mem::take(&mut self.repaired);

        if fresh.is_empty() {
            self.blanks = self.blanks.saturating_add(1);
            if repaired {
                self.blank_threshold = (self.blank_threshold / 2).max(1);
            }
            counter!("monitor_blank_total").increment(1);
            tracing::trace!(
                target: "monitor",
                path = %self.path,
                blanks = self.blanks,
                threshold = self.blank_threshold,
                "blank fetch"
            );
        } else {
            self.blanks = 0;
            tracing::debug!(
                target: "monitor",
                path = %self.path,
                new = fresh.len(),
                front = %fresh[0],
                seeding = self.reseed.is_some(),
                "tip advanced"
            );
            self.tip.prepend(fresh);
        }

        match self.reseed.take() {
            Some(Reseed::Exhausted) if !harvest.is_empty() => {
                tracing::warn!(
                    target: "monitor",
                    path = %self.path,
                    dropped = harvest.len(),
                    "tip was exhausted; page used to re-seed, items not delivered"
                );
                return Ok(Harvest::default());
            }
            Some(_) => return Ok(Harvest::default()),
            None => {}
        }
        counter!("monitor_new_items_total").increment(harvest.len() as u64);
        Ok(harvest)
    }

    async fn health_check(&mut self) -> Result<Health> {
        counter!("monitor_health_checks_total").increment(1);

        let alive = match self.tip.cursor() {
            Some(front) => self.prober.exists(front).await?,
            // Nothing to go stale when fetching from latest.
            None => true,
        };
        self.blanks = 0;

        if alive {
            self.blank_threshold = self.blank_threshold.saturating_mul(2);
            tracing::debug!(
                target: "monitor",
                path = %self.path,
                threshold = self.blank_threshold,
                "tip alive; backing off"
            );
            return Ok(Health::Live);
        }

        let Some(dead) = self.tip.shave() else {
            return Ok(Health::Live);
        };
        self.repaired = true;
        if self.tip.is_latest() {
            self.reseed = Some(Reseed::Exhausted);
        }
        counter!("monitor_tip_shaved_total").increment(1);
        tracing::info!(
            target: "monitor",
            path = %self.path,
            shaved = %dead,
            remaining = self.tip.len(),
            "tip front deleted; shaved"
        );
        Ok(Health::Shaved(dead))
    }
}
