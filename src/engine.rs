//! # Engine
//! Drives every watched monitor from one loop.
//!
//! Monitors are updated one at a time, round-robin, with a fixed minimum gap
//! between updates shared by all of them so the aggregate request rate stays
//! under the backend's limit. Each update's harvest is handed to the
//! dispatcher before the next monitor runs. Errors from either step go to the
//! caller's [`FailurePolicy`], which decides whether the loop continues.

use anyhow::Result;
use metrics::gauge;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::EngineConfig;
use crate::dispatch::{dispatch, Handlers};
use crate::monitor::{Monitor, MonitorConfig, SharedFetcher, SharedProber};
use crate::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Decides what a failed update or dispatch means for the loop.
pub trait FailurePolicy: Send + Sync {
    fn on_error(&self, target: &Target, err: &anyhow::Error) -> Flow;
}

impl<F> FailurePolicy for F
where
    F: Fn(&Target, &anyhow::Error) -> Flow + Send + Sync,
{
    fn on_error(&self, target: &Target, err: &anyhow::Error) -> Flow {
        self(target, err)
    }
}

/// Log a warning and keep polling.
pub struct LogAndContinue;

impl FailurePolicy for LogAndContinue {
    fn on_error(&self, target: &Target, err: &anyhow::Error) -> Flow {
        tracing::warn!(target: "engine", watched = %target, "tick failed: {err:#}");
        Flow::Continue
    }
}

/// Stop the loop on the first error.
pub struct StopOnError;

impl FailurePolicy for StopOnError {
    fn on_error(&self, target: &Target, err: &anyhow::Error) -> Flow {
        tracing::error!(target: "engine", watched = %target, "stopping: {err:#}");
        Flow::Stop
    }
}

/// Outcome of one engine step.
#[derive(Debug)]
pub struct Step {
    pub target: Target,
    /// Items delivered to handlers, or the first error seen.
    pub outcome: Result<usize>,
}

pub struct Engine {
    watched: Vec<(Target, Monitor)>,
    next: usize,
    handlers: Handlers,
    interval: Duration,
    policy: Arc<dyn FailurePolicy>,
    fetcher: SharedFetcher,
    prober: SharedProber,
    monitor_cfg: MonitorConfig,
}

impl Engine {
    pub fn new(
        fetcher: SharedFetcher,
        prober: SharedProber,
        handlers: Handlers,
        interval: Duration,
    ) -> Self {
        Self {
            watched: Vec::new(),
            next: 0,
            handlers,
            interval,
            policy: Arc::new(LogAndContinue),
            fetcher,
            prober,
            monitor_cfg: MonitorConfig::default(),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn FailurePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_monitor_config(mut self, cfg: MonitorConfig) -> Self {
        self.monitor_cfg = cfg.sanitized();
        self
    }

    /// Build an engine and seed one monitor per configured target.
    ///
    /// A target that fails to seed goes to `policy`: [`Flow::Continue`] skips
    /// it, [`Flow::Stop`] aborts startup with that error.
    pub async fn from_config(
        cfg: &EngineConfig,
        fetcher: SharedFetcher,
        prober: SharedProber,
        handlers: Handlers,
        policy: Arc<dyn FailurePolicy>,
    ) -> Result<Self> {
        let mut engine = Self::new(fetcher, prober, handlers, cfg.interval())
            .with_monitor_config(cfg.monitor)
            .with_policy(policy);
        for target in cfg.watch.targets() {
            if let Err(e) = engine.watch(target.clone()).await {
                if engine.policy.on_error(&target, &e) == Flow::Stop {
                    return Err(e.context(format!("seeding monitor for {target}")));
                }
                tracing::warn!(target: "engine", watched = %target, "skipped; seeding failed");
            }
        }
        Ok(engine)
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.watched.iter().map(|(t, _)| t)
    }

    pub fn monitor(&self, target: &Target) -> Option<&Monitor> {
        self.watched
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, m)| m)
    }

    /// Seed a monitor for `target` with the engine's own fetcher and config.
    /// Watching a target twice replaces its monitor.
    pub async fn watch(&mut self, target: Target) -> Result<()> {
        let monitor = Monitor::seed(
            target.path(),
            self.fetcher.clone(),
            self.prober.clone(),
            self.monitor_cfg,
        )
        .await?;
        self.insert(target, monitor);
        Ok(())
    }

    /// Register an already built monitor.
    pub fn insert(&mut self, target: Target, monitor: Monitor) {
        tracing::info!(target: "engine", watched = %target, "watching");
        match self.watched.iter_mut().find(|(t, _)| *t == target) {
            Some(slot) => slot.1 = monitor,
            None => self.watched.push((target, monitor)),
        }
    }

    /// Drop the monitor for `target`, returning it if it was watched.
    pub fn unwatch(&mut self, target: &Target) -> Option<Monitor> {
        let idx = self.watched.iter().position(|(t, _)| t == target)?;
        let (_, monitor) = self.watched.remove(idx);
        if self.next > idx {
            self.next -= 1;
        }
        tracing::info!(target: "engine", watched = %target, "unwatched");
        Some(monitor)
    }

    /// Update the next monitor and dispatch what it found. `None` when
    /// nothing is watched.
    pub async fn step(&mut self) -> Option<Step> {
        if self.watched.is_empty() {
            return None;
        }
        if self.next >= self.watched.len() {
            self.next = 0;
        }
        let idx = self.next;
        self.next += 1;

        let (target, monitor) = &mut self.watched[idx];
        let outcome = match monitor.update().await {
            Ok(harvest) if harvest.is_empty() => Ok(0),
            Ok(harvest) => {
                let n = harvest.len();
                tracing::debug!(target: "engine", watched = %target, items = n, "dispatching");
                dispatch(harvest, &self.handlers).await.map(|()| n)
            }
            Err(e) => Err(e),
        };
        Some(Step {
            target: target.clone(),
            outcome,
        })
    }

    /// Tick until `shutdown` flips to `true` (or its sender is dropped), or
    /// the policy answers [`Flow::Stop`], in which case that error is returned.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(target: "engine", "shutdown requested");
                        return Ok(());
                    }
                    continue;
                }
            }

            let now = chrono::Utc::now().timestamp().max(0);
            gauge!("engine_last_tick_ts").set(now as f64);

            let Some(step) = self.step().await else {
                continue;
            };
            match step.outcome {
                Ok(0) => {}
                Ok(n) => {
                    tracing::info!(target: "engine", watched = %step.target, items = n, "delivered");
                }
                Err(e) => {
                    if self.policy.on_error(&step.target, &e) == Flow::Stop {
                        return Err(e.context(format!("engine stopped while polling {}", step.target)));
                    }
                }
            }
        }
    }

    /// Run on a background task. Send `true` on the returned sender to stop.
    pub fn spawn(self) -> (JoinHandle<Result<()>>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (tokio::spawn(self.run(rx)), tx)
    }
}
