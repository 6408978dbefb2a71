//! Listing monitor — binary entrypoint.
//! Loads config, seeds one monitor per watched target and logs every new item
//! until Ctrl-C.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use listing_monitor::{
    config, telemetry, Comment, CommentHandler, Engine, Handlers, LogAndContinue, Message,
    MessageHandler, Post, PostHandler, RedditClient,
};

/// Prints what arrives; stands in for a real bot.
struct LogHandler;

#[async_trait]
impl PostHandler for LogHandler {
    async fn post(&self, p: Post) -> Result<()> {
        tracing::info!(target: "bot", name = %p.name, sub = %p.subreddit, author = %p.author, "post: {}", p.title);
        Ok(())
    }
}

#[async_trait]
impl CommentHandler for LogHandler {
    async fn comment(&self, c: Comment) -> Result<()> {
        tracing::info!(target: "bot", name = %c.name, sub = %c.subreddit, author = %c.author, "comment");
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for LogHandler {
    async fn message(&self, m: Message) -> Result<()> {
        tracing::info!(target: "bot", name = %m.name, author = %m.author, "message: {}", m.subject);
        Ok(())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("listing_monitor=info,bot=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default().context("loading config")?;

    // Recorder first, so every counter from seeding on is captured.
    let snapshot = match cfg.metrics_addr {
        Some(addr) => {
            telemetry::install_prometheus_listener(addr)?;
            tracing::info!(%addr, "metrics exposed at /metrics");
            None
        }
        None => Some(telemetry::install_prometheus()?),
    };
    let client = Arc::new(RedditClient::from_url(
        &cfg.base_url,
        &cfg.user_agent,
        cfg.access_token.clone(),
    )?);

    let engine = Engine::from_config(
        &cfg,
        client.clone(),
        client,
        Handlers::all(Arc::new(LogHandler)),
        Arc::new(LogAndContinue),
    )
    .await
    .context("seeding monitors")?;

    if engine.targets().next().is_none() {
        tracing::warn!("nothing to watch; configure [watch] in config/monitor.toml");
        return Ok(());
    }

    let (mut task, stop) = engine.spawn();
    tokio::select! {
        res = &mut task => return res.context("engine task")?,
        res = tokio::signal::ctrl_c() => {
            res.context("listening for ctrl-c")?;
            let _ = stop.send(true);
        }
    }
    let res = task.await.context("engine task")?;
    if let Some(handle) = snapshot {
        tracing::info!("metrics at shutdown:\n{}", handle.render());
    }
    res
}
