// tests/engine_loop.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use listing_monitor::config::{EngineConfig, WatchConfig};
use listing_monitor::{
    Engine, ExistenceProber, Flow, Fullname, Handlers, Harvest, Kind, ListingFetcher,
    LogAndContinue, Post, PostHandler, StopOnError, Target,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Each path serves an increasing post id per call; paths listed in
/// `failing` return an error instead.
#[derive(Default)]
struct Counter {
    calls: Mutex<HashMap<String, i64>>,
    failing: Mutex<Vec<String>>,
}

#[async_trait]
impl ListingFetcher for Counter {
    async fn fetch(&self, path: &str, _after: Option<&Fullname>) -> Result<Harvest> {
        if self.failing.lock().iter().any(|p| p == path) {
            return Err(anyhow!("{path} unavailable"));
        }
        let mut calls = self.calls.lock();
        let n = calls.entry(path.to_string()).or_insert(0);
        *n += 1;
        Ok(Harvest {
            posts: vec![Post {
                name: Fullname::new(Kind::Post, format!("{}{}", path.len(), n)),
                created_at: Utc.timestamp_opt(*n, 0).unwrap(),
                author: "a".into(),
                subreddit: "rust".into(),
                title: String::new(),
                selftext: String::new(),
                url: None,
                permalink: String::new(),
            }],
            ..Harvest::default()
        })
    }
}

struct AlwaysThere;

#[async_trait]
impl ExistenceProber for AlwaysThere {
    async fn exists(&self, _name: &Fullname) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Default)]
struct Collect(Mutex<Vec<String>>);

#[async_trait]
impl PostHandler for Collect {
    async fn post(&self, p: Post) -> Result<()> {
        self.0.lock().push(p.name.to_string());
        Ok(())
    }
}

fn engine(fetcher: Arc<Counter>, sink: Arc<Collect>) -> Engine {
    Engine::new(
        fetcher,
        Arc::new(AlwaysThere),
        Handlers::new().with_posts(sink),
        Duration::from_millis(10),
    )
}

#[tokio::test]
async fn steps_round_robin_and_deliver_only_new_items() {
    let fetcher = Arc::new(Counter::default());
    let sink = Arc::new(Collect::default());
    let mut e = engine(fetcher.clone(), sink.clone());

    let a = Target::Subreddits(vec!["rust".into()]);
    let b = Target::User("ferris".into());
    e.watch(a.clone()).await.unwrap();
    e.watch(b.clone()).await.unwrap();
    assert!(sink.0.lock().is_empty());

    let s1 = e.step().await.unwrap();
    let s2 = e.step().await.unwrap();
    assert_eq!(s1.target, a);
    assert_eq!(s2.target, b);
    assert_eq!(s1.outcome.unwrap(), 1);
    assert_eq!(s2.outcome.unwrap(), 1);
    assert_eq!(sink.0.lock().len(), 2);
}

#[tokio::test]
async fn unwatch_removes_monitor() {
    let fetcher = Arc::new(Counter::default());
    let sink = Arc::new(Collect::default());
    let mut e = engine(fetcher, sink);
    let a = Target::Inbox;
    e.watch(a.clone()).await.unwrap();

    assert!(e.unwatch(&a).is_some());
    assert!(e.unwatch(&a).is_none());
    assert!(e.step().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn stop_policy_ends_run_with_the_error() {
    let fetcher = Arc::new(Counter::default());
    let sink = Arc::new(Collect::default());
    let mut e = engine(fetcher.clone(), sink).with_policy(Arc::new(StopOnError));
    e.watch(Target::Mentions).await.unwrap();
    fetcher.failing.lock().push(Target::Mentions.path());

    let (task, _stop) = e.spawn();
    let err = task.await.unwrap().unwrap_err();
    assert!(format!("{err:#}").contains("/message/mentions unavailable"));
}

#[tokio::test(start_paused = true)]
async fn continue_policy_keeps_polling_until_shutdown() {
    let fetcher = Arc::new(Counter::default());
    let sink = Arc::new(Collect::default());
    let seen = Arc::new(Mutex::new(0usize));
    let seen_in_policy = seen.clone();
    let policy = move |_t: &Target, _e: &anyhow::Error| {
        *seen_in_policy.lock() += 1;
        Flow::Continue
    };

    let mut e = engine(fetcher.clone(), sink).with_policy(Arc::new(policy));
    e.watch(Target::Inbox).await.unwrap();
    fetcher.failing.lock().push(Target::Inbox.path());

    let (task, stop) = e.spawn();
    tokio::time::sleep(Duration::from_millis(55)).await;
    stop.send(true).unwrap();
    task.await.unwrap().unwrap();
    assert!(*seen.lock() >= 3);
}

fn inbox_and_mentions() -> EngineConfig {
    EngineConfig {
        watch: WatchConfig {
            inbox: true,
            mentions: true,
            ..WatchConfig::default()
        },
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn seeding_failure_is_skipped_under_continue_policy() {
    let fetcher = Arc::new(Counter::default());
    fetcher.failing.lock().push(Target::Inbox.path());

    let e = Engine::from_config(
        &inbox_and_mentions(),
        fetcher,
        Arc::new(AlwaysThere),
        Handlers::new(),
        Arc::new(LogAndContinue),
    )
    .await
    .unwrap();
    let targets: Vec<&Target> = e.targets().collect();
    assert_eq!(targets, vec![&Target::Mentions]);
}

#[tokio::test]
async fn seeding_failure_aborts_under_stop_policy() {
    let fetcher = Arc::new(Counter::default());
    fetcher.failing.lock().push(Target::Inbox.path());

    let err = Engine::from_config(
        &inbox_and_mentions(),
        fetcher,
        Arc::new(AlwaysThere),
        Handlers::new(),
        Arc::new(StopOnError),
    )
    .await
    .err()
    .unwrap();
    assert!(format!("{err:#}").contains("/message/inbox unavailable"));
}
