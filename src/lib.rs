// src/lib.rs
// Public library surface for integration tests (and the bundled binary).

pub mod config;
pub mod data;
pub mod dispatch;
pub mod engine;
pub mod monitor;
pub mod reddit;
pub mod sorter;
pub mod target;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::data::{Comment, Fullname, Harvest, Item, Kind, Message, Post};
pub use crate::dispatch::{dispatch, CommentHandler, Handlers, MessageHandler, PostHandler};
pub use crate::engine::{Engine, FailurePolicy, Flow, LogAndContinue, StopOnError};
pub use crate::monitor::{ExistenceProber, ListingFetcher, Monitor, MonitorConfig, Tick, Tip};
pub use crate::reddit::RedditClient;
pub use crate::target::Target;
