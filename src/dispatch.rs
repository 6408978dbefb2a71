// src/dispatch.rs
//! Fan a harvest out to per-kind handlers.
//!
//! Every item runs in its own tokio task. `dispatch` waits for all of them;
//! nothing is cancelled when one fails. Handlers must therefore be safe to
//! run concurrently with themselves and with each other.

use anyhow::{anyhow, Result};
use metrics::counter;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::data::{Comment, Fullname, Harvest, Message, Post};

#[async_trait::async_trait]
pub trait PostHandler: Send + Sync {
    async fn post(&self, post: Post) -> Result<()>;
}

#[async_trait::async_trait]
pub trait CommentHandler: Send + Sync {
    async fn comment(&self, comment: Comment) -> Result<()>;
}

#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
    async fn message(&self, message: Message) -> Result<()>;
}

/// Optional handler per kind. Items of a kind without a handler are skipped.
#[derive(Clone, Default)]
pub struct Handlers {
    pub post: Option<Arc<dyn PostHandler>>,
    pub comment: Option<Arc<dyn CommentHandler>>,
    pub message: Option<Arc<dyn MessageHandler>>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(mut self, h: Arc<dyn PostHandler>) -> Self {
        self.post = Some(h);
        self
    }

    pub fn with_comments(mut self, h: Arc<dyn CommentHandler>) -> Self {
        self.comment = Some(h);
        self
    }

    pub fn with_messages(mut self, h: Arc<dyn MessageHandler>) -> Self {
        self.message = Some(h);
        self
    }

    /// Handler for every kind from one value implementing all three traits.
    pub fn all<H>(h: Arc<H>) -> Self
    where
        H: PostHandler + CommentHandler + MessageHandler + 'static,
    {
        let post: Arc<dyn PostHandler> = h.clone();
        let comment: Arc<dyn CommentHandler> = h.clone();
        let message: Arc<dyn MessageHandler> = h;
        Self {
            post: Some(post),
            comment: Some(comment),
            message: Some(message),
        }
    }
}

/// Deliver every item to its handler concurrently and wait for all of them.
///
/// When several handlers fail, the error returned is the one from the first
/// failing item in harvest order (posts, then comments, then messages, each
/// in list order). A panicking handler counts as a failure of its item.
pub async fn dispatch(harvest: Harvest, handlers: &Handlers) -> Result<()> {
    let Harvest {
        posts,
        comments,
        messages,
    } = harvest;

    let mut tasks: Vec<(Fullname, JoinHandle<Result<()>>)> = Vec::new();

    if let Some(h) = &handlers.post {
        for p in posts {
            let h = Arc::clone(h);
            tasks.push((p.name.clone(), tokio::spawn(async move { h.post(p).await })));
        }
    }
    if let Some(h) = &handlers.comment {
        for c in comments {
            let h = Arc::clone(h);
            tasks.push((
                c.name.clone(),
                tokio::spawn(async move { h.comment(c).await }),
            ));
        }
    }
    if let Some(h) = &handlers.message {
        for m in messages {
            let h = Arc::clone(h);
            tasks.push((
                m.name.clone(),
                tokio::spawn(async move { h.message(m).await }),
            ));
        }
    }

    let mut first_err: Option<anyhow::Error> = None;
    for (name, task) in tasks {
        let outcome = match task.await {
            Ok(r) => r,
            Err(join) => Err(anyhow!("handler for {name} panicked: {join}")),
        };
        if let Err(e) = outcome {
            counter!("dispatch_handler_errors_total").increment(1);
            tracing::warn!(target: "dispatch", item = %name, error = ?e, "handler failed");
            first_err.get_or_insert(e);
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Kind;
    use chrono::Utc;

    struct Boom;

    #[async_trait::async_trait]
    impl PostHandler for Boom {
        async fn post(&self, _post: Post) -> Result<()> {
            panic!("boom");
        }
    }

    #[tokio::test]
    async fn panicking_handler_is_reported_not_propagated() {
        let h = Harvest {
            posts: vec![Post {
                name: Fullname::new(Kind::Post, "p"),
                created_at: Utc::now(),
                author: "a".into(),
                subreddit: "s".into(),
                title: String::new(),
                selftext: String::new(),
                url: None,
                permalink: String::new(),
            }],
            ..Harvest::default()
        };
        let handlers = Handlers::new().with_posts(Arc::new(Boom));
        let err = dispatch(h, &handlers).await.unwrap_err();
        assert!(err.to_string().contains("t3_p"));
    }

    #[tokio::test]
    async fn empty_harvest_without_handlers_is_ok() {
        dispatch(Harvest::default(), &Handlers::new()).await.unwrap();
    }
}
