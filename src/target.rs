// src/target.rs
use std::fmt;

/// One watched resource. Each target gets its own monitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// New posts in one or more subreddits.
    Subreddits(Vec<String>),
    /// New comments in one or more subreddits.
    SubredditComments(Vec<String>),
    /// Posts and comments by one user.
    User(String),
    /// Everything landing in the bot's inbox.
    Inbox,
    /// Username mentions only.
    Mentions,
}

impl Target {
    /// Listing path relative to the API base.
    pub fn path(&self) -> String {
        match self {
            Target::Subreddits(subs) => format!("/r/{}/new", subs.join("+")),
            Target::SubredditComments(subs) => format!("/r/{}/comments", subs.join("+")),
            Target::User(name) => format!("/user/{name}"),
            Target::Inbox => "/message/inbox".to_string(),
            Target::Mentions => "/message/mentions".to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
