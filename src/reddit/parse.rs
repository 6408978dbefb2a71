// src/reddit/parse.rs
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::data::{Comment, Fullname, Harvest, Message, Post};

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: serde_json::Value,
}

/// Union of the fields we read from links, comments and messages.
#[derive(Debug, Deserialize)]
struct Raw {
    name: String,
    created_utc: f64,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    link_id: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    dest: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    was_comment: bool,
    #[serde(default)]
    context: Option<String>,
}

fn created(ts: f64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(ts.trunc() as i64, 0)
        .single()
        .ok_or_else(|| anyhow!("created_utc out of range: {ts}"))
}

fn into_post(r: Raw) -> Result<Post> {
    Ok(Post {
        name: r.name.parse()?,
        created_at: created(r.created_utc)?,
        author: r.author.unwrap_or_default(),
        subreddit: r.subreddit.unwrap_or_default(),
        title: r.title.unwrap_or_default(),
        selftext: r.selftext.unwrap_or_default(),
        url: r.url,
        permalink: r.permalink.unwrap_or_default(),
    })
}

fn into_comment(r: Raw) -> Result<Comment> {
    Ok(Comment {
        name: r.name.parse()?,
        created_at: created(r.created_utc)?,
        author: r.author.unwrap_or_default(),
        subreddit: r.subreddit.unwrap_or_default(),
        body: r.body.unwrap_or_default(),
        link_id: r.link_id,
        parent_id: r.parent_id,
        permalink: r.permalink.unwrap_or_default(),
    })
}

fn into_message(r: Raw) -> Result<Message> {
    let name: Fullname = r.name.parse()?;
    Ok(Message {
        name,
        created_at: created(r.created_utc)?,
        author: r.author.unwrap_or_default(),
        dest: r.dest.unwrap_or_default(),
        subject: r.subject.unwrap_or_default(),
        body: r.body.unwrap_or_default(),
        was_comment: r.was_comment,
        context: r.context,
    })
}

/// Parse a `Listing` body into a harvest.
///
/// Inbox entries arrive as `t1` with `was_comment: true`; they are messages
/// to the handlers even though their fullname is a comment's. Kinds we do not
/// track (accounts, subreddits, "more" stubs) are skipped.
pub fn parse_listing(body: &str) -> Result<Harvest> {
    let listing: Listing = serde_json::from_str(body).context("parsing reddit listing json")?;

    let mut h = Harvest::default();
    for thing in listing.data.children {
        let kind = thing.kind.as_str();
        if !matches!(kind, "t1" | "t3" | "t4") {
            tracing::trace!(target: "reddit", kind, "skipping listing child");
            continue;
        }
        let raw: Raw = serde_json::from_value(thing.data)
            .with_context(|| format!("parsing {kind} listing child"))?;
        match kind {
            "t3" => h.posts.push(into_post(raw)?),
            "t1" if !raw.was_comment => h.comments.push(into_comment(raw)?),
            _ => h.messages.push(into_message(raw)?),
        }
    }
    Ok(h)
}
