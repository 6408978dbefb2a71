// src/data.rs
//! Typed records produced by one listing fetch.
//!
//! A [`Fullname`] carries its [`Kind`] explicitly; the kind is resolved once
//! when the name is parsed off the wire and never re-derived from the string.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Author name the backend substitutes once an item is deleted.
pub const DELETED_AUTHOR: &str = "[deleted]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Post,
    Comment,
    Message,
}

impl Kind {
    /// Wire prefix ("t3", "t1", "t4").
    pub fn prefix(self) -> &'static str {
        match self {
            Kind::Comment => "t1",
            Kind::Post => "t3",
            Kind::Message => "t4",
        }
    }

    pub fn from_prefix(p: &str) -> Option<Self> {
        match p {
            "t1" => Some(Kind::Comment),
            "t3" => Some(Kind::Post),
            "t4" => Some(Kind::Message),
            _ => None,
        }
    }
}

/// Globally unique, stable identifier of one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fullname {
    kind: Kind,
    id: String,
}

impl Fullname {
    pub fn new(kind: Kind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Base36 id without the kind prefix.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Fullname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.id)
    }
}

impl FromStr for Fullname {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (prefix, id) = s
            .split_once('_')
            .ok_or_else(|| anyhow!("fullname without kind prefix: {s:?}"))?;
        let kind =
            Kind::from_prefix(prefix).ok_or_else(|| anyhow!("unsupported fullname kind: {s:?}"))?;
        if id.is_empty() {
            return Err(anyhow!("fullname with empty id: {s:?}"));
        }
        Ok(Self::new(kind, id))
    }
}

impl Serialize for Fullname {
    fn serialize<S: Serializer>(&self, ser: S) -> std::result::Result<S::Ok, S::Error> {
        ser.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fullname {
    fn deserialize<D: Deserializer<'de>>(de: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(de)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Common view over every record kind: identity plus creation time.
pub trait Item {
    fn fullname(&self) -> &Fullname;
    fn created_at(&self) -> DateTime<Utc>;
    fn author(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub name: Fullname,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub subreddit: String,
    pub title: String,
    pub selftext: String,
    pub url: Option<String>,
    pub permalink: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub name: Fullname,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub subreddit: String,
    pub body: String,
    pub link_id: Option<String>,
    pub parent_id: Option<String>,
    pub permalink: String,
}

/// Private message or inbox entry (comment/post reply, username mention).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub name: Fullname,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub dest: String,
    pub subject: String,
    pub body: String,
    pub was_comment: bool,
    pub context: Option<String>,
}

macro_rules! impl_item {
    ($($t:ty),*) => {$(
        impl Item for $t {
            fn fullname(&self) -> &Fullname {
                &self.name
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
            fn author(&self) -> &str {
                &self.author
            }
        }
    )*};
}

impl_item!(Post, Comment, Message);

/// One fetch's worth of typed results. Order inside each list is whatever
/// the backend returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Harvest {
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub messages: Vec<Message>,
}

impl Harvest {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.comments.is_empty() && self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.posts.len() + self.comments.len() + self.messages.len()
    }

    /// Iterate every record regardless of kind (posts, comments, messages).
    pub fn items(&self) -> impl Iterator<Item = &dyn Item> + '_ {
        let posts = self.posts.iter().map(|p| p as &dyn Item);
        let comments = self.comments.iter().map(|c| c as &dyn Item);
        let messages = self.messages.iter().map(|m| m as &dyn Item);
        posts.chain(comments).chain(messages)
    }

    /// Keep only the records whose fullname satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Fullname) -> bool) {
        self.posts.retain(|p| keep(&p.name));
        self.comments.retain(|c| keep(&c.name));
        self.messages.retain(|m| keep(&m.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullname_parses_and_renders() {
        let f: Fullname = "t3_abc12".parse().unwrap();
        assert_eq!(f.kind(), Kind::Post);
        assert_eq!(f.id(), "abc12");
        assert_eq!(f.to_string(), "t3_abc12");

        let m: Fullname = "t4_zz".parse().unwrap();
        assert_eq!(m.kind(), Kind::Message);
    }

    #[test]
    fn fullname_rejects_unknown_or_malformed() {
        assert!("t2_user".parse::<Fullname>().is_err());
        assert!("abc".parse::<Fullname>().is_err());
        assert!("t1_".parse::<Fullname>().is_err());
    }

    #[test]
    fn fullname_serde_uses_wire_form() {
        let f = Fullname::new(Kind::Comment, "x9");
        let s = serde_json::to_string(&f).unwrap();
        assert_eq!(s, r#""t1_x9""#);
        let back: Fullname = serde_json::from_str(&s).unwrap();
        assert_eq!(back, f);
    }
}
