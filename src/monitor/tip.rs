// src/monitor/tip.rs
use std::collections::VecDeque;

use crate::data::Fullname;

/// Resilient cursor: recently seen fullnames, youngest first.
///
/// More than one entry is kept so that a deleted front can be shaved off and
/// the next-most-recent name used instead. An empty tip is the "fetch from
/// latest" state; it still yields a usable cursor (`None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tip {
    names: VecDeque<Fullname>,
    max: usize,
}

impl Tip {
    /// `max` < 1 is treated as 1.
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            names: VecDeque::with_capacity(max),
            max,
        }
    }

    /// Reference for the next fetch.
    pub fn cursor(&self) -> Option<&Fullname> {
        self.names.front()
    }

    pub fn is_latest(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn contains(&self, name: &Fullname) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &Fullname> {
        self.names.iter()
    }

    /// Put `fresh` (already youngest first) in front and drop the oldest
    /// entries beyond the bound.
    pub fn prepend(&mut self, fresh: Vec<Fullname>) {
        for name in fresh.into_iter().rev() {
            self.names.push_front(name);
        }
        self.names.truncate(self.max);
    }

    /// Drop the front entry. Shaving the last one leaves the tip at "latest".
    pub fn shave(&mut self) -> Option<Fullname> {
        self.names.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Kind;

    fn names(ids: &[&str]) -> Vec<Fullname> {
        ids.iter().map(|id| Fullname::new(Kind::Post, *id)).collect()
    }

    fn ids(tip: &Tip) -> Vec<String> {
        tip.names().map(|f| f.id().to_string()).collect()
    }

    #[test]
    fn prepend_keeps_youngest_and_truncates() {
        let mut tip = Tip::new(3);
        tip.prepend(names(&["c", "d"]));
        tip.prepend(names(&["a", "b"]));
        assert_eq!(ids(&tip), vec!["a", "b", "c"]);
        assert_eq!(tip.cursor().unwrap().id(), "a");
    }

    #[test]
    fn shaving_last_entry_returns_to_latest() {
        let mut tip = Tip::new(5);
        tip.prepend(names(&["a"]));
        assert_eq!(tip.shave().unwrap().id(), "a");
        assert!(tip.is_latest());
        assert!(tip.cursor().is_none());
        assert!(tip.shave().is_none());
    }

    #[test]
    fn zero_bound_is_clamped() {
        let mut tip = Tip::new(0);
        tip.prepend(names(&["a", "b"]));
        assert_eq!(ids(&tip), vec!["a"]);
    }
}
