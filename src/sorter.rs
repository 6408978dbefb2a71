// src/sorter.rs
//! Pure merge of a harvest into one youngest-first fullname sequence.
//! No I/O, suitable for unit tests.

use crate::data::{Fullname, Harvest};

/// Merge posts, comments and messages ordered by `created_at` descending.
///
/// Ties keep their input position (posts, then comments, then messages, each
/// in fetch order), so calling this twice on the same harvest yields the same
/// sequence.
pub fn sort(harvest: &Harvest) -> Vec<Fullname> {
    let mut stamped: Vec<_> = harvest
        .items()
        .map(|it| (it.created_at(), it.fullname()))
        .collect();

    // `sort_by` is stable.
    stamped.sort_by(|a, b| b.0.cmp(&a.0));

    stamped.into_iter().map(|(_, name)| name.clone()).collect()
}
