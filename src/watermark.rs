//! Per-source "last seen" timestamps. In memory only; a fresh store starts
//! every source at the moment it was created so history is never replayed.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct WatermarkStore {
    origin: DateTime<Utc>,
    marks: HashMap<String, DateTime<Utc>>,
}

impl WatermarkStore {
    /// Every listed source starts at `now`.
    pub fn new<I, S>(sources: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let marks = sources.into_iter().map(|s| (s.into(), now)).collect();
        Self { origin: now, marks }
    }

    /// Unknown sources report the store's creation time.
    pub fn get(&self, source: &str) -> DateTime<Utc> {
        self.marks.get(source).copied().unwrap_or(self.origin)
    }

    /// Move the mark forward to `candidate`. Never moves it back.
    /// Returns true when the stored value changed.
    pub fn advance(&mut self, source: &str, candidate: DateTime<Utc>) -> bool {
        let origin = self.origin;
        let mark = self.marks.entry(source.to_string()).or_insert(origin);
        if candidate > *mark {
            *mark = candidate;
            true
        } else {
            false
        }
    }

    /// Re-initialize every source to `now` (supervised restart without
    /// watermark preservation).
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.origin = now;
        for mark in self.marks.values_mut() {
            *mark = now;
        }
    }
}
