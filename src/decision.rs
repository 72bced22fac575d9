//! decision.rs: per-filter verdicts and the merged per-item decision.
//!
//! Merging is a fold of logical OR over `matched` and set union over
//! recipients. Both are commutative and associative, so the decision does not
//! depend on the order in which concurrent evaluators report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One filter's outcome for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub matched: bool,
    /// The filter's notify list on a match, empty otherwise.
    pub recipients: BTreeSet<String>,
}

impl Verdict {
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn matched<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            matched: true,
            recipients: recipients.into_iter().map(Into::into).collect(),
        }
    }
}

/// Merged outcome across all filters of a source for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub notify: bool,
    pub recipients: BTreeSet<String>,
}

impl Decision {
    /// Fold one verdict in. Non-matching verdicts contribute nothing.
    pub fn merge(mut self, v: Verdict) -> Self {
        if v.matched {
            self.notify = true;
            self.recipients.extend(v.recipients);
        }
        self
    }

    pub fn from_verdicts<I: IntoIterator<Item = Verdict>>(verdicts: I) -> Self {
        verdicts.into_iter().fold(Self::default(), Self::merge)
    }
}
