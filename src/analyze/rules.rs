//! Keyword filters evaluated against a post title.
//!
//! Matching is case-insensitive plain substring search (no tokenization):
//! - `includes`: every phrase must appear (an empty list always passes)
//! - `except`:   any phrase appearing rejects the post (an empty list never rejects)

use serde::{Deserialize, Serialize};

use crate::decision::Verdict;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Optional label used in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default, alias = "excepts")]
    pub except: Vec<String>,
    /// Recipient ids (Slack member ids or Telegram chat ids).
    #[serde(default)]
    pub notify: Vec<String>,
}

pub fn includes_ok(filter: &Filter, title: &str) -> bool {
    let text = title.to_lowercase();
    filter.includes.iter().all(|p| contains(&text, p))
}

pub fn excepts_hit(filter: &Filter, title: &str) -> bool {
    let text = title.to_lowercase();
    filter.except.iter().any(|p| contains(&text, p))
}

/// Evaluate one filter against one title.
pub fn evaluate(filter: &Filter, title: &str) -> Verdict {
    if includes_ok(filter, title) && !excepts_hit(filter, title) {
        Verdict::matched(filter.notify.iter().cloned())
    } else {
        Verdict::no_match()
    }
}

// `text` is already lowercased.
fn contains(text: &str, pat: &str) -> bool {
    text.contains(pat.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(includes: &[&str], except: &[&str], notify: &[&str]) -> Filter {
        Filter {
            name: None,
            includes: includes.iter().map(|s| s.to_string()).collect(),
            except: except.iter().map(|s| s.to_string()).collect(),
            notify: notify.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn include_hit_notifies_configured_users() {
        let f = filter(&["launch"], &[], &["u1"]);
        let v = evaluate(&f, "Product Launch Today");
        assert!(v.matched);
        assert_eq!(v.recipients.into_iter().collect::<Vec<_>>(), vec!["u1"]);
    }

    #[test]
    fn except_hit_rejects() {
        let f = filter(&[], &["spam"], &["u2"]);
        let v = evaluate(&f, "This is spam content");
        assert!(!v.matched);
        assert!(v.recipients.is_empty());
    }

    #[test]
    fn includes_is_a_conjunction() {
        let f = filter(&["rust", "release"], &[], &[]);
        assert!(includes_ok(&f, "New RUST release is out"));
        assert!(!includes_ok(&f, "New rust crate is out"));
    }

    #[test]
    fn excepts_is_a_disjunction() {
        let f = filter(&[], &["nsfw", "meme"], &[]);
        assert!(excepts_hit(&f, "a MEME about borrowck"));
        assert!(excepts_hit(&f, "nsfw"));
        assert!(!excepts_hit(&f, "serious question"));
    }

    #[test]
    fn empty_lists_are_neutral() {
        let f = Filter::default();
        assert!(includes_ok(&f, "anything"));
        assert!(!excepts_hit(&f, "anything"));
        assert!(evaluate(&f, "anything").matched);
    }

    #[test]
    fn substring_not_token_match() {
        let f = filter(&["cat"], &[], &[]);
        assert!(evaluate(&f, "Concatenate strings").matched);
    }

    #[test]
    fn non_match_carries_no_recipients() {
        let f = filter(&["gpu"], &[], &["u9"]);
        let v = evaluate(&f, "cpu only");
        assert_eq!(v, Verdict::no_match());
    }
}
