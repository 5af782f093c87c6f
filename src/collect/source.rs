//! Finds `if is_open('BZ:123456'):` / `if not is_open('JR:SAT-1'):` call sites.

use std::sync::OnceLock;

use regex::Regex;

use crate::issue::{IssueRef, TrackerKind};

/// One `is_open` guard found in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// The guarded issue.
    pub issue: IssueRef,
    /// `if not is_open(...)` rather than `if is_open(...)`.
    pub negated: bool,
}

impl CallSite {
    /// Usage label recorded in the issue index.
    #[must_use]
    pub fn usage(&self) -> &'static str {
        if self.negated {
            "not is_open"
        } else {
            "is_open"
        }
    }
}

fn call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"\bif\s+(?P<not>not\s+)?is_open\(\s*['"](?P<tag>\D{2})\s*:\s*(?P<num>[\w-]+)['"]\s*\)"#,
        )
        .expect("valid call-site regex")
    })
}

/// Scans `source` for `is_open` guards, in source order.
///
/// Guards naming an unknown tracker tag are ignored.
#[must_use]
pub fn scan(source: &str) -> Vec<CallSite> {
    if !source.contains("is_open(") {
        return Vec::new();
    }
    call_pattern()
        .captures_iter(source)
        .filter_map(|caps| {
            let kind = TrackerKind::from_tag(&caps["tag"])?;
            Some(CallSite {
                issue: IssueRef::new(kind, &caps["num"]),
                negated: caps.name("not").is_some(),
            })
        })
        .collect()
}
