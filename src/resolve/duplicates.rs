//! Walks `dupe_of` links to the canonical issue.

use std::collections::HashSet;

use super::rules::is_duplicate;
use crate::error::{Error, Result};
use crate::issue::{IssueIndex, IssueRecord, IssueRef};

/// Longest duplicate chain followed before the data is declared malformed.
pub const MAX_DUPLICATE_DEPTH: usize = 16;

/// Follows duplicates from `start` to the last record present in `index`.
///
/// Returns `None` when `start` has no data. A chain that stops at an issue
/// missing from the index ends at the last known record.
///
/// # Errors
///
/// Returns [`Error::MalformedDuplicateChain`] when the chain loops back on
/// itself or is longer than [`MAX_DUPLICATE_DEPTH`].
pub fn follow_duplicates<'a>(
    index: &'a IssueIndex,
    start: &IssueRef,
) -> Result<Option<&'a IssueRecord>> {
    let Some(mut record) = index.record(start) else {
        return Ok(None);
    };
    let mut visited = HashSet::from([start.clone()]);
    let mut chain = vec![start.to_string()];

    while is_duplicate(start.kind, record) {
        let Some(next_id) = record.dupe_of.as_deref() else { break };
        let next = IssueRef::new(start.kind, next_id);
        let Some(next_record) = index.record(&next) else { break };

        chain.push(next.to_string());
        if !visited.insert(next) || chain.len() > MAX_DUPLICATE_DEPTH {
            return Err(Error::MalformedDuplicateChain { start: start.to_string(), chain });
        }
        record = next_record;
    }
    Ok(Some(record))
}
