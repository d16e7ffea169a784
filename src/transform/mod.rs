//! Star-schema derivation.
//!
//! Each submodule is a pure function layer over immutable record
//! collections: filter, project, deduplicate, join, and rank. The
//! orchestrator in [`crate::pipeline`] sequences dimension extraction
//! before fact assembly; nothing here performs I/O.

pub mod catalog;
pub mod events;
pub mod fact;
pub mod time;

use serde::Serialize;
use snafu::prelude::*;
use std::collections::HashSet;

use crate::error::{DedupKeySnafu, TransformError};

/// Remove full-row duplicates, keeping the first occurrence of each row.
///
/// Equality is over every projected field, not the key column alone: two
/// rows differing in any field are both kept. Rows are compared through
/// their serialized form, which sidesteps float fields not being `Eq`.
/// The operation is idempotent.
pub(crate) fn dedup_rows<T: Serialize>(rows: Vec<T>) -> Result<Vec<T>, TransformError> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let key = serde_json::to_string(&row).context(DedupKeySnafu)?;
        if seen.insert(key) {
            out.push(row);
        }
    }
    Ok(out)
}
