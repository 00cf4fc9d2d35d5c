//! Drift detection for `schemasync-detector`.
//!
//! `detect(desired, live)` compares one desired table or view against the
//! column catalog a single replica reported for it and returns every
//! divergence, in a fixed order:
//!
//! 1. `ObjectMissing` alone, when the replica reported no rows at all
//! 2. `ColumnExcess`, in live discovery order
//! 3. `TypeMismatch`, in live discovery order
//! 4. `ColumnMissing`, in desired declaration order
//!
//! The function is pure; it neither logs nor touches a replica.

use std::collections::HashSet;
use std::fmt;

use schemasync_core::types::{DesiredObject, LiveColumn};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One classified difference between a desired object and a replica.
///
/// Names either exactly one column or the whole object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Divergence {
    /// The replica has no such table or view.
    ObjectMissing,
    /// The replica has a column the desired object does not declare.
    ColumnExcess { column: String },
    /// A declared column is absent; `want` is the full declared type.
    ColumnMissing { column: String, want: String },
    /// Column types differ; `want` is the comparable (first-token) type.
    TypeMismatch {
        column: String,
        want: String,
        have: String,
    },
}

impl Divergence {
    /// The column this divergence is about, or `None` for the whole object.
    pub fn column(&self) -> Option<&str> {
        match self {
            Divergence::ObjectMissing => None,
            Divergence::ColumnExcess { column }
            | Divergence::ColumnMissing { column, .. }
            | Divergence::TypeMismatch { column, .. } => Some(column),
        }
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Divergence::ObjectMissing => write!(f, "object does not exist"),
            Divergence::ColumnExcess { column } => write!(f, "excess column '{column}'"),
            Divergence::ColumnMissing { column, want } => {
                write!(f, "missing column '{column}' ({want})")
            }
            Divergence::TypeMismatch { column, want, have } => {
                write!(f, "column '{column}' has type {have}, want {want}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// The part of a declared type that is compared against the catalog.
///
/// `"UInt8 DEFAULT 0"` compares as `"UInt8"`. Config validation guarantees a
/// non-blank type; a blank one compares as the empty string.
pub fn comparable_type(declared: &str) -> &str {
    declared.split_whitespace().next().unwrap_or("")
}

/// Compare `desired` against the `live` catalog rows of one replica.
///
/// Presence is decided by the row count alone: an empty `live` means the
/// object is missing, whatever the desired definition says.
pub fn detect(desired: &DesiredObject, live: &[LiveColumn]) -> Vec<Divergence> {
    if live.is_empty() {
        return vec![Divergence::ObjectMissing];
    }

    let columns = desired.columns();
    // Objects created from another table or a select have no declared
    // columns and are exempt from excess checking.
    let check_excess = !columns.is_empty();

    let mut excess = Vec::new();
    let mut mismatched = Vec::new();
    let mut seen = HashSet::with_capacity(live.len());

    for column in live {
        seen.insert(column.name.as_str());
        match columns.get(&column.name) {
            None if check_excess => excess.push(Divergence::ColumnExcess {
                column: column.name.clone(),
            }),
            None => {}
            Some(declared) => {
                let want = comparable_type(declared);
                if want != column.column_type {
                    mismatched.push(Divergence::TypeMismatch {
                        column: column.name.clone(),
                        want: want.to_owned(),
                        have: column.column_type.clone(),
                    });
                }
            }
        }
    }

    let missing = columns
        .iter()
        .filter(|(name, _)| !seen.contains(name.as_str()))
        .map(|(name, declared)| Divergence::ColumnMissing {
            column: name.clone(),
            want: declared.clone(),
        });

    let mut divergences = excess;
    divergences.extend(mismatched);
    divergences.extend(missing);
    divergences
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
