//! Drift detection tests for `schemasync-detector`.
//!
//! Each case builds its own desired object and live catalog.

use rstest::rstest;
use schemasync_core::types::{
    ColumnMap, DesiredObject, LiveColumn, ObjectKind, TableSource, TableSpec, ViewSpec,
};
use schemasync_detector::{detect, Divergence};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn table(columns: &[(&str, &str)]) -> DesiredObject {
    DesiredObject {
        name: "t".to_string(),
        kind: ObjectKind::Table(TableSpec {
            columns: column_map(columns),
            engine: "MergeTree ORDER BY id".to_string(),
            source: TableSource::Columns,
        }),
    }
}

fn copy_of(other: &str) -> DesiredObject {
    DesiredObject {
        name: "t_copy".to_string(),
        kind: ObjectKind::Table(TableSpec {
            columns: ColumnMap::new(),
            engine: "Log".to_string(),
            source: TableSource::AsTable(other.to_string()),
        }),
    }
}

fn select_view() -> DesiredObject {
    DesiredObject {
        name: "v".to_string(),
        kind: ObjectKind::View(ViewSpec {
            columns: ColumnMap::new(),
            engine: None,
            materialized: false,
            populate: false,
            select: Some("SELECT 1 AS one".to_string()),
        }),
    }
}

fn column_map(columns: &[(&str, &str)]) -> ColumnMap {
    columns
        .iter()
        .map(|(n, t)| (n.to_string(), t.to_string()))
        .collect()
}

fn live(columns: &[(&str, &str)]) -> Vec<LiveColumn> {
    columns.iter().map(|(n, t)| LiveColumn::new(*n, *t)).collect()
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

#[rstest]
#[case(table(&[("id", "UInt64")]))]
#[case(table(&[]))]
#[case(copy_of("events"))]
#[case(select_view())]
fn empty_live_is_exactly_one_object_missing(#[case] desired: DesiredObject) {
    assert_eq!(detect(&desired, &[]), vec![Divergence::ObjectMissing]);
}

#[test]
fn view_with_rows_but_no_declared_columns_is_present() {
    let found = detect(&select_view(), &live(&[("one", "UInt8")]));
    assert!(found.is_empty(), "got {found:?}");
}

// ---------------------------------------------------------------------------
// Column comparison
// ---------------------------------------------------------------------------

#[test]
fn identical_catalog_has_no_divergence() {
    let desired = table(&[("id", "UInt64"), ("name", "String"), ("flag", "UInt8 DEFAULT 0")]);
    let found = detect(
        &desired,
        &live(&[("flag", "UInt8"), ("id", "UInt64"), ("name", "String")]),
    );
    assert!(found.is_empty(), "got {found:?}");
}

#[test]
fn default_clause_is_ignored_in_type_comparison() {
    let found = detect(&table(&[("flag", "UInt8 DEFAULT 0")]), &live(&[("flag", "UInt8")]));
    assert!(found.is_empty());
}

#[test]
fn missing_column_keeps_full_declared_type() {
    let desired = table(&[("id", "UInt64"), ("name", "String DEFAULT 'x'")]);
    let found = detect(&desired, &live(&[("id", "UInt64")]));
    assert_eq!(
        found,
        vec![Divergence::ColumnMissing {
            column: "name".into(),
            want: "String DEFAULT 'x'".into(),
        }]
    );
}

#[test]
fn excess_column_detected() {
    let found = detect(
        &table(&[("id", "UInt64")]),
        &live(&[("id", "UInt64"), ("extra", "String")]),
    );
    assert_eq!(found, vec![Divergence::ColumnExcess { column: "extra".into() }]);
}

#[test]
fn type_mismatch_uses_first_token() {
    let found = detect(
        &table(&[("n", "UInt32 DEFAULT 1")]),
        &live(&[("n", "UInt64")]),
    );
    assert_eq!(
        found,
        vec![Divergence::TypeMismatch {
            column: "n".into(),
            want: "UInt32".into(),
            have: "UInt64".into(),
        }]
    );
}

#[rstest]
#[case(copy_of("events"))]
#[case(select_view())]
fn no_declared_columns_never_reports_excess(#[case] desired: DesiredObject) {
    let found = detect(&desired, &live(&[("a", "String"), ("b", "UInt8")]));
    assert!(
        !found.iter().any(|d| matches!(d, Divergence::ColumnExcess { .. })),
        "got {found:?}"
    );
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn groups_are_ordered_excess_mismatch_missing() {
    let desired = table(&[("a", "UInt8"), ("b", "String"), ("c", "Date"), ("d", "UInt64")]);
    let found = detect(
        &desired,
        &live(&[("b", "UInt8"), ("x", "String"), ("a", "UInt16"), ("y", "Date")]),
    );
    assert_eq!(
        found,
        vec![
            Divergence::ColumnExcess { column: "x".into() },
            Divergence::ColumnExcess { column: "y".into() },
            Divergence::TypeMismatch {
                column: "b".into(),
                want: "String".into(),
                have: "UInt8".into(),
            },
            Divergence::TypeMismatch {
                column: "a".into(),
                want: "UInt8".into(),
                have: "UInt16".into(),
            },
            Divergence::ColumnMissing { column: "c".into(), want: "Date".into() },
            Divergence::ColumnMissing { column: "d".into(), want: "UInt64".into() },
        ]
    );
}

#[test]
fn divergence_serializes_with_kind_tag() {
    let json = serde_json::to_value(Divergence::ColumnExcess { column: "x".into() })
        .expect("serialize");
    assert_eq!(json["kind"], "column_excess");
    assert_eq!(json["column"], "x");
}
