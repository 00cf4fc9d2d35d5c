//! Domain types for the desired schema and the live catalog.
//!
//! Everything here is immutable once loaded. The orchestrator borrows these
//! values for the whole run and only ever compares against them.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Column name → declared type, in document order.
///
/// The declared type may carry trailing modifiers (`UInt8 DEFAULT 0`); only
/// its first whitespace-delimited token takes part in type comparison.
pub type ColumnMap = IndexMap<String, String>;

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

/// One replica's address and credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub pass: String,
}

/// ClickHouse HTTP interface.
pub const DEFAULT_PORT: u16 = 8123;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_user() -> String {
    "default".to_owned()
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: default_user(),
            pass: String::new(),
        }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Desired objects
// ---------------------------------------------------------------------------

/// How a plain table gets its structure when it has to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSource {
    /// Use the declared column list.
    Columns,
    /// `CREATE TABLE t AS other`.
    AsTable(String),
    /// `CREATE TABLE t ENGINE = e AS SELECT ...`.
    AsSelect(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub columns: ColumnMap,
    pub engine: String,
    pub source: TableSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSpec {
    pub columns: ColumnMap,
    pub engine: Option<String>,
    pub materialized: bool,
    pub populate: bool,
    /// Required to create the view. A view without it is still drift-checked.
    pub select: Option<String>,
}

/// Table or view, each carrying only the fields meaningful to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectKind {
    Table(TableSpec),
    View(ViewSpec),
}

/// A table or view as it should exist on every replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredObject {
    pub name: String,
    pub kind: ObjectKind,
}

impl DesiredObject {
    /// Declared columns; empty when the object takes its structure from a source.
    pub fn columns(&self) -> &ColumnMap {
        match &self.kind {
            ObjectKind::Table(t) => &t.columns,
            ObjectKind::View(v) => &v.columns,
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self.kind, ObjectKind::View(_))
    }
}

/// A database and the objects declared in it, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Database {
    pub name: String,
    pub objects: Vec<DesiredObject>,
}

/// The validated desired state for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub servers: Vec<ServerEndpoint>,
    pub databases: Vec<Database>,
}

// ---------------------------------------------------------------------------
// Live catalog
// ---------------------------------------------------------------------------

/// One row of a replica's column catalog for a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

impl LiveColumn {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fix policy
// ---------------------------------------------------------------------------

/// What the reconciler is allowed to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FixPolicy {
    apply_fixes: bool,
    allow_column_drop: bool,
}

impl FixPolicy {
    pub const fn new(apply_fixes: bool, allow_column_drop: bool) -> Self {
        Self {
            apply_fixes,
            allow_column_drop,
        }
    }

    /// Report only.
    pub const fn check_only() -> Self {
        Self::new(false, false)
    }

    pub const fn applies_fixes(self) -> bool {
        self.apply_fixes
    }

    /// Dropping is gated behind `apply_fixes` as well.
    pub const fn drops_columns(self) -> bool {
        self.apply_fixes && self.allow_column_drop
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
