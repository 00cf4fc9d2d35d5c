//! YAML configuration loading.
//!
//! # Document shape
//!
//! ```yaml
//! servers:
//!   - host: ch-1
//!     port: 8123
//!     user: default
//!     pass: ""
//! databases:
//!   - name: analytics
//!     tables:
//!       events:
//!         engine: MergeTree ORDER BY id
//!         columns:
//!           id: UInt64
//!           name: String DEFAULT ''
//!       events_daily:
//!         view: true
//!         materialized: true
//!         engine: SummingMergeTree ORDER BY day
//!         as_select: SELECT toDate(ts) AS day, count() AS n FROM events GROUP BY day
//! ```
//!
//! The document is parsed into flat `Raw*` records first and then validated
//! into the tagged [`ObjectKind`] model. Anything that cannot be reconciled
//! unambiguously is rejected here, before a single connection is opened.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{invalid, ConfigError};
use crate::types::{
    ColumnMap, Config, Database, DesiredObject, ObjectKind, ServerEndpoint, TableSource,
    TableSpec, ViewSpec,
};

// ---------------------------------------------------------------------------
// 1. Raw document
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    servers: Vec<ServerEndpoint>,
    #[serde(default)]
    databases: Vec<RawDatabase>,
}

#[derive(Debug, Deserialize)]
struct RawDatabase {
    name: String,
    #[serde(default)]
    tables: IndexMap<String, RawTable>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    #[serde(default)]
    view: bool,
    #[serde(default)]
    materialized: bool,
    #[serde(default)]
    populate: bool,
    #[serde(default)]
    columns: ColumnMap,
    #[serde(default)]
    engine: Option<String>,
    #[serde(default)]
    as_table: Option<String>,
    #[serde(default)]
    as_select: Option<String>,
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate the configuration at `path`.
///
/// Returns `ConfigError::Io` if unreadable, `ConfigError::Parse` (with path +
/// line context) if malformed YAML, `ConfigError::Invalid` for definitions
/// that cannot be reconciled.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawConfig = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    raw.validate()
}

impl Config {
    /// Parse and validate configuration text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text)?;
        raw.validate()
    }
}

// ---------------------------------------------------------------------------
// 3. Validation
// ---------------------------------------------------------------------------

impl RawConfig {
    fn validate(self) -> Result<Config, ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::Empty("no servers configured"));
        }
        if self.servers.iter().any(|s| s.host.trim().is_empty()) {
            return Err(ConfigError::Empty("server without a host"));
        }

        let databases = self
            .databases
            .into_iter()
            .map(RawDatabase::validate)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            servers: self.servers,
            databases,
        })
    }
}

impl RawDatabase {
    fn validate(self) -> Result<Database, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Empty("database without a name"));
        }
        let objects = self
            .tables
            .into_iter()
            .map(|(name, raw)| build_object(&self.name, name, raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Database {
            name: self.name,
            objects,
        })
    }
}

fn build_object(database: &str, name: String, raw: RawTable) -> Result<DesiredObject, ConfigError> {
    for (column, column_type) in &raw.columns {
        if column_type.split_whitespace().next().is_none() {
            return Err(invalid(database, &name, format!("column '{column}' has no type")));
        }
    }

    let engine = non_empty(raw.engine);
    let as_table = non_empty(raw.as_table);
    let as_select = non_empty(raw.as_select);

    let kind = if raw.view {
        if as_table.is_some() {
            return Err(invalid(
                database,
                &name,
                "a view cannot be created as another table; use as_select",
            ));
        }
        ObjectKind::View(ViewSpec {
            columns: raw.columns,
            engine,
            materialized: raw.materialized,
            populate: raw.populate,
            select: as_select,
        })
    } else {
        if raw.materialized || raw.populate {
            return Err(invalid(
                database,
                &name,
                "materialized and populate only apply to views",
            ));
        }
        let Some(engine) = engine else {
            return Err(invalid(database, &name, "engine is required for a table"));
        };
        let has_columns = !raw.columns.is_empty();
        let source = match (has_columns, as_table, as_select) {
            (true, None, None) => TableSource::Columns,
            (false, Some(other), None) => TableSource::AsTable(other),
            (false, None, Some(select)) => TableSource::AsSelect(select),
            (false, None, None) => {
                return Err(invalid(
                    database,
                    &name,
                    "declare columns, as_table or as_select",
                ))
            }
            _ => {
                return Err(invalid(
                    database,
                    &name,
                    "declare only one of columns, as_table, as_select",
                ))
            }
        };
        ObjectKind::Table(TableSpec {
            columns: raw.columns,
            engine,
            source,
        })
    };

    Ok(DesiredObject { name, kind })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
