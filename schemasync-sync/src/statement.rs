//! Corrective DDL statements.
//!
//! ```text
//! CREATE TABLE IF NOT EXISTS <table> (<col> <type>, ...) ENGINE = <engine>
//! CREATE TABLE IF NOT EXISTS <table> AS <other> ENGINE = <engine>
//! CREATE TABLE IF NOT EXISTS <table> ENGINE = <engine> AS <select>
//! CREATE [MATERIALIZED] VIEW IF NOT EXISTS <view> [(<col> <type>, ...)] [ENGINE = <engine>] [POPULATE] AS <select>
//! ALTER TABLE <table> ADD COLUMN <col> <type>
//! ALTER TABLE <table> MODIFY COLUMN <col> <type>
//! ALTER TABLE <table> DROP COLUMN <col>
//! ```
//!
//! Names and types are substituted verbatim from the configuration.

use std::fmt;

use schemasync_core::types::{ColumnMap, DesiredObject, ObjectKind, TableSource, TableSpec};

use crate::error::PlanError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateTable {
        table: String,
        spec: TableSpec,
    },
    CreateView {
        view: String,
        materialized: bool,
        columns: ColumnMap,
        engine: Option<String>,
        populate: bool,
        select: String,
    },
    AddColumn {
        table: String,
        column: String,
        column_type: String,
    },
    ModifyColumn {
        table: String,
        column: String,
        column_type: String,
    },
    DropColumn {
        table: String,
        column: String,
    },
}

impl Statement {
    /// The `CREATE ... IF NOT EXISTS` statement for a missing object.
    pub fn create(object: &DesiredObject) -> Result<Self, PlanError> {
        match &object.kind {
            ObjectKind::Table(spec) => Ok(Statement::CreateTable {
                table: object.name.clone(),
                spec: spec.clone(),
            }),
            ObjectKind::View(spec) => {
                let select = spec.select.clone().ok_or_else(|| PlanError::ViewWithoutSelect {
                    view: object.name.clone(),
                })?;
                Ok(Statement::CreateView {
                    view: object.name.clone(),
                    materialized: spec.materialized,
                    columns: spec.columns.clone(),
                    engine: spec.engine.clone(),
                    populate: spec.populate,
                    select,
                })
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateTable { table, spec } => {
                write!(f, "CREATE TABLE IF NOT EXISTS {table} ")?;
                match &spec.source {
                    TableSource::Columns => {
                        write_columns(f, &spec.columns)?;
                        write!(f, " ENGINE = {}", spec.engine)
                    }
                    TableSource::AsTable(other) => {
                        write!(f, "AS {other} ENGINE = {}", spec.engine)
                    }
                    TableSource::AsSelect(select) => {
                        write!(f, "ENGINE = {} AS {select}", spec.engine)
                    }
                }
            }
            Statement::CreateView {
                view,
                materialized,
                columns,
                engine,
                populate,
                select,
            } => {
                if *materialized {
                    write!(f, "CREATE MATERIALIZED VIEW IF NOT EXISTS {view} ")?;
                } else {
                    write!(f, "CREATE VIEW IF NOT EXISTS {view} ")?;
                }
                if !columns.is_empty() {
                    write_columns(f, columns)?;
                    write!(f, " ")?;
                }
                if let Some(engine) = engine {
                    write!(f, "ENGINE = {engine} ")?;
                }
                if *populate {
                    write!(f, "POPULATE ")?;
                }
                write!(f, "AS {select}")
            }
            Statement::AddColumn {
                table,
                column,
                column_type,
            } => write!(f, "ALTER TABLE {table} ADD COLUMN {column} {column_type}"),
            Statement::ModifyColumn {
                table,
                column,
                column_type,
            } => write!(f, "ALTER TABLE {table} MODIFY COLUMN {column} {column_type}"),
            Statement::DropColumn { table, column } => {
                write!(f, "ALTER TABLE {table} DROP COLUMN {column}")
            }
        }
    }
}

fn write_columns(f: &mut fmt::Formatter<'_>, columns: &ColumnMap) -> fmt::Result {
    write!(f, "(")?;
    for (i, (name, column_type)) in columns.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{name} {column_type}")?;
    }
    write!(f, ")")
}
