//! schemasync core library: desired-state model, config loading, errors.
//!
//! - [`types`]: endpoints, desired tables/views, live columns, fix policy
//! - [`config`]: YAML loading and validation into [`types::Config`]
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::{
    ColumnMap, Config, Database, DesiredObject, FixPolicy, LiveColumn, ObjectKind,
    ServerEndpoint, TableSource, TableSpec, ViewSpec,
};
