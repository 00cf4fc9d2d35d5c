//! The replica capability consumed by the engine.
//!
//! The engine never speaks a wire protocol itself. It drives a [`Replica`],
//! opened for each [`ServerEndpoint`] by a [`Connector`]:
//!
//! - [`clickhouse`]: the ClickHouse HTTP interface
//! - [`memory`]: an in-process catalog that records statements

pub mod clickhouse;
pub mod memory;

use async_trait::async_trait;

use schemasync_core::types::{LiveColumn, ServerEndpoint};

use crate::error::ReplicaError;

/// One live server of the fleet.
///
/// Every call names its database explicitly; a replica carries no mutable
/// "current database" state, so reads and repair writes can share it.
#[async_trait]
pub trait Replica: Send + Sync + 'static {
    /// Liveness check performed right after opening.
    async fn ping(&self) -> Result<(), ReplicaError>;

    /// Fails unless `database` can be used for the following calls.
    async fn use_database(&self, database: &str) -> Result<(), ReplicaError>;

    /// `(name, type)` rows of the column catalog, in column position order.
    /// An absent table yields an empty list, not an error.
    async fn columns(&self, database: &str, table: &str) -> Result<Vec<LiveColumn>, ReplicaError>;

    /// Run one DDL statement inside `database`.
    async fn execute(&self, database: &str, statement: &str) -> Result<(), ReplicaError>;

    async fn close(&self) -> Result<(), ReplicaError>;
}

/// Opens replicas for endpoints.
#[async_trait]
pub trait Connector: Send + Sync {
    type Replica: Replica;

    async fn open(&self, endpoint: &ServerEndpoint) -> Result<Self::Replica, ReplicaError>;
}
