//! Error types for schemasync-sync.

use std::fmt;

use thiserror::Error;

use schemasync_core::types::ServerEndpoint;

/// A failure reported by one replica.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// An error from the ClickHouse client (transport or server side).
    #[error("clickhouse: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),

    /// The replica refused the operation.
    #[error("{0}")]
    Rejected(String),
}

/// Which fleet-wide step an aggregated failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetOperation {
    Connect,
    UseDatabase(String),
    Close,
}

impl fmt::Display for FleetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FleetOperation::Connect => write!(f, "connect"),
            FleetOperation::UseDatabase(db) => write!(f, "use database {db}"),
            FleetOperation::Close => write!(f, "close"),
        }
    }
}

/// One endpoint's failure inside a [`FleetError`].
#[derive(Debug)]
pub struct EndpointFailure {
    pub endpoint: ServerEndpoint,
    pub error: ReplicaError,
}

/// Every per-endpoint failure of a fleet-wide step, in endpoint order.
#[derive(Debug)]
pub struct FleetError {
    pub operation: FleetOperation,
    pub failures: Vec<EndpointFailure>,
}

impl FleetError {
    /// `None` when there is nothing to report.
    pub fn from_failures(operation: FleetOperation, failures: Vec<EndpointFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { operation, failures })
        }
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.endpoint.host.as_str())
    }
}

impl fmt::Display for FleetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed on {} replica(s)",
            self.operation,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.endpoint, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for FleetError {}

/// A divergence that cannot be turned into a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("view '{view}' has no as_select; cannot create it")]
    ViewWithoutSelect { view: String },
}

/// Run-aborting failures of the orchestrator.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error("repair worker for {host} stopped abnormally: {source}")]
    Worker {
        host: String,
        #[source]
        source: tokio::task::JoinError,
    },
}
