//! # schemasync-sync
//!
//! Fleet-wide schema drift checking and repair.
//!
//! Open a [`ReplicaPool`] with a [`Connector`], hand it to a [`Synchronizer`]
//! with a [`FixPolicy`](schemasync_core::FixPolicy), and call
//! [`Synchronizer::run`] with the desired databases. Close the pool with
//! [`ReplicaPool::close`] afterwards.

pub mod catalog;
pub mod error;
pub mod pool;
pub mod reconcile;
pub mod replica;
pub mod statement;
pub mod synchronizer;

pub use error::{EndpointFailure, FleetError, FleetOperation, PlanError, ReplicaError, SyncError};
pub use pool::{ReplicaHandle, ReplicaPool};
pub use reconcile::{plan, RepairOutcome, RepairRecord};
pub use replica::{Connector, Replica};
pub use statement::Statement;
pub use synchronizer::{Finding, RunReport, SkippedRepair, Synchronizer, UnreadableCatalog};
