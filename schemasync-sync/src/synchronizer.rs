//! The run driver: databases → objects → replicas.
//!
//! Reads (database selection, catalog queries) are issued one replica at a
//! time from the calling task. Repairs go to the per-replica
//! [`RepairWorkers`] and are joined before [`Synchronizer::run`] returns, so
//! the returned [`RunReport`] is complete.

use serde::Serialize;

use schemasync_core::types::{Database, DesiredObject, FixPolicy};
use schemasync_detector::{detect, Divergence};

use crate::catalog::read_columns;
use crate::error::{EndpointFailure, FleetError, FleetOperation, SyncError};
use crate::pool::{ReplicaHandle, ReplicaPool};
use crate::reconcile::{plan, RepairJob, RepairRecord, RepairWorkers};
use crate::replica::Replica;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One divergence on one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub host: String,
    pub database: String,
    pub object: String,
    pub divergence: Divergence,
}

/// A repair that was needed but could not be planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRepair {
    pub host: String,
    pub database: String,
    pub object: String,
    pub reason: String,
}

/// A catalog read that failed; the object was not checked on that replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadableCatalog {
    pub host: String,
    pub database: String,
    pub object: String,
    pub error: String,
}

/// Everything a run observed and did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub findings: Vec<Finding>,
    pub repairs: Vec<RepairRecord>,
    pub skipped: Vec<SkippedRepair>,
    pub unreadable: Vec<UnreadableCatalog>,
}

impl RunReport {
    /// No drift found and every catalog was readable.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.unreadable.is_empty()
    }

    pub fn applied_count(&self) -> usize {
        self.repairs.iter().filter(|r| r.applied()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.repairs.len() - self.applied_count()
    }
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

pub struct Synchronizer<R> {
    pool: ReplicaPool<R>,
    policy: FixPolicy,
}

impl<R: Replica> Synchronizer<R> {
    pub fn new(pool: ReplicaPool<R>, policy: FixPolicy) -> Self {
        Self { pool, policy }
    }

    /// Hand the pool back for closing.
    pub fn into_pool(self) -> ReplicaPool<R> {
        self.pool
    }

    /// Check every declared object on every replica, repairing per policy.
    ///
    /// Fails only when a database cannot be selected on some replica. Repairs
    /// already queued at that point are still awaited before returning.
    pub async fn run(&self, databases: &[Database]) -> Result<RunReport, SyncError> {
        let workers = self
            .policy
            .applies_fixes()
            .then(|| RepairWorkers::spawn(&self.pool));
        let mut report = RunReport::default();

        let mut outcome = Ok(());
        for database in databases {
            outcome = self.check_database(database, workers.as_ref(), &mut report).await;
            if outcome.is_err() {
                break;
            }
        }

        if let Some(workers) = workers {
            report.repairs = workers.finish().await?;
        }
        outcome?;

        tracing::info!(
            findings = report.findings.len(),
            applied = report.applied_count(),
            failed = report.failed_count(),
            skipped = report.skipped.len(),
            "check finished"
        );
        Ok(report)
    }

    async fn check_database(
        &self,
        database: &Database,
        workers: Option<&RepairWorkers>,
        report: &mut RunReport,
    ) -> Result<(), SyncError> {
        self.use_database(&database.name).await?;
        tracing::info!(database = %database.name, objects = database.objects.len(), "checking database");

        for object in &database.objects {
            for (index, handle) in self.pool.iter().enumerate() {
                self.check_object(index, handle, &database.name, object, workers, report)
                    .await;
            }
        }
        Ok(())
    }

    /// Select `database` on every replica; any failure is fatal.
    async fn use_database(&self, database: &str) -> Result<(), FleetError> {
        let mut failures = Vec::new();
        for handle in self.pool.iter() {
            if let Err(error) = handle.replica().use_database(database).await {
                tracing::error!(host = %handle.host(), database, error = %error, "cannot use database");
                failures.push(EndpointFailure {
                    endpoint: handle.endpoint().clone(),
                    error,
                });
            }
        }
        match FleetError::from_failures(FleetOperation::UseDatabase(database.to_owned()), failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn check_object(
        &self,
        index: usize,
        handle: &ReplicaHandle<R>,
        database: &str,
        object: &DesiredObject,
        workers: Option<&RepairWorkers>,
        report: &mut RunReport,
    ) {
        let host = handle.host();
        let table = object.name.as_str();

        let live = match read_columns(handle, database, table).await {
            Ok(live) => live,
            Err(err) => {
                tracing::error!(host, database, table, error = %err, "failed to read column catalog");
                report.unreadable.push(UnreadableCatalog {
                    host: host.to_owned(),
                    database: database.to_owned(),
                    object: table.to_owned(),
                    error: err.to_string(),
                });
                return;
            }
        };

        for divergence in detect(object, &live) {
            log_divergence(host, database, object, &divergence);

            if let Some(workers) = workers {
                match plan(object, &divergence, self.policy) {
                    Ok(Some(statement)) => {
                        let job = RepairJob {
                            database: database.to_owned(),
                            object: table.to_owned(),
                            column: divergence.column().map(str::to_owned),
                            statement,
                        };
                        workers.submit(index, job).await;
                    }
                    Ok(None) => {
                        tracing::debug!(host, database, table, column = divergence.column(), "left as is by fix policy");
                    }
                    Err(err) => {
                        tracing::error!(host, database, table, error = %err, "skipping repair");
                        report.skipped.push(SkippedRepair {
                            host: host.to_owned(),
                            database: database.to_owned(),
                            object: table.to_owned(),
                            reason: err.to_string(),
                        });
                    }
                }
            }

            report.findings.push(Finding {
                host: host.to_owned(),
                database: database.to_owned(),
                object: table.to_owned(),
                divergence,
            });
        }
    }
}

fn log_divergence(host: &str, database: &str, object: &DesiredObject, divergence: &Divergence) {
    let table = object.name.as_str();
    match divergence {
        Divergence::ObjectMissing if object.is_view() => {
            tracing::warn!(host, database, table, "view does not exist");
        }
        Divergence::ObjectMissing => {
            tracing::warn!(host, database, table, "table does not exist");
        }
        Divergence::ColumnExcess { column } => {
            tracing::warn!(host, database, table, column = %column, "table has excess column");
        }
        Divergence::ColumnMissing { column, want } => {
            tracing::warn!(host, database, table, column = %column, want = %want, "table is missing column");
        }
        Divergence::TypeMismatch { column, want, have } => {
            tracing::warn!(host, database, table, column = %column, want = %want, have = %have, "column type mismatch");
        }
    }
}
