//! Turning divergences into repairs and running them.
//!
//! [`plan`] is the pure half: divergence + policy → at most one statement.
//! [`RepairWorkers`] is the effectful half: one task per replica drains a
//! bounded queue of statements for that replica, runs each exactly once and
//! records the outcome. The orchestrator joins the workers before it reports,
//! so no repair is still in flight when a run returns.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use schemasync_core::types::{DesiredObject, FixPolicy};
use schemasync_detector::Divergence;

use crate::error::{PlanError, SyncError};
use crate::pool::ReplicaPool;
use crate::replica::Replica;
use crate::statement::Statement;

/// Queued repairs per replica before `submit` waits.
pub const QUEUE_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// The statement that closes `divergence`, if `policy` allows one.
///
/// `Ok(None)` means the policy forbids the change. `Err` means the
/// definition cannot be created at all (a view without `as_select`).
pub fn plan(
    object: &DesiredObject,
    divergence: &Divergence,
    policy: FixPolicy,
) -> Result<Option<Statement>, PlanError> {
    if !policy.applies_fixes() {
        return Ok(None);
    }
    let table = object.name.clone();
    let statement = match divergence {
        Divergence::ObjectMissing => Statement::create(object)?,
        Divergence::ColumnExcess { column } => {
            if !policy.drops_columns() {
                return Ok(None);
            }
            Statement::DropColumn {
                table,
                column: column.clone(),
            }
        }
        Divergence::TypeMismatch { column, want, .. } => Statement::ModifyColumn {
            table,
            column: column.clone(),
            column_type: want.clone(),
        },
        Divergence::ColumnMissing { column, want } => Statement::AddColumn {
            table,
            column: column.clone(),
            column_type: want.clone(),
        },
    };
    Ok(Some(statement))
}

// ---------------------------------------------------------------------------
// Jobs and outcomes
// ---------------------------------------------------------------------------

/// One statement bound for one replica.
#[derive(Debug, Clone)]
pub struct RepairJob {
    pub database: String,
    pub object: String,
    pub column: Option<String>,
    pub statement: Statement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepairOutcome {
    Applied,
    Failed { error: String },
}

/// A finished repair, as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairRecord {
    pub host: String,
    pub database: String,
    pub object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub statement: String,
    #[serde(flatten)]
    pub outcome: RepairOutcome,
}

impl RepairRecord {
    pub fn applied(&self) -> bool {
        self.outcome == RepairOutcome::Applied
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

struct Worker {
    host: String,
    queue: mpsc::Sender<RepairJob>,
    task: JoinHandle<Vec<RepairRecord>>,
}

/// One repair worker per replica, indexed like the pool.
pub struct RepairWorkers {
    workers: Vec<Worker>,
}

impl RepairWorkers {
    /// Spawn a worker for every replica in `pool`. Must run inside a tokio runtime.
    pub fn spawn<R: Replica>(pool: &ReplicaPool<R>) -> Self {
        let workers = pool
            .iter()
            .map(|handle| {
                let (queue, jobs) = mpsc::channel(QUEUE_DEPTH);
                let host = handle.host().to_owned();
                let replica = Arc::clone(handle.replica());
                let task = tokio::spawn(run_worker(host.clone(), replica, jobs));
                Worker { host, queue, task }
            })
            .collect();
        Self { workers }
    }

    /// Queue `job` for the replica at `index`; waits while that queue is full.
    pub async fn submit(&self, index: usize, job: RepairJob) {
        let Some(worker) = self.workers.get(index) else {
            tracing::error!(index, "no repair worker for replica index");
            return;
        };
        if let Err(mpsc::error::SendError(job)) = worker.queue.send(job).await {
            tracing::error!(
                host = %worker.host,
                database = %job.database,
                table = %job.object,
                statement = %job.statement,
                "repair worker is gone; repair not attempted"
            );
        }
    }

    /// Close every queue and wait for all outstanding repairs.
    ///
    /// Records come back grouped by replica in pool order, each group in
    /// submission order.
    pub async fn finish(self) -> Result<Vec<RepairRecord>, SyncError> {
        let mut records = Vec::new();
        let mut first_error = None;
        for Worker { host, queue, task } in self.workers {
            drop(queue);
            match task.await {
                Ok(done) => records.extend(done),
                Err(source) => {
                    tracing::error!(host = %host, error = %source, "repair worker stopped abnormally");
                    first_error.get_or_insert(SyncError::Worker { host, source });
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(records),
        }
    }
}

async fn run_worker<R: Replica>(
    host: String,
    replica: Arc<R>,
    mut jobs: mpsc::Receiver<RepairJob>,
) -> Vec<RepairRecord> {
    let mut records = Vec::new();
    while let Some(job) = jobs.recv().await {
        records.push(apply(&host, replica.as_ref(), job).await);
    }
    records
}

async fn apply<R: Replica>(host: &str, replica: &R, job: RepairJob) -> RepairRecord {
    let sql = job.statement.to_string();
    let column = job.column.as_deref();
    tracing::debug!(host, database = %job.database, table = %job.object, column, statement = %sql, "executing");

    let outcome = match replica.execute(&job.database, &sql).await {
        Ok(()) => {
            tracing::info!(host, database = %job.database, table = %job.object, column, "{}", describe(&job.statement));
            RepairOutcome::Applied
        }
        Err(err) => {
            tracing::error!(
                host,
                database = %job.database,
                table = %job.object,
                column,
                statement = %sql,
                error = %err,
                "repair failed"
            );
            RepairOutcome::Failed {
                error: err.to_string(),
            }
        }
    };

    RepairRecord {
        host: host.to_owned(),
        database: job.database,
        object: job.object,
        column: job.column,
        statement: sql,
        outcome,
    }
}

fn describe(statement: &Statement) -> &'static str {
    match statement {
        Statement::CreateTable { .. } => "created table",
        Statement::CreateView { .. } => "created view",
        Statement::AddColumn { .. } => "added column",
        Statement::ModifyColumn { .. } => "modified column type",
        Statement::DropColumn { .. } => "dropped column",
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use schemasync_core::types::{
        ColumnMap, ObjectKind, ServerEndpoint, TableSource, TableSpec, ViewSpec,
    };

    use super::*;
    use crate::replica::memory::MemoryReplica;

    fn table() -> DesiredObject {
        DesiredObject {
            name: "t".into(),
            kind: ObjectKind::Table(TableSpec {
                columns: [("id".to_string(), "UInt64".to_string())].into_iter().collect(),
                engine: "Log".into(),
                source: TableSource::Columns,
            }),
        }
    }

    fn excess() -> Divergence {
        Divergence::ColumnExcess { column: "extra".into() }
    }

    fn missing() -> Divergence {
        Divergence::ColumnMissing {
            column: "name".into(),
            want: "String DEFAULT ''".into(),
        }
    }

    fn mismatch() -> Divergence {
        Divergence::TypeMismatch {
            column: "id".into(),
            want: "UInt64".into(),
            have: "UInt32".into(),
        }
    }

    #[rstest]
    #[case(Divergence::ObjectMissing)]
    #[case(excess())]
    #[case(missing())]
    #[case(mismatch())]
    fn check_only_never_plans(#[case] divergence: Divergence) {
        let planned = plan(&table(), &divergence, FixPolicy::new(false, true)).expect("plan");
        assert_eq!(planned, None);
    }

    #[test]
    fn excess_needs_drop_permission() {
        assert_eq!(plan(&table(), &excess(), FixPolicy::new(true, false)), Ok(None));
        let planned = plan(&table(), &excess(), FixPolicy::new(true, true))
            .expect("plan")
            .expect("statement");
        assert_eq!(planned.to_string(), "ALTER TABLE t DROP COLUMN extra");
    }

    #[test]
    fn missing_column_is_added_with_full_type() {
        let planned = plan(&table(), &missing(), FixPolicy::new(true, false))
            .expect("plan")
            .expect("statement");
        assert_eq!(planned.to_string(), "ALTER TABLE t ADD COLUMN name String DEFAULT ''");
    }

    #[test]
    fn mismatch_is_modified_to_comparable_type() {
        let planned = plan(&table(), &mismatch(), FixPolicy::new(true, false))
            .expect("plan")
            .expect("statement");
        assert_eq!(planned.to_string(), "ALTER TABLE t MODIFY COLUMN id UInt64");
    }

    #[test]
    fn missing_view_without_select_is_a_plan_error() {
        let view = DesiredObject {
            name: "v".into(),
            kind: ObjectKind::View(ViewSpec {
                columns: ColumnMap::new(),
                engine: None,
                materialized: true,
                populate: false,
                select: None,
            }),
        };
        let err = plan(&view, &Divergence::ObjectMissing, FixPolicy::new(true, false)).unwrap_err();
        assert_eq!(err, PlanError::ViewWithoutSelect { view: "v".into() });
    }

    #[tokio::test]
    async fn workers_run_every_job_once_and_record_failures() {
        let replica = MemoryReplica::new().rejecting("DROP");
        let pool = ReplicaPool::from_replicas(vec![(ServerEndpoint::new("ch-1", 8123), replica.clone())]);
        let workers = RepairWorkers::spawn(&pool);

        for statement in [
            Statement::AddColumn {
                table: "t".into(),
                column: "a".into(),
                column_type: "UInt8".into(),
            },
            Statement::DropColumn {
                table: "t".into(),
                column: "b".into(),
            },
        ] {
            let column = match &statement {
                Statement::AddColumn { column, .. } | Statement::DropColumn { column, .. } => {
                    Some(column.clone())
                }
                _ => None,
            };
            workers
                .submit(
                    0,
                    RepairJob {
                        database: "db".into(),
                        object: "t".into(),
                        column,
                        statement,
                    },
                )
                .await;
        }

        let records = workers.finish().await.expect("finish");
        assert_eq!(records.len(), 2);
        assert!(records[0].applied());
        assert!(matches!(records[1].outcome, RepairOutcome::Failed { .. }));
        assert_eq!(records[1].host, "ch-1");
        assert_eq!(replica.executed().len(), 2, "no retry after a failure");
    }
}
