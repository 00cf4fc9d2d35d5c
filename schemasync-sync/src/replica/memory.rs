//! In-process replicas.
//!
//! A [`MemoryReplica`] serves a catalog seeded by its owner and records every
//! statement it is asked to execute, in arrival order. Statements are not
//! applied to the catalog. Failures can be injected per operation.
//!
//! Handles are cheap clones over shared state, so a test can keep one handle
//! and hand another to a [`MemoryConnector`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use schemasync_core::types::{LiveColumn, ServerEndpoint};

use crate::error::ReplicaError;
use crate::replica::{Connector, Replica};

/// A statement received by a [`MemoryReplica`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStatement {
    pub database: String,
    pub sql: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryReplica {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// database → table → columns
    catalog: HashMap<String, HashMap<String, Vec<LiveColumn>>>,
    executed: Vec<ExecutedStatement>,
    closed: bool,
    ping_error: Option<String>,
    close_error: Option<String>,
    unusable_databases: HashSet<String>,
    unreadable_tables: HashSet<String>,
    rejected_fragments: Vec<String>,
}

impl MemoryReplica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `database` exist with no tables.
    pub fn with_database(self, database: &str) -> Self {
        self.lock().catalog.entry(database.to_owned()).or_default();
        self
    }

    /// Seed a table's column catalog (and its database).
    pub fn with_table(self, database: &str, table: &str, columns: &[(&str, &str)]) -> Self {
        let columns = columns
            .iter()
            .map(|(name, ty)| LiveColumn::new(*name, *ty))
            .collect();
        self.lock()
            .catalog
            .entry(database.to_owned())
            .or_default()
            .insert(table.to_owned(), columns);
        self
    }

    pub fn failing_ping(self, message: &str) -> Self {
        self.lock().ping_error = Some(message.to_owned());
        self
    }

    pub fn failing_close(self, message: &str) -> Self {
        self.lock().close_error = Some(message.to_owned());
        self
    }

    /// `use_database` fails for `database` even if it exists.
    pub fn failing_use(self, database: &str) -> Self {
        self.lock().unusable_databases.insert(database.to_owned());
        self
    }

    /// Catalog reads for `table` fail.
    pub fn failing_columns(self, table: &str) -> Self {
        self.lock().unreadable_tables.insert(table.to_owned());
        self
    }

    /// Statements containing `fragment` are rejected (and still recorded).
    pub fn rejecting(self, fragment: &str) -> Self {
        self.lock().rejected_fragments.push(fragment.to_owned());
        self
    }

    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.lock().executed.clone()
    }

    /// Just the SQL text of [`executed`](Self::executed).
    pub fn executed_sql(&self) -> Vec<String> {
        self.lock().executed.iter().map(|s| s.sql.clone()).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Replica for MemoryReplica {
    async fn ping(&self) -> Result<(), ReplicaError> {
        match &self.lock().ping_error {
            Some(message) => Err(ReplicaError::Rejected(message.clone())),
            None => Ok(()),
        }
    }

    async fn use_database(&self, database: &str) -> Result<(), ReplicaError> {
        let state = self.lock();
        if state.unusable_databases.contains(database) || !state.catalog.contains_key(database) {
            return Err(ReplicaError::Rejected(format!(
                "database {database} does not exist"
            )));
        }
        Ok(())
    }

    async fn columns(&self, database: &str, table: &str) -> Result<Vec<LiveColumn>, ReplicaError> {
        let state = self.lock();
        if state.unreadable_tables.contains(table) {
            return Err(ReplicaError::Rejected(format!(
                "catalog read for {database}.{table} failed"
            )));
        }
        Ok(state
            .catalog
            .get(database)
            .and_then(|tables| tables.get(table))
            .cloned()
            .unwrap_or_default())
    }

    async fn execute(&self, database: &str, statement: &str) -> Result<(), ReplicaError> {
        let mut state = self.lock();
        state.executed.push(ExecutedStatement {
            database: database.to_owned(),
            sql: statement.to_owned(),
        });
        if let Some(fragment) = state
            .rejected_fragments
            .iter()
            .find(|f| statement.contains(f.as_str()))
        {
            return Err(ReplicaError::Rejected(format!(
                "statement rejected ({fragment})"
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ReplicaError> {
        let mut state = self.lock();
        state.closed = true;
        match &state.close_error {
            Some(message) => Err(ReplicaError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}

/// Hands out [`MemoryReplica`] handles by host name.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    replicas: HashMap<String, MemoryReplica>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replica(mut self, host: &str, replica: MemoryReplica) -> Self {
        self.replicas.insert(host.to_owned(), replica);
        self
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Replica = MemoryReplica;

    async fn open(&self, endpoint: &ServerEndpoint) -> Result<MemoryReplica, ReplicaError> {
        self.replicas
            .get(&endpoint.host)
            .cloned()
            .ok_or_else(|| ReplicaError::Rejected(format!("connection refused: {endpoint}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_table_reads_as_empty() {
        let replica = MemoryReplica::new().with_database("db");
        let columns = replica.columns("db", "nope").await.expect("columns");
        assert!(columns.is_empty());
    }

    #[tokio::test]
    async fn rejected_statements_are_still_recorded() {
        let replica = MemoryReplica::new().rejecting("DROP");
        let err = replica
            .execute("db", "ALTER TABLE t DROP COLUMN x")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
        assert_eq!(replica.executed_sql(), ["ALTER TABLE t DROP COLUMN x"]);
    }

    #[tokio::test]
    async fn unknown_database_cannot_be_used() {
        let replica = MemoryReplica::new().with_database("db");
        assert!(replica.use_database("db").await.is_ok());
        assert!(replica.use_database("other").await.is_err());
    }
}
