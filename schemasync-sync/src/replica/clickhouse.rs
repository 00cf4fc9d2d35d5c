//! ClickHouse replicas over the HTTP interface.
//!
//! HTTP is stateless, so there is no session to hold a `USE` across calls:
//! the database is attached to a client clone per call instead, and
//! `use_database` only proves the database is usable.

use async_trait::async_trait;
use ::clickhouse::{Client, Row};
use serde::Deserialize;

use schemasync_core::types::{LiveColumn, ServerEndpoint};

use crate::catalog::COLUMNS_QUERY;
use crate::error::ReplicaError;
use crate::replica::{Connector, Replica};

/// Opens a [`ClickHouseReplica`] for `http://<host>:<port>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickHouseConnector;

#[async_trait]
impl Connector for ClickHouseConnector {
    type Replica = ClickHouseReplica;

    async fn open(&self, endpoint: &ServerEndpoint) -> Result<ClickHouseReplica, ReplicaError> {
        Ok(ClickHouseReplica::new(endpoint))
    }
}

#[derive(Clone)]
pub struct ClickHouseReplica {
    client: Client,
}

#[derive(Debug, Row, Deserialize)]
struct ColumnRow {
    name: String,
    column_type: String,
}

impl ClickHouseReplica {
    pub fn new(endpoint: &ServerEndpoint) -> Self {
        let client = Client::default()
            .with_url(format!("http://{}:{}", endpoint.host, endpoint.port))
            .with_user(endpoint.user.as_str())
            .with_password(endpoint.pass.as_str());
        Self { client }
    }

    fn in_database(&self, database: &str) -> Client {
        self.client.clone().with_database(database)
    }
}

/// Configuration text carries no bind arguments; the client reads a bare `?`
/// as one, and `??` as a literal `?`.
fn unbound(statement: &str) -> String {
    statement.replace('?', "??")
}

#[async_trait]
impl Replica for ClickHouseReplica {
    async fn ping(&self) -> Result<(), ReplicaError> {
        self.client.query("SELECT 1").execute().await?;
        Ok(())
    }

    async fn use_database(&self, database: &str) -> Result<(), ReplicaError> {
        // The server rejects any request whose database setting is unknown.
        self.in_database(database)
            .query("SELECT 1")
            .execute()
            .await?;
        Ok(())
    }

    async fn columns(&self, database: &str, table: &str) -> Result<Vec<LiveColumn>, ReplicaError> {
        let rows = self
            .client
            .query(COLUMNS_QUERY)
            .bind(database)
            .bind(table)
            .fetch_all::<ColumnRow>()
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| LiveColumn::new(row.name, row.column_type))
            .collect())
    }

    async fn execute(&self, database: &str, statement: &str) -> Result<(), ReplicaError> {
        self.in_database(database)
            .query(&unbound(statement))
            .execute()
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ReplicaError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_marks_are_literal() {
        assert_eq!(unbound("SELECT 1"), "SELECT 1");
        assert_eq!(
            unbound("SELECT x > 0 ? 'a?b' : 'c' FROM t"),
            "SELECT x > 0 ?? 'a??b' : 'c' FROM t"
        );
    }

    #[tokio::test]
    async fn statement_with_question_mark_reaches_the_transport() {
        // Nothing listens on port 1, so the only failure left is the connection.
        let replica = ClickHouseReplica::new(&ServerEndpoint::new("127.0.0.1", 1));
        let err = replica
            .execute(
                "db",
                "CREATE VIEW IF NOT EXISTS v AS SELECT match(s, 'a?b') FROM t",
            )
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(!text.contains("unbound"), "{text}");
        assert!(matches!(err, ReplicaError::ClickHouse(_)), "{text}");
    }
}
