//! The `schemasync` run: load, connect, check (and repair), close.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use schemasync_core::{config, FixPolicy};
use schemasync_sync::replica::clickhouse::ClickHouseConnector;
use schemasync_sync::{ReplicaPool, Synchronizer};

use super::report;

/// Arguments for a check or sync run.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// YAML file declaring servers and databases.
    #[arg(long, default_value = "config.yml")]
    pub config: PathBuf,

    /// Apply corrective statements instead of only reporting drift.
    #[arg(long)]
    pub sync: bool,

    /// Also drop columns the configuration does not declare.
    #[arg(long, requires = "sync")]
    pub drop_columns: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub fn policy(&self) -> FixPolicy {
        FixPolicy::new(self.sync, self.drop_columns)
    }

    pub async fn run(self) -> Result<()> {
        let config = config::load(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;
        tracing::info!(
            servers = config.servers.len(),
            databases = config.databases.len(),
            "configuration loaded"
        );

        let (pool, connect_error) =
            ReplicaPool::connect(&ClickHouseConnector, &config.servers).await;
        // Partial connectivity is not an operating mode: no further calls.
        if let Some(err) = connect_error {
            drop(pool);
            return Err(err).context("cannot reach every replica");
        }

        let policy = self.policy();
        let synchronizer = Synchronizer::new(pool, policy);
        let outcome = synchronizer.run(&config.databases).await;
        let closed = synchronizer.into_pool().close().await;

        let run_report = outcome.context("schema check aborted")?;
        closed.context("failed to close replicas")?;

        if self.json {
            report::print_json(&run_report)
        } else {
            report::print_summary(&run_report, policy);
            Ok(())
        }
    }
}
