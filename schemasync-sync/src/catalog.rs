//! Catalog reads: the live `(name, type)` columns of one table on one replica.

use schemasync_core::types::LiveColumn;

use crate::error::ReplicaError;
use crate::pool::ReplicaHandle;
use crate::replica::Replica;

/// System catalog query, bound as `(database, table)`.
pub const COLUMNS_QUERY: &str = "SELECT name, type AS column_type FROM system.columns \
     WHERE database = ? AND table = ? ORDER BY position";

/// Fetch the live columns of `database.table` from one replica.
///
/// An empty result means the table does not exist there; it is never cached.
pub async fn read_columns<R: Replica>(
    handle: &ReplicaHandle<R>,
    database: &str,
    table: &str,
) -> Result<Vec<LiveColumn>, ReplicaError> {
    let columns = handle.replica().columns(database, table).await?;
    tracing::debug!(
        host = %handle.host(),
        database,
        table,
        rows = columns.len(),
        "read column catalog"
    );
    Ok(columns)
}
