use chrono::NaiveDate;
use connectors::warehouse::{Warehouse, error::WarehouseError};
use tracing::{info, warn};

/// Point-in-time duplicate screen for one date batch.
///
/// The remote max-date snapshot is taken once at construction and never
/// refreshed; matchers are value objects scoped to a single batch, which
/// bounds staleness to that batch's lifetime. Comparison is exact and
/// field-order-sensitive over the canonical comma-joined row; any
/// serialization drift between producer and remote schema shows up as a
/// false negative.
pub struct ConflictMatcher<'a> {
    warehouse: &'a dyn Warehouse,
    table: &'a str,
    batch_date: NaiveDate,
    remote_date: Option<NaiveDate>,
}

impl<'a> ConflictMatcher<'a> {
    /// Snapshots the remote max order date for the table. An unreachable or
    /// empty store degrades to "no remote data"; only a broken aggregate
    /// shape is surfaced.
    pub async fn snapshot(
        warehouse: &'a dyn Warehouse,
        table: &'a str,
        batch_date: NaiveDate,
    ) -> Result<ConflictMatcher<'a>, WarehouseError> {
        let remote_date = match warehouse.max_order_date(table).await {
            Ok(date) => date,
            Err(err) if err.is_query_shape() => return Err(err),
            Err(err) => {
                warn!(table, error = %err, "Warehouse unreachable, assuming no remote data");
                None
            }
        };

        info!(table, batch_date = %batch_date, remote_date = ?remote_date, "Conflict matcher ready");
        Ok(ConflictMatcher {
            warehouse,
            table,
            batch_date,
            remote_date,
        })
    }

    pub fn remote_date(&self) -> Option<NaiveDate> {
        self.remote_date
    }

    /// True when the remote ingestion frontier reaches this batch's date,
    /// i.e. the batch needs row-level screening.
    pub fn is_date_matching(&self) -> bool {
        match self.remote_date {
            Some(remote) => remote <= self.batch_date,
            None => false,
        }
    }

    /// Number of batch rows that collide exactly with a stored remote row.
    pub async fn conflict_row_count(&self, local_rows: &[String]) -> usize {
        if !self.is_date_matching() {
            return 0;
        }
        match self.fetch_remote_rows().await {
            Ok(remote_rows) => remote_rows
                .iter()
                .map(|remote| local_rows.iter().filter(|local| *local == remote).count())
                .sum(),
            Err(err) => {
                warn!(table = self.table, error = %err, "Row fetch failed, reporting no conflicts");
                0
            }
        }
    }

    /// Short-circuiting variant of `conflict_row_count`: true on the first
    /// exact collision. Used to decide batch routing without counting.
    pub async fn is_record_matching(&self, local_rows: &[String]) -> bool {
        if !self.is_date_matching() {
            return false;
        }
        match self.fetch_remote_rows().await {
            Ok(remote_rows) => remote_rows
                .iter()
                .any(|remote| local_rows.iter().any(|local| local == remote)),
            Err(err) => {
                warn!(table = self.table, error = %err, "Row fetch failed, reporting no conflicts");
                false
            }
        }
    }

    /// Per-row collision flags, for per-record routing.
    pub async fn matching_rows(&self, local_rows: &[String]) -> Vec<bool> {
        if !self.is_date_matching() {
            return vec![false; local_rows.len()];
        }
        match self.fetch_remote_rows().await {
            Ok(remote_rows) => local_rows
                .iter()
                .map(|local| remote_rows.iter().any(|remote| remote == local))
                .collect(),
            Err(err) => {
                warn!(table = self.table, error = %err, "Row fetch failed, reporting no conflicts");
                vec![false; local_rows.len()]
            }
        }
    }

    // Remote rows are fetched for the snapshot date, as the original store
    // contract works: with one date per batch, only the equal-date case can
    // ever produce a collision.
    async fn fetch_remote_rows(&self) -> Result<Vec<String>, WarehouseError> {
        let Some(date) = self.remote_date else {
            return Ok(Vec::new());
        };
        let rows = self.warehouse.rows_for_date(self.table, date).await?;
        Ok(rows.into_iter().map(|row| row.join(",")).collect())
    }
}
