pub mod error;
pub mod rest;

use crate::warehouse::error::WarehouseError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Final report of a finished load job.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadStats {
    pub output_rows: u64,
}

/// Completion handle for an asynchronous warehouse load job.
#[async_trait]
pub trait LoadJob: Send {
    /// Waits for the remote job to finish and reports the rows written, or
    /// surfaces the job's own error.
    async fn wait(self: Box<Self>) -> Result<LoadStats, WarehouseError>;
}

/// The remote analytical store, consumed as a queryable collaborator and a
/// load-job endpoint. Append-only and externally shared; other producers may
/// write concurrently.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// `MAX(ordine_data)` over the target table; `None` when it holds no rows.
    async fn max_order_date(&self, table: &str) -> Result<Option<NaiveDate>, WarehouseError>;

    /// Every stored row for the exact date, as ordered string fields.
    async fn rows_for_date(
        &self,
        table: &str,
        date: NaiveDate,
    ) -> Result<Vec<Vec<String>>, WarehouseError>;

    /// Stages the given CSV bytes into the table's write channel and starts
    /// an asynchronous load job.
    async fn start_load(&self, table: &str, data: Vec<u8>) -> Result<Box<dyn LoadJob>, WarehouseError>;
}
