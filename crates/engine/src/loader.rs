use crate::error::LoadError;
use crate::state::CheckpointStore;
use crate::transform::BATCH_FILE_PREFIX;
use chrono::NaiveDate;
use connectors::warehouse::{LoadStats, Warehouse};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadSummary {
    pub uploaded: usize,
    pub failed: usize,
    pub output_rows: u64,
}

/// Uploads numbered batch files to the warehouse, checkpointing each handoff
/// so an interrupted run resumes at the first batch that was never started.
///
/// Upload completion is awaited on a background task overlapped with reading
/// and starting the next batch; at most one wait is outstanding at a time.
pub struct ResumableLoader {
    staging_dir: PathBuf,
    table: String,
    warehouse: Arc<dyn Warehouse>,
    checkpoints: CheckpointStore,
    run_date: NaiveDate,
}

impl std::fmt::Debug for ResumableLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumableLoader")
            .field("staging_dir", &self.staging_dir)
            .field("table", &self.table)
            .field("checkpoints", &self.checkpoints)
            .field("run_date", &self.run_date)
            .finish_non_exhaustive()
    }
}

impl ResumableLoader {
    pub fn new(
        staging_dir: impl AsRef<Path>,
        table: impl Into<String>,
        warehouse: Arc<dyn Warehouse>,
        checkpoints: CheckpointStore,
        run_date: NaiveDate,
    ) -> Result<Self, LoadError> {
        let staging_dir = staging_dir.as_ref().to_path_buf();
        if !staging_dir.is_dir() {
            return Err(LoadError::DirectoryNotFound(
                staging_dir.display().to_string(),
            ));
        }
        Ok(ResumableLoader {
            staging_dir,
            table: table.into(),
            warehouse,
            checkpoints,
            run_date,
        })
    }

    /// Last started batch index for this run, if any. Resume re-attempts
    /// this index, since its completion was never confirmed.
    pub fn last_load(&self) -> Result<Option<u32>, LoadError> {
        Ok(self.checkpoints.last_load(self.run_date)?)
    }

    pub fn batch_file(&self, index: u32) -> PathBuf {
        self.staging_dir
            .join(format!("{BATCH_FILE_PREFIX}{index}.csv"))
    }

    /// Uploads batch files `start..end`. A failed upload is logged and
    /// counted, not fatal; a missing batch file is, since the numbering is
    /// dense by construction.
    pub async fn start_load(&self, start: u32, end: u32) -> Result<LoadSummary, LoadError> {
        let mut summary = LoadSummary::default();
        let mut pending: Option<tokio::task::JoinHandle<Result<LoadStats, _>>> = None;

        if start < end {
            self.checkpoints.save(self.run_date, start)?;
        }

        for index in start..end {
            let path = self.batch_file(index);
            let data = tokio::fs::read(&path)
                .await
                .map_err(|source| LoadError::BatchFile {
                    path: path.display().to_string(),
                    source,
                })?;

            info!(index, path = %path.display(), bytes = data.len(), "Starting upload");
            let job = self.warehouse.start_load(&self.table, data).await?;

            // The previous upload must settle before a new wait is spawned.
            if let Some(handle) = pending.take() {
                self.absorb(handle, &mut summary).await;
            }
            pending = Some(tokio::spawn(job.wait()));

            // The checkpoint records "started", not "completed": resume
            // re-attempts this index, and the duplicate screen on the re-run
            // catches anything the interrupted upload already landed.
            self.checkpoints.save(self.run_date, index)?;
        }

        if let Some(handle) = pending.take() {
            self.absorb(handle, &mut summary).await;
        }

        info!(
            uploaded = summary.uploaded,
            failed = summary.failed,
            output_rows = summary.output_rows,
            "Load finished"
        );
        Ok(summary)
    }

    async fn absorb(
        &self,
        handle: tokio::task::JoinHandle<Result<LoadStats, connectors::warehouse::error::WarehouseError>>,
        summary: &mut LoadSummary,
    ) {
        match handle.await {
            Ok(Ok(stats)) => {
                summary.uploaded += 1;
                summary.output_rows += stats.output_rows;
            }
            Ok(Err(err)) => {
                error!(table = %self.table, error = %err, "Upload failed");
                summary.failed += 1;
            }
            Err(err) => {
                error!(table = %self.table, error = %err, "Upload wait task panicked");
                summary.failed += 1;
            }
        }
    }
}
