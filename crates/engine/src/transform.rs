use crate::enrich::{CalendarEnricher, WAREHOUSE_HEADER, warehouse_row};
use crate::error::TransformError;
use crate::matcher::ConflictMatcher;
use chrono::NaiveDate;
use connectors::warehouse::Warehouse;
use model::batch::DateBatch;
use model::record::OrderRecord;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub const BATCH_FILE_PREFIX: &str = "load_data_";
pub const DUPLICATE_FILE: &str = "duplicate_data.csv";
pub const DISCARD_FILE: &str = "discarded_records.csv";
const FILE_COUNT_LOG: &str = "log_transform.log";

/// How a batch with remote collisions is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingPolicy {
    /// One colliding record diverts the whole batch. Conservative default:
    /// duplicate avoidance over partial acceptance.
    #[default]
    PerBatch,
    /// Only colliding records are diverted; the rest of the batch is kept.
    PerRecord,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransformReport {
    pub accepted_batches: usize,
    pub diverted_batches: usize,
    pub accepted_records: usize,
    pub diverted_records: usize,
    /// Records dropped for a value outside its domain, written to the
    /// discard sink.
    pub rejected_records: usize,
    /// Total batch files produced so far in this run.
    pub files_created: usize,
}

type PendingWrite = JoinHandle<Result<csv::Writer<File>, TransformError>>;

/// Groups validated records into date-contiguous batches, screens each batch
/// against the warehouse, and routes it to the accepted batch file or the
/// duplicate sink.
///
/// Accepted-batch writes run on a background task overlapped with the scan
/// of the next batch; at most one write is in flight, so appends stay
/// ordered. Input must be ordered by date: a date step backwards is an
/// explicit error, never a silently fragmented batch.
pub struct BatchTransformer {
    staging_dir: PathBuf,
    table: String,
    enricher: CalendarEnricher,
    policy: RoutingPolicy,
    files_created: usize,
    duplicate_sink: Option<csv::Writer<File>>,
    duplicate_sink_spent: bool,
}

impl BatchTransformer {
    /// Creates the staging directory if needed.
    pub fn new(
        staging_dir: impl AsRef<Path>,
        table: impl Into<String>,
        enricher: CalendarEnricher,
    ) -> Result<Self, TransformError> {
        let staging_dir = staging_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&staging_dir)?;
        Ok(BatchTransformer {
            staging_dir,
            table: table.into(),
            enricher,
            policy: RoutingPolicy::default(),
            files_created: 0,
            duplicate_sink: None,
            duplicate_sink_spent: false,
        })
    }

    pub fn with_policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn files_created(&self) -> usize {
        self.files_created
    }

    /// Transforms one extraction's worth of records into the next numbered
    /// batch file. Records must be date-ordered; each closed batch is
    /// enriched, screened, and routed before the next one is scanned.
    pub async fn transform(
        &mut self,
        records: &[OrderRecord],
        warehouse: &dyn Warehouse,
    ) -> Result<TransformReport, TransformError> {
        let mut report = TransformReport::default();
        let mut pending: Option<PendingWrite> = None;

        let scan = self
            .scan_batches(records, warehouse, &mut pending, &mut report)
            .await;

        // The in-flight write settles first, error path included, so the
        // batch file's contents are deterministic.
        let close = match pending.take() {
            Some(handle) => join_write(handle).await.and_then(|mut writer| {
                writer.flush()?;
                Ok(())
            }),
            None => Ok(()),
        };
        scan?;
        close?;

        if report.accepted_batches == 0 {
            // No batch was accepted; the file still gets created with its
            // header so the numbering the loader consumes stays dense.
            let mut writer = self.open_batch_file()?;
            writer.flush()?;
        }
        if let Some(sink) = self.duplicate_sink.as_mut() {
            sink.flush()?;
        }

        self.files_created += 1;
        self.persist_file_count()?;
        report.files_created = self.files_created;

        info!(
            accepted_batches = report.accepted_batches,
            diverted_batches = report.diverted_batches,
            files_created = report.files_created,
            "Transformation finished"
        );
        Ok(report)
    }

    /// Closes the duplicate sink for good. Further diverted batches in this
    /// run are a usage error.
    pub fn close(&mut self) -> Result<(), TransformError> {
        if let Some(mut sink) = self.duplicate_sink.take() {
            sink.flush()?;
            self.duplicate_sink_spent = true;
        }
        Ok(())
    }

    async fn scan_batches(
        &mut self,
        records: &[OrderRecord],
        warehouse: &dyn Warehouse,
        pending: &mut Option<PendingWrite>,
        report: &mut TransformReport,
    ) -> Result<(), TransformError> {
        let mut batch_index = 0usize;
        let mut current_date: Option<NaiveDate> = None;
        let mut bucket: Vec<OrderRecord> = Vec::new();

        for record in records {
            match current_date {
                Some(date) if record.order_date == date => {}
                Some(date) => {
                    if record.order_date < date {
                        return Err(TransformError::UnsortedInput {
                            previous: date,
                            current: record.order_date,
                        });
                    }
                    let batch = DateBatch::new(batch_index, date, std::mem::take(&mut bucket));
                    batch_index += 1;
                    self.route_batch(batch, warehouse, pending, report).await?;
                    current_date = Some(record.order_date);
                }
                None => current_date = Some(record.order_date),
            }
            bucket.push(record.clone());
        }
        if let Some(date) = current_date {
            let batch = DateBatch::new(batch_index, date, bucket);
            self.route_batch(batch, warehouse, pending, report).await?;
        }
        Ok(())
    }

    async fn route_batch(
        &mut self,
        batch: DateBatch,
        warehouse: &dyn Warehouse,
        pending: &mut Option<PendingWrite>,
        report: &mut TransformReport,
    ) -> Result<(), TransformError> {
        let facts = self.enricher.facts(batch.date).await;
        let mut rows = Vec::with_capacity(batch.len());
        for record in &batch.records {
            match warehouse_row(record, &facts) {
                Ok(row) => rows.push(row),
                // A value outside its domain rejects the one record, never
                // the batch or the run; the raw fields go to the discard
                // sink for operator review.
                Err(TransformError::DisallowedColor(color)) => {
                    warn!(
                        date = %batch.date,
                        order_id = record.order_id,
                        color = %color,
                        "Record rejected, color outside the allowed set"
                    );
                    self.write_discard(record)?;
                    report.rejected_records += 1;
                }
                Err(err) => return Err(err),
            }
        }
        if rows.is_empty() {
            return Ok(());
        }
        let canonical: Vec<String> = rows.iter().map(|row| row.join(",")).collect();

        // Remote errors during screening degrade to "no conflict": the batch
        // is still written, just without duplicate protection.
        let flags = match ConflictMatcher::snapshot(warehouse, &self.table, batch.date).await {
            Ok(matcher) => match self.policy {
                RoutingPolicy::PerBatch => {
                    if matcher.is_record_matching(&canonical).await {
                        vec![true; rows.len()]
                    } else {
                        vec![false; rows.len()]
                    }
                }
                RoutingPolicy::PerRecord => matcher.matching_rows(&canonical).await,
            },
            Err(err) => {
                error!(
                    table = %self.table,
                    date = %batch.date,
                    error = %err,
                    "Conflict screening unavailable, accepting batch without duplicate protection"
                );
                vec![false; rows.len()]
            }
        };

        let mut accepted = Vec::new();
        let mut diverted = Vec::new();
        for (row, is_duplicate) in rows.into_iter().zip(flags) {
            if is_duplicate {
                diverted.push(row);
            } else {
                accepted.push(row);
            }
        }

        if !diverted.is_empty() {
            warn!(
                date = %batch.date,
                records = diverted.len(),
                "Batch collides with remote rows, diverting to the duplicate sink"
            );
            report.diverted_batches += 1;
            report.diverted_records += diverted.len();
            self.write_duplicates(&diverted)?;
        }

        if !accepted.is_empty() {
            info!(date = %batch.date, records = accepted.len(), "Batch accepted");
            report.accepted_batches += 1;
            report.accepted_records += accepted.len();

            // Recover the writer from the previous background write, then
            // hand it to the next one while the scan moves on.
            let mut writer = match pending.take() {
                Some(handle) => join_write(handle).await?,
                None => self.open_batch_file()?,
            };
            *pending = Some(tokio::task::spawn_blocking(move || {
                for row in &accepted {
                    writer.write_record(row)?;
                }
                Ok(writer)
            }));
        }

        Ok(())
    }

    fn open_batch_file(&self) -> Result<csv::Writer<File>, TransformError> {
        let path = self.staging_dir.join(format!(
            "{}{}.csv",
            BATCH_FILE_PREFIX, self.files_created
        ));
        let file = File::create(&path)?;
        // Canonical rows are compared byte-for-byte against remote data, so
        // quoting must never alter them.
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(file);
        writer.write_record(WAREHOUSE_HEADER)?;
        info!(path = %path.display(), "Batch file opened");
        Ok(writer)
    }

    fn write_duplicates(&mut self, rows: &[Vec<String>]) -> Result<(), TransformError> {
        if self.duplicate_sink.is_none() {
            if self.duplicate_sink_spent {
                return Err(TransformError::DuplicateSinkReopened);
            }
            let path = self.staging_dir.join(DUPLICATE_FILE);
            let file = File::create(&path)?;
            let mut writer = csv::WriterBuilder::new()
                .quote_style(csv::QuoteStyle::Never)
                .from_writer(file);
            writer.write_record(WAREHOUSE_HEADER)?;
            warn!(path = %path.display(), "Duplicate sink opened, review after the load");
            self.duplicate_sink = Some(writer);
        }
        if let Some(sink) = self.duplicate_sink.as_mut() {
            for row in rows {
                sink.write_record(row)?;
            }
        }
        Ok(())
    }

    /// Appends the record's raw input fields to the discard sink, one line
    /// per rejected record.
    fn write_discard(&self, record: &OrderRecord) -> Result<(), TransformError> {
        let path = self.staging_dir.join(DISCARD_FILE);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", record.to_fields().join(";"))?;
        Ok(())
    }

    /// Persists the produced-file count for the loader to consume.
    fn persist_file_count(&self) -> Result<(), TransformError> {
        let path = self.staging_dir.join(FILE_COUNT_LOG);
        std::fs::write(path, self.files_created.to_string())?;
        Ok(())
    }
}

/// Reads back the produced-file count persisted by a transformer run.
pub fn read_file_count(staging_dir: impl AsRef<Path>) -> Result<usize, TransformError> {
    let path = staging_dir.as_ref().join(FILE_COUNT_LOG);
    let contents = std::fs::read_to_string(path)?;
    contents
        .trim()
        .parse()
        .map_err(|_| TransformError::CorruptFileCount(contents.trim().to_string()))
}

async fn join_write(handle: PendingWrite) -> Result<csv::Writer<File>, TransformError> {
    handle
        .await
        .map_err(|err| TransformError::WriteTask(err.to_string()))?
}
