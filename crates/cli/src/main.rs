use crate::error::CliError;
use chrono::{NaiveDate, Weekday};
use clap::Parser;
use commands::Commands;
use connectors::file::analysis::FieldAnalysis;
use connectors::file::extract::Extractor;
use connectors::holiday::HolidayClient;
use connectors::warehouse::rest::RestWarehouse;
use engine::enrich::CalendarEnricher;
use engine::loader::ResumableLoader;
use engine::state::CheckpointStore;
use engine::transform::{BatchTransformer, RoutingPolicy, read_file_count};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, info};

mod commands;
mod error;

const NULL_FIELD_REPORT: &str = "null_fields";
const PARSE_ERROR_REPORT: &str = "parse_errors";
const FIELD_ANALYSIS_REPORT: &str = "field_analysis";

#[derive(Parser)]
#[command(name = "rialto", version = "0.1.0", about = "Order archive ETL pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            staging,
            table,
            warehouse_url,
            holidays_url,
            country,
            rest_day,
            per_record,
            state,
            run_date,
        } => {
            let run_date = run_date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let extraction = extract_with_reports(&input, &staging)?;

            let holidays = Arc::new(HolidayClient::new(holidays_url, country)?);
            let mut enricher = CalendarEnricher::new(holidays);
            if let Some(day) = rest_day {
                let day = Weekday::from_str(&day).map_err(|_| CliError::InvalidRestDay(day))?;
                enricher = enricher.with_rest_day(day);
            }

            let policy = if per_record {
                RoutingPolicy::PerRecord
            } else {
                RoutingPolicy::PerBatch
            };
            let warehouse = Arc::new(RestWarehouse::new(warehouse_url)?);

            let mut transformer =
                BatchTransformer::new(&staging, &table, enricher)?.with_policy(policy);
            let report = transformer
                .transform(extraction.records(), warehouse.as_ref())
                .await?;
            transformer.close()?;

            let loader = ResumableLoader::new(
                &staging,
                table,
                warehouse,
                CheckpointStore::open(&state)?,
                run_date,
            )?;
            let summary = loader.start_load(0, report.files_created as u32).await?;

            info!(
                accepted_batches = report.accepted_batches,
                diverted_batches = report.diverted_batches,
                uploaded = summary.uploaded,
                failed = summary.failed,
                output_rows = summary.output_rows,
                "Pipeline run finished"
            );
        }
        Commands::Extract { input, output } => {
            extract_with_reports(&input, &output)?;
        }
        Commands::Analyze { input, output } => {
            let extraction = extract_with_reports(&input, &output)?;
            let analysis = FieldAnalysis::over(extraction.records());
            analysis.save_report(&output, FIELD_ANALYSIS_REPORT)?;
        }
        Commands::Resume {
            staging,
            table,
            warehouse_url,
            state,
            run_date,
        } => {
            resume_load(&staging, table, &warehouse_url, &state, run_date).await?;
        }
    }

    Ok(())
}

/// Extracts the archive and persists both rejection reports next to the
/// staging output.
fn extract_with_reports(input: &str, report_dir: &str) -> Result<Extractor, CliError> {
    let extraction = Extractor::read(input)?;
    extraction.save_null_field_report(report_dir, NULL_FIELD_REPORT)?;
    extraction.save_parse_error_report(report_dir, PARSE_ERROR_REPORT)?;

    info!(
        accepted = extraction.records().len(),
        null_fields = extraction.null_field_lines().len(),
        parse_errors = extraction.parse_error_lines().len(),
        "Extraction finished"
    );
    Ok(extraction)
}

/// Picks up an interrupted load after the last checkpointed batch. The batch
/// count comes from the transform log the producing run left behind.
async fn resume_load(
    staging: &str,
    table: String,
    warehouse_url: &str,
    state: &str,
    run_date: NaiveDate,
) -> Result<(), CliError> {
    let file_count = read_file_count(staging)?;
    let warehouse = Arc::new(RestWarehouse::new(warehouse_url)?);
    let loader = ResumableLoader::new(
        staging,
        table,
        warehouse,
        CheckpointStore::open(state)?,
        run_date,
    )?;

    // Re-attempt the last started index: its completion was never confirmed
    // and the duplicate screen of a later run covers the overlap.
    let start = loader.last_load()?.unwrap_or(0);
    if start as usize >= file_count {
        info!(run_date = %run_date, "Nothing to resume");
        return Ok(());
    }

    info!(run_date = %run_date, start, end = file_count, "Resuming load");
    let summary = loader.start_load(start, file_count as u32).await?;
    info!(
        uploaded = summary.uploaded,
        failed = summary.failed,
        output_rows = summary.output_rows,
        "Resumed load finished"
    );
    Ok(())
}
