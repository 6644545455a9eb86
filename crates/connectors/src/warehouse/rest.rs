use crate::warehouse::{LoadJob, LoadStats, Warehouse, error::WarehouseError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Warehouse client over the analytical store's REST facade.
pub struct RestWarehouse {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MaxDateResponse {
    rows: Vec<MaxDateRow>,
}

#[derive(Debug, Deserialize)]
struct MaxDateRow {
    max_order_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct LoadStarted {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    state: String,
    error: Option<String>,
    output_rows: Option<u64>,
}

impl RestWarehouse {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(RestWarehouse {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Warehouse for RestWarehouse {
    async fn max_order_date(&self, table: &str) -> Result<Option<NaiveDate>, WarehouseError> {
        let url = format!("{}/tables/{}/max-date", self.base_url, table);
        let response: MaxDateResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // The aggregate must come back as a single row.
        if response.rows.len() > 1 {
            return Err(WarehouseError::QueryShape {
                rows: response.rows.len(),
            });
        }
        Ok(response.rows.into_iter().next().and_then(|r| r.max_order_date))
    }

    async fn rows_for_date(
        &self,
        table: &str,
        date: NaiveDate,
    ) -> Result<Vec<Vec<String>>, WarehouseError> {
        let url = format!("{}/tables/{}/rows", self.base_url, table);
        let response: RowsResponse = self
            .http
            .get(&url)
            .query(&[("date", date.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.rows)
    }

    async fn start_load(
        &self,
        table: &str,
        data: Vec<u8>,
    ) -> Result<Box<dyn LoadJob>, WarehouseError> {
        let url = format!("{}/tables/{}/load", self.base_url, table);
        let started: LoadStarted = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "text/csv")
            .body(data)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(table, job_id = %started.job_id, "Load job started");
        Ok(Box::new(RestLoadJob {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            job_id: started.job_id,
        }))
    }
}

struct RestLoadJob {
    http: reqwest::Client,
    base_url: String,
    job_id: String,
}

#[async_trait]
impl LoadJob for RestLoadJob {
    async fn wait(self: Box<Self>) -> Result<LoadStats, WarehouseError> {
        let url = format!("{}/jobs/{}", self.base_url, self.job_id);
        loop {
            let status: JobStatus = self
                .http
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            match status.state.as_str() {
                "done" => {
                    return Ok(LoadStats {
                        output_rows: status.output_rows.unwrap_or(0),
                    });
                }
                "failed" => {
                    return Err(WarehouseError::JobFailed {
                        job_id: self.job_id,
                        message: status
                            .error
                            .unwrap_or_else(|| "no error detail reported".to_string()),
                    });
                }
                state => {
                    debug!(job_id = %self.job_id, state, "Load job still running");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_an_empty_max_date() {
        let payload = r#"{"rows": [{"max_order_date": null}]}"#;
        let response: MaxDateResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.rows.len(), 1);
        assert!(response.rows[0].max_order_date.is_none());
    }

    #[test]
    fn decodes_job_status_states() {
        let done: JobStatus =
            serde_json::from_str(r#"{"state": "done", "error": null, "output_rows": 42}"#).unwrap();
        assert_eq!(done.state, "done");
        assert_eq!(done.output_rows, Some(42));

        let failed: JobStatus =
            serde_json::from_str(r#"{"state": "failed", "error": "schema drift"}"#).unwrap();
        assert_eq!(failed.error.as_deref(), Some("schema drift"));
        assert!(failed.output_rows.is_none());
    }
}
