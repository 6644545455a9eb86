use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Year-level holiday lookups. Implementations must never fail a record:
/// an unreachable service resolves to "no holiday".
#[async_trait]
pub trait HolidaySource: Send + Sync {
    /// The localized holiday name for the date, if any.
    async fn holiday_name(&self, date: NaiveDate) -> Option<String>;
}

#[derive(Debug, Clone, Deserialize)]
struct HolidayEntry {
    date: NaiveDate,
    #[serde(rename = "localName")]
    local_name: String,
}

/// Client for the external holiday service: one request per distinct year,
/// successful year lists cached for the rest of the run.
pub struct HolidayClient {
    http: reqwest::Client,
    base_url: String,
    country: String,
    cache: Mutex<HashMap<i32, Vec<HolidayEntry>>>,
}

impl HolidayClient {
    pub fn new(
        base_url: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(HolidayClient {
            http,
            base_url: base_url.into(),
            country: country.into(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn fetch_year(&self, year: i32) -> Result<Vec<HolidayEntry>, reqwest::Error> {
        let url = format!("{}/{}/{}", self.base_url, year, self.country);
        let entries: Vec<HolidayEntry> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(year, count = entries.len(), "Holiday list fetched");
        Ok(entries)
    }
}

#[async_trait]
impl HolidaySource for HolidayClient {
    async fn holiday_name(&self, date: NaiveDate) -> Option<String> {
        let year = date.year();
        let mut cache = self.cache.lock().await;

        if !cache.contains_key(&year) {
            match self.fetch_year(year).await {
                Ok(entries) => {
                    cache.insert(year, entries);
                }
                // Failures are not cached; a later record of the same year
                // gets another chance.
                Err(err) => {
                    warn!(year, error = %err, "Holiday lookup failed, treating date as non-holiday");
                    return None;
                }
            }
        }

        cache
            .get(&year)
            .and_then(|entries| entries.iter().find(|e| e.date == date))
            .map(|e| e.local_name.clone())
    }
}
