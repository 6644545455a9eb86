use async_trait::async_trait;
use chrono::NaiveDate;
use connectors::holiday::HolidaySource;
use connectors::warehouse::{LoadJob, LoadStats, Warehouse, error::WarehouseError};
use model::record::OrderRecord;
use std::sync::Mutex;

pub(crate) struct FixedHolidays(pub Vec<(NaiveDate, &'static str)>);

#[async_trait]
impl HolidaySource for FixedHolidays {
    async fn holiday_name(&self, date: NaiveDate) -> Option<String> {
        self.0
            .iter()
            .find(|(d, _)| *d == date)
            .map(|(_, name)| name.to_string())
    }
}

pub(crate) struct NoHolidays;

#[async_trait]
impl HolidaySource for NoHolidays {
    async fn holiday_name(&self, _date: NaiveDate) -> Option<String> {
        None
    }
}

/// In-memory warehouse double: a fixed max date, fixed remote rows, and a
/// log of every upload it receives.
#[derive(Default)]
pub(crate) struct MockWarehouse {
    pub max_date: Option<NaiveDate>,
    pub rows: Vec<Vec<String>>,
    pub uploads: Mutex<Vec<Vec<u8>>>,
    pub unreachable: bool,
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn max_order_date(&self, _table: &str) -> Result<Option<NaiveDate>, WarehouseError> {
        if self.unreachable {
            return Err(WarehouseError::Decode("store unreachable".to_string()));
        }
        Ok(self.max_date)
    }

    async fn rows_for_date(
        &self,
        _table: &str,
        _date: NaiveDate,
    ) -> Result<Vec<Vec<String>>, WarehouseError> {
        if self.unreachable {
            return Err(WarehouseError::Decode("store unreachable".to_string()));
        }
        Ok(self.rows.clone())
    }

    async fn start_load(
        &self,
        _table: &str,
        data: Vec<u8>,
    ) -> Result<Box<dyn LoadJob>, WarehouseError> {
        // Rows = data lines minus the header.
        let lines = data.iter().filter(|b| **b == b'\n').count();
        self.uploads
            .lock()
            .expect("uploads lock poisoned")
            .push(data);
        Ok(Box::new(MockLoadJob {
            output_rows: lines.saturating_sub(1) as u64,
        }))
    }
}

pub(crate) struct MockLoadJob {
    output_rows: u64,
}

#[async_trait]
impl LoadJob for MockLoadJob {
    async fn wait(self: Box<Self>) -> Result<LoadStats, WarehouseError> {
        Ok(LoadStats {
            output_rows: self.output_rows,
        })
    }
}

pub(crate) fn record_for_date(order_id: i64, date: &str) -> OrderRecord {
    let id = order_id.to_string();
    let fields: [&str; 16] = [
        id.as_str(),
        date,
        "IT",
        "M",
        "1",
        "100.0",
        "0",
        "0",
        "Diesel",
        "P/E2020",
        "Blu",
        "Uomo",
        "PayPal",
        "L",
        "Jeans",
        "Uomo Abbigliamento",
    ];
    OrderRecord::parse(&fields).expect("fixture record must parse")
}
