use crate::record::OrderRecord;
use chrono::NaiveDate;

/// Contiguous run of records sharing one order date, closed by a date change
/// or end of input.
#[derive(Debug, Clone)]
pub struct DateBatch {
    pub index: usize,
    pub date: NaiveDate,
    pub records: Vec<OrderRecord>,
}

impl DateBatch {
    pub fn new(index: usize, date: NaiveDate, records: Vec<OrderRecord>) -> Self {
        DateBatch {
            index,
            date,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
