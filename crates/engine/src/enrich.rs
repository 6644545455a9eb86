use crate::country::country_name;
use crate::error::TransformError;
use chrono::{Datelike, NaiveDate, Weekday};
use connectors::holiday::HolidaySource;
use model::record::{OrderRecord, is_allowed_color};
use std::collections::HashMap;
use std::sync::Arc;

pub const NO_HOLIDAY: &str = "NONE";
pub const WORKING: &str = "WORKING";
pub const NON_WORKING: &str = "NON-WORKING";
pub const HOLIDAY: &str = "HOLIDAY";
pub const NON_HOLIDAY: &str = "NON-HOLIDAY";

/// Column layout of the batch files uploaded to the warehouse.
pub const WAREHOUSE_HEADER: [&str; 28] = [
    "ordine_id_carrello",
    "ordine_data",
    "ordine_giorno_nome",
    "ordine_giorno_dell_anno",
    "ordine_mese_nome",
    "ordine_anno_valore",
    "ordine_mese_valore",
    "ordine_trimestre",
    "ordine_periodo",
    "ordine_trimestre_anno",
    "ordine_mese_anno",
    "ordine_feriale_non",
    "ordine_festivo_non",
    "ordine_codice_stato",
    "ordine_stato_nome",
    "ordine_sesso_acquirente",
    "ordine_quantita",
    "ordine_prezzo_pagato",
    "ordine_sconto",
    "ordine_outlet",
    "ordine_brand",
    "ordine_collezione",
    "ordine_colore",
    "ordine_sesso_articolo",
    "ordine_metodo_pagamento",
    "ordine_taglia",
    "ordine_categoria",
    "ordine_macro_categoria",
];

/// Calendar attributes derived for one date. Stable within a run.
#[derive(Debug, Clone)]
pub struct CalendarFacts {
    pub iso_date: String,
    pub day_name: String,
    pub day_of_year: u32,
    pub month_name: String,
    pub year: i32,
    pub month: u32,
    pub quarter: &'static str,
    /// Localized holiday name, upper-cased, or the `NONE` sentinel.
    pub holiday: String,
    pub quarter_year: String,
    pub month_year: String,
    pub working_label: &'static str,
    pub holiday_label: &'static str,
}

impl CalendarFacts {
    pub fn derive(date: NaiveDate, holiday: String, rest_day: Weekday) -> Self {
        let month = date.month();
        let year = date.year();
        let quarter = match month {
            1..=3 => "T1",
            4..=6 => "T2",
            7..=9 => "T3",
            _ => "T4",
        };

        let is_holiday = holiday != NO_HOLIDAY;
        let working_label = if is_holiday || date.weekday() == rest_day {
            NON_WORKING
        } else {
            WORKING
        };
        let holiday_label = if is_holiday { HOLIDAY } else { NON_HOLIDAY };

        CalendarFacts {
            iso_date: date.format("%Y-%m-%d").to_string(),
            day_name: date.format("%A").to_string().to_uppercase(),
            day_of_year: date.ordinal(),
            month_name: date.format("%B").to_string().to_uppercase(),
            year,
            month,
            quarter,
            holiday,
            quarter_year: format!("{quarter}-{year}"),
            month_year: format!("{month}-{year}"),
            working_label,
            holiday_label,
        }
    }
}

/// Derives calendar facts per date, consulting the holiday source once per
/// date at most; facts are cached for the rest of the run.
pub struct CalendarEnricher {
    holidays: Arc<dyn HolidaySource>,
    rest_day: Weekday,
    cache: HashMap<NaiveDate, CalendarFacts>,
}

impl CalendarEnricher {
    pub fn new(holidays: Arc<dyn HolidaySource>) -> Self {
        CalendarEnricher {
            holidays,
            rest_day: Weekday::Sun,
            cache: HashMap::new(),
        }
    }

    /// Overrides the weekly rest day (Sunday by default).
    pub fn with_rest_day(mut self, rest_day: Weekday) -> Self {
        self.rest_day = rest_day;
        self
    }

    pub async fn facts(&mut self, date: NaiveDate) -> CalendarFacts {
        if let Some(facts) = self.cache.get(&date) {
            return facts.clone();
        }

        let holiday = match self.holidays.holiday_name(date).await {
            Some(name) => name.to_uppercase(),
            None => NO_HOLIDAY.to_string(),
        };
        let facts = CalendarFacts::derive(date, holiday, self.rest_day);
        self.cache.insert(date, facts.clone());
        facts
    }
}

/// Renders the canonical 28-column warehouse row for one record. Text fields
/// are upper-cased, the date stays in ISO form, and the price is fixed to one
/// decimal.
pub fn warehouse_row(
    record: &OrderRecord,
    facts: &CalendarFacts,
) -> Result<Vec<String>, TransformError> {
    let color = record.color.to_uppercase();
    if !is_allowed_color(&color) {
        return Err(TransformError::DisallowedColor(record.color.clone()));
    }

    Ok(vec![
        record.order_id.to_string(),
        facts.iso_date.clone(),
        facts.day_name.clone(),
        facts.day_of_year.to_string(),
        facts.month_name.clone(),
        facts.year.to_string(),
        facts.month.to_string(),
        facts.quarter.to_string(),
        facts.holiday.clone(),
        facts.quarter_year.clone(),
        facts.month_year.clone(),
        facts.working_label.to_string(),
        facts.holiday_label.to_string(),
        record.country_code.to_uppercase(),
        country_name(&record.country_code).to_uppercase(),
        record.gender.to_string(),
        record.quantity.to_string(),
        format!("{:.1}", record.price),
        record.discount.to_string(),
        if record.outlet { "OUTLET" } else { "NOT OUTLET" }.to_string(),
        record.brand.to_uppercase(),
        record.collection.to_uppercase(),
        color,
        record.item_gender.to_uppercase(),
        record.payment_method.to_uppercase(),
        record.size.to_uppercase(),
        record.category.to_uppercase(),
        record.macro_category.to_uppercase(),
    ])
}

/// Comma-joined canonical form used for exact duplicate comparison against
/// remote rows. Field-order-sensitive by design.
pub fn canonical_row(record: &OrderRecord, facts: &CalendarFacts) -> Result<String, TransformError> {
    Ok(warehouse_row(record, facts)?.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FixedHolidays;
    use model::record::OrderRecord;

    fn italy_2020() -> CalendarEnricher {
        let labour_day = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        CalendarEnricher::new(Arc::new(FixedHolidays(vec![(
            labour_day,
            "Festa del Lavoro",
        )])))
    }

    #[tokio::test]
    async fn labour_day_is_a_non_working_holiday() {
        let mut enricher = italy_2020();
        let facts = enricher
            .facts(NaiveDate::from_ymd_opt(2020, 5, 1).unwrap())
            .await;

        assert_eq!(facts.quarter, "T2");
        assert_eq!(facts.holiday, "FESTA DEL LAVORO");
        assert_eq!(facts.working_label, NON_WORKING);
        assert_eq!(facts.holiday_label, HOLIDAY);
        assert_eq!(facts.iso_date, "2020-05-01");
        assert_eq!(facts.day_of_year, 122);
        assert_eq!(facts.quarter_year, "T2-2020");
        assert_eq!(facts.month_year, "5-2020");
    }

    #[tokio::test]
    async fn ordinary_saturday_is_a_working_day() {
        let mut enricher = italy_2020();
        let facts = enricher
            .facts(NaiveDate::from_ymd_opt(2020, 5, 2).unwrap())
            .await;

        assert_eq!(facts.holiday, NO_HOLIDAY);
        assert_eq!(facts.working_label, WORKING);
        assert_eq!(facts.holiday_label, NON_HOLIDAY);
    }

    #[tokio::test]
    async fn sunday_rest_day_overrides_holiday_absence() {
        let mut enricher = italy_2020();
        let facts = enricher
            .facts(NaiveDate::from_ymd_opt(2020, 5, 3).unwrap())
            .await;

        assert_eq!(facts.holiday, NO_HOLIDAY);
        assert_eq!(facts.day_name, "SUNDAY");
        assert_eq!(facts.working_label, NON_WORKING);
    }

    fn sample_record() -> OrderRecord {
        OrderRecord::parse(&[
            "10271",
            "01/05/20",
            "IT",
            "F",
            "2",
            "59.9",
            "10",
            "1",
            "Guess",
            "P/E2020",
            "Rosso",
            "Donna",
            "Carta Credito",
            "m",
            "Abbigliamento",
            "Donna Abbigliamento",
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn renders_the_warehouse_row() {
        let mut enricher = italy_2020();
        let facts = enricher
            .facts(NaiveDate::from_ymd_opt(2020, 5, 1).unwrap())
            .await;

        let row = warehouse_row(&sample_record(), &facts).unwrap();
        assert_eq!(row.len(), WAREHOUSE_HEADER.len());
        assert_eq!(row[0], "10271");
        assert_eq!(row[1], "2020-05-01");
        assert_eq!(row[8], "FESTA DEL LAVORO");
        assert_eq!(row[14], "ITALY");
        assert_eq!(row[17], "59.9");
        assert_eq!(row[19], "OUTLET");
        assert_eq!(row[20], "GUESS");
        assert_eq!(row[22], "ROSSO");
    }

    #[tokio::test]
    async fn disallowed_color_aborts_the_record() {
        let mut enricher = italy_2020();
        let facts = enricher
            .facts(NaiveDate::from_ymd_opt(2020, 5, 1).unwrap())
            .await;

        let mut record = sample_record();
        record.color = "TURCHESE".to_string();
        let err = warehouse_row(&record, &facts).unwrap_err();
        assert!(matches!(err, TransformError::DisallowedColor(_)));
    }
}
