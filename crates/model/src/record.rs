use crate::error::RecordError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const FIELD_COUNT: usize = 16;

/// Input date format of the source archives (two-digit year).
pub const INPUT_DATE_FORMAT: &str = "%d/%m/%y";

/// Header the input archives must carry, order-sensitive.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "IdOrdine",
    "DataOrdine",
    "CodStatoFattura",
    "SexAcquirente",
    "Quantita",
    "PrezzoPagato",
    "Sconto",
    "Outlet",
    "NomeBrand",
    "Collezione",
    "Colore",
    "SexArticolo",
    "PagamentoOrdine",
    "ValoreTagliaEffettivo",
    "NomeCategoria",
    "MacroCategoria",
];

/// Colors admitted by the warehouse schema. Anything else aborts the
/// record's transformation.
pub const ALLOWED_COLORS: [&str; 15] = [
    "ROSSO",
    "MULTICOLOR",
    "BLU",
    "NO COLOR",
    "GIALLO",
    "ROSA",
    "VERDE",
    "NERO",
    "GRIGIO",
    "MARRONE",
    "NEUTRO",
    "BIANCO",
    "VIOLA",
    "ARANCIONE",
    "FANTASIA",
];

pub fn is_allowed_color(color: &str) -> bool {
    ALLOWED_COLORS.iter().any(|c| *c == color)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::M => write!(f, "M"),
            Gender::F => write!(f, "F"),
        }
    }
}

/// One validated order line. Immutable once parsed; `to_fields` restores the
/// exact input representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: i64,
    pub order_date: NaiveDate,
    pub country_code: String,
    pub gender: Gender,
    pub quantity: i32,
    pub price: Decimal,
    pub discount: i32,
    pub outlet: bool,
    pub brand: String,
    pub collection: String,
    pub color: String,
    pub item_gender: String,
    pub payment_method: String,
    pub size: String,
    pub category: String,
    pub macro_category: String,
}

impl OrderRecord {
    /// Builds a record from the split fields of one line, enforcing arity,
    /// non-emptiness, and every per-field domain.
    pub fn parse(fields: &[&str]) -> Result<Self, RecordError> {
        if fields.len() != FIELD_COUNT {
            return Err(RecordError::FieldCount {
                found: fields.len(),
            });
        }
        for (index, field) in fields.iter().enumerate() {
            if field.is_empty() {
                return Err(RecordError::EmptyField {
                    index,
                    field: FIELD_NAMES[index],
                });
            }
        }

        let order_id = parse_number::<i64>(fields, 0)?;
        let order_date = NaiveDate::parse_from_str(fields[1], INPUT_DATE_FORMAT).map_err(|_| {
            RecordError::Parse {
                index: 1,
                field: FIELD_NAMES[1],
                value: fields[1].to_string(),
            }
        })?;
        let gender = match fields[3] {
            "M" => Gender::M,
            "F" => Gender::F,
            other => {
                return Err(RecordError::Semantic {
                    index: 3,
                    field: FIELD_NAMES[3],
                    value: other.to_string(),
                });
            }
        };
        let quantity = parse_number::<i32>(fields, 4)?;
        let price = Decimal::from_str(fields[5]).map_err(|_| RecordError::Parse {
            index: 5,
            field: FIELD_NAMES[5],
            value: fields[5].to_string(),
        })?;
        if price.is_sign_negative() {
            return Err(RecordError::Domain {
                field: FIELD_NAMES[5],
                reason: format!("price cannot be negative: {price}"),
            });
        }
        let discount = parse_number::<i32>(fields, 6)?;
        let outlet = match fields[7] {
            "0" => false,
            "1" => true,
            other => {
                return Err(RecordError::Semantic {
                    index: 7,
                    field: FIELD_NAMES[7],
                    value: other.to_string(),
                });
            }
        };

        Ok(OrderRecord {
            order_id,
            order_date,
            country_code: fields[2].to_string(),
            gender,
            quantity,
            price,
            discount,
            outlet,
            brand: fields[8].to_string(),
            collection: fields[9].to_string(),
            color: fields[10].to_string(),
            item_gender: fields[11].to_string(),
            payment_method: fields[12].to_string(),
            size: fields[13].to_string(),
            category: fields[14].to_string(),
            macro_category: fields[15].to_string(),
        })
    }

    /// Re-serializes the record to its 16 input fields.
    pub fn to_fields(&self) -> [String; FIELD_COUNT] {
        [
            self.order_id.to_string(),
            self.order_date.format(INPUT_DATE_FORMAT).to_string(),
            self.country_code.clone(),
            self.gender.to_string(),
            self.quantity.to_string(),
            self.price.to_string(),
            self.discount.to_string(),
            if self.outlet { "1" } else { "0" }.to_string(),
            self.brand.clone(),
            self.collection.clone(),
            self.color.clone(),
            self.item_gender.clone(),
            self.payment_method.clone(),
            self.size.clone(),
            self.category.clone(),
            self.macro_category.clone(),
        ]
    }
}

fn parse_number<T: FromStr>(fields: &[&str], index: usize) -> Result<T, RecordError> {
    fields[index].parse().map_err(|_| RecordError::Parse {
        index,
        field: FIELD_NAMES[index],
        value: fields[index].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_fields() -> Vec<&'static str> {
        vec![
            "10271", "01/05/20", "IT", "F", "2", "59.90", "10", "0", "GUESS", "P/E2020", "ROSSO",
            "DONNA", "CARTA CREDITO", "M", "ABBIGLIAMENTO", "DONNA ABBIGLIAMENTO",
        ]
    }

    #[test]
    fn parses_and_round_trips_a_valid_line() {
        let fields = valid_fields();
        let record = OrderRecord::parse(&fields).unwrap();

        assert_eq!(record.order_id, 10271);
        assert_eq!(
            record.order_date,
            NaiveDate::from_ymd_opt(2020, 5, 1).unwrap()
        );
        assert_eq!(record.gender, Gender::F);
        assert!(!record.outlet);

        let round_trip = record.to_fields();
        assert_eq!(round_trip.as_slice(), fields.as_slice());
    }

    #[test]
    fn rejects_wrong_field_count_with_the_count() {
        let err = OrderRecord::parse(&["a", "b", "c"]).unwrap_err();
        assert!(err.is_structural());
        assert!(matches!(err, RecordError::FieldCount { found: 3 }));
    }

    #[test]
    fn rejects_empty_field_citing_its_index() {
        let mut fields = valid_fields();
        fields[9] = "";
        let err = OrderRecord::parse(&fields).unwrap_err();
        assert!(err.is_structural());
        assert!(matches!(err, RecordError::EmptyField { index: 9, .. }));
    }

    #[test]
    fn rejects_negative_price_as_domain_error() {
        let mut fields = valid_fields();
        fields[5] = "-1.00";
        let err = OrderRecord::parse(&fields).unwrap_err();
        assert!(!err.is_structural());
        assert!(matches!(err, RecordError::Domain { .. }));
    }

    #[test]
    fn rejects_unknown_gender_code() {
        let mut fields = valid_fields();
        fields[3] = "X";
        let err = OrderRecord::parse(&fields).unwrap_err();
        assert!(matches!(err, RecordError::Semantic { index: 3, .. }));
    }

    #[test]
    fn rejects_non_boolean_outlet_flag() {
        let mut fields = valid_fields();
        fields[7] = "yes";
        let err = OrderRecord::parse(&fields).unwrap_err();
        assert!(matches!(err, RecordError::Semantic { index: 7, .. }));
    }

    #[test]
    fn rejects_unparseable_date() {
        let mut fields = valid_fields();
        fields[1] = "2020-05-01";
        let err = OrderRecord::parse(&fields).unwrap_err();
        assert!(matches!(err, RecordError::Parse { index: 1, .. }));
    }
}
