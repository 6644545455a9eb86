use crate::file::error::FileError;
use model::record::OrderRecord;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const ANALYSIS_DIR: &str = "Analysis";
const CSV_EXTENSION: &str = ".csv";

/// Value-frequency tally over the descriptive fields of an archive: country
/// code, brand, collection, color, payment method, and the two categories.
/// Fields and values are kept in lexical order so the report is stable.
pub struct FieldAnalysis {
    counts: BTreeMap<&'static str, BTreeMap<String, usize>>,
}

impl FieldAnalysis {
    pub fn over(records: &[OrderRecord]) -> Self {
        let mut counts: BTreeMap<&'static str, BTreeMap<String, usize>> = BTreeMap::new();
        for record in records {
            for (field, value) in [
                ("CodStatoFattura", record.country_code.as_str()),
                ("NomeBrand", record.brand.as_str()),
                ("Collezione", record.collection.as_str()),
                ("Colore", record.color.as_str()),
                ("PagamentoOrdine", record.payment_method.as_str()),
                ("NomeCategoria", record.category.as_str()),
                ("MacroCategoria", record.macro_category.as_str()),
            ] {
                *counts
                    .entry(field)
                    .or_default()
                    .entry(value.to_string())
                    .or_default() += 1;
            }
        }
        FieldAnalysis { counts }
    }

    pub fn value_count(&self, field: &str, value: &str) -> usize {
        self.counts
            .get(field)
            .and_then(|values| values.get(value))
            .copied()
            .unwrap_or(0)
    }

    /// Persists the tally as one `field;value;count` line per distinct value,
    /// under an `Analysis` subdirectory created on demand. Returns the
    /// written path, or `None` when there was nothing to report.
    pub fn save_report(
        &self,
        directory: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<Option<PathBuf>, FileError> {
        if self.counts.is_empty() {
            return Ok(None);
        }

        let report_dir = directory.as_ref().join(ANALYSIS_DIR);
        std::fs::create_dir_all(&report_dir)?;

        let file_name = if file_name.ends_with(CSV_EXTENSION) {
            file_name.to_string()
        } else {
            format!("{file_name}{CSV_EXTENSION}")
        };
        let path = report_dir.join(file_name);

        let mut file = File::create(&path)?;
        for (field, values) in &self.counts {
            for (value, count) in values {
                writeln!(file, "{field};{value};{count}")?;
            }
        }

        info!(path = %path.display(), fields = self.counts.len(), "Field analysis written");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(country: &str, brand: &str, color: &str) -> OrderRecord {
        OrderRecord::parse(&[
            "1",
            "01/05/20",
            country,
            "M",
            "1",
            "10.0",
            "0",
            "0",
            brand,
            "P/E2020",
            color,
            "Uomo",
            "PayPal",
            "L",
            "Jeans",
            "Uomo Abbigliamento",
        ])
        .unwrap()
    }

    #[test]
    fn tallies_values_per_field() {
        let records = vec![
            record("IT", "Diesel", "Blu"),
            record("IT", "Guess", "Blu"),
            record("FR", "Diesel", "Rosso"),
        ];
        let analysis = FieldAnalysis::over(&records);

        assert_eq!(analysis.value_count("CodStatoFattura", "IT"), 2);
        assert_eq!(analysis.value_count("CodStatoFattura", "FR"), 1);
        assert_eq!(analysis.value_count("NomeBrand", "Diesel"), 2);
        assert_eq!(analysis.value_count("Colore", "Blu"), 2);
        assert_eq!(analysis.value_count("Colore", "Verde"), 0);
    }

    #[test]
    fn writes_the_report_under_the_analysis_directory() {
        let records = vec![record("IT", "Diesel", "Blu")];
        let analysis = FieldAnalysis::over(&records);

        let dir = tempfile::tempdir().unwrap();
        let path = analysis
            .save_report(dir.path(), "field_analysis")
            .unwrap()
            .unwrap();
        assert!(path.ends_with("Analysis/field_analysis.csv"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().any(|line| line == "Colore;Blu;1"));
        assert!(contents.lines().any(|line| line == "NomeBrand;Diesel;1"));
        assert!(contents.lines().any(|line| line == "PagamentoOrdine;PayPal;1"));
    }

    #[test]
    fn empty_input_produces_no_report() {
        let analysis = FieldAnalysis::over(&[]);
        let dir = tempfile::tempdir().unwrap();
        assert!(
            analysis
                .save_report(dir.path(), "field_analysis")
                .unwrap()
                .is_none()
        );
    }
}
