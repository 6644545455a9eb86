use crate::file::error::FileError;
use model::record::{FIELD_NAMES, OrderRecord};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Field delimiter of the input archives. Lines are split naively; the
/// contract guarantees fields never contain the delimiter.
pub const DELIMITER: char = ';';

const REPORT_DIR: &str = "Results";
const CSV_EXTENSION: &str = ".csv";

/// Reads one order archive and partitions its lines into accepted records
/// and two verbatim rejection lists, preserving input order.
#[derive(Debug)]
pub struct Extractor {
    records: Vec<OrderRecord>,
    null_field_lines: Vec<String>,
    parse_error_lines: Vec<String>,
}

impl Extractor {
    /// Opens the archive, validates its header against the expected schema,
    /// and consumes every remaining line. Only a header mismatch or an I/O
    /// failure aborts the file; rejected lines are collected, never dropped.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound(path.display().to_string()),
            _ => FileError::Io(e),
        })?;
        let mut lines = BufReader::new(file).lines();

        let header = lines
            .next()
            .ok_or_else(|| FileError::Empty(path.display().to_string()))??;
        check_header(&header)?;

        let mut records = Vec::new();
        let mut null_field_lines = Vec::new();
        let mut parse_error_lines = Vec::new();

        for line in lines {
            let line = line?;
            let fields: Vec<&str> = line.split(DELIMITER).collect();
            match OrderRecord::parse(&fields) {
                Ok(record) => records.push(record),
                Err(err) if err.is_structural() => {
                    warn!(line = %line, error = %err, "Rejected line with a broken shape");
                    null_field_lines.push(line);
                }
                Err(err) => {
                    warn!(line = %line, error = %err, "Rejected line with an invalid value");
                    parse_error_lines.push(line);
                }
            }
        }

        info!(
            path = %path.display(),
            accepted = records.len(),
            null_fields = null_field_lines.len(),
            parse_errors = parse_error_lines.len(),
            "Archive extracted"
        );

        Ok(Extractor {
            records,
            null_field_lines,
            parse_error_lines,
        })
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<OrderRecord> {
        self.records
    }

    pub fn null_field_lines(&self) -> &[String] {
        &self.null_field_lines
    }

    pub fn parse_error_lines(&self) -> &[String] {
        &self.parse_error_lines
    }

    /// Persists the structurally rejected lines for operator remediation.
    /// Returns the written path, or `None` when there was nothing to report.
    pub fn save_null_field_report(
        &self,
        directory: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<Option<PathBuf>, FileError> {
        write_report(directory.as_ref(), file_name, &self.null_field_lines)
    }

    /// Persists the value-rejected lines for operator remediation.
    pub fn save_parse_error_report(
        &self,
        directory: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<Option<PathBuf>, FileError> {
        write_report(directory.as_ref(), file_name, &self.parse_error_lines)
    }
}

fn check_header(header: &str) -> Result<(), FileError> {
    let columns: Vec<&str> = header.split(DELIMITER).collect();
    if columns != FIELD_NAMES {
        return Err(FileError::HeaderMismatch(header.to_string()));
    }
    Ok(())
}

/// Writes one rejected line per output line, verbatim, under a `Results`
/// subdirectory created on demand.
fn write_report(
    directory: &Path,
    file_name: &str,
    lines: &[String],
) -> Result<Option<PathBuf>, FileError> {
    if lines.is_empty() {
        return Ok(None);
    }

    let report_dir = directory.join(REPORT_DIR);
    std::fs::create_dir_all(&report_dir)?;

    let file_name = if file_name.ends_with(CSV_EXTENSION) {
        file_name.to_string()
    } else {
        format!("{file_name}{CSV_EXTENSION}")
    };
    let path = report_dir.join(file_name);

    let mut file = File::create(&path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }

    info!(path = %path.display(), lines = lines.len(), "Rejection report written");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "IdOrdine;DataOrdine;CodStatoFattura;SexAcquirente;Quantita;PrezzoPagato;\
Sconto;Outlet;NomeBrand;Collezione;Colore;SexArticolo;PagamentoOrdine;\
ValoreTagliaEffettivo;NomeCategoria;MacroCategoria";

    fn good_line(id: u32, date: &str) -> String {
        format!(
            "{id};{date};IT;M;1;100.00;0;0;DIESEL;P/E2020;BLU;UOMO;PAYPAL;L;JEANS;UOMO ABBIGLIAMENTO"
        )
    }

    fn write_archive(lines: &[String]) -> tempfile::NamedTempFile {
        let mut content = String::from(HEADER);
        for line in lines {
            content.push('\n');
            content.push_str(line);
        }
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn partitions_lines_without_overlap() {
        let mut lines = vec![
            "1;2;3".to_string(),
            good_line(1, "01/05/20"),
            "7;only;three;or;more;fields;but;not;sixteen".to_string(),
            good_line(2, "01/05/20"),
            "8;;;;;;;;;;;;;;;".to_string(),
            good_line(3, "02/05/20"),
            ";;;;;;;;;;;;;;;".to_string(),
        ];
        // One well-shaped line with a bad price lands in the parse list.
        let mut bad_price = good_line(4, "02/05/20");
        bad_price = bad_price.replace("100.00", "free");
        lines.push(bad_price);

        let file = write_archive(&lines);
        let extraction = Extractor::read(file.path()).unwrap();

        assert_eq!(extraction.records().len(), 3);
        assert_eq!(extraction.null_field_lines().len(), 4);
        assert_eq!(extraction.parse_error_lines().len(), 1);

        let total = extraction.records().len()
            + extraction.null_field_lines().len()
            + extraction.parse_error_lines().len();
        assert_eq!(total, lines.len());
    }

    #[test]
    fn preserves_input_order_of_accepted_records() {
        let lines = vec![
            good_line(3, "01/05/20"),
            good_line(1, "01/05/20"),
            good_line(2, "02/05/20"),
        ];
        let file = write_archive(&lines);
        let extraction = Extractor::read(file.path()).unwrap();

        let ids: Vec<i64> = extraction.records().iter().map(|r| r.order_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn fails_fast_on_header_drift() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "IdOrdine;WrongColumn\n1;2").unwrap();

        let err = Extractor::read(file.path()).unwrap_err();
        assert!(matches!(err, FileError::HeaderMismatch(_)));
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let err = Extractor::read("/no/such/archive.csv").unwrap_err();
        assert!(matches!(err, FileError::NotFound(_)));
    }

    #[test]
    fn writes_rejection_reports_with_verbatim_lines() {
        let lines = vec!["1;2;3".to_string(), good_line(1, "01/05/20")];
        let file = write_archive(&lines);
        let extraction = Extractor::read(file.path()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let report = extraction
            .save_null_field_report(dir.path(), "null_fields")
            .unwrap()
            .unwrap();
        assert!(report.ends_with("Results/null_fields.csv"));

        let contents = std::fs::read_to_string(&report).unwrap();
        assert_eq!(contents, "1;2;3\n");

        // Nothing to report on the parse side.
        let none = extraction
            .save_parse_error_report(dir.path(), "parse_errors")
            .unwrap();
        assert!(none.is_none());
    }
}
