use crate::utils::error::{KitError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// Header row plus string cells. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A row-level problem surfaced by a step without failing the whole run.
/// `row` is 1-based and counts data rows only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowWarning {
    pub row: usize,
    pub column: String,
    pub value: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub table: Table,
    pub warnings: Vec<RowWarning>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(KitError::processing("CSV input has no header row"));
        }

        let width = headers.len();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.len() > width {
                tracing::warn!(
                    "Row {} has {} cells but only {} columns; extra cells dropped",
                    rows.len() + 1,
                    row.len(),
                    width
                );
            }
            row.resize(width, String::new());
            rows.push(row);
        }

        tracing::debug!("Read {} rows x {} columns", rows.len(), width);
        Ok(Self { headers, rows })
    }

    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the table as CSV, creating parent folders. Replaces any existing file.
    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.to_csv_writer(std::io::BufWriter::new(file))
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.to_csv_writer(&mut buf)?;
        String::from_utf8(buf).map_err(|e| KitError::processing(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact header match first, then case- and whitespace-insensitive.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        if let Some(idx) = self.headers.iter().position(|h| h == name) {
            return Ok(idx);
        }
        let wanted = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
            .ok_or_else(|| KitError::ColumnNotFound {
                column: name.to_string(),
                available: self.headers.clone(),
            })
    }

    pub fn column_values(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Replaces the column if it exists, otherwise appends it.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(KitError::processing(format!(
                "Column '{}' has {} values but the table has {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.headers.iter().position(|h| h == name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// snake_case headers, unique within the table.
    pub fn clean_column_names(&mut self) {
        let mut seen: Vec<String> = Vec::with_capacity(self.headers.len());
        for header in self.headers.iter_mut() {
            let base = clean_name(header);
            let mut candidate = base.clone();
            let mut n = 2;
            while seen.contains(&candidate) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            seen.push(candidate.clone());
            *header = candidate;
        }
    }
}

fn clean_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    let mut prev_lower = false;

    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() {
            // camelCase boundary
            if ch.is_uppercase() && prev_lower {
                pending_sep = true;
            }
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            prev_lower = ch.is_lowercase() || ch.is_numeric();
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
            prev_lower = false;
        }
    }

    if out.is_empty() {
        return "x".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "x");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_reader("Person ID,Admit Date\n1,2025-01-02\n2,2025-02-03\n".as_bytes()).unwrap()
    }

    #[test]
    fn test_from_reader_pads_short_rows() {
        let table = Table::from_reader("a,b,c\n1,2\n".as_bytes()).unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_from_reader_strips_bom() {
        let table = Table::from_reader("\u{feff}id,name\n1,x\n".as_bytes()).unwrap();
        assert_eq!(table.headers[0], "id");
    }

    #[test]
    fn test_column_index_falls_back_to_case_insensitive() {
        let table = sample();
        assert_eq!(table.column_index("Admit Date").unwrap(), 1);
        assert_eq!(table.column_index(" admit date ").unwrap(), 1);
        assert!(matches!(
            table.column_index("discharge"),
            Err(KitError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_set_column_appends_then_replaces() {
        let mut table = sample();
        table
            .set_column("flag", vec!["y".to_string(), "n".to_string()])
            .unwrap();
        assert_eq!(table.headers.len(), 3);
        table
            .set_column("flag", vec!["n".to_string(), "y".to_string()])
            .unwrap();
        assert_eq!(table.headers.len(), 3);
        assert_eq!(table.rows[0][2], "n");

        assert!(table.set_column("short", vec!["1".to_string()]).is_err());
    }

    #[test]
    fn test_clean_column_names() {
        let mut table = Table::new(vec![
            "Person ID".to_string(),
            "admitDate".to_string(),
            "% Change (YoY)".to_string(),
            "2025 Total".to_string(),
            "".to_string(),
            "person_id".to_string(),
        ]);
        table.clean_column_names();
        assert_eq!(
            table.headers,
            vec![
                "person_id",
                "admit_date",
                "change_yo_y",
                "x2025_total",
                "x",
                "person_id_2"
            ]
        );
    }

    #[test]
    fn test_csv_string_round_trips_quotes() {
        let mut table = Table::new(vec!["note".to_string()]);
        table.rows.push(vec!["said \"hi\", left".to_string()]);
        let text = table.to_csv_string().unwrap();
        let back = Table::from_reader(text.as_bytes()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_write_csv_path_creates_folders() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("output/2025_Q1/clean.csv");
        let table = Table::from_reader("id,note\n1,\"a, b\"\n".as_bytes()).unwrap();

        table.write_csv_path(&path).unwrap();
        assert_eq!(Table::from_csv_path(&path).unwrap(), table);

        Table::new(vec!["id".to_string()]).write_csv_path(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id\n");
    }
}
