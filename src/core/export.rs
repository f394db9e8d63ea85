//! Spreadsheet and CSV export.
//!
//! Workbooks are written as a minimal Office Open XML package: one zip entry
//! per part, inline strings instead of a shared-string table, no styles.

use crate::core::period::Period;
use crate::domain::model::Table;
use crate::utils::error::{KitError, Result};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MAX_SHEET_NAME: usize = 31;
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<(String, Table)>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet under a sanitised, workbook-unique name and returns it.
    pub fn add_sheet(&mut self, name: &str, table: Table) -> String {
        let base = sanitize_sheet_name(name, self.sheets.len() + 1);
        let mut candidate = base.clone();
        let mut n = 2;
        while self
            .sheets
            .iter()
            .any(|(existing, _)| existing.eq_ignore_ascii_case(&candidate))
        {
            let suffix = format!(" ({})", n);
            let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
            candidate = format!("{}{}", truncate_chars(&base, keep), suffix);
            n += 1;
        }
        self.sheets.push((candidate.clone(), table));
        candidate
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>> {
        if self.sheets.is_empty() {
            return Err(KitError::processing("A workbook needs at least one sheet"));
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(self.content_types_xml().as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS.as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(self.workbook_xml().as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(self.workbook_rels_xml().as_bytes())?;

        for (i, (_, table)) in self.sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
            zip.write_all(worksheet_xml(table).as_bytes())?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    pub fn write_xlsx(&self, path: &Path, overwrite: bool) -> Result<PathBuf> {
        ensure_writable(path, overwrite)?;
        let bytes = self.to_xlsx_bytes()?;
        std::fs::write(path, &bytes)?;
        tracing::debug!(
            "Wrote workbook {} ({} sheets, {} bytes)",
            path.display(),
            self.sheets.len(),
            bytes.len()
        );
        Ok(path.to_path_buf())
    }

    fn content_types_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        for (i, (name, _)) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(name),
                i + 1,
                i + 1
            ));
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn workbook_rels_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i, i
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

fn worksheet_xml(table: &Table) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    push_row(&mut xml, 1, table.headers.iter().map(|h| (h.as_str(), false)));
    for (i, row) in table.rows.iter().enumerate() {
        push_row(&mut xml, i + 2, row.iter().map(|cell| (cell.as_str(), true)));
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

/// `numeric_ok` is false for the header row so "2025" headers stay text.
fn push_row<'a>(xml: &mut String, row_number: usize, cells: impl Iterator<Item = (&'a str, bool)>) {
    xml.push_str(&format!(r#"<row r="{}">"#, row_number));
    for (col, (value, numeric_ok)) in cells.enumerate() {
        if value.is_empty() {
            continue;
        }
        let reference = format!("{}{}", column_letter(col), row_number);
        if numeric_ok && is_plain_number(value) {
            xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value.trim()));
        } else {
            xml.push_str(&format!(
                r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                reference,
                escape_xml(value)
            ));
        }
    }
    xml.push_str("</row>");
}

/// 0 → A, 25 → Z, 26 → AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Decimal literals only. Leading zeros (ids, zip codes) and exponent forms stay text.
fn is_plain_number(value: &str) -> bool {
    let v = value.trim();
    if v.is_empty() || v != value {
        return false;
    }
    let digits = v.strip_prefix('-').unwrap_or(v);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if int_part.len() > 1 && int_part.starts_with('0') {
        return false;
    }
    if int_part.len() > 15 {
        return false;
    }
    match frac_part {
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

pub fn sanitize_sheet_name(name: &str, position: usize) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !INVALID_SHEET_CHARS.contains(c) && !c.is_control())
        .collect();
    // Excel also rejects names wrapped in apostrophes.
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    let truncated = truncate_chars(cleaned, MAX_SHEET_NAME);
    if truncated.is_empty() {
        format!("Sheet{}", position)
    } else {
        truncated.trim_end().to_string()
    }
}

fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(KitError::OutputExists {
            path: path.display().to_string(),
        });
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn write_csv(path: &Path, table: &Table, overwrite: bool) -> Result<PathBuf> {
    ensure_writable(path, overwrite)?;
    table.write_csv_path(path)?;
    tracing::debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(path.to_path_buf())
}

/// `<root>/<period>/<stem>_<period>.<ext>`
pub fn output_file_path(output_root: &Path, period: &Period, stem: &str, ext: &str) -> PathBuf {
    let token = period.to_string();
    output_root
        .join(&token)
        .join(format!("{}_{}.{}", stem, token, ext.trim_start_matches('.')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn table(rows: &[&[&str]]) -> Table {
        let mut t = Table::new(rows[0].iter().map(|s| s.to_string()).collect());
        for row in &rows[1..] {
            t.rows.push(row.iter().map(|s| s.to_string()).collect());
        }
        t
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_plain_numbers() {
        for v in ["0", "42", "-3", "3.14", "-0.5"] {
            assert!(is_plain_number(v), "{}", v);
        }
        let not_numbers = [
            "", "007", "1e5", "1.", ".5", " 4", "12a", "1,000", "2025-01-01", "1234567890123456",
        ];
        for v in not_numbers {
            assert!(!is_plain_number(v), "{}", v);
        }
    }

    #[test]
    fn test_sheet_names_are_sanitised_and_unique() {
        let mut wb = Workbook::new();
        assert_eq!(wb.add_sheet("Q1/Q2 [draft]?", Table::default()), "Q1Q2 draft");
        assert_eq!(wb.add_sheet("", Table::default()), "Sheet2");
        assert_eq!(wb.add_sheet("q1q2 draft", Table::default()), "q1q2 draft (2)");
        let long = "A very long sheet name that Excel would reject";
        let name = wb.add_sheet(long, Table::default());
        assert_eq!(name.chars().count(), 31);
        let again = wb.add_sheet(long, Table::default());
        assert!(again.ends_with(" (2)"));
        assert_eq!(again.chars().count(), 31);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b & \"c\"\u{1}"), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_worksheet_cells() {
        let xml = worksheet_xml(&table(&[&["id", "2025"], &["7", "x&y"], &["", "0012"]]));
        assert!(xml.contains(
            r#"<c r="B1" t="inlineStr"><is><t xml:space="preserve">2025</t></is></c>"#
        ));
        assert!(xml.contains(r#"<c r="A2"><v>7</v></c>"#));
        assert!(xml.contains("x&amp;y"));
        assert!(!xml.contains(r#"r="A3""#));
        assert!(xml.contains(
            r#"<c r="B3" t="inlineStr"><is><t xml:space="preserve">0012</t></is></c>"#
        ));
    }

    #[test]
    fn test_xlsx_package_layout() {
        let mut wb = Workbook::new();
        wb.add_sheet("Summary", table(&[&["a"], &["1"]]));
        wb.add_sheet("Detail", table(&[&["b"], &["2"]]));
        let bytes = wb.to_xlsx_bytes().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/worksheets/sheet1.xml",
            "xl/worksheets/sheet2.xml",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {}", name);
        }

        let mut workbook = String::new();
        archive
            .by_name("xl/workbook.xml")
            .unwrap()
            .read_to_string(&mut workbook)
            .unwrap();
        assert!(workbook.contains(r#"<sheet name="Summary" sheetId="1" r:id="rId1"/>"#));
        assert!(workbook.contains(r#"<sheet name="Detail" sheetId="2" r:id="rId2"/>"#));
    }

    #[test]
    fn test_empty_workbook_is_rejected() {
        assert!(Workbook::new().to_xlsx_bytes().is_err());
    }

    #[test]
    fn test_overwrite_protection() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/out.csv");
        let t = table(&[&["a"], &["1"]]);

        write_csv(&path, &t, false).unwrap();
        assert!(matches!(
            write_csv(&path, &t, false),
            Err(KitError::OutputExists { .. })
        ));
        assert!(write_csv(&path, &t, true).is_ok());
    }

    #[test]
    fn test_output_file_path() {
        let period: Period = "2025_Q1".parse().unwrap();
        assert_eq!(
            output_file_path(Path::new("/out"), &period, "los_summary", ".xlsx"),
            PathBuf::from("/out/2025_Q1/los_summary_2025_Q1.xlsx")
        );
    }
}
