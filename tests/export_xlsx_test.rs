use analyst_kit::core::export::{self, Workbook};
use analyst_kit::{KitError, Period, Table};
use anyhow::Result;
use std::io::Read;
use tempfile::TempDir;

fn read_part(path: &std::path::Path, part: &str) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path)?)?;
    let mut content = String::new();
    archive.by_name(part)?.read_to_string(&mut content)?;
    Ok(content)
}

#[test]
fn test_multi_sheet_workbook() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let summary = Table::from_reader("quarter,bookings\n2025_Q1,412\n2025_Q2,398\n".as_bytes())?;
    let detail = Table::from_reader("id,zip,note\n7,02134,R&D <intake>\n".as_bytes())?;

    let period: Period = "2025_Q2".parse()?;
    let output = temp_dir.path().join("output");
    let path = export::output_file_path(&output, &period, "bookings", "xlsx");

    let mut workbook = Workbook::new();
    assert_eq!(workbook.add_sheet("Summary", summary), "Summary");
    assert_eq!(workbook.add_sheet("summary", detail.clone()), "summary (2)");
    assert_eq!(workbook.add_sheet("Detail: Q2/2025", detail), "Detail Q22025");

    let written = workbook.write_xlsx(&path, false)?;
    assert!(written.ends_with("output/2025_Q2/bookings_2025_Q2.xlsx"));

    let archive = zip::ZipArchive::new(std::fs::File::open(&written)?)?;
    let mut parts: Vec<&str> = archive.file_names().collect();
    parts.sort();
    assert_eq!(
        parts,
        vec![
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/_rels/workbook.xml.rels",
            "xl/workbook.xml",
            "xl/worksheets/sheet1.xml",
            "xl/worksheets/sheet2.xml",
            "xl/worksheets/sheet3.xml",
        ]
    );

    let workbook_xml = read_part(&written, "xl/workbook.xml")?;
    assert!(workbook_xml.contains(r#"<sheet name="summary (2)" sheetId="2" r:id="rId2"/>"#));

    let first = read_part(&written, "xl/worksheets/sheet1.xml")?;
    assert!(first.contains(r#"<c r="B2"><v>412</v></c>"#));
    assert!(first.contains(r#"<t xml:space="preserve">2025_Q1</t>"#));

    let second = read_part(&written, "xl/worksheets/sheet2.xml")?;
    assert!(second.contains(r#"<c r="A2"><v>7</v></c>"#));
    assert!(second.contains(r#"<c r="B2" t="inlineStr"><is><t xml:space="preserve">02134</t>"#));
    assert!(second.contains("R&amp;D &lt;intake&gt;"));

    Ok(())
}

#[test]
fn test_workbook_overwrite_rules() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("report.xlsx");
    let mut workbook = Workbook::new();
    workbook.add_sheet("Data", Table::from_reader("a\n1\n".as_bytes())?);

    workbook.write_xlsx(&path, false)?;
    assert!(matches!(
        workbook.write_xlsx(&path, false),
        Err(KitError::OutputExists { .. })
    ));
    workbook.write_xlsx(&path, true)?;

    assert!(matches!(
        Workbook::new().write_xlsx(&temp_dir.path().join("empty.xlsx"), false),
        Err(KitError::ProcessingError { .. })
    ));
    Ok(())
}
