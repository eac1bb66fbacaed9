//! Spreadsheet I/O: the first worksheet in, a single sheet out.

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;

use crate::error::{PipelineError, Result, XlsxError};
use crate::table::{Cell, Table};

/// Reads the first worksheet of `path`. The first row of the used range
/// holds the column names; blank rows inside the range come back as rows of
/// empty cells.
pub fn read_table(path: &Path) -> Result<Table> {
    read_first_sheet(path).map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `table` as a single-sheet workbook. The package is built in memory
/// first so a failure never leaves a half-written file behind.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let write_err = |source: XlsxError| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };
    let bytes = workbook_bytes(table).map_err(write_err)?;
    fs::write(path, bytes).map_err(|e| write_err(e.into()))
}

fn read_first_sheet(path: &Path) -> std::result::Result<Table, XlsxError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| XlsxError::Malformed("workbook has no worksheet".to_string()))??;

    let grid: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();
    Ok(grid_to_table(grid).with_origin(path.display().to_string()))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => text_cell(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
    }
}

fn text_cell(text: &str) -> Cell {
    if text.is_empty() {
        Cell::Empty
    } else {
        Cell::text(text)
    }
}

fn grid_to_table(grid: Vec<Vec<Cell>>) -> Table {
    let mut rows = grid.into_iter();
    let header = rows.next().unwrap_or_default();
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, c)| c.as_string().unwrap_or_else(|| format!("Unnamed: {i}")))
        .collect();
    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row);
    }
    table
}

fn workbook_bytes(table: &Table) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in table.columns().iter().enumerate() {
        sheet.write_string(0, column_number(col)?, xml_safe(name))?;
    }
    for (i, row) in table.rows().iter().enumerate() {
        let r = u32::try_from(i + 1)
            .map_err(|_| XlsxError::Malformed(format!("row {} out of range", i + 1)))?;
        for (col, cell) in row.iter().enumerate() {
            let c = column_number(col)?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    sheet.write_string(r, c, xml_safe(s))?;
                }
                Cell::Number(n) => {
                    sheet.write_number(r, c, *n)?;
                }
                Cell::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

fn column_number(col: usize) -> std::result::Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::Malformed(format!("column {col} out of range")))
}

/// Drops characters XML 1.0 cannot carry: C0/C1 controls other than tab and
/// line breaks, and the U+FFFE/U+FFFF noncharacters.
fn xml_safe(text: &str) -> String {
    text.chars().filter(|c| is_xml_char(*c)).collect()
}

fn is_xml_char(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => true,
        '\u{FFFE}' | '\u{FFFF}' => false,
        c => !c.is_control(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use zip::write::FileOptions;
    use zip::ZipWriter;

    use super::*;

    fn write_package(path: &Path, parts: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::<()>::default();
        for (name, body) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn package_with_sheet(path: &Path, sheet_data: &str) {
        write_package(
            path,
            &[
                (
                    "[Content_Types].xml",
                    r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#,
                ),
                (
                    "_rels/.rels",
                    r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
                ),
                (
                    "xl/workbook.xml",
                    r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
                ),
                (
                    "xl/_rels/workbook.xml.rels",
                    r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
                ),
                (
                    "xl/worksheets/sheet1.xml",
                    &format!(
                        r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#
                    ),
                ),
            ],
        );
    }

    #[test]
    fn written_workbook_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xlsx");
        let mut table = Table::new(vec!["id".into(), "request".into(), "content".into()]);
        table.push_row(vec![
            Cell::Number(1.0),
            Cell::text("SIÊU SALE!!! <áo> & quần\nhttps://shop.vn/p?a=1&b=2"),
            Cell::text("  leading spaces kept"),
        ]);
        table.push_row(vec![Cell::Number(2.0), Cell::Empty, Cell::Bool(true)]);
        write_table(&path, &table).unwrap();

        let back = read_table(&path).unwrap();
        assert_eq!(back.columns(), table.columns());
        assert_eq!(back.rows(), table.rows());
        assert_eq!(back.origin(), path.display().to_string());
    }

    #[test]
    fn sparse_header_and_blank_rows_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "content").unwrap();
        sheet.write_string(0, 2, "extra").unwrap();
        sheet.write_string(1, 0, "Xem ngay deal").unwrap();
        sheet.write_number(1, 2, 3.5).unwrap();
        sheet.write_string(3, 0, "a & b").unwrap();
        sheet.write_boolean(3, 1, false).unwrap();
        workbook.save(&path).unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.columns(), &["content", "Unnamed: 1", "extra"]);
        assert_eq!(
            table.rows(),
            &[
                vec![Cell::text("Xem ngay deal"), Cell::Empty, Cell::Number(3.5)],
                vec![Cell::Empty, Cell::Empty, Cell::Empty],
                vec![Cell::text("a & b"), Cell::Bool(false), Cell::Empty],
            ]
        );
    }

    #[test]
    fn oversized_cell_reference_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xlsx");
        package_with_sheet(
            &path,
            r#"<row r="1"><c r="ZZZZZZZZZZZZZZZ1" t="inlineStr"><is><t>x</t></is></c></row>"#,
        );
        let err = read_table(&path).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table(&dir.path().join("nope.xlsx")).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn characters_xml_cannot_carry_are_dropped_on_write() {
        assert_eq!(xml_safe("a\u{1}b\u{FFFE}c\u{FFFF}\td\u{85}\n"), "abc\td\n");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contents.xlsx");
        let table = Table::single_column("content", [Cell::text("a\u{1}b\u{FFFE}c\u{FFFF}\td")]);
        write_table(&path, &table).unwrap();
        let back = read_table(&path).unwrap();
        assert_eq!(back.rows(), &[vec![Cell::text("abc\td")]]);
    }
}
