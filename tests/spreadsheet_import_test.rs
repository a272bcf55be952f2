// ==========================================
// 电子表格导入端到端测试
// ==========================================
// 测试目标: .xlsx 经扩展名分派进入流水线
// 夹具: 运行时用 rust_xlsxwriter 生成
// ==========================================

mod test_helpers;

use level_import::domain::{ImportWarning, LengthUnit};
use level_import::importer::{LevelFileParser, SourceFormat, UniversalFileParser};
use level_import::MemoryLevelDocument;
use rust_xlsxwriter::Workbook;
use std::path::PathBuf;
use tempfile::TempDir;
use test_helpers::{assert_elevation, pipeline};

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// 写入单工作表 .xlsx，第 1 行为表头
fn write_workbook(rows: &[Vec<Cell<'_>>]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("niveles.xlsx");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let written = match cell {
                Cell::Text(s) => worksheet.write_string(r as u32, c as u16, *s),
                Cell::Number(n) => worksheet.write_number(r as u32, c as u16, *n),
            };
            written.expect("write cell");
        }
    }
    workbook.save(&path).expect("save workbook");
    (dir, path)
}

#[test]
fn test_xlsx_is_dispatched_to_spreadsheet_parser() {
    let (_dir, path) = write_workbook(&[
        vec![Cell::Text("Nombre"), Cell::Text("Cota (mm)")],
        vec![Cell::Text("P1"), Cell::Number(3000.0)],
    ]);

    let source = UniversalFileParser.parse(&path, None).expect("parse xlsx");
    assert_eq!(source.format, SourceFormat::Spreadsheet);

    let rows: Vec<_> = source.map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].raw_name, "P1");
    assert_eq!(rows[0].raw_elevation_text, "3000");
    assert_eq!(rows[0].source_line, 2);
}

#[test]
fn test_xlsx_import_creates_levels_and_views() {
    let (_dir, path) = write_workbook(&[
        vec![Cell::Text("Nombre"), Cell::Text("Cota (mm)")],
        vec![Cell::Text("P2"), Cell::Number(6000.0)],
        vec![Cell::Text("P0"), Cell::Number(0.0)],
        vec![Cell::Text("P1"), Cell::Text("3 m")],
        vec![Cell::Text("P1"), Cell::Number(9000.0)],
        vec![Cell::Text("X"), Cell::Text("abc")],
    ]);

    let mut doc = MemoryLevelDocument::new();
    let report = pipeline(LengthUnit::Meters)
        .run(&mut doc, &path, None)
        .expect("import should succeed");

    assert_eq!(report.total_rows, 5);
    assert_eq!(report.invalid_rows, 2);
    assert_eq!(report.tally.create, 3);
    assert_eq!(report.input_unit, LengthUnit::Millimeters);
    assert_eq!(report.units_used, vec![LengthUnit::Millimeters, LengthUnit::Meters]);
    assert_eq!(
        report.created_views,
        vec!["Planta - P0", "Planta - P1", "Planta - P2"]
    );
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, ImportWarning::DuplicateInFile { line: 5, .. })));

    let p1 = doc.level_by_name("P1").expect("P1 created");
    assert_elevation(p1.elevation, 3.0 / 0.3048);
}

#[test]
fn test_xlsx_data_stops_at_first_blank_row() {
    let (_dir, path) = write_workbook(&[
        vec![Cell::Text("Nombre"), Cell::Text("Cota")],
        vec![Cell::Text("P0"), Cell::Number(0.0)],
        vec![],
        vec![Cell::Text("P9"), Cell::Number(27.0)],
    ]);

    let mut doc = MemoryLevelDocument::new();
    let report = pipeline(LengthUnit::Meters)
        .run(&mut doc, &path, None)
        .expect("import should succeed");

    assert_eq!(report.total_rows, 1);
    assert_eq!(report.created_views, vec!["Planta - P0"]);
}
