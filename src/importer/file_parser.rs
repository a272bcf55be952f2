// ==========================================
// 标高导入系统 - 文件解析器实现
// ==========================================
// 阶段 1: 文件读取与解析 → CandidateRow 序列（惰性、按源顺序）
// 支持: 分隔文本 (.csv/.txt) / 电子表格 (.xlsx/.xls/.xlsm/.xlsb/.ods)
// ==========================================

use crate::domain::level::CandidateRow;
use crate::domain::types::{LengthUnit, UnitHint};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::{ByteRecord, ReaderBuilder};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// 名称列表头关键字（归一化后匹配）
const NAME_HEADER_KEYS: &[&str] = &["nombre", "name", "nivel", "level"];

/// 标高列表头关键字（归一化后匹配）
const ELEVATION_HEADER_KEYS: &[&str] = &["elev", "cota", "altura", "height"];

/// 单位列表头（归一化后完全匹配）
const UNIT_HEADER_KEYS: &[&str] = &["unidad", "unidades", "unit", "units", "ud"];

// ==========================================
// 列映射
// ==========================================
// 0 起列序号；显式映射优先于表头识别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub name: usize,
    pub elevation: usize,
    pub unit: Option<usize>,
}

impl ColumnMapping {
    /// 电子表格默认映射: A 列名称，B 列标高
    pub const SPREADSHEET: ColumnMapping = ColumnMapping {
        name: 0,
        elevation: 1,
        unit: None,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    Delimited { delimiter: u8 },
    Spreadsheet,
}

// ==========================================
// ParsedSource - 解析结果（惰性行序列）
// ==========================================
pub struct ParsedSource {
    pub format: SourceFormat,
    pub columns: ColumnMapping,
    pub header_unit: UnitHint, // 表头单位注记
    rows: Box<dyn Iterator<Item = ImportResult<CandidateRow>>>,
}

impl ParsedSource {
    fn new(
        format: SourceFormat,
        columns: ColumnMapping,
        header_unit: UnitHint,
        rows: Box<dyn Iterator<Item = ImportResult<CandidateRow>>>,
    ) -> Self {
        Self {
            format,
            columns,
            header_unit,
            rows,
        }
    }
}

impl Iterator for ParsedSource {
    type Item = ImportResult<CandidateRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

// ==========================================
// LevelFileParser Trait
// ==========================================
pub trait LevelFileParser {
    /// 打开并解析文件
    ///
    /// # 返回
    /// - Err(SourceUnavailable): 路径不存在
    /// - Err(FormatError): 文本模式下找不到名称/标高列
    fn parse(&self, path: &Path, mapping: Option<ColumnMapping>) -> ImportResult<ParsedSource>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.is_file() {
        return Err(ImportError::SourceUnavailable(path.display().to_string()));
    }
    Ok(())
}

/// 行级单位提示: 单位列优先，其次标高文本后缀
fn row_unit_hint(unit_cell: Option<&str>, elevation_text: &str) -> UnitHint {
    let from_column = unit_cell.and_then(LengthUnit::from_token);
    from_column
        .or_else(|| LengthUnit::split_suffix(elevation_text).1)
        .into()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 自动识别分隔符: 首个非空行含 ';' 则用 ';'，否则含 ',' 用 ','，默认 ';'
    pub fn detect_delimiter(text: &str) -> u8 {
        let first = text.lines().find(|line| !line.trim().is_empty());
        match first {
            Some(line) if line.contains(';') => b';',
            Some(line) if line.contains(',') => b',',
            _ => b';',
        }
    }

    /// 从表头识别列映射
    pub fn locate_columns(headers: &[String]) -> ImportResult<ColumnMapping> {
        let cleaner = DataCleaner;
        let normalized: Vec<String> = headers.iter().map(|h| cleaner.normalize_header(h)).collect();

        let elevation = normalized
            .iter()
            .position(|h| ELEVATION_HEADER_KEYS.iter().any(|k| h.contains(k)))
            .ok_or_else(|| ImportError::FormatError(format!("标高列 ({})", headers.join(" | "))))?;

        let name = normalized
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != elevation)
            .find(|(_, h)| NAME_HEADER_KEYS.iter().any(|k| h.contains(k)))
            .map(|(idx, _)| idx)
            .ok_or_else(|| ImportError::FormatError(format!("名称列 ({})", headers.join(" | "))))?;

        let unit = normalized
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != elevation && *idx != name)
            .find(|(_, h)| UNIT_HEADER_KEYS.contains(&h.as_str()))
            .map(|(idx, _)| idx);

        Ok(ColumnMapping {
            name,
            elevation,
            unit,
        })
    }

    /// 解析内存中的文本（供 parse 与测试复用）
    pub fn parse_text(text: String, mapping: Option<ColumnMapping>) -> ImportResult<ParsedSource> {
        let delimiter = Self::detect_delimiter(&text);
        let reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(Cursor::new(text.into_bytes()));

        let mut records = reader.into_byte_records();

        // 首个非空行作为表头
        let headers = loop {
            match records.next() {
                Some(result) => {
                    let fields = record_fields(&result?);
                    if fields.iter().any(|f| !f.is_empty()) {
                        break fields;
                    }
                }
                None => return Err(ImportError::FormatError("文件无表头行".to_string())),
            }
        };

        let columns = match mapping {
            Some(explicit) => explicit,
            None => Self::locate_columns(&headers)?,
        };
        let header_unit = headers
            .get(columns.elevation)
            .map(|h| DataCleaner.header_unit(h))
            .unwrap_or_default();
        let header_len = headers.len();

        debug!(
            delimiter = %(delimiter as char),
            name_col = columns.name,
            elevation_col = columns.elevation,
            header_unit = ?header_unit,
            "CSV 表头识别完成"
        );

        let rows = records.filter_map(move |result| {
            let record = match result {
                Ok(record) => record,
                Err(e) => return Some(Err(ImportError::from(e))),
            };
            let source_line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            let mut fields = record_fields(&record);

            // 跳过空白行
            if fields.iter().all(|f| f.is_empty()) {
                return None;
            }

            // 连续分隔符: 行宽超出表头时，首列之后的空字段视为多余分隔符
            if fields.len() > header_len {
                let first = fields.remove(0);
                fields.retain(|f| !f.is_empty());
                fields.insert(0, first);
            }

            let cell = |idx: usize| fields.get(idx).cloned().unwrap_or_default();
            let raw_elevation_text = cell(columns.elevation);
            let unit_cell = columns.unit.map(&cell);

            Some(Ok(CandidateRow {
                source_line,
                raw_name: cell(columns.name),
                unit_hint: row_unit_hint(unit_cell.as_deref(), &raw_elevation_text),
                raw_elevation_text,
            }))
        });

        Ok(ParsedSource::new(
            SourceFormat::Delimited { delimiter },
            columns,
            header_unit,
            Box::new(rows),
        ))
    }
}

fn record_fields(record: &ByteRecord) -> Vec<String> {
    let cleaner = DataCleaner;
    record
        .iter()
        .map(|field| cleaner.clean_cell(&String::from_utf8_lossy(field)))
        .collect()
}

impl LevelFileParser for CsvParser {
    fn parse(&self, path: &Path, mapping: Option<ColumnMapping>) -> ImportResult<ParsedSource> {
        ensure_exists(path)?;

        // 非 UTF-8 内容（如 Windows-1252 导出）按有损方式读入
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Self::parse_text(text, mapping)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 第 1 个工作表，第 2 行起；A 列名称，B 列标高
// 两格皆空则停止；仅一格为空则跳过该行
pub struct ExcelParser;

impl ExcelParser {
    /// 从已加载的工作表区域构造行序列
    pub fn parse_range(range: Range<Data>, mapping: Option<ColumnMapping>) -> ParsedSource {
        let columns = mapping.unwrap_or(ColumnMapping::SPREADSHEET);
        let header_unit = range
            .get_value((0, columns.elevation as u32))
            .map(|cell| DataCleaner.header_unit(&cell_text(cell)))
            .unwrap_or_default();

        let rows = SheetRows {
            end_row: range.end().map(|(row, _)| row),
            range,
            next_row: 1,
            columns,
            done: false,
        };

        ParsedSource::new(SourceFormat::Spreadsheet, columns, header_unit, Box::new(rows))
    }
}

impl LevelFileParser for ExcelParser {
    fn parse(&self, path: &Path, mapping: Option<ColumnMapping>) -> ImportResult<ParsedSource> {
        ensure_exists(path)?;

        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))??;

        Ok(Self::parse_range(range, mapping))
    }
}

struct SheetRows {
    range: Range<Data>,
    next_row: u32,
    end_row: Option<u32>,
    columns: ColumnMapping,
    done: bool,
}

impl Iterator for SheetRows {
    type Item = ImportResult<CandidateRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let end_row = self.end_row?;
        while !self.done && self.next_row <= end_row {
            let row = self.next_row;
            self.next_row += 1;

            let cell = |col: usize| {
                self.range
                    .get_value((row, col as u32))
                    .map(cell_text)
                    .unwrap_or_default()
            };
            let name = cell(self.columns.name);
            let elevation = cell(self.columns.elevation);

            match (name.is_empty(), elevation.is_empty()) {
                (true, true) => {
                    self.done = true;
                }
                (true, false) | (false, true) => {
                    debug!(row = row + 1, "电子表格行缺少名称或标高，已跳过");
                }
                (false, false) => {
                    let unit_cell = self.columns.unit.map(&cell);
                    return Some(Ok(CandidateRow {
                        source_line: row as usize + 1,
                        raw_name: name,
                        unit_hint: row_unit_hint(unit_cell.as_deref(), &elevation),
                        raw_elevation_text: elevation,
                    }));
                }
            }
        }
        None
    }
}

fn cell_text(cell: &Data) -> String {
    let text = match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    };
    DataCleaner.clean_cell(&text)
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl LevelFileParser for UniversalFileParser {
    fn parse(&self, path: &Path, mapping: Option<ColumnMapping>) -> ImportResult<ParsedSource> {
        ensure_exists(path)?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "txt" => CsvParser.parse(path, mapping),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => ExcelParser.parse(path, mapping),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn collect(source: ParsedSource) -> Vec<CandidateRow> {
        source.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("\n\nNombre;Elevacion\n"), b';');
        assert_eq!(CsvParser::detect_delimiter("Name,Elevation\n"), b',');
        assert_eq!(CsvParser::detect_delimiter("Nombre\tElevacion\n"), b';');
        assert_eq!(CsvParser::detect_delimiter(""), b';');
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let mut temp_file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(temp_file, "Nombre;Elevación (m)").unwrap();
        writeln!(temp_file, "P1;0.00").unwrap();
        writeln!(temp_file, "P2;3,50").unwrap();

        let source = CsvParser.parse(temp_file.path(), None).unwrap();
        assert_eq!(source.header_unit, UnitHint::Meters);
        assert_eq!(source.format, SourceFormat::Delimited { delimiter: b';' });

        let rows = collect(source);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].raw_name, "P1");
        assert_eq!(rows[0].raw_elevation_text, "0.00");
        assert_eq!(rows[0].source_line, 2);
        assert_eq!(rows[1].raw_elevation_text, "3,50");
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse(Path::new("no_existe.csv"), None);
        assert!(matches!(result, Err(ImportError::SourceUnavailable(_))));
    }

    #[test]
    fn test_csv_parser_missing_columns() {
        let result = CsvParser::parse_text("Foo;Bar\nP1;3\n".to_string(), None);
        assert!(matches!(result, Err(ImportError::FormatError(_))));
    }

    #[test]
    fn test_csv_parser_skips_blank_lines_and_keeps_line_numbers() {
        let text = "\n  \nName,Elevation [ft]\nA,1\n\n   ,  \nB,2\n".to_string();
        let source = CsvParser::parse_text(text, None).unwrap();
        assert_eq!(source.header_unit, UnitHint::Feet);

        let rows = collect(source);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].raw_name, "A");
        assert_eq!(rows[0].source_line, 4);
        assert_eq!(rows[1].raw_name, "B");
        assert_eq!(rows[1].source_line, 7);
    }

    #[test]
    fn test_csv_parser_collapses_duplicate_delimiters() {
        let text = "Nombre;Cota\nP1;;3.0\n;;4.0\nP3;6.0;\n".to_string();
        let rows = collect(CsvParser::parse_text(text, None).unwrap());

        assert_eq!(rows[0].raw_name, "P1");
        assert_eq!(rows[0].raw_elevation_text, "3.0");
        // 名称为空的行保留，交由校验器报告
        assert_eq!(rows[1].raw_name, "");
        assert_eq!(rows[1].raw_elevation_text, "4.0");
        assert_eq!(rows[2].raw_elevation_text, "6.0");
    }

    #[test]
    fn test_csv_parser_row_unit_hints() {
        let text = "Nivel;Elevacion;Unidad\nP1;3500;mm\nP2;3.5 m;\nP3;10;\n".to_string();
        let source = CsvParser::parse_text(text, None).unwrap();
        assert_eq!(source.columns.unit, Some(2));

        let rows = collect(source);
        assert_eq!(rows[0].unit_hint, UnitHint::Millimeters);
        assert_eq!(rows[1].unit_hint, UnitHint::Meters);
        assert_eq!(rows[2].unit_hint, UnitHint::Unknown);
    }

    #[test]
    fn test_csv_parser_explicit_mapping() {
        let text = "x;y;z\n1;P1;2.5\n".to_string();
        let mapping = ColumnMapping {
            name: 1,
            elevation: 2,
            unit: None,
        };
        let rows = collect(CsvParser::parse_text(text, Some(mapping)).unwrap());
        assert_eq!(rows[0].raw_name, "P1");
        assert_eq!(rows[0].raw_elevation_text, "2.5");
    }

    #[test]
    fn test_excel_rows_stop_and_skip() {
        let mut range: Range<Data> = Range::new((0, 0), (5, 1));
        range.set_value((0, 0), Data::String("Nombre".to_string()));
        range.set_value((0, 1), Data::String("Elevación [mm]".to_string()));
        range.set_value((1, 0), Data::String("P1".to_string()));
        range.set_value((1, 1), Data::Float(0.0));
        range.set_value((2, 0), Data::String("P2".to_string()));
        // (2, 1) 为空 → 跳过
        range.set_value((3, 0), Data::String("P3".to_string()));
        range.set_value((3, 1), Data::Float(3500.5));
        // 第 5 行两格皆空 → 停止
        range.set_value((5, 0), Data::String("P9".to_string()));
        range.set_value((5, 1), Data::Int(9000));

        let source = ExcelParser::parse_range(range, None);
        assert_eq!(source.header_unit, UnitHint::Millimeters);

        let rows = collect(source);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].raw_name, "P1");
        assert_eq!(rows[0].raw_elevation_text, "0");
        assert_eq!(rows[0].source_line, 2);
        assert_eq!(rows[1].raw_name, "P3");
        assert_eq!(rows[1].raw_elevation_text, "3500.5");
        assert_eq!(rows[1].source_line, 4);
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let result = UniversalFileParser.parse(temp_file.path(), None);
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
