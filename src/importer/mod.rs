// ==========================================
// 标高导入系统 - 导入层
// ==========================================
// 职责: 外部文件 → 校验后的标高行
// 流程: 解析 → 单位换算 → 校验/去重
// 支持: CSV / Excel
// ==========================================

pub mod data_cleaner;
pub mod error;
pub mod file_parser;
pub mod row_validator;
pub mod unit_resolver;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use file_parser::{
    ColumnMapping, CsvParser, ExcelParser, LevelFileParser, ParsedSource, SourceFormat,
    UniversalFileParser,
};
pub use row_validator::{RowValidator, ValidationOutcome};
pub use unit_resolver::{NumberFormat, ResolvedRow, UnitResolver};
