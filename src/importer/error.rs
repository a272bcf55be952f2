// ==========================================
// 标高导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 只有致命问题走错误通道；行级/元素级问题记为 ImportWarning
// ==========================================

use crate::repository::error::DocumentError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误（致命，发生在任何文档修改之前）=====
    #[error("文件不存在或不可读: {0}")]
    SourceUnavailable(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.txt/.xlsx/.xls/.xlsm/.ods）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("表头缺少必需列: {0}")]
    FormatError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 运行参数错误 =====
    #[error("未指定标高单位（需为 mm / m / ft 之一）")]
    MissingDefaultUnit,

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 写入阶段错误（致命，已整体回滚）=====
    #[error("导入失败，已回滚全部修改: {message}")]
    ApplyFailed { message: String },

    #[error(transparent)]
    Document(#[from] DocumentError),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ImportError::SourceUnavailable(err.to_string())
            }
            _ => ImportError::FileReadError(err.to_string()),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
