// ==========================================
// 标高导入系统 - 导入警告
// ==========================================
// 可恢复问题一律记为警告，不阻断运行
// 文案经 rust-i18n 本地化（见 locales/）
// ==========================================

use crate::domain::level::RowIssue;
use rust_i18n::t;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportWarning {
    // ===== 行级问题 =====
    EmptyName {
        line: usize,
    },
    DuplicateInFile {
        line: usize,
        name: String,
    },
    InvalidElevation {
        line: usize,
        text: String,
    },
    AmbiguousElevation {
        line: usize,
        name: String,
        conflicting: Option<String>,
    },

    // ===== 标高写入问题 =====
    LevelCreateFailed {
        line: usize,
        name: String,
        message: String,
    },
    LevelRenameFailed {
        line: usize,
        name: String,
        kept_name: String,
        message: String,
    },
    ElevationLocked {
        name: String,
    },
    LevelUpdateFailed {
        name: String,
        message: String,
    },

    // ===== 视图派生问题 =====
    NoPlanViewType,
    ViewCreateFailed {
        level: String,
        message: String,
    },
    ViewRenameFailed {
        level: String,
        view_name: String,
        message: String,
    },
    ViewSettingsFailed {
        view_name: String,
        message: String,
    },

    // ===== 运行级 =====
    NoValidRows,
}

impl ImportWarning {
    /// 对应的行级问题（仅行级警告有值）
    pub fn row_issue(&self) -> Option<RowIssue> {
        match self {
            ImportWarning::EmptyName { .. } => Some(RowIssue::EmptyName),
            ImportWarning::DuplicateInFile { .. } => Some(RowIssue::DuplicateInFile),
            ImportWarning::InvalidElevation { .. } => Some(RowIssue::InvalidElevation),
            ImportWarning::AmbiguousElevation { .. } => Some(RowIssue::AmbiguousElevation),
            _ => None,
        }
    }

    /// 源文件行号（若有）
    pub fn source_line(&self) -> Option<usize> {
        match self {
            ImportWarning::EmptyName { line }
            | ImportWarning::DuplicateInFile { line, .. }
            | ImportWarning::InvalidElevation { line, .. }
            | ImportWarning::AmbiguousElevation { line, .. }
            | ImportWarning::LevelCreateFailed { line, .. }
            | ImportWarning::LevelRenameFailed { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ImportWarning::EmptyName { line } => t!("warning.empty_name", line = line),
            ImportWarning::DuplicateInFile { line, name } => {
                t!("warning.duplicate_in_file", line = line, name = name)
            }
            ImportWarning::InvalidElevation { line, text } => {
                t!("warning.invalid_elevation", line = line, text = text)
            }
            ImportWarning::AmbiguousElevation {
                line,
                name,
                conflicting,
            } => match conflicting {
                Some(other) => t!(
                    "warning.ambiguous_elevation_with",
                    line = line,
                    name = name,
                    other = other
                ),
                None => t!("warning.ambiguous_elevation", line = line, name = name),
            },
            ImportWarning::LevelCreateFailed {
                line,
                name,
                message,
            } => t!(
                "warning.level_create_failed",
                line = line,
                name = name,
                message = message
            ),
            ImportWarning::LevelRenameFailed {
                line,
                name,
                kept_name,
                message,
            } => t!(
                "warning.level_rename_failed",
                line = line,
                name = name,
                kept = kept_name,
                message = message
            ),
            ImportWarning::ElevationLocked { name } => {
                t!("warning.elevation_locked", name = name)
            }
            ImportWarning::LevelUpdateFailed { name, message } => {
                t!("warning.level_update_failed", name = name, message = message)
            }
            ImportWarning::NoPlanViewType => t!("warning.no_plan_view_type"),
            ImportWarning::ViewCreateFailed { level, message } => {
                t!("warning.view_create_failed", level = level, message = message)
            }
            ImportWarning::ViewRenameFailed {
                level,
                view_name,
                message,
            } => t!(
                "warning.view_rename_failed",
                level = level,
                view = view_name,
                message = message
            ),
            ImportWarning::ViewSettingsFailed { view_name, message } => {
                t!("warning.view_settings_failed", view = view_name, message = message)
            }
            ImportWarning::NoValidRows => t!("warning.no_valid_rows"),
        };
        write!(f, "{}", msg)
    }
}
