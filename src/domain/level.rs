// ==========================================
// 标高导入系统 - 标高领域模型
// ==========================================
// 管道: CandidateRow → ValidatedRow → Classification
// ==========================================

use crate::domain::types::{ElementId, UnitHint};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// CandidateRow - 解析中间结构体
// ==========================================
// 用途: 文件解析产物，校验后即丢弃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRow {
    pub source_line: usize,         // 源文件行号（1 起）
    pub raw_name: String,           // 原始名称（已 TRIM）
    pub raw_elevation_text: String, // 原始标高文本
    pub unit_hint: UnitHint,        // 行级单位提示
}

// ==========================================
// ValidatedRow - 校验通过的行
// ==========================================
// 红线: 同一次运行内 name 不区分大小写唯一；elevation 为有限值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRow {
    pub source_line: usize,
    pub name: String,
    pub elevation: f64, // 规范单位（ft）
}

// ==========================================
// ExistingLevel - 文档中的标高
// ==========================================
// 归属: 外部文档；核心只读，UPDATE 时仅改写标高
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingLevel {
    pub id: ElementId,
    pub name: String,
    pub elevation: f64, // 规范单位（ft）
}

// ==========================================
// RowIssue - 行级问题（可恢复）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowIssue {
    EmptyName,
    DuplicateInFile,
    InvalidElevation,
    AmbiguousElevation,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIssue::EmptyName => write!(f, "EMPTY_NAME"),
            RowIssue::DuplicateInFile => write!(f, "DUPLICATE_IN_FILE"),
            RowIssue::InvalidElevation => write!(f, "INVALID_ELEVATION"),
            RowIssue::AmbiguousElevation => write!(f, "AMBIGUOUS_ELEVATION"),
        }
    }
}

// ==========================================
// Classification - 匹配器对每行的判定
// ==========================================
// 每个 ValidatedRow 恰好对应一个 Classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Classification {
    /// 文档中无同名标高，且无标高冲突
    Create(ValidatedRow),
    /// 同名标高存在，标高差超出容差
    Update {
        level: ExistingLevel,
        row: ValidatedRow,
    },
    /// 同名标高存在，标高在容差内
    Skip {
        level: ExistingLevel,
        row: ValidatedRow,
    },
    /// 无同名标高，但与已有/本次已判定标高冲突
    ConflictSkip {
        row: ValidatedRow,
        reason: RowIssue,
        conflicting: Option<String>,
    },
}

impl Classification {
    pub fn row(&self) -> &ValidatedRow {
        match self {
            Classification::Create(row) => row,
            Classification::Update { row, .. }
            | Classification::Skip { row, .. }
            | Classification::ConflictSkip { row, .. } => row,
        }
    }

    pub fn kind(&self) -> ClassificationKind {
        match self {
            Classification::Create(_) => ClassificationKind::Create,
            Classification::Update { .. } => ClassificationKind::Update,
            Classification::Skip { .. } => ClassificationKind::Skip,
            Classification::ConflictSkip { .. } => ClassificationKind::ConflictSkip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationKind {
    Create,
    Update,
    Skip,
    ConflictSkip,
}

/// 判定计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationTally {
    pub create: usize,
    pub update: usize,
    pub skip: usize,
    pub conflict_skip: usize,
}

impl ClassificationTally {
    pub fn from_classifications(items: &[Classification]) -> Self {
        items.iter().fold(Self::default(), |mut acc, c| {
            match c.kind() {
                ClassificationKind::Create => acc.create += 1,
                ClassificationKind::Update => acc.update += 1,
                ClassificationKind::Skip => acc.skip += 1,
                ClassificationKind::ConflictSkip => acc.conflict_skip += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.create + self.update + self.skip + self.conflict_skip
    }
}

/// 名称比较键（不区分大小写）
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
