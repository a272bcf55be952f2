// ==========================================
// 标高导入系统 - 领域模型层
// ==========================================
// 职责: 定义标高、视图、判定、报告等值类型
// 红线: 不含数据访问逻辑，不含引擎逻辑
// ==========================================

pub mod level;
pub mod report;
pub mod types;
pub mod view;
pub mod warning;

// 重导出核心类型
pub use level::{
    name_key, CandidateRow, Classification, ClassificationKind, ClassificationTally,
    ExistingLevel, RowIssue, ValidatedRow,
};
pub use report::RunReport;
pub use types::{ElementId, LengthUnit, Tolerance, UnitHint};
pub use view::{DerivedView, ViewSettings};
pub use warning::ImportWarning;
