// ==========================================
// 标高导入系统 - 引擎层
// ==========================================
// 职责: 匹配、命名、事务写入、视图派生、报告
// 红线: 引擎不拼 SQL，文档一律通过 LevelDocument 显式传入
// ==========================================

pub mod apply;
pub mod matcher;
pub mod name_resolver;
pub mod orchestrator;
pub mod report_builder;
pub mod transaction;
pub mod view_deriver;

// 重导出核心引擎
pub use apply::{ApplyEngine, ApplyOutcome};
pub use matcher::{ElevationLedger, LevelMatcher, MatchOutcome};
pub use name_resolver::{
    level_name_resolver, view_name_resolver, CounterSuffix, NameResolver, SuffixStrategy,
    TimestampSuffix,
};
pub use orchestrator::LevelImportPipeline;
pub use report_builder::{ReportBuilder, ReportInput};
pub use transaction::{GroupScope, TransactionScope};
pub use view_deriver::{ViewDerivation, ViewDeriver};
