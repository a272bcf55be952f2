// ==========================================
// 标高导入系统 - 核心库
// ==========================================
// 功能: 从 CSV / 电子表格导入标高，与文档现有标高对账，
//       事务性地新建/更新标高并派生平面视图
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "es");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 文档访问层 - 标高/视图读写与事务
pub mod repository;

// 引擎层 - 匹配与写入规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/schema）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出常用类型
// ==========================================
pub use config::{ConfigManager, ImportSettings};
pub use domain::{LengthUnit, RunReport, Tolerance};
pub use engine::LevelImportPipeline;
pub use importer::{ColumnMapping, ImportError, ImportResult};
pub use repository::{LevelDocument, MemoryLevelDocument, SqliteLevelDocument};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
