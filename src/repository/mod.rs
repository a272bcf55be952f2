// ==========================================
// 标高导入系统 - 文档访问层
// ==========================================
// 红线: 文档层不含业务逻辑
// ==========================================
// 职责: 提供标高/视图的读写与事务接口，屏蔽存储细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod level_document_repo;
pub mod memory_document;
pub mod sqlite_document;

// 重导出核心类型
pub use error::{DocumentError, DocumentResult};
pub use level_document_repo::{
    validate_element_name, DocumentSnapshot, LevelDocument, SnapshotLevel, FORBIDDEN_NAME_CHARS,
};
pub use memory_document::{FaultPlan, LevelRecord, MemoryLevelDocument, ViewRecord};
pub use sqlite_document::SqliteLevelDocument;
