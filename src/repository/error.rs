// ==========================================
// 标高导入系统 - 文档层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分级: 可恢复（单个元素被拒绝）/ 致命（必须整体回滚）
// ==========================================

use crate::domain::types::ElementId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    // ===== 可恢复：单个元素操作被拒绝 =====
    #[error("操作被拒绝: {0}")]
    Rejected(String),

    #[error("参数只读: {element} 的 {parameter}")]
    ParameterReadOnly { element: ElementId, parameter: String },

    #[error("元素不存在: {0}")]
    NotFound(ElementId),

    #[error("文档中没有平面视图类型")]
    NoPlanViewType,

    // ===== 致命：事务必须回滚 =====
    #[error("文档异常: {0}")]
    Fatal(String),

    #[error("事务状态错误: {0}")]
    TransactionState(String),

    #[error("数据库错误: {0}")]
    Database(String),
}

impl DocumentError {
    /// 是否需要中止运行并回滚事务组
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DocumentError::Fatal(_) | DocumentError::TransactionState(_) | DocumentError::Database(_)
        )
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for DocumentError {
    fn from(err: rusqlite::Error) -> Self {
        DocumentError::Database(err.to_string())
    }
}

/// Result 类型别名
pub type DocumentResult<T> = Result<T, DocumentError>;
