// ==========================================
// 标高导入系统 - 文档提供者 Trait
// ==========================================
// 职责: 定义核心所需的外部文档接口（不包含实现）
// 红线: 核心通过显式参数持有文档，从不隐式获取
// 实现者: SqliteLevelDocument / MemoryLevelDocument
// ==========================================

use crate::domain::level::ExistingLevel;
use crate::domain::types::ElementId;
use crate::repository::error::{DocumentError, DocumentResult};

/// 元素名称中禁止出现的字符
pub const FORBIDDEN_NAME_CHARS: &[char] = &[
    '{', '}', '[', ']', '|', ';', '<', '>', '?', '`', '~', ':', '\\',
];

/// 校验元素名称: 非空且不含禁用字符
pub fn validate_element_name(name: &str) -> DocumentResult<()> {
    if name.trim().is_empty() {
        return Err(DocumentError::Rejected("名称不能为空".to_string()));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(DocumentError::Rejected(format!(
            "名称 '{}' 含有禁用字符 '{}'",
            name, c
        )));
    }
    Ok(())
}

// ==========================================
// DocumentSnapshot - 文档只读快照
// ==========================================
// 用途: 试运行时在内存副本上重放导入；须携带影响写入结果的文档状态
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotLevel {
    pub level: ExistingLevel,
    pub elevation_locked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub levels: Vec<SnapshotLevel>,
    pub view_names: Vec<String>,
    pub has_plan_view_type: bool,
}

// ==========================================
// LevelDocument Trait
// ==========================================
// 事务模型:
// - 外层事务组 (group): 覆盖本次运行全部标高与视图修改
// - 内层事务 (transaction): 位于事务组内，可多次开启/提交
// 事务组只有在 assimilate 后才真正生效；rollback_group 撤销组内一切
pub trait LevelDocument {
    // ===== 读取 =====

    /// 当前全部标高快照
    fn levels(&self) -> DocumentResult<Vec<ExistingLevel>>;

    /// 当前全部视图名称
    fn view_names(&self) -> DocumentResult<Vec<String>>;

    /// 文档是否具备平面视图类型
    fn supports_plan_views(&self) -> bool {
        true
    }

    /// 完整快照（标高含只读标志、视图名、平面视图类型是否存在）
    fn snapshot(&self) -> DocumentResult<DocumentSnapshot>;

    // ===== 标高写入 =====

    /// 在给定标高（ft）新建标高，名称为文档默认名
    fn create_level(&mut self, elevation: f64) -> DocumentResult<ExistingLevel>;

    /// 重命名标高
    fn rename_level(&mut self, id: ElementId, name: &str) -> DocumentResult<()>;

    /// 改写标高值（ft）；参数只读时返回 ParameterReadOnly
    fn set_level_elevation(&mut self, id: ElementId, elevation: f64) -> DocumentResult<()>;

    // ===== 视图写入 =====

    /// 为标高新建依附的平面视图
    fn create_plan_view(&mut self, level: ElementId) -> DocumentResult<ElementId>;

    fn rename_view(&mut self, view: ElementId, name: &str) -> DocumentResult<()>;

    fn set_view_scale(&mut self, view: ElementId, scale: i32) -> DocumentResult<()>;

    fn set_crop_box_active(&mut self, view: ElementId, active: bool) -> DocumentResult<()>;

    fn set_crop_box_visible(&mut self, view: ElementId, visible: bool) -> DocumentResult<()>;

    // ===== 事务组 =====

    fn begin_group(&mut self, name: &str) -> DocumentResult<()>;

    fn assimilate_group(&mut self) -> DocumentResult<()>;

    fn rollback_group(&mut self) -> DocumentResult<()>;

    // ===== 内层事务 =====

    fn begin_transaction(&mut self, name: &str) -> DocumentResult<()>;

    fn commit_transaction(&mut self) -> DocumentResult<()>;

    fn rollback_transaction(&mut self) -> DocumentResult<()>;
}
