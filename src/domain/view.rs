// ==========================================
// 标高导入系统 - 派生平面视图
// ==========================================
// 只为本次新建的标高派生；运行结束后不再修改
// ==========================================

use crate::domain::types::ElementId;
use serde::{Deserialize, Serialize};

/// 视图默认比例 1:100
pub const DEFAULT_VIEW_SCALE: i32 = 100;

/// 视图默认名称前缀
pub const DEFAULT_VIEW_NAME_PREFIX: &str = "Planta - ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedView {
    pub id: ElementId,
    pub owner_level_name: String,
    pub final_view_name: String,
    pub scale: i32,
    pub crop_active: bool,
    pub crop_visible: bool,
}

/// 视图设置（比例 + 裁剪框标志）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub scale: i32,
    pub name_prefix: String,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            scale: DEFAULT_VIEW_SCALE,
            name_prefix: DEFAULT_VIEW_NAME_PREFIX.to_string(),
        }
    }
}

impl ViewSettings {
    /// 视图基础名称: 前缀 + 标高名
    pub fn base_name(&self, level_name: &str) -> String {
        format!("{}{}", self.name_prefix, level_name)
    }
}
