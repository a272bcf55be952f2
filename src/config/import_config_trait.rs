// ==========================================
// 标高导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入流程所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::LengthUnit;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入流程所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）/ ImportSettings（内置默认值）
pub trait ImportConfigReader {
    // ===== 匹配配置 =====

    /// 获取标高匹配容差（毫米）
    ///
    /// # 默认值
    /// - 1.0
    fn get_tolerance_mm(&self) -> Result<f64, Box<dyn Error>>;

    /// 获取运行默认单位
    ///
    /// # 返回
    /// - None: 未配置，须由调用方在每次运行时提供
    fn get_default_unit(&self) -> Result<Option<LengthUnit>, Box<dyn Error>>;

    // ===== 视图配置 =====

    /// 获取派生视图比例
    ///
    /// # 默认值
    /// - 100
    fn get_view_scale(&self) -> Result<i32, Box<dyn Error>>;

    /// 获取派生视图名称前缀
    ///
    /// # 默认值
    /// - "Planta - "
    fn get_view_name_prefix(&self) -> Result<String, Box<dyn Error>>;

    // ===== 区域配置 =====

    /// 获取当前区域的小数分隔符
    ///
    /// # 默认值
    /// - ','
    fn get_decimal_separator(&self) -> Result<char, Box<dyn Error>>;

    /// 获取报告语言
    ///
    /// # 默认值
    /// - "es"
    fn get_locale(&self) -> Result<String, Box<dyn Error>>;
}
