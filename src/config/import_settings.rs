// ==========================================
// 标高导入系统 - 运行设置
// ==========================================
// 优先级: CLI 参数 > config_kv > 内置默认值
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::domain::types::{LengthUnit, Tolerance};
use crate::domain::view::ViewSettings;
use crate::importer::unit_resolver::NumberFormat;
use serde::Serialize;
use std::error::Error;

/// 一次导入运行使用的全部设置
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSettings {
    pub tolerance: Tolerance,
    pub default_unit: Option<LengthUnit>,
    pub view: ViewSettings,
    pub number_format: NumberFormat,
    pub locale: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            default_unit: None,
            view: ViewSettings::default(),
            number_format: NumberFormat::default(),
            locale: "es".to_string(),
        }
    }
}

impl ImportSettings {
    /// 从配置源加载（容差非法时回落默认值）
    pub fn from_reader(reader: &dyn ImportConfigReader) -> Result<Self, Box<dyn Error>> {
        let tolerance_mm = reader.get_tolerance_mm()?;
        let tolerance = Tolerance::from_millimeters(tolerance_mm).unwrap_or_else(|| {
            tracing::warn!(tolerance_mm, "容差非法，使用默认值");
            Tolerance::default()
        });

        Ok(Self {
            tolerance,
            default_unit: reader.get_default_unit()?,
            view: ViewSettings {
                scale: reader.get_view_scale()?,
                name_prefix: reader.get_view_name_prefix()?,
            },
            number_format: NumberFormat {
                decimal_separator: reader.get_decimal_separator()?,
            },
            locale: reader.get_locale()?,
        })
    }

    pub fn with_default_unit(mut self, unit: Option<LengthUnit>) -> Self {
        if unit.is_some() {
            self.default_unit = unit;
        }
        self
    }

    pub fn with_tolerance(mut self, tolerance: Option<Tolerance>) -> Self {
        if let Some(t) = tolerance {
            self.tolerance = t;
        }
        self
    }

    pub fn with_view_scale(mut self, scale: Option<i32>) -> Self {
        if let Some(s) = scale {
            self.view.scale = s;
        }
        self
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        if let Some(l) = locale {
            self.locale = l;
        }
        self
    }
}

// 内置默认值作为最低优先级的配置源
impl ImportConfigReader for ImportSettings {
    fn get_tolerance_mm(&self) -> Result<f64, Box<dyn Error>> {
        Ok(LengthUnit::Millimeters.from_canonical(self.tolerance.value()))
    }

    fn get_default_unit(&self) -> Result<Option<LengthUnit>, Box<dyn Error>> {
        Ok(self.default_unit)
    }

    fn get_view_scale(&self) -> Result<i32, Box<dyn Error>> {
        Ok(self.view.scale)
    }

    fn get_view_name_prefix(&self) -> Result<String, Box<dyn Error>> {
        Ok(self.view.name_prefix.clone())
    }

    fn get_decimal_separator(&self) -> Result<char, Box<dyn Error>> {
        Ok(self.number_format.decimal_separator)
    }

    fn get_locale(&self) -> Result<String, Box<dyn Error>> {
        Ok(self.locale.clone())
    }
}
