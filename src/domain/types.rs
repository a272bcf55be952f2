// ==========================================
// 标高导入系统 - 领域类型定义
// ==========================================
// 内部规范单位: 英尺 (ft)，与宿主文档内部长度单位一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 1 英尺 = 0.3048 米（精确定义）
pub const METERS_PER_FOOT: f64 = 0.3048;

/// 1 英尺 = 304.8 毫米（精确定义）
pub const MILLIMETERS_PER_FOOT: f64 = 304.8;

// ==========================================
// 长度单位 (Length Unit)
// ==========================================
// 红线: 每次运行必须有一个确定的默认单位，只能是以下三者之一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Millimeters,
    Meters,
    Feet,
}

impl LengthUnit {
    /// 换算到规范单位（英尺）的线性系数
    pub fn to_canonical_factor(self) -> f64 {
        match self {
            LengthUnit::Millimeters => 1.0 / MILLIMETERS_PER_FOOT,
            LengthUnit::Meters => 1.0 / METERS_PER_FOOT,
            LengthUnit::Feet => 1.0,
        }
    }

    /// 将该单位下的数值换算为规范单位
    pub fn to_canonical(self, value: f64) -> f64 {
        value * self.to_canonical_factor()
    }

    /// 将规范单位数值换算回该单位
    pub fn from_canonical(self, canonical: f64) -> f64 {
        canonical / self.to_canonical_factor()
    }

    /// 单位符号
    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Millimeters => "mm",
            LengthUnit::Meters => "m",
            LengthUnit::Feet => "ft",
        }
    }

    /// 识别单位记号（不区分大小写）
    ///
    /// 支持: mm / m / ft，及常见全称（西语/英语）
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "mm" | "milimetros" | "milímetros" | "millimeters" | "millimetres" => {
                Some(LengthUnit::Millimeters)
            }
            "m" | "metros" | "meters" | "metres" => Some(LengthUnit::Meters),
            "ft" | "'" | "pies" | "feet" | "foot" => Some(LengthUnit::Feet),
            _ => None,
        }
    }

    /// 拆分数值文本尾部的单位后缀
    ///
    /// `"3.5 m"` → `("3.5", Some(Meters))`；无后缀时原样返回
    pub fn split_suffix(text: &str) -> (&str, Option<Self>) {
        let trimmed = text.trim();
        let split_at = trimmed
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphabetic() || *c == '\'')
            .last()
            .map(|(idx, _)| idx);

        match split_at {
            Some(idx) if idx > 0 => match LengthUnit::from_token(&trimmed[idx..]) {
                Some(unit) => (trimmed[..idx].trim_end(), Some(unit)),
                None => (trimmed, None),
            },
            _ => (trimmed, None),
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LengthUnit::from_token(s).ok_or_else(|| format!("未知长度单位: {}", s))
    }
}

// ==========================================
// 单位提示 (Unit Hint)
// ==========================================
// 来源: 行级单位列/数值后缀，或表头注记 "(mm)" "[m]" 等
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitHint {
    #[default]
    Unknown,
    Millimeters,
    Meters,
    Feet,
}

impl UnitHint {
    pub fn unit(self) -> Option<LengthUnit> {
        match self {
            UnitHint::Unknown => None,
            UnitHint::Millimeters => Some(LengthUnit::Millimeters),
            UnitHint::Meters => Some(LengthUnit::Meters),
            UnitHint::Feet => Some(LengthUnit::Feet),
        }
    }
}

impl From<LengthUnit> for UnitHint {
    fn from(unit: LengthUnit) -> Self {
        match unit {
            LengthUnit::Millimeters => UnitHint::Millimeters,
            LengthUnit::Meters => UnitHint::Meters,
            LengthUnit::Feet => UnitHint::Feet,
        }
    }
}

impl From<Option<LengthUnit>> for UnitHint {
    fn from(unit: Option<LengthUnit>) -> Self {
        unit.map(UnitHint::from).unwrap_or_default()
    }
}

// ==========================================
// 容差 (Tolerance)
// ==========================================
// 红线: tolerance >= 0；比较口径 abs(a - b) <= tolerance
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Tolerance(f64);

impl Tolerance {
    /// 以规范单位构造；负数或非有限值返回 None
    pub fn new(canonical: f64) -> Option<Self> {
        (canonical.is_finite() && canonical >= 0.0).then_some(Self(canonical))
    }

    /// 以毫米构造
    pub fn from_millimeters(mm: f64) -> Option<Self> {
        Self::new(LengthUnit::Millimeters.to_canonical(mm))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// 两个标高是否视为相等
    pub fn matches(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.0
    }
}

impl Default for Tolerance {
    /// 默认 1 mm
    fn default() -> Self {
        Self(1.0 / MILLIMETERS_PER_FOOT)
    }
}

// ==========================================
// 文档元素句柄 (Element Id)
// ==========================================
// 由外部文档分配，核心只做透传
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub i64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
