// ==========================================
// 标高导入系统 - 单位解析器
// ==========================================
// 阶段 2: 确定每行有效单位并换算到规范单位（ft）
// 单位优先级: 行级提示 > 表头注记 > 运行默认单位
// 数值解析顺序: 不变区域 → 当前区域 → 小数点/逗号互换
// ==========================================

use crate::domain::level::{CandidateRow, RowIssue};
use crate::domain::types::{LengthUnit, UnitHint};
use serde::{Deserialize, Serialize};

// ==========================================
// NumberFormat - 当前区域数值格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub decimal_separator: char,
}

impl NumberFormat {
    pub const INVARIANT: NumberFormat = NumberFormat {
        decimal_separator: '.',
    };

    /// 千位分隔符: 与小数分隔符相对
    pub fn group_separator(&self) -> char {
        if self.decimal_separator == ',' {
            '.'
        } else {
            ','
        }
    }
}

impl Default for NumberFormat {
    /// 默认西语区域（小数逗号）
    fn default() -> Self {
        Self {
            decimal_separator: ',',
        }
    }
}

/// 按给定格式解析数值；千位分隔符必须按三位分组
fn parse_with(text: &str, decimal: char, group: char) -> Option<f64> {
    let (integer, fraction) = match text.split_once(decimal) {
        Some((i, f)) => (i, Some(f)),
        None => (text, None),
    };
    if fraction.is_some_and(|f| f.contains(group) || f.contains(decimal)) {
        return None;
    }

    let (sign, digits) = match integer.strip_prefix(['-', '+']) {
        Some(rest) => (&integer[..1], rest),
        None => ("", integer),
    };

    let integer_digits = if digits.contains(group) {
        let mut groups = digits.split(group);
        let head = groups.next()?;
        if head.is_empty() || head.len() > 3 || !head.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let mut joined = head.to_string();
        for g in groups {
            if g.len() != 3 || !g.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            joined.push_str(g);
        }
        joined
    } else {
        digits.to_string()
    };

    let normalized = match fraction {
        Some(f) => format!("{}{}.{}", sign, integer_digits, f),
        None => format!("{}{}", sign, integer_digits),
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ==========================================
// ResolvedRow - 单位解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRow {
    pub source_line: usize,
    pub raw_name: String,
    pub raw_elevation_text: String,
    pub unit: LengthUnit,
    pub elevation: Result<f64, RowIssue>, // 规范单位（ft）
}

// ==========================================
// UnitResolver
// ==========================================
#[derive(Debug, Clone)]
pub struct UnitResolver {
    default_unit: LengthUnit,
    number_format: NumberFormat,
}

impl UnitResolver {
    pub fn new(default_unit: LengthUnit, number_format: NumberFormat) -> Self {
        Self {
            default_unit,
            number_format,
        }
    }

    /// 有效单位: 行级提示 > 表头注记 > 默认单位
    pub fn effective_unit(&self, row_hint: UnitHint, header_hint: UnitHint) -> LengthUnit {
        row_hint
            .unit()
            .or_else(|| header_hint.unit())
            .unwrap_or(self.default_unit)
    }

    /// 解析数值文本（可带单位后缀）
    pub fn parse_number(&self, text: &str) -> Option<f64> {
        let (number, _) = LengthUnit::split_suffix(text);
        if number.is_empty() {
            return None;
        }

        let invariant = NumberFormat::INVARIANT;
        parse_with(number, invariant.decimal_separator, invariant.group_separator())
            .or_else(|| {
                parse_with(
                    number,
                    self.number_format.decimal_separator,
                    self.number_format.group_separator(),
                )
            })
            .or_else(|| number.replace(',', ".").parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// 解析一行: 确定单位并换算到规范单位
    pub fn resolve(&self, row: CandidateRow, header_hint: UnitHint) -> ResolvedRow {
        let unit = self.effective_unit(row.unit_hint, header_hint);
        let elevation = self
            .parse_number(&row.raw_elevation_text)
            .map(|value| unit.to_canonical(value))
            .ok_or(RowIssue::InvalidElevation);

        ResolvedRow {
            source_line: row.source_line,
            raw_name: row.raw_name,
            raw_elevation_text: row.raw_elevation_text,
            unit,
            elevation,
        }
    }
}
