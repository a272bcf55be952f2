// ==========================================
// 标高导入系统 - 单元格清洗
// ==========================================
// 职责: TRIM / BOM 去除 / NULL 标准化 / 表头归一化与单位注记提取
// ==========================================

use crate::domain::types::{LengthUnit, UnitHint};

/// 表头单位注记（按此顺序匹配）
const HEADER_UNIT_TOKENS: &[(&str, LengthUnit)] = &[
    ("(mm)", LengthUnit::Millimeters),
    ("[mm]", LengthUnit::Millimeters),
    ("(m)", LengthUnit::Meters),
    ("[m]", LengthUnit::Meters),
    ("(ft)", LengthUnit::Feet),
    ("[ft]", LengthUnit::Feet),
];

pub struct DataCleaner;

impl DataCleaner {
    /// 清洗单元格文本: 去 BOM、去首尾空白
    pub fn clean_cell(&self, value: &str) -> String {
        value.trim_start_matches('\u{feff}').trim().to_string()
    }

    /// 表头归一化: 小写、去重音、去掉单位注记与非字母数字字符
    ///
    /// `"Elevación (m)"` → `"elevacion"`
    pub fn normalize_header(&self, header: &str) -> String {
        let lowered = self.clean_cell(header).to_lowercase();
        let without_unit = HEADER_UNIT_TOKENS
            .iter()
            .fold(lowered, |acc, (token, _)| acc.replace(token, ""));

        without_unit
            .chars()
            .map(fold_accent)
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    }

    /// 提取表头中的单位注记（忽略空白与大小写）
    pub fn header_unit(&self, header: &str) -> UnitHint {
        let compact: String = header
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        HEADER_UNIT_TOKENS
            .iter()
            .find(|(token, _)| compact.contains(token))
            .map(|(_, unit)| UnitHint::from(*unit))
            .unwrap_or_default()
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        other => other,
    }
}
