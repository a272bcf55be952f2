// ==========================================
// 标高导入系统 - 运行报告
// ==========================================
// 纯输出对象；由 ReportBuilder 生成
// ==========================================

use crate::domain::level::{ClassificationTally, ExistingLevel};
use crate::domain::types::LengthUnit;
use crate::domain::warning::ImportWarning;
use rust_i18n::t;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    // ===== 运行信息 =====
    pub run_id: String,
    pub source_file: Option<String>,
    pub default_unit: LengthUnit, // 运行参数给定的默认单位
    pub input_unit: LengthUnit,   // 标高列单位: 表头注记，否则默认单位
    pub units_used: Vec<LengthUnit>, // 各行实际采用的单位（按首次出现顺序）
    pub cancelled: bool, // 无有效行时为 true（空操作，不是失败）
    pub elapsed_ms: u64,

    // ===== 行统计 =====
    pub total_rows: usize,   // 解析出的候选行数
    pub invalid_rows: usize, // 校验阶段剔除的行数
    pub tally: ClassificationTally,

    // ===== 结果 =====
    pub created: Vec<ExistingLevel>,
    pub updated: Vec<ExistingLevel>,
    pub unchanged: Vec<ExistingLevel>,
    pub created_views: Vec<String>,
    pub warnings: Vec<ImportWarning>,
}

impl RunReport {
    /// 本地化后的警告文本
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(|w| w.to_string()).collect()
    }
}

// ==========================================
// 文本渲染（本地化）
// ==========================================
impl RunReport {
    /// 标高按输入单位显示，保留三位小数
    fn format_elevation(&self, canonical: f64) -> String {
        format!(
            "{:.3} {}",
            self.input_unit.from_canonical(canonical),
            self.input_unit.symbol()
        )
    }

    /// 实际采用的单位；无有效标高时退回标高列单位
    fn unit_label(&self) -> String {
        if self.units_used.is_empty() {
            return self.input_unit.symbol().to_string();
        }
        self.units_used
            .iter()
            .map(|u| u.symbol())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn render_text(&self) -> String {
        let mut lines = vec![t!("report.title").to_string()];
        if let Some(file) = &self.source_file {
            lines.push(t!("report.source", file = file).to_string());
        }
        lines.push(t!("report.unit", unit = self.unit_label()).to_string());
        lines.push(
            t!(
                "report.rows",
                total = self.total_rows,
                invalid = self.invalid_rows
            )
            .to_string(),
        );

        if self.cancelled {
            lines.push(t!("report.cancelled").to_string());
        } else {
            lines.push(
                t!(
                    "report.tally",
                    create = self.created.len(),
                    update = self.updated.len(),
                    skip = self.unchanged.len(),
                    conflict = self.tally.conflict_skip
                )
                .to_string(),
            );
            if self.created.is_empty() && self.updated.is_empty() {
                lines.push(t!("report.no_changes").to_string());
            }
        }

        let mut section = |header: String, items: Vec<String>| {
            if !items.is_empty() {
                lines.push(String::new());
                lines.push(header);
                lines.extend(items.into_iter().map(|item| format!("  - {}", item)));
            }
        };
        section(
            t!("report.created_header").to_string(),
            self.created
                .iter()
                .map(|l| format!("{} ({})", l.name, self.format_elevation(l.elevation)))
                .collect(),
        );
        section(
            t!("report.updated_header").to_string(),
            self.updated
                .iter()
                .map(|l| format!("{} ({})", l.name, self.format_elevation(l.elevation)))
                .collect(),
        );
        section(t!("report.views_header").to_string(), self.created_views.clone());
        section(t!("report.warnings_header").to_string(), self.warning_messages());

        lines.push(String::new());
        lines.push(t!("report.elapsed", ms = self.elapsed_ms).to_string());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ElementId;
    use crate::i18n::tests::LOCALE_TEST_LOCK;

    fn report() -> RunReport {
        RunReport {
            run_id: "r".to_string(),
            source_file: Some("niveles.csv".to_string()),
            default_unit: LengthUnit::Meters,
            input_unit: LengthUnit::Meters,
            units_used: vec![LengthUnit::Meters],
            cancelled: false,
            elapsed_ms: 12,
            total_rows: 3,
            invalid_rows: 1,
            tally: ClassificationTally {
                create: 1,
                update: 0,
                skip: 1,
                conflict_skip: 0,
            },
            created: vec![ExistingLevel {
                id: ElementId(5),
                name: "P1".to_string(),
                elevation: LengthUnit::Meters.to_canonical(3.0),
            }],
            updated: vec![],
            unchanged: vec![],
            created_views: vec!["Planta - P1".to_string()],
            warnings: vec![ImportWarning::EmptyName { line: 4 }],
        }
    }

    #[test]
    fn test_render_text_spanish() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        crate::i18n::set_locale("es");
        let text = report().render_text();

        assert!(text.contains("Archivo: niveles.csv"));
        assert!(text.contains("  - P1 (3.000 m)"));
        assert!(text.contains("  - Planta - P1"));
        assert!(text.contains("Fila 4: nombre vacío"));
    }

    #[test]
    fn test_render_text_english_cancelled() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        crate::i18n::set_locale("en");
        let mut r = report();
        r.cancelled = true;
        r.created.clear();
        r.created_views.clear();
        let text = r.render_text();
        crate::i18n::set_locale("es");

        assert!(text.contains("Operation cancelled"));
        assert!(!text.contains("Created levels:"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["created"][0]["name"], "P1");
        assert_eq!(json["warnings"][0]["kind"], "EMPTY_NAME");
    }

    #[test]
    fn test_render_text_shows_conflicts_and_applied_units() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        crate::i18n::set_locale("es");
        let mut r = report();
        r.tally.conflict_skip = 2;
        r.input_unit = LengthUnit::Millimeters;
        r.units_used = vec![LengthUnit::Millimeters, LengthUnit::Feet];
        let text = r.render_text();

        assert!(text.contains("Omitidos: 2"));
        assert!(text.contains("Unidad de entrada: mm, ft"));
        // 标高按标高列单位显示
        assert!(text.contains("  - P1 (3000.000 mm)"));
    }
}
