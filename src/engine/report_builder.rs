// ==========================================
// 标高导入系统 - 报告构建
// ==========================================
// 阶段 8: 纯函数，汇总判定、写入结果与警告
// ==========================================

use crate::domain::level::{Classification, ClassificationTally};
use crate::domain::report::RunReport;
use crate::domain::types::LengthUnit;
use crate::domain::warning::ImportWarning;
use crate::engine::apply::ApplyOutcome;

/// 报告输入
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub run_id: &'a str,
    pub source_file: Option<&'a str>,
    pub default_unit: LengthUnit,
    pub input_unit: LengthUnit,
    pub units_used: &'a [LengthUnit],
    pub elapsed_ms: u64,
    pub total_rows: usize,
    pub invalid_rows: usize,
    pub classifications: &'a [Classification],
    /// 未进入写入阶段（无有效行）时为 None
    pub applied: Option<&'a ApplyOutcome>,
    /// 解析/校验/匹配阶段的警告
    pub warnings: &'a [ImportWarning],
}

pub struct ReportBuilder;

impl ReportBuilder {
    pub fn build(input: ReportInput<'_>) -> RunReport {
        let mut warnings = input.warnings.to_vec();
        let (created, updated, unchanged, created_views) = match input.applied {
            Some(applied) => {
                warnings.extend(applied.warnings.iter().cloned());
                (
                    applied.created.clone(),
                    applied.updated.clone(),
                    applied.unchanged.clone(),
                    applied.created_view_names(),
                )
            }
            None => Default::default(),
        };

        RunReport {
            run_id: input.run_id.to_string(),
            source_file: input.source_file.map(str::to_string),
            default_unit: input.default_unit,
            input_unit: input.input_unit,
            units_used: input.units_used.to_vec(),
            cancelled: input.applied.is_none(),
            elapsed_ms: input.elapsed_ms,
            total_rows: input.total_rows,
            invalid_rows: input.invalid_rows,
            tally: ClassificationTally::from_classifications(input.classifications),
            created,
            updated,
            unchanged,
            created_views,
            warnings,
        }
    }
}
