// ==========================================
// 标高导入系统 - 行校验与去重
// ==========================================
// 阶段 3: 按顺序应用规则
//   (a) 名称为空          → EmptyName
//   (b) 名称本次已出现过  → DuplicateInFile（首次出现者胜出）
//   (c) 标高无法解析      → InvalidElevation
// 红线: 单行问题只记警告，绝不中止整次运行
// ==========================================

use crate::domain::level::{name_key, RowIssue, ValidatedRow};
use crate::domain::warning::ImportWarning;
use crate::importer::unit_resolver::ResolvedRow;
use std::collections::HashSet;
use tracing::debug;

/// 校验结果
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub rows: Vec<ValidatedRow>,
    pub warnings: Vec<ImportWarning>,
    pub total_rows: usize,
    pub invalid_rows: usize,
}

impl ValidationOutcome {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct RowValidator;

impl RowValidator {
    pub fn validate<I>(&self, rows: I) -> ValidationOutcome
    where
        I: IntoIterator<Item = ResolvedRow>,
    {
        let mut outcome = ValidationOutcome::default();
        let mut seen_names: HashSet<String> = HashSet::new();

        for row in rows {
            outcome.total_rows += 1;
            match self.check_row(&row, &mut seen_names) {
                Ok(validated) => outcome.rows.push(validated),
                Err(issue) => {
                    debug!(line = row.source_line, issue = %issue, "行校验未通过");
                    outcome.invalid_rows += 1;
                    outcome.warnings.push(Self::warning_for(&row, issue));
                }
            }
        }

        outcome
    }

    fn check_row(
        &self,
        row: &ResolvedRow,
        seen_names: &mut HashSet<String>,
    ) -> Result<ValidatedRow, RowIssue> {
        let name = row.raw_name.trim();
        if name.is_empty() {
            return Err(RowIssue::EmptyName);
        }

        // 名称在标高校验之前登记：首次出现即占用该名称
        if !seen_names.insert(name_key(name)) {
            return Err(RowIssue::DuplicateInFile);
        }

        let elevation = row.elevation?;

        Ok(ValidatedRow {
            source_line: row.source_line,
            name: name.to_string(),
            elevation,
        })
    }

    fn warning_for(row: &ResolvedRow, issue: RowIssue) -> ImportWarning {
        let line = row.source_line;
        match issue {
            RowIssue::EmptyName => ImportWarning::EmptyName { line },
            RowIssue::DuplicateInFile => ImportWarning::DuplicateInFile {
                line,
                name: row.raw_name.trim().to_string(),
            },
            RowIssue::InvalidElevation => ImportWarning::InvalidElevation {
                line,
                text: row.raw_elevation_text.clone(),
            },
            RowIssue::AmbiguousElevation => ImportWarning::AmbiguousElevation {
                line,
                name: row.raw_name.trim().to_string(),
                conflicting: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::LengthUnit;

    fn resolved(line: usize, name: &str, elevation: Result<f64, RowIssue>) -> ResolvedRow {
        ResolvedRow {
            source_line: line,
            raw_name: name.to_string(),
            raw_elevation_text: "x".to_string(),
            unit: LengthUnit::Meters,
            elevation,
        }
    }

    #[test]
    fn test_validate_all_valid() {
        let outcome = RowValidator.validate(vec![
            resolved(2, "P1", Ok(0.0)),
            resolved(3, "P2", Ok(10.0)),
        ]);
        assert_eq!(outcome.rows.len(), 2);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.total_rows, 2);
    }

    #[test]
    fn test_validate_empty_name() {
        let outcome = RowValidator.validate(vec![
            resolved(2, "   ", Ok(0.0)),
            resolved(3, "P2", Ok(10.0)),
        ]);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.invalid_rows, 1);
        assert_eq!(outcome.warnings, vec![ImportWarning::EmptyName { line: 2 }]);
    }

    #[test]
    fn test_validate_duplicate_first_wins_case_insensitive() {
        let outcome = RowValidator.validate(vec![
            resolved(2, "Nivel 1", Ok(0.0)),
            resolved(3, "NIVEL 1", Ok(5.0)),
            resolved(4, "nivel 1", Ok(6.0)),
        ]);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].source_line, 2);
        assert_eq!(outcome.invalid_rows, 2);
        assert_eq!(
            outcome.warnings[0].row_issue(),
            Some(RowIssue::DuplicateInFile)
        );
        assert_eq!(outcome.warnings[1].source_line(), Some(4));
    }

    #[test]
    fn test_validate_invalid_elevation_still_claims_name() {
        let outcome = RowValidator.validate(vec![
            resolved(2, "P1", Err(RowIssue::InvalidElevation)),
            resolved(3, "P1", Ok(3.0)),
        ]);
        assert!(outcome.is_empty());
        assert_eq!(
            outcome.warnings[0].row_issue(),
            Some(RowIssue::InvalidElevation)
        );
        assert_eq!(
            outcome.warnings[1].row_issue(),
            Some(RowIssue::DuplicateInFile)
        );
    }
}
