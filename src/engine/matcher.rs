// ==========================================
// 标高导入系统 - 匹配器
// ==========================================
// 阶段 4: 将校验后的行与文档已有标高比对，判定 CREATE / UPDATE / SKIP / CONFLICT_SKIP
// ==========================================
// 规则:
// 1) 行按标高升序处理，同标高按源行号
// 2) 同名（不区分大小写）: 容差内 SKIP，否则 UPDATE
// 3) 不同名: 与累计标高集合中任一标高在容差内 → CONFLICT_SKIP，否则 CREATE
// 4) CREATE / UPDATE 立即追加进累计标高集合
// ==========================================

use crate::domain::level::{name_key, Classification, ExistingLevel, RowIssue, ValidatedRow};
use crate::domain::types::Tolerance;
use crate::domain::warning::ImportWarning;
use std::collections::HashMap;
use tracing::{debug, instrument};

// ==========================================
// ElevationLedger - 累计标高集合
// ==========================================
// 只追加；顺序即登记顺序
#[derive(Debug, Clone, Default)]
pub struct ElevationLedger {
    entries: Vec<(String, f64)>,
}

impl ElevationLedger {
    pub fn from_levels(levels: &[ExistingLevel]) -> Self {
        Self {
            entries: levels
                .iter()
                .map(|l| (l.name.clone(), l.elevation))
                .collect(),
        }
    }

    pub fn push(&mut self, name: &str, elevation: f64) {
        self.entries.push((name.to_string(), elevation));
    }

    /// 容差内最接近的登记项名称
    pub fn nearest_within(&self, elevation: f64, tolerance: Tolerance) -> Option<&str> {
        self.entries
            .iter()
            .filter(|(_, e)| tolerance.matches(*e, elevation))
            .min_by(|a, b| (a.1 - elevation).abs().total_cmp(&(b.1 - elevation).abs()))
            .map(|(name, _)| name.as_str())
    }
}

/// 匹配结果
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub classifications: Vec<Classification>,
    pub warnings: Vec<ImportWarning>,
}

// ==========================================
// LevelMatcher - 匹配器
// ==========================================
pub struct LevelMatcher {
    tolerance: Tolerance,
}

impl LevelMatcher {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// 标高升序，同标高按源行号
    pub fn sort_rows(rows: &mut [ValidatedRow]) {
        rows.sort_by(|a, b| {
            a.elevation
                .total_cmp(&b.elevation)
                .then(a.source_line.cmp(&b.source_line))
        });
    }

    /// 逐行判定
    ///
    /// # 参数
    /// - rows: 校验通过的行（任意顺序）
    /// - existing: 运行开始时的文档标高快照
    ///
    /// # 返回
    /// 每行恰好一个判定（按处理顺序），以及标高冲突警告
    #[instrument(skip_all, fields(rows = rows.len(), existing = existing.len()))]
    pub fn classify(&self, mut rows: Vec<ValidatedRow>, existing: &[ExistingLevel]) -> MatchOutcome {
        Self::sort_rows(&mut rows);

        // 同名查找表；文档内重名时先出现者优先
        let mut by_name: HashMap<String, &ExistingLevel> = HashMap::new();
        for level in existing {
            by_name.entry(name_key(&level.name)).or_insert(level);
        }

        let mut ledger = ElevationLedger::from_levels(existing);
        let mut outcome = MatchOutcome::default();

        for row in rows {
            let classification = match by_name.get(&name_key(&row.name)) {
                Some(level) if self.tolerance.matches(level.elevation, row.elevation) => {
                    debug!(line = row.source_line, name = %row.name, "标高一致，跳过");
                    Classification::Skip {
                        level: (*level).clone(),
                        row,
                    }
                }
                Some(level) => {
                    debug!(
                        line = row.source_line,
                        name = %row.name,
                        from = level.elevation,
                        to = row.elevation,
                        "标高变化，更新"
                    );
                    ledger.push(&row.name, row.elevation);
                    Classification::Update {
                        level: (*level).clone(),
                        row,
                    }
                }
                None => match ledger.nearest_within(row.elevation, self.tolerance) {
                    Some(other) => {
                        let conflicting = other.to_string();
                        debug!(
                            line = row.source_line,
                            name = %row.name,
                            conflicting = %conflicting,
                            "标高冲突，跳过"
                        );
                        outcome.warnings.push(ImportWarning::AmbiguousElevation {
                            line: row.source_line,
                            name: row.name.clone(),
                            conflicting: Some(conflicting.clone()),
                        });
                        Classification::ConflictSkip {
                            row,
                            reason: RowIssue::AmbiguousElevation,
                            conflicting: Some(conflicting),
                        }
                    }
                    None => {
                        debug!(line = row.source_line, name = %row.name, "新建");
                        ledger.push(&row.name, row.elevation);
                        Classification::Create(row)
                    }
                },
            };
            outcome.classifications.push(classification);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::level::{ClassificationKind, ClassificationTally};
    use crate::domain::types::{ElementId, LengthUnit};

    fn row(line: usize, name: &str, elevation_ft: f64) -> ValidatedRow {
        ValidatedRow {
            source_line: line,
            name: name.to_string(),
            elevation: elevation_ft,
        }
    }

    fn level(id: i64, name: &str, elevation_ft: f64) -> ExistingLevel {
        ExistingLevel {
            id: ElementId(id),
            name: name.to_string(),
            elevation: elevation_ft,
        }
    }

    fn kinds(outcome: &MatchOutcome) -> Vec<ClassificationKind> {
        outcome.classifications.iter().map(|c| c.kind()).collect()
    }

    #[test]
    fn test_create_on_empty_document() {
        let matcher = LevelMatcher::new(Tolerance::default());
        let outcome = matcher.classify(vec![row(2, "P1", 0.0)], &[]);
        assert_eq!(kinds(&outcome), vec![ClassificationKind::Create]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_update_when_outside_tolerance() {
        let matcher = LevelMatcher::new(Tolerance::default());
        let target = LengthUnit::Meters.to_canonical(3.0);
        let outcome = matcher.classify(vec![row(2, "p1", target)], &[level(1, "P1", 10.0)]);

        match &outcome.classifications[0] {
            Classification::Update { level, row } => {
                assert_eq!(level.id, ElementId(1));
                assert!((row.elevation - 9.8425).abs() < 1e-3);
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_skip_within_tolerance() {
        let matcher = LevelMatcher::new(Tolerance::default());
        let half_mm = LengthUnit::Millimeters.to_canonical(0.5);
        let outcome = matcher.classify(vec![row(2, "P1", 10.0 + half_mm)], &[level(1, "P1", 10.0)]);
        assert_eq!(kinds(&outcome), vec![ClassificationKind::Skip]);
    }

    #[test]
    fn test_same_elevation_different_names_conflicts() {
        let matcher = LevelMatcher::new(Tolerance::default());
        let five_m = LengthUnit::Meters.to_canonical(5.0);
        let outcome = matcher.classify(vec![row(3, "B", five_m), row(2, "A", five_m)], &[]);

        assert_eq!(
            kinds(&outcome),
            vec![ClassificationKind::Create, ClassificationKind::ConflictSkip]
        );
        assert_eq!(outcome.classifications[0].row().name, "A");
        match &outcome.classifications[1] {
            Classification::ConflictSkip {
                row,
                reason,
                conflicting,
            } => {
                assert_eq!(row.name, "B");
                assert_eq!(*reason, RowIssue::AmbiguousElevation);
                assert_eq!(conflicting.as_deref(), Some("A"));
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_conflict_with_existing_level_of_other_name() {
        let matcher = LevelMatcher::new(Tolerance::default());
        let outcome = matcher.classify(vec![row(2, "Nuevo", 10.0)], &[level(1, "P1", 10.0)]);
        assert_eq!(kinds(&outcome), vec![ClassificationKind::ConflictSkip]);
    }

    #[test]
    fn test_updated_elevation_extends_ledger() {
        let matcher = LevelMatcher::new(Tolerance::default());
        // P1 从 0 移动到 20；随后的 X 落在 20 上应冲突
        let outcome = matcher.classify(
            vec![row(2, "P1", 20.0), row(3, "X", 20.0)],
            &[level(1, "P1", 0.0)],
        );
        assert_eq!(
            kinds(&outcome),
            vec![ClassificationKind::Update, ClassificationKind::ConflictSkip]
        );
    }

    #[test]
    fn test_rows_processed_in_elevation_order() {
        let matcher = LevelMatcher::new(Tolerance::default());
        let outcome = matcher.classify(
            vec![row(2, "P3", 30.0), row(3, "P1", 0.0), row(4, "P2", 15.0)],
            &[],
        );
        let names: Vec<&str> = outcome
            .classifications
            .iter()
            .map(|c| c.row().name.as_str())
            .collect();
        assert_eq!(names, vec!["P1", "P2", "P3"]);
    }

    #[test]
    fn test_tally_matches_input_count() {
        let matcher = LevelMatcher::new(Tolerance::default());
        let rows = vec![
            row(2, "P1", 0.0),
            row(3, "P2", 10.0),
            row(4, "P3", 10.0),
            row(5, "P4", 25.0),
        ];
        let outcome = matcher.classify(rows, &[level(1, "P2", 12.0), level(2, "P4", 25.0)]);
        let tally = ClassificationTally::from_classifications(&outcome.classifications);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_zero_tolerance_only_exact_matches() {
        let matcher = LevelMatcher::new(Tolerance::new(0.0).unwrap());
        let outcome = matcher.classify(vec![row(2, "P1", 10.000001)], &[level(1, "P1", 10.0)]);
        assert_eq!(kinds(&outcome), vec![ClassificationKind::Update]);
    }
}
