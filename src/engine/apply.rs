// ==========================================
// 标高导入系统 - 写入引擎
// ==========================================
// 阶段 6: 在一个事务组内执行判定结果，并驱动视图派生
// ==========================================
// 事务结构:
//   事务组 "Importar niveles"
//     ├─ 事务 "Crear/actualizar niveles"  (标高新建/重命名/改标高)
//     └─ 事务 "Crear vistas de planta"    (ViewDeriver)
//   视图派生成功后才 assimilate；任何致命异常整体回滚
// ==========================================
// 可恢复问题（记警告，继续）:
// - 新建被拒绝       → 该行不计入新建
// - 重命名失败       → 标高保留文档默认名，仍计入新建
// - 标高只读/被拒绝  → 视为未变化
// ==========================================

use crate::domain::level::{name_key, Classification, ExistingLevel, ValidatedRow};
use crate::domain::view::{DerivedView, ViewSettings};
use crate::domain::warning::ImportWarning;
use crate::engine::name_resolver::{level_name_resolver, CounterSuffix, NameResolver};
use crate::engine::transaction::{GroupScope, TransactionScope};
use crate::engine::view_deriver::ViewDeriver;
use crate::repository::error::{DocumentError, DocumentResult};
use crate::repository::level_document_repo::LevelDocument;
use chrono::{DateTime, Local};
use tracing::{debug, info, instrument, warn};

pub const GROUP_NAME: &str = "Importar niveles";
pub const LEVEL_TRANSACTION_NAME: &str = "Crear/actualizar niveles";

/// 写入结果
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub created: Vec<ExistingLevel>,
    pub updated: Vec<ExistingLevel>,
    pub unchanged: Vec<ExistingLevel>,
    pub views: Vec<DerivedView>,
    pub warnings: Vec<ImportWarning>,
}

impl ApplyOutcome {
    pub fn created_view_names(&self) -> Vec<String> {
        self.views.iter().map(|v| v.final_view_name.clone()).collect()
    }
}

// ==========================================
// ApplyEngine - 写入引擎
// ==========================================
pub struct ApplyEngine {
    view_settings: ViewSettings,
    now: DateTime<Local>,
}

impl ApplyEngine {
    pub fn new(view_settings: ViewSettings, now: DateTime<Local>) -> Self {
        Self { view_settings, now }
    }

    /// 执行全部判定
    ///
    /// # 返回
    /// - Ok: 事务组已合并
    /// - Err: 致命异常，事务组已回滚，文档无任何结构性修改
    #[instrument(skip_all, fields(classifications = classifications.len()))]
    pub fn apply<D>(&self, doc: &mut D, classifications: &[Classification]) -> DocumentResult<ApplyOutcome>
    where
        D: LevelDocument + ?Sized,
    {
        let known_names: Vec<String> = doc.levels()?.into_iter().map(|l| l.name).collect();
        let mut names = level_name_resolver(known_names);
        let mut outcome = ApplyOutcome::default();

        let mut group = GroupScope::begin(doc, GROUP_NAME)?;

        // ===== 标高新建/更新 =====
        {
            let mut tx = TransactionScope::begin(group.doc(), LEVEL_TRANSACTION_NAME)?;
            for classification in classifications {
                match classification {
                    Classification::Create(row) => {
                        if let Some(level) = Self::create_level(tx.doc(), row, &mut names, &mut outcome.warnings)? {
                            outcome.created.push(level);
                        }
                    }
                    Classification::Update { level, row } => {
                        match Self::update_level(tx.doc(), level, row, &mut outcome.warnings)? {
                            Some(updated) => outcome.updated.push(updated),
                            None => outcome.unchanged.push(level.clone()),
                        }
                    }
                    Classification::Skip { level, .. } => outcome.unchanged.push(level.clone()),
                    Classification::ConflictSkip { .. } => {}
                }
            }
            tx.commit()?;
        }
        info!(
            created = outcome.created.len(),
            updated = outcome.updated.len(),
            unchanged = outcome.unchanged.len(),
            "标高事务已提交"
        );

        // ===== 视图派生 =====
        let deriver = ViewDeriver::new(self.view_settings.clone(), self.now);
        let derivation = deriver.derive(group.doc(), &outcome.created)?;
        outcome.views = derivation.views;
        outcome.warnings.extend(derivation.warnings);

        group.assimilate()?;
        info!(views = outcome.views.len(), "事务组已合并");
        Ok(outcome)
    }

    /// 新建单个标高并命名
    ///
    /// 新建被拒绝返回 None；重命名失败保留默认名
    fn create_level<D>(
        doc: &mut D,
        row: &ValidatedRow,
        names: &mut NameResolver<CounterSuffix>,
        warnings: &mut Vec<ImportWarning>,
    ) -> DocumentResult<Option<ExistingLevel>>
    where
        D: LevelDocument + ?Sized,
    {
        let desired = names.resolve(&row.name);

        let mut level = match doc.create_level(row.elevation) {
            Ok(level) => level,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(line = row.source_line, name = %row.name, error = %e, "标高新建失败");
                names.release(&desired);
                warnings.push(ImportWarning::LevelCreateFailed {
                    line: row.source_line,
                    name: row.name.clone(),
                    message: e.to_string(),
                });
                return Ok(None);
            }
        };
        names.reserve(&level.name);

        match doc.rename_level(level.id, &desired) {
            Ok(()) => {
                if name_key(&level.name) != name_key(&desired) {
                    names.release(&level.name);
                }
                debug!(line = row.source_line, name = %desired, id = %level.id, "标高已新建");
                level.name = desired;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(
                    line = row.source_line,
                    name = %desired,
                    kept = %level.name,
                    error = %e,
                    "标高重命名失败，保留默认名"
                );
                if name_key(&level.name) != name_key(&desired) {
                    names.release(&desired);
                }
                warnings.push(ImportWarning::LevelRenameFailed {
                    line: row.source_line,
                    name: desired,
                    kept_name: level.name.clone(),
                    message: e.to_string(),
                });
            }
        }
        Ok(Some(level))
    }

    /// 改写单个标高；只读或被拒绝时返回 None（视为未变化）
    fn update_level<D>(
        doc: &mut D,
        level: &ExistingLevel,
        row: &ValidatedRow,
        warnings: &mut Vec<ImportWarning>,
    ) -> DocumentResult<Option<ExistingLevel>>
    where
        D: LevelDocument + ?Sized,
    {
        match doc.set_level_elevation(level.id, row.elevation) {
            Ok(()) => {
                debug!(name = %level.name, from = level.elevation, to = row.elevation, "标高已更新");
                Ok(Some(ExistingLevel {
                    elevation: row.elevation,
                    ..level.clone()
                }))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(DocumentError::ParameterReadOnly { .. }) => {
                warn!(name = %level.name, "标高参数只读");
                warnings.push(ImportWarning::ElevationLocked {
                    name: level.name.clone(),
                });
                Ok(None)
            }
            Err(e) => {
                warn!(name = %level.name, error = %e, "标高更新失败");
                warnings.push(ImportWarning::LevelUpdateFailed {
                    name: level.name.clone(),
                    message: e.to_string(),
                });
                Ok(None)
            }
        }
    }
}
