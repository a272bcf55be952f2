// ==========================================
// 标高导入系统 - 视图派生
// ==========================================
// 阶段 7: 为本次新建的标高各派生一个平面视图
// 红线: 只处理新建标高；UPDATE / SKIP 的标高不派生
// 单个视图失败只记警告，不中断其余视图；致命异常向上抛出
// ==========================================

use crate::domain::level::ExistingLevel;
use crate::domain::view::{DerivedView, ViewSettings, DEFAULT_VIEW_SCALE};
use crate::domain::warning::ImportWarning;
use crate::engine::name_resolver::view_name_resolver;
use crate::engine::transaction::TransactionScope;
use crate::repository::error::{DocumentError, DocumentResult};
use crate::repository::level_document_repo::LevelDocument;
use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

const VIEW_TRANSACTION_NAME: &str = "Crear vistas de planta";

/// 视图派生结果
#[derive(Debug, Clone, Default)]
pub struct ViewDerivation {
    pub views: Vec<DerivedView>,
    pub warnings: Vec<ImportWarning>,
}

impl ViewDerivation {
    pub fn view_names(&self) -> Vec<String> {
        self.views.iter().map(|v| v.final_view_name.clone()).collect()
    }
}

pub struct ViewDeriver {
    settings: ViewSettings,
    now: DateTime<Local>,
}

impl ViewDeriver {
    pub fn new(settings: ViewSettings, now: DateTime<Local>) -> Self {
        Self { settings, now }
    }

    /// 派生视图（在调用方的事务组内，自带内层事务）
    pub fn derive<D>(&self, doc: &mut D, created: &[ExistingLevel]) -> DocumentResult<ViewDerivation>
    where
        D: LevelDocument + ?Sized,
    {
        let mut outcome = ViewDerivation::default();
        if created.is_empty() {
            return Ok(outcome);
        }
        if !doc.supports_plan_views() {
            warn!("文档无平面视图类型，跳过视图派生");
            outcome.warnings.push(ImportWarning::NoPlanViewType);
            return Ok(outcome);
        }

        let mut names = view_name_resolver(doc.view_names()?, self.now);
        let mut tx = TransactionScope::begin(doc, VIEW_TRANSACTION_NAME)?;

        for level in created {
            let view_id = match tx.doc().create_plan_view(level.id) {
                Ok(id) => id,
                Err(e) if e.is_fatal() => return Err(e),
                Err(DocumentError::NoPlanViewType) => {
                    outcome.warnings.push(ImportWarning::NoPlanViewType);
                    break;
                }
                Err(e) => {
                    warn!(level = %level.name, error = %e, "视图创建失败");
                    outcome.warnings.push(ImportWarning::ViewCreateFailed {
                        level: level.name.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let final_name = names.resolve(&self.settings.base_name(&level.name));
            let named = match tx.doc().rename_view(view_id, &final_name) {
                Ok(()) => true,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(level = %level.name, view = %final_name, error = %e, "视图命名失败");
                    outcome.warnings.push(ImportWarning::ViewRenameFailed {
                        level: level.name.clone(),
                        view_name: final_name.clone(),
                        message: e.to_string(),
                    });
                    names.release(&final_name);
                    false
                }
            };

            let label = if named {
                final_name.clone()
            } else {
                level.name.clone()
            };
            let scale_set = record_setting(
                tx.doc().set_view_scale(view_id, self.settings.scale),
                &label,
                &mut outcome.warnings,
            )?;
            let crop_active = record_setting(
                tx.doc().set_crop_box_active(view_id, true),
                &label,
                &mut outcome.warnings,
            )?;
            let crop_hidden = record_setting(
                tx.doc().set_crop_box_visible(view_id, false),
                &label,
                &mut outcome.warnings,
            )?;

            if named {
                debug!(view = %final_name, level = %level.name, "视图已创建");
                outcome.views.push(DerivedView {
                    id: view_id,
                    owner_level_name: level.name.clone(),
                    final_view_name: final_name,
                    scale: if scale_set {
                        self.settings.scale
                    } else {
                        DEFAULT_VIEW_SCALE
                    },
                    crop_active,
                    crop_visible: !crop_hidden,
                });
            }
        }

        tx.commit()?;
        info!(views = outcome.views.len(), warnings = outcome.warnings.len(), "视图派生完成");
        Ok(outcome)
    }
}

/// 单个视图设置的结果；可恢复失败记警告并返回 false
fn record_setting(
    result: DocumentResult<()>,
    view_label: &str,
    warnings: &mut Vec<ImportWarning>,
) -> DocumentResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warnings.push(ImportWarning::ViewSettingsFailed {
                view_name: view_label.to_string(),
                message: e.to_string(),
            });
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory_document::MemoryLevelDocument;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    fn created(doc: &MemoryLevelDocument, names: &[&str]) -> Vec<ExistingLevel> {
        names
            .iter()
            .map(|n| {
                let r = doc.level_by_name(n).unwrap();
                ExistingLevel {
                    id: r.id,
                    name: r.name.clone(),
                    elevation: r.elevation,
                }
            })
            .collect()
    }

    fn derive(doc: &mut MemoryLevelDocument, levels: &[ExistingLevel]) -> DocumentResult<ViewDerivation> {
        ViewDeriver::new(ViewSettings::default(), now()).derive(doc, levels)
    }

    #[test]
    fn test_view_per_created_level() {
        let mut doc = MemoryLevelDocument::with_levels([("P1", 0.0), ("P2", 10.0)]);
        let levels = created(&doc, &["P1", "P2"]);
        let outcome = derive(&mut doc, &levels).unwrap();

        assert_eq!(outcome.view_names(), vec!["Planta - P1", "Planta - P2"]);
        for view in doc.view_records() {
            assert_eq!(view.scale, 100);
            assert!(view.crop_active);
            assert!(!view.crop_visible);
        }
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_existing_view_name_gets_timestamp() {
        let mut doc = MemoryLevelDocument::with_levels([("P1", 0.0)]);
        doc.insert_view("planta - p1");
        let levels = created(&doc, &["P1"]);
        let outcome = derive(&mut doc, &levels).unwrap();
        assert_eq!(outcome.view_names(), vec!["Planta - P1 (20240102_030405)"]);
    }

    #[test]
    fn test_single_view_failure_does_not_abort() {
        let mut doc = MemoryLevelDocument::with_levels([("P1", 0.0), ("P2", 10.0)]);
        doc.faults_mut().reject_views_for.insert("p1".to_string());
        let levels = created(&doc, &["P1", "P2"]);
        let outcome = derive(&mut doc, &levels).unwrap();

        assert_eq!(outcome.view_names(), vec!["Planta - P2"]);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [ImportWarning::ViewCreateFailed { level, .. }] if level == "P1"
        ));
    }

    #[test]
    fn test_no_plan_view_type_is_single_warning() {
        let mut doc = MemoryLevelDocument::with_levels([("P1", 0.0), ("P2", 10.0)]);
        doc.faults_mut().no_plan_view_type = true;
        let levels = created(&doc, &["P1", "P2"]);
        let outcome = derive(&mut doc, &levels).unwrap();

        assert!(outcome.views.is_empty());
        assert_eq!(outcome.warnings, vec![ImportWarning::NoPlanViewType]);
    }

    #[test]
    fn test_fatal_view_failure_propagates() {
        let mut doc = MemoryLevelDocument::with_levels([("P1", 0.0)]);
        doc.faults_mut().fatal_on_view_call = Some(1);
        let levels = created(&doc, &["P1"]);
        let err = derive(&mut doc, &levels).unwrap_err();
        assert!(err.is_fatal());
        assert!(doc.view_records().is_empty());
    }

    #[test]
    fn test_nothing_created_means_no_transaction() {
        let mut doc = MemoryLevelDocument::new();
        let outcome = derive(&mut doc, &[]).unwrap();
        assert!(outcome.views.is_empty());
        assert!(doc.events().is_empty());
    }
}
