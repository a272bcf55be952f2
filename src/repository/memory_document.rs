// ==========================================
// 标高导入系统 - 内存文档实现
// ==========================================
// 用途: 试运行（dry-run）与测试
// 支持故障注入: 重命名失败 / 标高锁定 / 视图创建失败 / 任意阶段致命异常
// ==========================================

use crate::domain::level::{name_key, ExistingLevel};
use crate::domain::types::ElementId;
use crate::repository::error::{DocumentError, DocumentResult};
use crate::repository::level_document_repo::{
    validate_element_name, DocumentSnapshot, LevelDocument, SnapshotLevel,
};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct LevelRecord {
    pub id: ElementId,
    pub name: String,
    pub elevation: f64,
    pub elevation_locked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRecord {
    pub id: ElementId,
    pub level_id: Option<ElementId>,
    pub name: String,
    pub scale: i32,
    pub crop_active: bool,
    pub crop_visible: bool,
}

#[derive(Debug, Clone, Default)]
struct DocState {
    levels: Vec<LevelRecord>,
    views: Vec<ViewRecord>,
    next_id: i64,
}

// ==========================================
// FaultPlan - 故障注入计划
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// 重命名为这些名称时被拒绝（不区分大小写）
    pub reject_level_names: HashSet<String>,
    /// 在这些标高（ft）上新建标高时被拒绝
    pub reject_create_elevations: Vec<f64>,
    /// 这些标高名的视图创建被拒绝
    pub reject_views_for: HashSet<String>,
    /// 第 N 次新建标高时抛出致命异常（1 起）
    pub fatal_on_create_call: Option<usize>,
    /// 第 N 次新建视图时抛出致命异常（1 起）
    pub fatal_on_view_call: Option<usize>,
    /// assimilate 时抛出致命异常
    pub fatal_on_assimilate: bool,
    /// 文档无平面视图类型
    pub no_plan_view_type: bool,
}

// ==========================================
// MemoryLevelDocument
// ==========================================
#[derive(Debug, Default)]
pub struct MemoryLevelDocument {
    state: DocState,
    group_snapshot: Option<DocState>,
    tx_snapshot: Option<DocState>,
    faults: FaultPlan,
    create_calls: usize,
    view_calls: usize,
    events: Vec<String>,
}

impl MemoryLevelDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 (名称, 标高 ft) 列表构造
    pub fn with_levels<'a, I>(levels: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut doc = Self::new();
        for (name, elevation) in levels {
            doc.insert_level(name, elevation, false);
        }
        doc
    }

    /// 以文档快照构造（试运行用）
    ///
    /// 只读标志与平面视图类型缺失一并带入，使试运行与真实写入结果一致
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Self {
        let mut doc = Self::new();
        let mut max_id = 0;
        for entry in snapshot.levels {
            max_id = max_id.max(entry.level.id.0);
            doc.state.levels.push(LevelRecord {
                id: entry.level.id,
                name: entry.level.name,
                elevation: entry.level.elevation,
                elevation_locked: entry.elevation_locked,
            });
        }
        doc.state.next_id = max_id;
        for name in snapshot.view_names {
            doc.insert_view(&name);
        }
        doc.faults.no_plan_view_type = !snapshot.has_plan_view_type;
        doc
    }

    pub fn insert_level(&mut self, name: &str, elevation: f64, locked: bool) -> ElementId {
        let id = self.next_id();
        self.state.levels.push(LevelRecord {
            id,
            name: name.to_string(),
            elevation,
            elevation_locked: locked,
        });
        id
    }

    pub fn insert_view(&mut self, name: &str) -> ElementId {
        let id = self.next_id();
        self.state.views.push(ViewRecord {
            id,
            level_id: None,
            name: name.to_string(),
            scale: 100,
            crop_active: false,
            crop_visible: false,
        });
        id
    }

    pub fn faults_mut(&mut self) -> &mut FaultPlan {
        &mut self.faults
    }

    pub fn level_records(&self) -> &[LevelRecord] {
        &self.state.levels
    }

    pub fn view_records(&self) -> &[ViewRecord] {
        &self.state.views
    }

    pub fn level_by_name(&self, name: &str) -> Option<&LevelRecord> {
        let key = name_key(name);
        self.state.levels.iter().find(|l| name_key(&l.name) == key)
    }

    /// 事务事件记录（begin_group / commit_transaction / rollback_group ...）
    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn in_group(&self) -> bool {
        self.group_snapshot.is_some()
    }

    fn next_id(&mut self) -> ElementId {
        self.state.next_id += 1;
        ElementId(self.state.next_id)
    }

    fn require_transaction(&self) -> DocumentResult<()> {
        if self.tx_snapshot.is_none() {
            return Err(DocumentError::TransactionState(
                "修改文档前必须开启事务".to_string(),
            ));
        }
        Ok(())
    }

    fn level_mut(&mut self, id: ElementId) -> DocumentResult<&mut LevelRecord> {
        self.state
            .levels
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(DocumentError::NotFound(id))
    }

    fn view_mut(&mut self, id: ElementId) -> DocumentResult<&mut ViewRecord> {
        self.state
            .views
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(DocumentError::NotFound(id))
    }

    fn default_level_name(&self) -> String {
        let taken: HashSet<String> = self.state.levels.iter().map(|l| name_key(&l.name)).collect();
        (1..)
            .map(|n| format!("Nivel {}", n))
            .find(|candidate| !taken.contains(&name_key(candidate)))
            .unwrap_or_default()
    }
}

impl LevelDocument for MemoryLevelDocument {
    fn levels(&self) -> DocumentResult<Vec<ExistingLevel>> {
        Ok(self
            .state
            .levels
            .iter()
            .map(|l| ExistingLevel {
                id: l.id,
                name: l.name.clone(),
                elevation: l.elevation,
            })
            .collect())
    }

    fn view_names(&self) -> DocumentResult<Vec<String>> {
        Ok(self.state.views.iter().map(|v| v.name.clone()).collect())
    }

    fn supports_plan_views(&self) -> bool {
        !self.faults.no_plan_view_type
    }

    fn snapshot(&self) -> DocumentResult<DocumentSnapshot> {
        Ok(DocumentSnapshot {
            levels: self
                .state
                .levels
                .iter()
                .map(|l| SnapshotLevel {
                    level: ExistingLevel {
                        id: l.id,
                        name: l.name.clone(),
                        elevation: l.elevation,
                    },
                    elevation_locked: l.elevation_locked,
                })
                .collect(),
            view_names: self.view_names()?,
            has_plan_view_type: self.supports_plan_views(),
        })
    }

    fn create_level(&mut self, elevation: f64) -> DocumentResult<ExistingLevel> {
        self.require_transaction()?;
        self.create_calls += 1;
        if self.faults.fatal_on_create_call == Some(self.create_calls) {
            return Err(DocumentError::Fatal("新建标高时文档异常".to_string()));
        }
        if self
            .faults
            .reject_create_elevations
            .iter()
            .any(|e| (e - elevation).abs() < 1e-9)
        {
            return Err(DocumentError::Rejected(format!(
                "无法在 {:.4} ft 新建标高",
                elevation
            )));
        }

        let name = self.default_level_name();
        let id = self.next_id();
        self.state.levels.push(LevelRecord {
            id,
            name: name.clone(),
            elevation,
            elevation_locked: false,
        });
        Ok(ExistingLevel {
            id,
            name,
            elevation,
        })
    }

    fn rename_level(&mut self, id: ElementId, name: &str) -> DocumentResult<()> {
        self.require_transaction()?;
        validate_element_name(name)?;
        let key = name_key(name);
        if self.faults.reject_level_names.contains(&key) {
            return Err(DocumentError::Rejected(format!("名称不可用: {}", name)));
        }
        if self
            .state
            .levels
            .iter()
            .any(|l| l.id != id && name_key(&l.name) == key)
        {
            return Err(DocumentError::Rejected(format!("名称已被占用: {}", name)));
        }
        self.level_mut(id)?.name = name.to_string();
        Ok(())
    }

    fn set_level_elevation(&mut self, id: ElementId, elevation: f64) -> DocumentResult<()> {
        self.require_transaction()?;
        let level = self.level_mut(id)?;
        if level.elevation_locked {
            return Err(DocumentError::ParameterReadOnly {
                element: id,
                parameter: "elevation".to_string(),
            });
        }
        level.elevation = elevation;
        Ok(())
    }

    fn create_plan_view(&mut self, level: ElementId) -> DocumentResult<ElementId> {
        self.require_transaction()?;
        if self.faults.no_plan_view_type {
            return Err(DocumentError::NoPlanViewType);
        }
        self.view_calls += 1;
        if self.faults.fatal_on_view_call == Some(self.view_calls) {
            return Err(DocumentError::Fatal("新建视图时文档异常".to_string()));
        }

        let level_name = self
            .state
            .levels
            .iter()
            .find(|l| l.id == level)
            .map(|l| l.name.clone())
            .ok_or(DocumentError::NotFound(level))?;
        if self.faults.reject_views_for.contains(&name_key(&level_name)) {
            return Err(DocumentError::Rejected(format!(
                "无法为标高 {} 新建视图",
                level_name
            )));
        }

        let id = self.next_id();
        self.state.views.push(ViewRecord {
            id,
            level_id: Some(level),
            name: format!("{} ({})", level_name, id.0),
            scale: 100,
            crop_active: false,
            crop_visible: true,
        });
        Ok(id)
    }

    fn rename_view(&mut self, view: ElementId, name: &str) -> DocumentResult<()> {
        self.require_transaction()?;
        validate_element_name(name)?;
        let key = name_key(name);
        if self
            .state
            .views
            .iter()
            .any(|v| v.id != view && name_key(&v.name) == key)
        {
            return Err(DocumentError::Rejected(format!("视图名称已被占用: {}", name)));
        }
        self.view_mut(view)?.name = name.to_string();
        Ok(())
    }

    fn set_view_scale(&mut self, view: ElementId, scale: i32) -> DocumentResult<()> {
        self.require_transaction()?;
        if scale <= 0 {
            return Err(DocumentError::Rejected(format!("无效比例: {}", scale)));
        }
        self.view_mut(view)?.scale = scale;
        Ok(())
    }

    fn set_crop_box_active(&mut self, view: ElementId, active: bool) -> DocumentResult<()> {
        self.require_transaction()?;
        self.view_mut(view)?.crop_active = active;
        Ok(())
    }

    fn set_crop_box_visible(&mut self, view: ElementId, visible: bool) -> DocumentResult<()> {
        self.require_transaction()?;
        self.view_mut(view)?.crop_visible = visible;
        Ok(())
    }

    fn begin_group(&mut self, name: &str) -> DocumentResult<()> {
        if self.group_snapshot.is_some() {
            return Err(DocumentError::TransactionState("事务组已开启".to_string()));
        }
        self.group_snapshot = Some(self.state.clone());
        self.events.push(format!("begin_group:{}", name));
        Ok(())
    }

    fn assimilate_group(&mut self) -> DocumentResult<()> {
        if self.tx_snapshot.is_some() {
            return Err(DocumentError::TransactionState(
                "仍有未结束的事务".to_string(),
            ));
        }
        if self.group_snapshot.is_none() {
            return Err(DocumentError::TransactionState("事务组未开启".to_string()));
        }
        if self.faults.fatal_on_assimilate {
            return Err(DocumentError::Fatal("合并事务组时文档异常".to_string()));
        }
        self.group_snapshot = None;
        self.events.push("assimilate_group".to_string());
        Ok(())
    }

    fn rollback_group(&mut self) -> DocumentResult<()> {
        let snapshot = self
            .group_snapshot
            .take()
            .ok_or_else(|| DocumentError::TransactionState("事务组未开启".to_string()))?;
        self.tx_snapshot = None;
        self.state = snapshot;
        self.events.push("rollback_group".to_string());
        Ok(())
    }

    fn begin_transaction(&mut self, name: &str) -> DocumentResult<()> {
        if self.tx_snapshot.is_some() {
            return Err(DocumentError::TransactionState("事务已开启".to_string()));
        }
        self.tx_snapshot = Some(self.state.clone());
        self.events.push(format!("begin_transaction:{}", name));
        Ok(())
    }

    fn commit_transaction(&mut self) -> DocumentResult<()> {
        self.tx_snapshot
            .take()
            .ok_or_else(|| DocumentError::TransactionState("事务未开启".to_string()))?;
        self.events.push("commit_transaction".to_string());
        Ok(())
    }

    fn rollback_transaction(&mut self) -> DocumentResult<()> {
        let snapshot = self
            .tx_snapshot
            .take()
            .ok_or_else(|| DocumentError::TransactionState("事务未开启".to_string()))?;
        self.state = snapshot;
        self.events.push("rollback_transaction".to_string());
        Ok(())
    }
}
