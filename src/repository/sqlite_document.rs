// ==========================================
// 标高导入系统 - SQLite 文档实现
// ==========================================
// 事务映射:
// - 事务组  → BEGIN / COMMIT / ROLLBACK
// - 内层事务 → SAVEPOINT / RELEASE / ROLLBACK TO
// 红线: 不含业务逻辑，只负责数据访问
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::level::ExistingLevel;
use crate::domain::types::ElementId;
use crate::repository::error::{DocumentError, DocumentResult};
use crate::repository::level_document_repo::{
    validate_element_name, DocumentSnapshot, LevelDocument, SnapshotLevel,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

const SAVEPOINT_NAME: &str = "level_import_tx";

/// 唯一约束冲突视为可恢复拒绝，其余数据库错误视为致命
fn map_write_error(err: rusqlite::Error) -> DocumentError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
            DocumentError::Rejected(msg.clone().unwrap_or_else(|| err.to_string()))
        }
        _ => DocumentError::from(err),
    }
}

// ==========================================
// SqliteLevelDocument
// ==========================================
/// 以 SQLite 文件作为标高文档
pub struct SqliteLevelDocument {
    conn: Arc<Mutex<Connection>>,
    group_open: bool,
    tx_open: bool,
}

impl SqliteLevelDocument {
    /// 打开（必要时创建）文档库并初始化 schema
    pub fn open(db_path: &str) -> DocumentResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建（schema 由调用方保证）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            group_open: false,
            tx_open: false,
        }
    }

    /// 共享连接（供配置管理器复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn get_conn(&self) -> DocumentResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DocumentError::Database(format!("锁获取失败: {}", e)))
    }

    fn require_transaction(&self) -> DocumentResult<()> {
        if !self.tx_open {
            return Err(DocumentError::TransactionState(
                "修改文档前必须开启事务".to_string(),
            ));
        }
        Ok(())
    }

    /// 直接写入一条标高（初始化/测试用，不经过事务模型）
    pub fn insert_level(&self, name: &str, elevation: f64, locked: bool) -> DocumentResult<ElementId> {
        validate_element_name(name)?;
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO level (name, elevation_ft, elevation_locked) VALUES (?1, ?2, ?3)",
            params![name, elevation, locked],
        )
        .map_err(map_write_error)?;
        Ok(ElementId(conn.last_insert_rowid()))
    }

    /// 视图明细: (名称, 所属标高名, 比例, 裁剪激活, 裁剪可见)
    pub fn view_details(&self) -> DocumentResult<Vec<(String, Option<String>, i32, bool, bool)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT v.name, l.name, v.scale, v.crop_active, v.crop_visible
            FROM plan_view v
            LEFT JOIN level l ON l.level_id = v.level_id
            ORDER BY v.view_id
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn level_name(conn: &Connection, id: ElementId) -> DocumentResult<String> {
        conn.query_row(
            "SELECT name FROM level WHERE level_id = ?1",
            [id.0],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(DocumentError::NotFound(id))
    }

    fn default_level_name(conn: &Connection) -> DocumentResult<String> {
        let mut n: i64 = 0;
        loop {
            n += 1;
            let candidate = format!("Nivel {}", n);
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM level WHERE name = ?1 COLLATE NOCASE LIMIT 1",
                    [&candidate],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_none() {
                return Ok(candidate);
            }
        }
    }

    fn update_view<F>(&self, view: ElementId, op: &str, bind: F) -> DocumentResult<()>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<usize>,
    {
        self.require_transaction()?;
        let conn = self.get_conn()?;
        let changed = bind(&conn).map_err(map_write_error)?;
        if changed == 0 {
            tracing::debug!(op = op, view = %view, "视图不存在");
            return Err(DocumentError::NotFound(view));
        }
        Ok(())
    }
}

impl LevelDocument for SqliteLevelDocument {
    fn levels(&self) -> DocumentResult<Vec<ExistingLevel>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT level_id, name, elevation_ft FROM level ORDER BY elevation_ft, level_id",
        )?;
        let levels = stmt
            .query_map([], |row| {
                Ok(ExistingLevel {
                    id: ElementId(row.get(0)?),
                    name: row.get(1)?,
                    elevation: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(levels)
    }

    fn view_names(&self) -> DocumentResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT name FROM plan_view ORDER BY view_id")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn supports_plan_views(&self) -> bool {
        let result = self.get_conn().and_then(|conn| {
            conn.query_row(
                "SELECT 1 FROM view_family_type WHERE family = 'FLOOR_PLAN' LIMIT 1",
                [],
                |_row| Ok(true),
            )
            .optional()
            .map_err(DocumentError::from)
        });
        match result {
            Ok(found) => found.unwrap_or(false),
            Err(e) => {
                tracing::warn!(error = %e, "查询平面视图类型失败");
                false
            }
        }
    }

    fn snapshot(&self) -> DocumentResult<DocumentSnapshot> {
        let levels = {
            let conn = self.get_conn()?;
            let mut stmt = conn.prepare(
                r#"
                SELECT level_id, name, elevation_ft, elevation_locked
                FROM level
                ORDER BY elevation_ft, level_id
                "#,
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(SnapshotLevel {
                        level: ExistingLevel {
                            id: ElementId(row.get(0)?),
                            name: row.get(1)?,
                            elevation: row.get(2)?,
                        },
                        elevation_locked: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        Ok(DocumentSnapshot {
            levels,
            view_names: self.view_names()?,
            has_plan_view_type: self.supports_plan_views(),
        })
    }

    fn create_level(&mut self, elevation: f64) -> DocumentResult<ExistingLevel> {
        self.require_transaction()?;
        if !elevation.is_finite() {
            return Err(DocumentError::Rejected(format!("无效标高: {}", elevation)));
        }
        let conn = self.get_conn()?;
        let name = Self::default_level_name(&conn)?;
        conn.execute(
            "INSERT INTO level (name, elevation_ft) VALUES (?1, ?2)",
            params![name, elevation],
        )
        .map_err(map_write_error)?;
        Ok(ExistingLevel {
            id: ElementId(conn.last_insert_rowid()),
            name,
            elevation,
        })
    }

    fn rename_level(&mut self, id: ElementId, name: &str) -> DocumentResult<()> {
        self.require_transaction()?;
        validate_element_name(name)?;
        let conn = self.get_conn()?;
        let taken: Option<i64> = conn
            .query_row(
                "SELECT level_id FROM level WHERE name = ?1 COLLATE NOCASE AND level_id <> ?2 LIMIT 1",
                params![name, id.0],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(DocumentError::Rejected(format!("名称已被占用: {}", name)));
        }
        let changed = conn
            .execute(
                "UPDATE level SET name = ?1, updated_at = datetime('now') WHERE level_id = ?2",
                params![name, id.0],
            )
            .map_err(map_write_error)?;
        if changed == 0 {
            return Err(DocumentError::NotFound(id));
        }
        Ok(())
    }

    fn set_level_elevation(&mut self, id: ElementId, elevation: f64) -> DocumentResult<()> {
        self.require_transaction()?;
        let conn = self.get_conn()?;
        let locked: bool = conn
            .query_row(
                "SELECT elevation_locked FROM level WHERE level_id = ?1",
                [id.0],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(DocumentError::NotFound(id))?;
        if locked {
            return Err(DocumentError::ParameterReadOnly {
                element: id,
                parameter: "elevation".to_string(),
            });
        }
        conn.execute(
            "UPDATE level SET elevation_ft = ?1, updated_at = datetime('now') WHERE level_id = ?2",
            params![elevation, id.0],
        )?;
        Ok(())
    }

    fn create_plan_view(&mut self, level: ElementId) -> DocumentResult<ElementId> {
        self.require_transaction()?;
        let conn = self.get_conn()?;
        let type_id: i64 = conn
            .query_row(
                "SELECT type_id FROM view_family_type WHERE family = 'FLOOR_PLAN' ORDER BY type_id LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(DocumentError::NoPlanViewType)?;
        let level_name = Self::level_name(&conn, level)?;

        // 先以唯一占位名插入，再按 "<标高名> (<视图ID>)" 命名
        let placeholder = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO plan_view (level_id, type_id, name) VALUES (?1, ?2, ?3)",
            params![level.0, type_id, placeholder],
        )
        .map_err(map_write_error)?;
        let view_id = conn.last_insert_rowid();
        conn.execute(
            "UPDATE plan_view SET name = ?1 WHERE view_id = ?2",
            params![format!("{} ({})", level_name, view_id), view_id],
        )
        .map_err(map_write_error)?;
        Ok(ElementId(view_id))
    }

    fn rename_view(&mut self, view: ElementId, name: &str) -> DocumentResult<()> {
        self.require_transaction()?;
        validate_element_name(name)?;
        {
            let conn = self.get_conn()?;
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT view_id FROM plan_view WHERE name = ?1 COLLATE NOCASE AND view_id <> ?2 LIMIT 1",
                    params![name, view.0],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(DocumentError::Rejected(format!("视图名称已被占用: {}", name)));
            }
        }
        self.update_view(view, "rename_view", |conn| {
            conn.execute(
                "UPDATE plan_view SET name = ?1 WHERE view_id = ?2",
                params![name, view.0],
            )
        })
    }

    fn set_view_scale(&mut self, view: ElementId, scale: i32) -> DocumentResult<()> {
        if scale <= 0 {
            return Err(DocumentError::Rejected(format!("无效比例: {}", scale)));
        }
        self.update_view(view, "set_view_scale", |conn| {
            conn.execute(
                "UPDATE plan_view SET scale = ?1 WHERE view_id = ?2",
                params![scale, view.0],
            )
        })
    }

    fn set_crop_box_active(&mut self, view: ElementId, active: bool) -> DocumentResult<()> {
        self.update_view(view, "set_crop_box_active", |conn| {
            conn.execute(
                "UPDATE plan_view SET crop_active = ?1 WHERE view_id = ?2",
                params![active, view.0],
            )
        })
    }

    fn set_crop_box_visible(&mut self, view: ElementId, visible: bool) -> DocumentResult<()> {
        self.update_view(view, "set_crop_box_visible", |conn| {
            conn.execute(
                "UPDATE plan_view SET crop_visible = ?1 WHERE view_id = ?2",
                params![visible, view.0],
            )
        })
    }

    fn begin_group(&mut self, name: &str) -> DocumentResult<()> {
        if self.group_open {
            return Err(DocumentError::TransactionState("事务组已开启".to_string()));
        }
        self.get_conn()?.execute_batch("BEGIN IMMEDIATE")?;
        self.group_open = true;
        tracing::debug!(group = name, "事务组开启");
        Ok(())
    }

    fn assimilate_group(&mut self) -> DocumentResult<()> {
        if self.tx_open {
            return Err(DocumentError::TransactionState(
                "仍有未结束的事务".to_string(),
            ));
        }
        if !self.group_open {
            return Err(DocumentError::TransactionState("事务组未开启".to_string()));
        }
        self.get_conn()?.execute_batch("COMMIT")?;
        self.group_open = false;
        Ok(())
    }

    fn rollback_group(&mut self) -> DocumentResult<()> {
        if !self.group_open {
            return Err(DocumentError::TransactionState("事务组未开启".to_string()));
        }
        self.group_open = false;
        self.tx_open = false;
        self.get_conn()?.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn begin_transaction(&mut self, name: &str) -> DocumentResult<()> {
        if self.tx_open {
            return Err(DocumentError::TransactionState("事务已开启".to_string()));
        }
        self.get_conn()?
            .execute_batch(&format!("SAVEPOINT {}", SAVEPOINT_NAME))?;
        self.tx_open = true;
        tracing::debug!(transaction = name, "事务开启");
        Ok(())
    }

    fn commit_transaction(&mut self) -> DocumentResult<()> {
        if !self.tx_open {
            return Err(DocumentError::TransactionState("事务未开启".to_string()));
        }
        self.get_conn()?
            .execute_batch(&format!("RELEASE {}", SAVEPOINT_NAME))?;
        self.tx_open = false;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> DocumentResult<()> {
        if !self.tx_open {
            return Err(DocumentError::TransactionState("事务未开启".to_string()));
        }
        self.tx_open = false;
        self.get_conn()?.execute_batch(&format!(
            "ROLLBACK TO {0}; RELEASE {0}",
            SAVEPOINT_NAME
        ))?;
        Ok(())
    }
}
