// ==========================================
// 标高导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (scope_id + key → value)
// 非法配置值: 记录告警并回落到默认值
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::LengthUnit;
use crate::domain::view::{DEFAULT_VIEW_NAME_PREFIX, DEFAULT_VIEW_SCALE};
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    ///
    /// 只接受 config_keys 中登记的键
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        if !config_keys::ALL.contains(&key) {
            return Err(format!("未知配置键: {}", key).into());
        }
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value.trim()],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - CLI `config list` 展示
    /// - 运行报告中记录本次使用的配置
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
impl ImportConfigReader for ConfigManager {
    fn get_tolerance_mm(&self) -> Result<f64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::TOLERANCE_MM, "1.0")?;
        match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = config_keys::TOLERANCE_MM,
                    raw_value = %value,
                    "容差配置非法，使用默认值"
                );
                Ok(1.0)
            }
        }
    }

    fn get_default_unit(&self) -> Result<Option<LengthUnit>, Box<dyn Error>> {
        let value = match self.get_config_value(config_keys::DEFAULT_UNIT)? {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Ok(None),
        };
        match value.parse::<LengthUnit>() {
            Ok(unit) => Ok(Some(unit)),
            Err(_) => {
                tracing::warn!(
                    config_key = config_keys::DEFAULT_UNIT,
                    raw_value = %value,
                    "默认单位配置非法，视为未配置"
                );
                Ok(None)
            }
        }
    }

    fn get_view_scale(&self) -> Result<i32, Box<dyn Error>> {
        let default = DEFAULT_VIEW_SCALE.to_string();
        let value = self.get_config_or_default(config_keys::VIEW_SCALE, &default)?;
        match value.trim().parse::<i32>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = config_keys::VIEW_SCALE,
                    raw_value = %value,
                    "视图比例配置非法，使用默认值"
                );
                Ok(DEFAULT_VIEW_SCALE)
            }
        }
    }

    fn get_view_name_prefix(&self) -> Result<String, Box<dyn Error>> {
        // 前缀允许尾随空格，不做 trim
        self.get_config_or_default(config_keys::VIEW_NAME_PREFIX, DEFAULT_VIEW_NAME_PREFIX)
    }

    fn get_decimal_separator(&self) -> Result<char, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DECIMAL_SEPARATOR, ",")?;
        match value.trim() {
            "." => Ok('.'),
            "," => Ok(','),
            _ => {
                tracing::warn!(
                    config_key = config_keys::DECIMAL_SEPARATOR,
                    raw_value = %value,
                    "小数分隔符配置非法，使用默认值"
                );
                Ok(',')
            }
        }
    }

    fn get_locale(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::LOCALE, "es")?;
        Ok(value.trim().to_lowercase())
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 匹配
    pub const TOLERANCE_MM: &str = "tolerance_mm";
    pub const DEFAULT_UNIT: &str = "default_unit";

    // 视图
    pub const VIEW_SCALE: &str = "view_scale";
    pub const VIEW_NAME_PREFIX: &str = "view_name_prefix";

    // 区域
    pub const DECIMAL_SEPARATOR: &str = "decimal_separator";
    pub const LOCALE: &str = "locale";

    pub const ALL: &[&str] = &[
        TOLERANCE_MM,
        DEFAULT_UNIT,
        VIEW_SCALE,
        VIEW_NAME_PREFIX,
        DECIMAL_SEPARATOR,
        LOCALE,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, ConfigManager) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.db");
        let manager = ConfigManager::new(path.to_str().unwrap()).unwrap();
        (dir, manager)
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let (_dir, manager) = manager();
        assert_eq!(manager.get_tolerance_mm().unwrap(), 1.0);
        assert_eq!(manager.get_default_unit().unwrap(), None);
        assert_eq!(manager.get_view_scale().unwrap(), 100);
        assert_eq!(manager.get_view_name_prefix().unwrap(), "Planta - ");
        assert_eq!(manager.get_decimal_separator().unwrap(), ',');
        assert_eq!(manager.get_locale().unwrap(), "es");
    }

    #[test]
    fn test_stored_values_override_defaults() {
        let (_dir, manager) = manager();
        manager.set_global_config_value(config_keys::TOLERANCE_MM, "2.5").unwrap();
        manager.set_global_config_value(config_keys::DEFAULT_UNIT, "m").unwrap();
        manager.set_global_config_value(config_keys::VIEW_SCALE, "50").unwrap();

        assert_eq!(manager.get_tolerance_mm().unwrap(), 2.5);
        assert_eq!(manager.get_default_unit().unwrap(), Some(LengthUnit::Meters));
        assert_eq!(manager.get_view_scale().unwrap(), 50);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let (_dir, manager) = manager();
        manager.set_global_config_value(config_keys::TOLERANCE_MM, "-3").unwrap();
        manager.set_global_config_value(config_keys::VIEW_SCALE, "abc").unwrap();
        manager.set_global_config_value(config_keys::DEFAULT_UNIT, "furlong").unwrap();

        assert_eq!(manager.get_tolerance_mm().unwrap(), 1.0);
        assert_eq!(manager.get_view_scale().unwrap(), 100);
        assert_eq!(manager.get_default_unit().unwrap(), None);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let (_dir, manager) = manager();
        assert!(manager.set_global_config_value("season_mode", "AUTO").is_err());
    }

    #[test]
    fn test_snapshot_lists_stored_keys() {
        let (_dir, manager) = manager();
        manager.set_global_config_value(config_keys::LOCALE, "en").unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(parsed.get("locale").map(String::as_str), Some("en"));
    }
}
