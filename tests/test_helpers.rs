// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时输入文件、临时数据库、固定时钟
// ==========================================

#![allow(dead_code)]

use chrono::{DateTime, Local, TimeZone};
use level_import::{ImportSettings, LengthUnit, LevelImportPipeline};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

/// 以指定扩展名写入临时输入文件
pub fn write_input(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp input file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp input file");
    file
}

pub fn write_csv(content: &str) -> NamedTempFile {
    write_input(".csv", content)
}

/// 创建临时数据库路径（目录需保持存活）
pub fn create_test_db() -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("levels.db").to_string_lossy().to_string();
    (dir, db_path)
}

/// 固定视图名时间戳
pub fn fixed_now() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 10, 16, 10, 15, 0)
        .single()
        .expect("valid local time")
}

pub fn settings(unit: LengthUnit) -> ImportSettings {
    ImportSettings::default().with_default_unit(Some(unit))
}

pub fn pipeline(unit: LengthUnit) -> LevelImportPipeline {
    LevelImportPipeline::new(settings(unit)).with_clock(fixed_now())
}

/// 断言两个标高（ft）在 1e-4 内相等
pub fn assert_elevation(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "elevation {} != {}",
        actual,
        expected
    );
}
