// ==========================================
// 标高导入系统 - 流程编排器
// ==========================================
// 用途: 按 1→8 顺序协调各阶段，任何阶段不回到前一阶段
// 1 解析 → 2 单位换算 → 3 校验/去重 → 4 匹配 → 5/6 命名与写入 → 7 视图派生 → 8 报告
// ==========================================

use crate::config::ImportSettings;
use crate::domain::report::RunReport;
use crate::domain::types::LengthUnit;
use crate::domain::warning::ImportWarning;
use crate::engine::apply::ApplyEngine;
use crate::engine::matcher::LevelMatcher;
use crate::engine::report_builder::{ReportBuilder, ReportInput};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{ColumnMapping, LevelFileParser, UniversalFileParser};
use crate::importer::row_validator::RowValidator;
use crate::importer::unit_resolver::UnitResolver;
use crate::repository::level_document_repo::LevelDocument;
use crate::repository::memory_document::MemoryLevelDocument;
use chrono::{DateTime, Local};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

// ==========================================
// LevelImportPipeline - 标高导入流程
// ==========================================
pub struct LevelImportPipeline<P = UniversalFileParser> {
    parser: P,
    settings: ImportSettings,
    clock: Option<DateTime<Local>>,
}

impl LevelImportPipeline<UniversalFileParser> {
    pub fn new(settings: ImportSettings) -> Self {
        Self::with_parser(UniversalFileParser, settings)
    }
}

impl<P: LevelFileParser> LevelImportPipeline<P> {
    pub fn with_parser(parser: P, settings: ImportSettings) -> Self {
        Self {
            parser,
            settings,
            clock: None,
        }
    }

    /// 固定视图名时间戳（测试用）
    pub fn with_clock(mut self, now: DateTime<Local>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// 试运行: 在文档快照的内存副本上执行完整流程，原文档不被修改
    pub fn preview<D>(
        &self,
        doc: &D,
        source: &Path,
        columns: Option<ColumnMapping>,
    ) -> ImportResult<RunReport>
    where
        D: LevelDocument + ?Sized,
    {
        let mut copy = MemoryLevelDocument::from_snapshot(doc.snapshot()?);
        info!("试运行: 写入在文档副本上执行");
        self.run(&mut copy, source, columns)
    }

    /// 执行完整导入流程
    ///
    /// # 参数
    /// - doc: 目标文档（调用方保证本次运行期间独占）
    /// - source: 输入文件路径
    /// - columns: 显式列映射（None 时按表头识别）
    ///
    /// # 返回
    /// - Ok(RunReport): 运行完成（含无有效行的空操作）
    /// - Err: 致命错误；若发生在写入阶段，文档已整体回滚
    #[instrument(skip(self, doc, source, columns), fields(run_id = tracing::field::Empty, source = %source.display()))]
    pub fn run<D>(
        &self,
        doc: &mut D,
        source: &Path,
        columns: Option<ColumnMapping>,
    ) -> ImportResult<RunReport>
    where
        D: LevelDocument + ?Sized,
    {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let default_unit = self
            .settings
            .default_unit
            .ok_or(ImportError::MissingDefaultUnit)?;
        let source_file = source
            .file_name()
            .map(|name| name.to_string_lossy().to_string());

        // ==========================================
        // 步骤1-2: 解析 + 单位换算
        // ==========================================
        let parsed = self.parser.parse(source, columns)?;
        let header_hint = parsed.header_unit;
        info!(format = ?parsed.format, header_unit = ?header_hint, "文件解析开始");

        let resolver = UnitResolver::new(default_unit, self.settings.number_format);
        let resolved = parsed
            .map(|candidate| candidate.map(|row| resolver.resolve(row, header_hint)))
            .collect::<ImportResult<Vec<_>>>()?;

        // 报告中的单位: 标高列单位 + 各行实际采用的单位
        let input_unit = header_hint.unit().unwrap_or(default_unit);
        let mut units_used: Vec<LengthUnit> = Vec::new();
        for row in resolved.iter().filter(|row| row.elevation.is_ok()) {
            if !units_used.contains(&row.unit) {
                units_used.push(row.unit);
            }
        }

        // ==========================================
        // 步骤3: 校验/去重
        // ==========================================
        let mut validation = RowValidator.validate(resolved);
        info!(
            total = validation.total_rows,
            valid = validation.rows.len(),
            invalid = validation.invalid_rows,
            "行校验完成"
        );

        let total_rows = validation.total_rows;
        let invalid_rows = validation.invalid_rows;
        let mut warnings = std::mem::take(&mut validation.warnings);

        if validation.is_empty() {
            info!("无有效行，运行按空操作结束");
            warnings.push(ImportWarning::NoValidRows);
            return Ok(ReportBuilder::build(ReportInput {
                run_id: &run_id,
                source_file: source_file.as_deref(),
                default_unit,
                input_unit,
                units_used: &units_used,
                elapsed_ms: elapsed_ms(started),
                total_rows,
                invalid_rows,
                classifications: &[],
                applied: None,
                warnings: &warnings,
            }));
        }

        // ==========================================
        // 步骤4: 匹配
        // ==========================================
        let existing = doc.levels()?;
        let matched = LevelMatcher::new(self.settings.tolerance).classify(validation.rows, &existing);
        warnings.extend(matched.warnings);
        debug!(existing = existing.len(), "匹配完成");

        // ==========================================
        // 步骤5-7: 命名、写入、视图派生
        // ==========================================
        let now = self.clock.unwrap_or_else(Local::now);
        let engine = ApplyEngine::new(self.settings.view.clone(), now);
        let applied = engine
            .apply(doc, &matched.classifications)
            .map_err(|e| {
                error!(error = %e, "写入失败，事务组已回滚");
                ImportError::ApplyFailed {
                    message: e.to_string(),
                }
            })?;

        // ==========================================
        // 步骤8: 报告
        // ==========================================
        let report = ReportBuilder::build(ReportInput {
            run_id: &run_id,
            source_file: source_file.as_deref(),
            default_unit,
            input_unit,
            units_used: &units_used,
            elapsed_ms: elapsed_ms(started),
            total_rows,
            invalid_rows,
            classifications: &matched.classifications,
            applied: Some(&applied),
            warnings: &warnings,
        });
        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            views = report.created_views.len(),
            warnings = report.warnings.len(),
            elapsed_ms = report.elapsed_ms,
            "导入完成"
        );
        Ok(report)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
