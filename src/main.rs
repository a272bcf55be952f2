// ==========================================
// 标高导入系统 - 命令行入口
// ==========================================
// 子命令: import / levels / init / config
// 报告输出到 stdout，日志输出到 stderr
// ==========================================

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use level_import::config::{ConfigManager, ImportConfigReader, ImportSettings};
use level_import::db::{get_default_db_path, DB_PATH_ENV};
use level_import::domain::{LengthUnit, Tolerance};
use level_import::i18n::{self, t_with_args};
use level_import::importer::{ColumnMapping, ImportError};
use level_import::repository::{LevelDocument, SqliteLevelDocument};
use level_import::{logging, LevelImportPipeline};

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "level-import")]
#[command(about = "Importa niveles desde CSV/Excel y crea sus vistas de planta")]
#[command(version = level_import::VERSION)]
struct Cli {
    /// Database file (defaults to LEVEL_IMPORT_DB_PATH or the user data dir)
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import levels from a CSV/TXT or spreadsheet file
    #[command(after_help = "\
Examples:
  level-import import niveles.csv --unit m
  level-import import niveles.xlsx --unit mm --dry-run
  level-import import datos.csv --unit ft --name-col 2 --elevation-col 4 --json")]
    Import {
        /// Input file (.csv, .txt, .xlsx, .xlsm, .xlsb, .xls, .ods)
        file: PathBuf,

        /// Unit for elevations without a row or header unit
        #[arg(long, short = 'u', value_enum)]
        unit: Option<UnitArg>,

        /// Matching tolerance in millimeters
        #[arg(long)]
        tolerance_mm: Option<f64>,

        /// Scale of the derived plan views
        #[arg(long)]
        view_scale: Option<i32>,

        /// Name column (1-based; requires --elevation-col)
        #[arg(long, requires = "elevation_col")]
        name_col: Option<usize>,

        /// Elevation column (1-based; requires --name-col)
        #[arg(long, requires = "name_col")]
        elevation_col: Option<usize>,

        /// Unit column (1-based, optional)
        #[arg(long, requires = "name_col")]
        unit_col: Option<usize>,

        /// Run against an in-memory copy; nothing is saved
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Report language
        #[arg(long, value_parser = ["es", "en"])]
        lang: Option<String>,
    },

    /// List levels and plan views in the database
    Levels,

    /// Create the database schema
    Init,

    /// Read or write stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store a setting (tolerance_mm, default_unit, view_scale, view_name_prefix, decimal_separator, locale)
    Set { key: String, value: String },
    /// Print all stored settings as JSON
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnitArg {
    Mm,
    M,
    Ft,
}

impl From<UnitArg> for LengthUnit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Mm => LengthUnit::Millimeters,
            UnitArg::M => LengthUnit::Meters,
            UnitArg::Ft => LengthUnit::Feet,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {:#}", e);
            let usage = matches!(
                e.downcast_ref::<ImportError>(),
                Some(ImportError::MissingDefaultUnit | ImportError::ConfigValueError { .. })
            );
            ExitCode::from(if usage { EXIT_USAGE } else { EXIT_ERROR })
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    tracing::debug!(db_path = %db_path, "使用数据库");

    match cli.command {
        Commands::Import {
            file,
            unit,
            tolerance_mm,
            view_scale,
            name_col,
            elevation_col,
            unit_col,
            dry_run,
            json,
            lang,
        } => {
            let columns = column_mapping(name_col, elevation_col, unit_col)?;
            let tolerance = tolerance_mm
                .map(|mm| {
                    Tolerance::from_millimeters(mm).ok_or_else(|| ImportError::ConfigValueError {
                        key: "tolerance_mm".to_string(),
                        value: mm.to_string(),
                        message: "debe ser un número finito >= 0".to_string(),
                    })
                })
                .transpose()?;
            if let Some(scale) = view_scale.filter(|s| *s <= 0) {
                return Err(ImportError::ConfigValueError {
                    key: "view_scale".to_string(),
                    value: scale.to_string(),
                    message: "debe ser > 0".to_string(),
                }
                .into());
            }

            let mut doc = SqliteLevelDocument::open(&db_path)
                .with_context(|| format!("no se pudo abrir {}", db_path))?;
            let config = ConfigManager::from_connection(doc.connection())
                .map_err(|e| anyhow!("{}", e))?;
            let settings = ImportSettings::from_reader(&config)
                .map_err(|e| anyhow!("{}", e))?
                .with_default_unit(unit.map(LengthUnit::from))
                .with_tolerance(tolerance)
                .with_view_scale(view_scale)
                .with_locale(lang);
            i18n::set_locale(&settings.locale);

            let pipeline = LevelImportPipeline::new(settings);
            let report = if dry_run {
                pipeline.preview(&doc, &file, columns)?
            } else {
                pipeline.run(&mut doc, &file, columns)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.render_text());
                if dry_run {
                    println!("{}", i18n::t("cli.dry_run"));
                }
            }
            Ok(())
        }
        Commands::Levels => {
            let doc = SqliteLevelDocument::open(&db_path)
                .with_context(|| format!("no se pudo abrir {}", db_path))?;
            let config = ConfigManager::from_connection(doc.connection())
                .map_err(|e| anyhow!("{}", e))?;
            i18n::set_locale(&config.get_locale().map_err(|e| anyhow!("{}", e))?);
            print_levels(&doc, &db_path)
        }
        Commands::Init => {
            SqliteLevelDocument::open(&db_path)
                .with_context(|| format!("no se pudo inicializar {}", db_path))?;
            println!("{}", t_with_args("cli.init_done", &[("path", db_path.as_str())]));
            Ok(())
        }
        Commands::Config { action } => {
            let config = ConfigManager::new(&db_path).map_err(|e| anyhow!("{}", e))?;
            match action {
                ConfigAction::Set { key, value } => {
                    config
                        .set_global_config_value(&key, &value)
                        .map_err(|e| anyhow!("{}", e))?;
                    println!(
                        "{}",
                        t_with_args("cli.config_saved", &[("key", key.as_str()), ("value", value.as_str())])
                    );
                }
                ConfigAction::List => {
                    println!("{}", config.get_config_snapshot().map_err(|e| anyhow!("{}", e))?);
                }
            }
            Ok(())
        }
    }
}

/// 1 起列号 → 0 起映射
fn column_mapping(
    name_col: Option<usize>,
    elevation_col: Option<usize>,
    unit_col: Option<usize>,
) -> Result<Option<ColumnMapping>, ImportError> {
    let to_index = |key: &str, col: usize| {
        col.checked_sub(1).ok_or_else(|| ImportError::ConfigValueError {
            key: key.to_string(),
            value: col.to_string(),
            message: "las columnas empiezan en 1".to_string(),
        })
    };
    match (name_col, elevation_col) {
        (Some(name), Some(elevation)) => Ok(Some(ColumnMapping {
            name: to_index("name_col", name)?,
            elevation: to_index("elevation_col", elevation)?,
            unit: unit_col.map(|c| to_index("unit_col", c)).transpose()?,
        })),
        _ => Ok(None),
    }
}

fn print_levels(doc: &SqliteLevelDocument, db_path: &str) -> anyhow::Result<()> {
    println!("{}", t_with_args("cli.levels_header", &[("path", db_path)]));
    for level in doc.levels()? {
        println!(
            "  {:<24} {:>10.3} m {:>10.3} ft",
            level.name,
            LengthUnit::Meters.from_canonical(level.elevation),
            level.elevation
        );
    }

    let views = doc.view_details()?;
    if !views.is_empty() {
        println!();
        println!("{}", i18n::t("cli.views_header"));
        for (name, level, scale, crop_active, crop_visible) in views {
            println!(
                "  {:<32} {:<16} 1:{:<5} crop={} visible={}",
                name,
                level.unwrap_or_default(),
                scale,
                crop_active,
                crop_visible
            );
        }
    }
    Ok(())
}
