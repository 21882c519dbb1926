use crate::{
    batch::{BatchProcessor, Progress, ProgressFn},
    config::{BatchConfig, Config, ScanConfig},
    engine::{bridge::BridgeEngine, Engine},
    report::{write_report, RunReport},
    scan::ScanRunner,
    util::{ensure_dir, now_rfc3339},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "vecdoc-refresh")]
#[command(about = "Batch re-save vector documents, scanning and converting legacy text")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./vecdoc-refresh.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the engine bridge starts and answers.
    Doctor {},
    /// Count legacy text in every document of a folder. Saves nothing.
    Scan {
        #[arg(long)]
        input: PathBuf,
    },
    /// List documents whose color space is RGB. Saves nothing.
    ColorScan {
        #[arg(long)]
        input: PathBuf,
    },
    /// Open, optionally convert, and re-save every document of a folder.
    Run {
        #[arg(long)]
        input: PathBuf,
        /// Save updated copies here instead of overwriting the originals.
        #[arg(long, conflicts_with = "overwrite")]
        out_dir: Option<PathBuf>,
        /// Overwrite the originals (the default unless the config says otherwise).
        #[arg(long)]
        overwrite: bool,
        /// Rewrite legacy text objects before saving.
        #[arg(long)]
        convert_legacy: bool,
        /// Run a legacy text scan first and print its result.
        #[arg(long)]
        scan_first: bool,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Scan { input } => scan(&cfg, input),
        Command::ColorScan { input } => color_scan(&cfg, input),
        Command::Run {
            input,
            out_dir,
            overwrite,
            convert_legacy,
            scan_first,
        } => {
            let batch_cfg =
                batch_config(&cfg, input, out_dir.as_deref(), *overwrite, *convert_legacy);
            // Folder problems surface before any bridge is started.
            batch_cfg.validate()?;
            if *scan_first {
                scan(&cfg, input)?;
            }
            run(&cfg, batch_cfg)
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("vecdoc-refresh.toml");
    default.exists().then_some(default)
}

fn init_logging(
    args: &Args,
    cfg: &Config,
    file_path: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.output.report_dir).join("vecdoc-refresh.log"))
}

fn batch_config(
    cfg: &Config,
    input: &Path,
    out_dir: Option<&Path>,
    overwrite: bool,
    convert_legacy: bool,
) -> BatchConfig {
    let mut batch = BatchConfig::from_config(cfg, input);
    if let Some(dest) = out_dir {
        batch.overwrite = false;
        batch.destination_dir = Some(dest.to_path_buf());
    } else if overwrite {
        batch.overwrite = true;
    }
    if convert_legacy {
        batch.convert_legacy_text = true;
    }
    batch
}

fn log_progress(p: Progress<'_>) {
    info!("({}/{}) {}", p.index, p.total, p.file_name);
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = BridgeEngine::new(cfg)?;
    let diag = engine.doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn scan(cfg: &Config, input: &Path) -> Result<()> {
    let scan_cfg = ScanConfig::legacy(cfg, input);
    let extensions = scan_cfg.extensions.clone();
    let engine = BridgeEngine::new(cfg)?;

    let started = now_rfc3339();
    let mut progress = log_progress;
    let result =
        ScanRunner::new(&engine, scan_cfg).run(Some(&mut progress as &mut ProgressFn<'_>))?;
    println!("{}", result.summary.operator_message(&extensions));

    finish(
        cfg,
        "scan",
        input,
        &cfg.output.scan_report_filename,
        started,
        result.outcomes,
        result.summary,
    )
}

fn color_scan(cfg: &Config, input: &Path) -> Result<()> {
    let scan_cfg = ScanConfig::color(cfg, input);
    let extensions = scan_cfg.extensions.clone();
    let engine = BridgeEngine::new(cfg)?;

    let started = now_rfc3339();
    let mut progress = log_progress;
    let result = ScanRunner::new(&engine, scan_cfg)
        .run_color(Some(&mut progress as &mut ProgressFn<'_>))?;
    println!("{}", result.summary.operator_message(&extensions));

    finish(
        cfg,
        "color_scan",
        input,
        &cfg.output.color_scan_report_filename,
        started,
        result.outcomes,
        result.summary,
    )
}

fn run(cfg: &Config, batch_cfg: BatchConfig) -> Result<()> {
    let input = batch_cfg.source_dir.clone();
    let extensions = batch_cfg.extensions.clone();
    let convert = batch_cfg.convert_legacy_text;

    batch_cfg.validate()?;
    let engine = BridgeEngine::new(cfg)?;

    let started = now_rfc3339();
    let mut progress = log_progress;
    let result = BatchProcessor::new(&engine, batch_cfg)
        .run(Some(&mut progress as &mut ProgressFn<'_>))?;
    info!("{}", result.summary.status_line());
    println!("{}", result.summary.operator_message(convert, &extensions));

    finish(
        cfg,
        "batch",
        &input,
        &cfg.output.batch_report_filename,
        started,
        result.outcomes,
        result.summary,
    )
}

fn finish<O: Serialize, S: Serialize>(
    cfg: &Config,
    kind: &str,
    input: &Path,
    filename: &str,
    started: String,
    outcomes: Vec<O>,
    summary: S,
) -> Result<()> {
    let report = RunReport {
        kind: kind.to_string(),
        source_dir: input.display().to_string(),
        started,
        finished: now_rfc3339(),
        outcomes,
        summary,
    };

    if cfg.global.write_report {
        let path = PathBuf::from(&cfg.output.report_dir).join(filename);
        write_report(&path, &report)?;
        info!("report written to {}", path.display());
    }

    if cfg.global.print_summary {
        println!("{}", serde_json::to_string_pretty(&report.summary)?);
    }
    Ok(())
}
