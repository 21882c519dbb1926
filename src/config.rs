use crate::{engine::Compatibility, error::BatchError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub discovery: Discovery,
    #[serde(default)]
    pub batch: Batch,
    #[serde(default)]
    pub save: Save,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
    pub write_report: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
            write_report: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Discovery {
    pub batch_extensions: Vec<String>,
    pub color_scan_extensions: Vec<String>,
    /// Regexes matched against file names; matching files are never processed.
    pub skip_patterns: Vec<String>,
}
impl Default for Discovery {
    fn default() -> Self {
        Self {
            batch_extensions: vec!["ai".into(), "eps".into()],
            color_scan_extensions: vec!["eps".into()],
            skip_patterns: vec!["^\\._".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Batch {
    pub overwrite: bool,
    pub destination_dir: String,
    pub convert_legacy_text: bool,
}
impl Default for Batch {
    fn default() -> Self {
        Self {
            overwrite: true,
            destination_dir: "".into(),
            convert_legacy_text: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Save {
    pub compatibility: Compatibility,
    pub eps_like_extensions: Vec<String>,
}
impl Default for Save {
    fn default() -> Self {
        Self {
            compatibility: Compatibility::Illustrator17,
            eps_like_extensions: vec!["eps".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Engine {
    pub bridge_exe: String,
    pub bridge_args: Vec<String>,
    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,
    pub suppress_dialogs: bool,
}
impl Default for Engine {
    fn default() -> Self {
        Self {
            bridge_exe: "auto".into(),
            bridge_args: Vec::new(),
            env: Default::default(),
            suppress_dialogs: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub report_dir: String,
    pub batch_report_filename: String,
    pub scan_report_filename: String,
    pub color_scan_report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            report_dir: "reports".into(),
            batch_report_filename: "batch-report.json".into(),
            scan_report_filename: "scan-report.json".into(),
            color_scan_report_filename: "color-scan-report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

/// Immutable settings for one batch run, built once from config and CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchConfig {
    pub source_dir: PathBuf,
    pub overwrite: bool,
    /// Required iff `overwrite` is false.
    pub destination_dir: Option<PathBuf>,
    pub convert_legacy_text: bool,
    pub extensions: Vec<String>,
    pub skip_patterns: Vec<String>,
    pub compatibility: Compatibility,
    pub eps_like_extensions: Vec<String>,
    pub suppress_dialogs: bool,
}

impl BatchConfig {
    pub fn from_config(cfg: &Config, source_dir: impl Into<PathBuf>) -> Self {
        let destination_dir = Some(cfg.batch.destination_dir.trim())
            .filter(|d| !d.is_empty())
            .map(PathBuf::from);
        Self {
            source_dir: source_dir.into(),
            overwrite: cfg.batch.overwrite,
            destination_dir,
            convert_legacy_text: cfg.batch.convert_legacy_text,
            extensions: cfg.discovery.batch_extensions.clone(),
            skip_patterns: cfg.discovery.skip_patterns.clone(),
            compatibility: cfg.save.compatibility,
            eps_like_extensions: cfg.save.eps_like_extensions.clone(),
            suppress_dialogs: cfg.engine.suppress_dialogs,
        }
    }

    /// Overwrite mode: originals are replaced using their existing save setup.
    pub fn overwriting(source_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(
            &Config {
                batch: Batch {
                    overwrite: true,
                    ..Batch::default()
                },
                ..Config::default()
            },
            source_dir,
        )
    }

    /// Copy mode: updated documents go to `destination_dir` with fresh save options.
    pub fn copying(source_dir: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            overwrite: false,
            destination_dir: Some(destination_dir.into()),
            ..Self::overwriting(source_dir)
        }
    }

    pub fn with_conversion(mut self, convert_legacy_text: bool) -> Self {
        self.convert_legacy_text = convert_legacy_text;
        self
    }

    /// Source must exist; copy mode needs an existing destination.
    pub fn validate(&self) -> Result<(), BatchError> {
        if !self.source_dir.is_dir() {
            return Err(BatchError::NotFound {
                what: "source folder",
                path: self.source_dir.clone(),
            });
        }
        if !self.overwrite {
            let dest = self
                .destination_dir
                .as_ref()
                .ok_or(BatchError::MissingDestination)?;
            if !dest.is_dir() {
                return Err(BatchError::NotFound {
                    what: "destination folder",
                    path: dest.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn is_eps_like(&self, extension: &str) -> bool {
        self.eps_like_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// Settings for a read-only scan over a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanConfig {
    pub source_dir: PathBuf,
    pub extensions: Vec<String>,
    pub skip_patterns: Vec<String>,
    pub suppress_dialogs: bool,
}

impl ScanConfig {
    /// Legacy text scan over the batch extensions.
    pub fn legacy(cfg: &Config, source_dir: impl Into<PathBuf>) -> Self {
        Self::with_extensions(cfg, source_dir, &cfg.discovery.batch_extensions)
    }

    /// Color space scan over the color scan extensions.
    pub fn color(cfg: &Config, source_dir: impl Into<PathBuf>) -> Self {
        Self::with_extensions(cfg, source_dir, &cfg.discovery.color_scan_extensions)
    }

    pub fn with_extensions(
        cfg: &Config,
        source_dir: impl Into<PathBuf>,
        extensions: &[String],
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            extensions: extensions.to_vec(),
            skip_patterns: cfg.discovery.skip_patterns.clone(),
            suppress_dialogs: cfg.engine.suppress_dialogs,
        }
    }
}
