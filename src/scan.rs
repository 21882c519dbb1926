//! Read-only passes over a folder: legacy text scan and color space scan.
//!
//! Neither pass converts or saves; each document is closed discarding changes.

use crate::{
    batch::{Progress, ProgressFn},
    config::ScanConfig,
    discovery::{self, FileDescriptor, SkipRules},
    engine::{ColorSpace, Engine},
    error::{BatchError, ProcessError, ProcessErrorKind},
    legacy::{self, DetectionSource},
    report::{build_color_scan_summary, build_scan_summary, ColorScanSummary, ScanSummary},
    session::{self, InteractionScope},
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub file: FileDescriptor,
    pub legacy_count: u32,
    #[serde(default)]
    pub source: Option<DetectionSource>,
    /// Set when the file could not be scanned; the count is then zero.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScanOutcome {
    pub file: FileDescriptor,
    /// `None` when the document opened but its color space was unreadable.
    pub color_space: Option<ColorSpace>,
    pub open_failed: bool,
}

impl ColorScanOutcome {
    pub fn is_rgb(&self) -> bool {
        self.color_space == Some(ColorSpace::Rgb)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRun {
    pub outcomes: Vec<ScanOutcome>,
    pub summary: ScanSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorScanRun {
    pub outcomes: Vec<ColorScanOutcome>,
    pub summary: ColorScanSummary,
}

pub struct ScanRunner<'e, E: Engine + ?Sized> {
    engine: &'e E,
    config: ScanConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'e, E: Engine + ?Sized> ScanRunner<'e, E> {
    pub fn new(engine: &'e E, config: ScanConfig) -> Self {
        Self {
            engine,
            config,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn discover(&self) -> Result<Vec<FileDescriptor>, BatchError> {
        let skip = SkipRules::compile(&self.config.skip_patterns)?;
        discovery::discover(&self.config.source_dir, &self.config.extensions, &skip)
    }

    /// Counts legacy text in one file. Failures are logged and count as zero.
    pub fn scan_file(&self, file: &FileDescriptor) -> ScanOutcome {
        let detected = session::with_document(self.engine, file, |doc| {
            legacy::detect(self.engine, doc)
                .map_err(|e| ProcessError::new(ProcessErrorKind::DetectionFailed, e))
        });
        match detected {
            Ok(d) => {
                debug!("{}: {} legacy text object(s)", file.path.display(), d.legacy_count);
                ScanOutcome {
                    file: file.clone(),
                    legacy_count: d.legacy_count,
                    source: Some(d.source),
                    error: None,
                }
            }
            Err(err) => {
                warn!("legacy scan failed on {}: {err}", file.path.display());
                ScanOutcome {
                    file: file.clone(),
                    legacy_count: 0,
                    source: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Reads the color space of one file.
    pub fn color_scan_file(&self, file: &FileDescriptor) -> ColorScanOutcome {
        let read = session::with_document(self.engine, file, |doc| {
            Ok(match self.engine.color_space(doc) {
                Ok(cs) => Some(cs),
                Err(err) => {
                    debug!("{}: color space unreadable: {err:#}", file.path.display());
                    None
                }
            })
        });
        match read {
            Ok(color_space) => ColorScanOutcome {
                file: file.clone(),
                color_space,
                open_failed: false,
            },
            Err(err) => {
                warn!("color scan failed on {}: {err}", file.path.display());
                ColorScanOutcome {
                    file: file.clone(),
                    color_space: None,
                    open_failed: true,
                }
            }
        }
    }

    pub fn run(&self, progress: Option<&mut ProgressFn<'_>>) -> Result<ScanRun, BatchError> {
        let (outcomes, cancelled) = self.run_each("legacy scan", progress, |f| self.scan_file(f))?;
        let summary = ScanSummary {
            cancelled,
            ..build_scan_summary(&outcomes)
        };
        Ok(ScanRun { outcomes, summary })
    }

    pub fn run_color(
        &self,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<ColorScanRun, BatchError> {
        let (outcomes, cancelled) =
            self.run_each("color scan", progress, |f| self.color_scan_file(f))?;
        let summary = ColorScanSummary {
            cancelled,
            ..build_color_scan_summary(&outcomes)
        };
        Ok(ColorScanRun { outcomes, summary })
    }

    fn run_each<T>(
        &self,
        what: &str,
        mut progress: Option<&mut ProgressFn<'_>>,
        mut per_file: impl FnMut(&FileDescriptor) -> T,
    ) -> Result<(Vec<T>, bool), BatchError> {
        let files = self.discover()?;
        info!(
            "{what}: {} file(s) in {}",
            files.len(),
            self.config.source_dir.display()
        );
        if files.is_empty() {
            return Ok((Vec::new(), false));
        }

        let _scope = InteractionScope::suppress_dialogs(self.engine, self.config.suppress_dialogs)?;
        let mut outcomes = Vec::with_capacity(files.len());
        for (i, file) in files.iter().enumerate() {
            if self.cancelled() {
                warn!("{what} cancelled after {} of {} file(s)", i, files.len());
                return Ok((outcomes, true));
            }
            let file_name = file.file_name();
            if let Some(report) = progress.as_deref_mut() {
                report(Progress {
                    index: i + 1,
                    total: files.len(),
                    file_name: &file_name,
                });
            }
            debug!("{what} ({}/{}): {}", i + 1, files.len(), file_name);
            outcomes.push(per_file(file));
        }
        Ok((outcomes, false))
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Scans a folder for legacy text and returns only the summary.
pub fn run_scan<E: Engine + ?Sized>(
    engine: &E,
    config: ScanConfig,
    progress: Option<&mut ProgressFn<'_>>,
) -> Result<ScanSummary, BatchError> {
    Ok(ScanRunner::new(engine, config).run(progress)?.summary)
}

/// Lists documents whose color space is RGB.
pub fn run_color_scan<E: Engine + ?Sized>(
    engine: &E,
    config: ScanConfig,
    progress: Option<&mut ProgressFn<'_>>,
) -> Result<ColorScanSummary, BatchError> {
    Ok(ScanRunner::new(engine, config).run_color(progress)?.summary)
}

/// Scans a folder for legacy text, keeping the per-file outcomes.
pub fn run_scan_detailed<E: Engine + ?Sized>(
    engine: &E,
    config: ScanConfig,
    progress: Option<&mut ProgressFn<'_>>,
) -> Result<ScanRun, BatchError> {
    ScanRunner::new(engine, config).run(progress)
}
