use crate::{
    config::BatchConfig,
    discovery::{self, FileDescriptor, SkipRules},
    engine::Engine,
    error::{BatchError, ProcessError, ProcessErrorKind},
    legacy::{self, ConversionStats},
    report::{build_batch_summary, BatchSummary},
    save,
    session::{self, InteractionScope},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reported once per file, before the file is processed.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// 1-based.
    pub index: usize,
    pub total: usize,
    pub file_name: &'a str,
}

pub type ProgressFn<'p> = dyn for<'a> FnMut(Progress<'a>) + 'p;

/// Per-file states. Every path ends in `Closed` once the session drops; an
/// outcome records the last state before that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    Opened,
    Detected,
    Converted,
    SkippedConversion,
    Saved,
    OpenFailed,
    SaveFailed,
    OtherFailed,
    Closed,
}

impl FileStage {
    pub fn failed(kind: ProcessErrorKind) -> Self {
        match kind {
            ProcessErrorKind::OpenFailed => Self::OpenFailed,
            ProcessErrorKind::SaveFailed => Self::SaveFailed,
            ProcessErrorKind::DetectionFailed | ProcessErrorKind::OtherFailed => Self::OtherFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub file: FileDescriptor,
    pub ok: bool,
    pub legacy_found: bool,
    pub legacy_converted: bool,
    pub legacy_count: u32,
    /// Last state reached before the document was closed.
    pub stage: FileStage,
    #[serde(default)]
    pub conversion: Option<ConversionStats>,
    #[serde(default)]
    pub saved_to: Option<PathBuf>,
    #[serde(default)]
    pub failure_kind: Option<ProcessErrorKind>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Default)]
struct FileState {
    legacy_count: u32,
    conversion: Option<ConversionStats>,
}

impl ProcessOutcome {
    fn saved(file: &FileDescriptor, state: FileState, saved_to: PathBuf) -> Self {
        Self {
            saved_to: Some(saved_to),
            ..Self::from_state(file, state, FileStage::Saved)
        }
    }

    fn failed(file: &FileDescriptor, state: FileState, err: &ProcessError) -> Self {
        Self {
            failure_kind: Some(err.kind),
            failure_reason: Some(format!("{:#}", err.source)),
            ..Self::from_state(file, state, FileStage::failed(err.kind))
        }
    }

    fn from_state(file: &FileDescriptor, state: FileState, stage: FileStage) -> Self {
        let legacy_found = state.legacy_count > 0;
        Self {
            file: file.clone(),
            ok: stage == FileStage::Saved,
            legacy_found,
            // Conversion only ever runs after legacy text was found.
            legacy_converted: legacy_found && state.conversion.is_some(),
            legacy_count: state.legacy_count,
            stage,
            conversion: state.conversion,
            saved_to: None,
            failure_kind: None,
            failure_reason: None,
        }
    }
}

/// Outcomes in discovery order plus their summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRun {
    pub outcomes: Vec<ProcessOutcome>,
    pub summary: BatchSummary,
}

/// Runs open, detect, convert, save and close over each file in turn.
///
/// A failing file is recorded in its outcome and the loop moves on.
pub struct BatchProcessor<'e, E: Engine + ?Sized> {
    engine: &'e E,
    config: BatchConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'e, E: Engine + ?Sized> BatchProcessor<'e, E> {
    pub fn new(engine: &'e E, config: BatchConfig) -> Self {
        Self {
            engine,
            config,
            cancel: None,
        }
    }

    /// Checked between files; a file already in progress always finishes.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Checks folders before anything is opened.
    pub fn validate(&self) -> Result<(), BatchError> {
        self.config.validate()
    }

    pub fn discover(&self) -> Result<Vec<FileDescriptor>, BatchError> {
        let skip = SkipRules::compile(&self.config.skip_patterns)?;
        discovery::discover(&self.config.source_dir, &self.config.extensions, &skip)
    }

    /// Validates, discovers and processes every file.
    pub fn run(&self, progress: Option<&mut ProgressFn<'_>>) -> Result<BatchRun, BatchError> {
        self.validate()?;
        let files = self.discover()?;
        info!(
            "batch: {} file(s) in {} overwrite={} convert_legacy_text={}",
            files.len(),
            self.config.source_dir.display(),
            self.config.overwrite,
            self.config.convert_legacy_text
        );
        if files.is_empty() {
            return Ok(BatchRun {
                outcomes: Vec::new(),
                summary: build_batch_summary(&[]),
            });
        }

        let _scope = InteractionScope::suppress_dialogs(self.engine, self.config.suppress_dialogs)?;
        Ok(self.process_all(&files, progress))
    }

    pub fn process_all(
        &self,
        files: &[FileDescriptor],
        mut progress: Option<&mut ProgressFn<'_>>,
    ) -> BatchRun {
        let mut outcomes = Vec::with_capacity(files.len());
        let mut cancelled = false;

        for (i, file) in files.iter().enumerate() {
            if self.cancelled() {
                warn!("batch cancelled after {} of {} file(s)", i, files.len());
                cancelled = true;
                break;
            }

            let file_name = file.file_name();
            if let Some(report) = progress.as_deref_mut() {
                report(Progress {
                    index: i + 1,
                    total: files.len(),
                    file_name: &file_name,
                });
            }
            info!("processing ({}/{}): {}", i + 1, files.len(), file_name);

            let outcome = self.process_file(file);
            if !outcome.ok {
                warn!(
                    "failed to process {}: {}",
                    file.path.display(),
                    outcome.failure_reason.as_deref().unwrap_or("unknown error")
                );
            }
            outcomes.push(outcome);
        }

        let summary = BatchSummary {
            cancelled,
            ..build_batch_summary(&outcomes)
        };
        BatchRun { outcomes, summary }
    }

    /// Processes one file. Never returns an error: failures land in the outcome.
    ///
    /// The save target is resolved before the document is opened, so a config
    /// with no valid target fails the file without touching it.
    pub fn process_file(&self, file: &FileDescriptor) -> ProcessOutcome {
        let mut state = FileState::default();

        let target = match save::resolve_target(file, &self.config) {
            Ok(target) => target,
            Err(err) => {
                let err = ProcessError::save(err.into());
                self.stage(file, FileStage::SaveFailed);
                return ProcessOutcome::failed(file, state, &err);
            }
        };

        let result = session::with_document(self.engine, file, |doc| {
            self.stage(file, FileStage::Opened);

            let detection = legacy::detect(self.engine, doc)
                .map_err(|e| ProcessError::new(ProcessErrorKind::DetectionFailed, e))?;
            state.legacy_count = detection.legacy_count;
            debug!(
                "{}: {} legacy text object(s) ({:?})",
                file.path.display(),
                detection.legacy_count,
                detection.source
            );
            self.stage(file, FileStage::Detected);

            if self.config.convert_legacy_text && detection.legacy_found() {
                let stats = legacy::convert(self.engine, doc)
                    .map_err(|e| ProcessError::new(ProcessErrorKind::OtherFailed, e))?;
                state.conversion = Some(stats);
                self.stage(file, FileStage::Converted);
            } else {
                self.stage(file, FileStage::SkippedConversion);
            }

            save::save(self.engine, doc, &target).map_err(ProcessError::save)?;
            self.stage(file, FileStage::Saved);
            Ok(target.path.clone())
        });

        let outcome = match result {
            Ok(saved_to) => ProcessOutcome::saved(file, state, saved_to),
            Err(err) => {
                self.stage(file, FileStage::failed(err.kind));
                ProcessOutcome::failed(file, state, &err)
            }
        };
        self.stage(file, FileStage::Closed);
        outcome
    }

    fn stage(&self, file: &FileDescriptor, stage: FileStage) {
        debug!("{} -> {:?}", file.path.display(), stage);
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Runs a whole batch and returns only the summary.
pub fn run_batch<E: Engine + ?Sized>(
    engine: &E,
    config: BatchConfig,
    progress: Option<&mut ProgressFn<'_>>,
) -> Result<BatchSummary, BatchError> {
    Ok(run_batch_detailed(engine, config, progress)?.summary)
}

pub fn run_batch_detailed<E: Engine + ?Sized>(
    engine: &E,
    config: BatchConfig,
    progress: Option<&mut ProgressFn<'_>>,
) -> Result<BatchRun, BatchError> {
    BatchProcessor::new(engine, config).run(progress)
}
