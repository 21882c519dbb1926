use crate::{
    batch::ProcessOutcome,
    scan::{ColorScanOutcome, ScanOutcome},
    util::ensure_dir,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CANCELLED_BEFORE_START: &str = "Cancelled before any file was processed.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed_files: Vec<String>,
    pub legacy_detected_count: usize,
    pub legacy_converted_count: usize,
    /// Legacy text found but not converted into a saved file. Covers both
    /// "conversion disabled" and "converted, then the save failed".
    pub legacy_skipped_files: Vec<String>,
    #[serde(default)]
    pub cancelled: bool,
}

pub fn build_batch_summary(outcomes: &[ProcessOutcome]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: outcomes.len(),
        ..BatchSummary::default()
    };

    for o in outcomes {
        let name = o.file.file_name();
        if o.ok {
            summary.succeeded += 1;
        } else {
            summary.failed_files.push(name.clone());
        }

        if o.legacy_found {
            summary.legacy_detected_count += 1;
            if o.legacy_converted && o.ok {
                summary.legacy_converted_count += 1;
            } else {
                summary.legacy_skipped_files.push(name);
            }
        }
    }

    summary
}

impl BatchSummary {
    /// Text shown to the operator when a batch finishes.
    pub fn operator_message(&self, convert_enabled: bool, extensions: &[String]) -> String {
        if self.cancelled && self.total == 0 {
            return CANCELLED_BEFORE_START.to_string();
        }
        if self.total == 0 {
            return format!(
                "No {} files found in the selected folder.",
                describe_extensions(extensions)
            );
        }

        let mut msg = String::new();
        if self.cancelled {
            msg.push_str(&format!("Cancelled after {} file(s). ", self.total));
        }

        if !self.failed_files.is_empty() {
            msg.push_str("Completed with errors. Failed files:\n");
            msg.push_str(&self.failed_files.join("\n"));
            return msg;
        }

        msg.push_str(&format!(
            "Completed successfully. {} files updated.",
            self.succeeded
        ));
        if self.legacy_detected_count == 0 {
            msg.push_str("\nNo legacy text detected.");
            return msg;
        }

        msg.push_str(&format!(
            "\nLegacy text detected in {} file(s).",
            self.legacy_detected_count
        ));
        if convert_enabled {
            msg.push_str(&format!(" Converted in {}.", self.legacy_converted_count));
        } else {
            msg.push_str(" Conversion skipped (conversion disabled).");
        }
        if !self.legacy_skipped_files.is_empty() {
            msg.push_str("\nSkipped files:\n");
            msg.push_str(&self.legacy_skipped_files.join("\n"));
        }
        msg
    }

    /// One-line status, e.g. for a progress display.
    pub fn status_line(&self) -> String {
        format!("Done. Updated {} of {} files.", self.succeeded, self.total)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_files: usize,
    pub legacy_files: Vec<String>,
    pub total_legacy_frames: u64,
    #[serde(default)]
    pub cancelled: bool,
}

pub fn build_scan_summary(outcomes: &[ScanOutcome]) -> ScanSummary {
    let mut summary = ScanSummary {
        total_files: outcomes.len(),
        ..ScanSummary::default()
    };
    for o in outcomes.iter().filter(|o| o.legacy_count > 0) {
        summary.legacy_files.push(o.file.file_name());
        summary.total_legacy_frames += u64::from(o.legacy_count);
    }
    summary
}

impl ScanSummary {
    pub fn operator_message(&self, extensions: &[String]) -> String {
        if self.cancelled && self.total_files == 0 {
            return CANCELLED_BEFORE_START.to_string();
        }
        if self.total_files == 0 {
            return format!(
                "No {} files found for scanning.",
                describe_extensions(extensions)
            );
        }
        let prefix = if self.cancelled {
            format!("Cancelled after {} file(s). ", self.total_files)
        } else {
            String::new()
        };
        let body = if self.legacy_files.is_empty() {
            format!(
                "No legacy text detected in {} file(s).\nConversion not needed.",
                self.total_files
            )
        } else {
            format!(
                "Legacy text detected in {} of {} file(s).\n\
                 Enable legacy text conversion to update them.",
                self.legacy_files.len(),
                self.total_files
            )
        };
        prefix + &body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScanSummary {
    pub total: usize,
    pub rgb_files: Vec<String>,
    pub open_failures: Vec<String>,
    #[serde(default)]
    pub cancelled: bool,
}

pub fn build_color_scan_summary(outcomes: &[ColorScanOutcome]) -> ColorScanSummary {
    let mut summary = ColorScanSummary {
        total: outcomes.len(),
        ..ColorScanSummary::default()
    };
    for o in outcomes {
        if o.open_failed {
            summary.open_failures.push(o.file.file_name());
        } else if o.is_rgb() {
            summary.rgb_files.push(o.file.file_name());
        }
    }
    summary
}

impl ColorScanSummary {
    pub fn operator_message(&self, extensions: &[String]) -> String {
        let exts = describe_extensions(extensions);
        if self.cancelled && self.total == 0 {
            return CANCELLED_BEFORE_START.to_string();
        }
        if self.total == 0 {
            return format!("No {exts} files found in the selected folder.");
        }

        let mut msg = if self.cancelled {
            format!("Cancelled after {} file(s). ", self.total)
        } else {
            String::new()
        };
        msg.push_str(&format!(
            "Scan complete. {} file(s) checked.\nRGB files found: {}.",
            self.total,
            self.rgb_files.len()
        ));
        if !self.rgb_files.is_empty() {
            msg.push_str("\n\nRGB files:\n");
            msg.push_str(&self.rgb_files.join("\n"));
        }
        if !self.open_failures.is_empty() {
            msg.push_str("\n\nNot checked:\n");
            let failed: Vec<String> = self
                .open_failures
                .iter()
                .map(|name| format!("{name} (failed to open)"))
                .collect();
            msg.push_str(&failed.join("\n"));
        }
        msg
    }
}

/// Renders `["ai", "eps"]` as `.ai or .eps`.
pub fn describe_extensions(extensions: &[String]) -> String {
    let dotted: Vec<String> = extensions
        .iter()
        .map(|e| format!(".{}", e.trim_start_matches('.').to_ascii_lowercase()))
        .collect();
    match dotted.as_slice() {
        [] => "matching".to_string(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} or {}", rest.join(", "), last),
    }
}

/// A finished run as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport<O, S> {
    pub kind: String,
    pub source_dir: String,
    pub started: String,
    pub finished: String,
    pub outcomes: Vec<O>,
    pub summary: S,
}

pub fn write_report<O: Serialize, S: Serialize>(
    path: &Path,
    report: &RunReport<O, S>,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("writing report: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_read_naturally() {
        assert_eq!(describe_extensions(&["ai".into(), "eps".into()]), ".ai or .eps");
        assert_eq!(describe_extensions(&["EPS".into()]), ".eps");
        assert_eq!(
            describe_extensions(&["ai".into(), "eps".into(), "pdf".into()]),
            ".ai, .eps or .pdf"
        );
    }
}
