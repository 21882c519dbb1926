use crate::error::BatchError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A candidate document found in the source folder. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: PathBuf,
    /// File name without extension.
    pub base_name: String,
    /// Extension, lowercased.
    pub extension: String,
}

impl FileDescriptor {
    /// `None` when the path has no stem or no extension. Names that are not
    /// valid UTF-8 are kept, converted lossily.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let base_name = path.file_stem()?.to_string_lossy().into_owned();
        let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
        Some(Self {
            path,
            base_name,
            extension,
        })
    }

    /// File name as it appears on disk (original extension case).
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.{}", self.base_name, self.extension))
    }
}

/// Compiled file-name filters that exclude sidecar/temp files from discovery.
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    patterns: Vec<Regex>,
}

impl SkipRules {
    pub fn compile(patterns: &[String]) -> Result<Self, BatchError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| BatchError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn skips(&self, file_name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(file_name))
    }
}

/// Lists the direct children of `folder` whose extension is in `extensions`.
///
/// Matching is case-insensitive. Results are grouped by extension in the
/// order given (duplicates ignored) and sorted by file name within a group.
/// Subfolders are never descended into.
pub fn discover(
    folder: &Path,
    extensions: &[String],
    skip: &SkipRules,
) -> Result<Vec<FileDescriptor>, BatchError> {
    if !folder.is_dir() {
        return Err(BatchError::NotFound {
            what: "source folder",
            path: folder.to_path_buf(),
        });
    }

    let mut wanted: Vec<String> = Vec::new();
    for ext in extensions {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        if !ext.is_empty() && !wanted.contains(&ext) {
            wanted.push(ext);
        }
    }
    if wanted.is_empty() {
        return Err(BatchError::NoExtensions);
    }

    let io_err = |source| BatchError::Io {
        operation: "read_dir",
        path: folder.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        // Follows symlinks so a linked document still counts as a file.
        if !path.is_file() {
            continue;
        }
        let Some(file) = FileDescriptor::from_path(&path) else {
            debug!("skipping without extension: {}", path.display());
            continue;
        };
        if skip.skips(&file.file_name()) {
            debug!("skipping by pattern: {}", file.path.display());
            continue;
        }
        candidates.push(file);
    }
    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut out = Vec::with_capacity(candidates.len());
    for ext in &wanted {
        out.extend(candidates.iter().filter(|f| &f.extension == ext).cloned());
    }

    debug!(
        "discovered {} file(s) in {} for {:?}",
        out.len(),
        folder.display(),
        wanted
    );
    Ok(out)
}
