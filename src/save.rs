use crate::{
    config::BatchConfig,
    discovery::FileDescriptor,
    engine::{DocHandle, Engine, FormatOptions},
    error::BatchError,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how one document gets saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveTarget {
    pub path: PathBuf,
    pub is_eps_like: bool,
    /// Save in place with the document's existing options.
    pub reuse_existing_options: bool,
    /// Fresh options for `save_as`; `None` iff `reuse_existing_options`.
    pub options: Option<FormatOptions>,
}

/// Computes the save target for `file` under `config`. Touches neither disk nor engine.
///
/// EPS-like documents are always written with explicit EPS options, even when
/// overwriting. Native documents reuse their existing save setup when
/// overwriting and get fresh native options when copied.
///
/// Copy mode without a destination is refused rather than falling back to the
/// source path.
pub fn resolve_target(
    file: &FileDescriptor,
    config: &BatchConfig,
) -> Result<SaveTarget, BatchError> {
    let is_eps_like = config.is_eps_like(&file.extension);
    let path = if config.overwrite {
        file.path.clone()
    } else {
        let dest = config
            .destination_dir
            .as_ref()
            .ok_or(BatchError::MissingDestination)?;
        dest.join(file.file_name())
    };

    let options = if is_eps_like {
        Some(FormatOptions::eps(config.compatibility))
    } else if config.overwrite {
        None
    } else {
        Some(FormatOptions::native(config.compatibility))
    };

    Ok(SaveTarget {
        path,
        is_eps_like,
        reuse_existing_options: options.is_none(),
        options,
    })
}

/// Performs the save described by `target`.
pub fn save<E: Engine + ?Sized>(engine: &E, doc: &DocHandle, target: &SaveTarget) -> Result<()> {
    match &target.options {
        Some(options) => engine.save_as(doc, &target.path, options),
        None => engine.save_in_place(doc),
    }
}
