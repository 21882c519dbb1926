pub mod bridge;
pub mod memory;
pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::{
    ColorSpace, Compatibility, DocDiag, EpsSaveOptions, FormatOptions, InteractionLevel,
    NativeSaveOptions, OverprintMode, RegionEncoding,
};

/// An open document inside the engine.
///
/// Deliberately neither `Clone` nor `Copy`: the session that opened it owns it,
/// lends it out by reference, and hands it back to `Engine::close` by value.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct DocHandle(u64);

impl DocHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A text-bearing region of an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionHandle {
    pub doc: u64,
    pub index: u32,
}

/// The narrow operation set the orchestrator needs from the host document engine.
///
/// One document context at a time; implementations are free to use interior
/// mutability since every call is made from a single thread.
pub trait Engine {
    fn doctor(&self) -> Result<DocDiag>;

    fn open(&self, path: &Path) -> Result<DocHandle>;
    /// Must tolerate documents that were already saved explicitly.
    fn close(&self, doc: DocHandle, discard_unsaved: bool) -> Result<()>;

    fn color_space(&self, doc: &DocHandle) -> Result<ColorSpace>;
    /// `Ok(None)` when the engine has no authoritative count for this document.
    fn legacy_text_count(&self, doc: &DocHandle) -> Result<Option<u32>>;
    fn text_regions(&self, doc: &DocHandle) -> Result<Vec<RegionHandle>>;
    /// Reads the marker property only defined on current-encoding text.
    fn probe_region(&self, region: RegionHandle) -> Result<RegionEncoding>;
    fn region_contents(&self, region: RegionHandle) -> Result<String>;
    fn rewrite_region_contents(&self, region: RegionHandle, content: &str) -> Result<()>;

    fn save_in_place(&self, doc: &DocHandle) -> Result<()>;
    fn save_as(&self, doc: &DocHandle, path: &Path, options: &FormatOptions) -> Result<()>;

    fn interaction_level(&self) -> Result<InteractionLevel>;
    fn set_interaction_level(&self, level: InteractionLevel) -> Result<()>;
}
