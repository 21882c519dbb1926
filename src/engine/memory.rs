//! In-memory engine for tests.
//!
//! Documents live in a map keyed by path. Opening a document takes a working
//! copy; `save_in_place`/`save_as` write the working copy back to the map and
//! `close` drops it. Every call is appended to a log that tests can inspect.

use super::{
    ColorSpace, DocDiag, DocHandle, Engine, FormatOptions, InteractionLevel, RegionEncoding,
    RegionHandle,
};
use anyhow::{anyhow, bail, Result};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRegion {
    pub contents: String,
    pub legacy: bool,
    pub locked: bool,
    /// Probing this region fails outright.
    pub unprobeable: bool,
}

impl FakeRegion {
    pub fn current(contents: &str) -> Self {
        Self {
            contents: contents.to_string(),
            legacy: false,
            locked: false,
            unprobeable: false,
        }
    }

    pub fn legacy(contents: &str) -> Self {
        Self {
            legacy: true,
            ..Self::current(contents)
        }
    }

    /// Rewrites of this region fail.
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn unprobeable(mut self) -> Self {
        self.unprobeable = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeDocument {
    pub color_space: Option<ColorSpace>,
    /// Whether the engine can report an authoritative legacy count for this document.
    pub reports_legacy_count: bool,
    pub regions: Vec<FakeRegion>,
    pub fail_open: bool,
    pub fail_save: bool,
    pub fail_regions: bool,
    /// The legacy count query errors instead of answering.
    pub fail_legacy_count: bool,
}

impl Default for FakeDocument {
    fn default() -> Self {
        Self {
            color_space: Some(ColorSpace::Cmyk),
            reports_legacy_count: true,
            regions: Vec::new(),
            fail_open: false,
            fail_save: false,
            fail_regions: false,
            fail_legacy_count: false,
        }
    }
}

impl FakeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_regions(mut self, regions: Vec<FakeRegion>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_color_space(mut self, color_space: Option<ColorSpace>) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn without_legacy_count(mut self) -> Self {
        self.reports_legacy_count = false;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    pub fn failing_regions(mut self) -> Self {
        self.fail_regions = true;
        self
    }

    pub fn failing_legacy_count(mut self) -> Self {
        self.fail_legacy_count = true;
        self
    }

    pub fn legacy_regions(&self) -> u32 {
        self.regions.iter().filter(|r| r.legacy).count() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Doctor,
    Open(PathBuf),
    Close { path: PathBuf, discard_unsaved: bool },
    ColorSpace(PathBuf),
    LegacyTextCount(PathBuf),
    TextRegions(PathBuf),
    ProbeRegion { path: PathBuf, index: u32 },
    RegionContents { path: PathBuf, index: u32 },
    RewriteRegion { path: PathBuf, index: u32, content: String },
    SaveInPlace(PathBuf),
    SaveAs { path: PathBuf, target: PathBuf, options: FormatOptions },
    InteractionLevel,
    SetInteractionLevel(InteractionLevel),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::RewriteRegion { .. } | Call::SaveInPlace(_) | Call::SaveAs { .. }
        )
    }
}

struct OpenDoc {
    path: PathBuf,
    working: FakeDocument,
}

pub struct MemoryEngine {
    stored: RefCell<BTreeMap<PathBuf, FakeDocument>>,
    open: RefCell<HashMap<u64, OpenDoc>>,
    next_id: Cell<u64>,
    level: Cell<InteractionLevel>,
    fail_close: Cell<bool>,
    calls: RefCell<Vec<Call>>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            stored: RefCell::new(BTreeMap::new()),
            open: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
            level: Cell::new(InteractionLevel::DisplayAlerts),
            fail_close: Cell::new(false),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_document(self, path: impl Into<PathBuf>, doc: FakeDocument) -> Self {
        self.insert(path, doc);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, doc: FakeDocument) {
        self.stored.borrow_mut().insert(path.into(), doc);
    }

    /// Makes every `close` report an error after releasing the document.
    pub fn failing_close(self) -> Self {
        self.fail_close.set(true);
        self
    }

    /// The persisted state of a document.
    pub fn document(&self, path: &Path) -> Option<FakeDocument> {
        self.stored.borrow().get(path).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn open_documents(&self) -> usize {
        self.open.borrow().len()
    }

    pub fn current_level(&self) -> InteractionLevel {
        self.level.get()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn path_of(&self, id: u64) -> Result<PathBuf> {
        self.open
            .borrow()
            .get(&id)
            .map(|d| d.path.clone())
            .ok_or_else(|| anyhow!("document {id} is not open"))
    }

    fn with_working<R>(
        &self,
        id: u64,
        f: impl FnOnce(&mut FakeDocument) -> Result<R>,
    ) -> Result<R> {
        let mut open = self.open.borrow_mut();
        let doc = open
            .get_mut(&id)
            .ok_or_else(|| anyhow!("document {id} is not open"))?;
        f(&mut doc.working)
    }

    fn with_region<R>(
        &self,
        region: RegionHandle,
        f: impl FnOnce(&mut FakeRegion) -> Result<R>,
    ) -> Result<R> {
        self.with_working(region.doc, |doc| {
            let r = doc
                .regions
                .get_mut(region.index as usize)
                .ok_or_else(|| anyhow!("no text region {}", region.index))?;
            f(r)
        })
    }
}

impl Engine for MemoryEngine {
    fn doctor(&self) -> Result<DocDiag> {
        self.record(Call::Doctor);
        Ok(DocDiag {
            host: "memory".into(),
            host_version: env!("CARGO_PKG_VERSION").into(),
            bridge_version: None,
            ok: true,
            error: None,
        })
    }

    fn open(&self, path: &Path) -> Result<DocHandle> {
        self.record(Call::Open(path.to_path_buf()));
        let doc = self
            .stored
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such document: {}", path.display()))?;
        if doc.fail_open {
            bail!("cannot open {}", path.display());
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.open.borrow_mut().insert(
            id,
            OpenDoc {
                path: path.to_path_buf(),
                working: doc,
            },
        );
        Ok(DocHandle::new(id))
    }

    fn close(&self, doc: DocHandle, discard_unsaved: bool) -> Result<()> {
        let released = self.open.borrow_mut().remove(&doc.id());
        let Some(released) = released else {
            bail!("document {} is not open", doc.id());
        };
        self.record(Call::Close {
            path: released.path.clone(),
            discard_unsaved,
        });
        if !discard_unsaved {
            self.stored.borrow_mut().insert(released.path, released.working);
        }
        if self.fail_close.get() {
            bail!("close reported an error");
        }
        Ok(())
    }

    fn color_space(&self, doc: &DocHandle) -> Result<ColorSpace> {
        self.record(Call::ColorSpace(self.path_of(doc.id())?));
        self.with_working(doc.id(), |d| {
            d.color_space
                .ok_or_else(|| anyhow!("color space is not readable"))
        })
    }

    fn legacy_text_count(&self, doc: &DocHandle) -> Result<Option<u32>> {
        self.record(Call::LegacyTextCount(self.path_of(doc.id())?));
        self.with_working(doc.id(), |d| {
            if d.fail_legacy_count {
                bail!("legacy text count query failed");
            }
            Ok(d.reports_legacy_count.then(|| d.legacy_regions()))
        })
    }

    fn text_regions(&self, doc: &DocHandle) -> Result<Vec<RegionHandle>> {
        self.record(Call::TextRegions(self.path_of(doc.id())?));
        let id = doc.id();
        self.with_working(id, |d| {
            if d.fail_regions {
                bail!("text regions are not enumerable");
            }
            Ok((0..d.regions.len() as u32)
                .map(|index| RegionHandle { doc: id, index })
                .collect())
        })
    }

    fn probe_region(&self, region: RegionHandle) -> Result<RegionEncoding> {
        self.record(Call::ProbeRegion {
            path: self.path_of(region.doc)?,
            index: region.index,
        });
        self.with_region(region, |r| {
            if r.unprobeable {
                bail!("marker property unreadable on region {}", region.index);
            }
            Ok(if r.legacy {
                RegionEncoding::Legacy
            } else {
                RegionEncoding::Current
            })
        })
    }

    fn region_contents(&self, region: RegionHandle) -> Result<String> {
        self.record(Call::RegionContents {
            path: self.path_of(region.doc)?,
            index: region.index,
        });
        self.with_region(region, |r| Ok(r.contents.clone()))
    }

    fn rewrite_region_contents(&self, region: RegionHandle, content: &str) -> Result<()> {
        self.record(Call::RewriteRegion {
            path: self.path_of(region.doc)?,
            index: region.index,
            content: content.to_string(),
        });
        self.with_region(region, |r| {
            if r.locked {
                bail!("text region {} is locked", region.index);
            }
            r.contents = content.to_string();
            r.legacy = false;
            Ok(())
        })
    }

    fn save_in_place(&self, doc: &DocHandle) -> Result<()> {
        let path = self.path_of(doc.id())?;
        self.record(Call::SaveInPlace(path.clone()));
        let working = self.with_working(doc.id(), |d| Ok(d.clone()))?;
        if working.fail_save {
            bail!("cannot save {}", path.display());
        }
        self.stored.borrow_mut().insert(path, working);
        Ok(())
    }

    fn save_as(&self, doc: &DocHandle, target: &Path, options: &FormatOptions) -> Result<()> {
        let path = self.path_of(doc.id())?;
        self.record(Call::SaveAs {
            path: path.clone(),
            target: target.to_path_buf(),
            options: options.clone(),
        });
        let working = self.with_working(doc.id(), |d| Ok(d.clone()))?;
        if working.fail_save {
            bail!("cannot save {} as {}", path.display(), target.display());
        }
        self.stored.borrow_mut().insert(target.to_path_buf(), working);
        Ok(())
    }

    fn interaction_level(&self) -> Result<InteractionLevel> {
        self.record(Call::InteractionLevel);
        Ok(self.level.get())
    }

    fn set_interaction_level(&self, level: InteractionLevel) -> Result<()> {
        self.record(Call::SetInteractionLevel(level));
        self.level.set(level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Compatibility;

    #[test]
    fn close_discarding_keeps_stored_copy() {
        let doc = FakeDocument::new().with_regions(vec![FakeRegion::legacy("x")]);
        let engine = MemoryEngine::new().with_document("/src/a.ai", doc);
        let doc = engine.open(Path::new("/src/a.ai")).unwrap();
        let regions = engine.text_regions(&doc).unwrap();
        engine.rewrite_region_contents(regions[0], "x").unwrap();
        engine.close(doc, true).unwrap();

        let stored = engine.document(Path::new("/src/a.ai")).unwrap();
        assert_eq!(stored.legacy_regions(), 1);
        assert_eq!(engine.open_documents(), 0);
    }

    #[test]
    fn save_as_persists_working_copy_at_target() {
        let doc = FakeDocument::new().with_regions(vec![FakeRegion::legacy("x")]);
        let engine = MemoryEngine::new().with_document("/src/a.ai", doc);
        let doc = engine.open(Path::new("/src/a.ai")).unwrap();
        let regions = engine.text_regions(&doc).unwrap();
        engine.rewrite_region_contents(regions[0], "x").unwrap();
        engine
            .save_as(
                &doc,
                Path::new("/out/a.ai"),
                &FormatOptions::native(Compatibility::Illustrator17),
            )
            .unwrap();
        engine.close(doc, true).unwrap();

        let saved = engine.document(Path::new("/out/a.ai")).unwrap();
        assert_eq!(saved.legacy_regions(), 0);
        assert_eq!(engine.document(Path::new("/src/a.ai")).unwrap().legacy_regions(), 1);
    }
}
