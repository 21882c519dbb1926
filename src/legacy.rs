//! Legacy text detection and conversion on an open document.
//!
//! Detection is two-tier. The engine's authoritative count is used whenever
//! the engine can give one. If the count is unavailable or the query errors,
//! every text region is probed for a property only current-encoding text
//! defines. A region that reports legacy encoding, or whose probe fails,
//! counts as one legacy occurrence. The probe is a heuristic: a region that
//! is legacy but happens to answer the probe is missed, so the fallback count
//! can be lower than the true count. Only a failure to enumerate regions
//! fails detection.

use crate::engine::{DocHandle, Engine, RegionEncoding};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Authoritative,
    Probed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub legacy_count: u32,
    pub source: DetectionSource,
}

impl DetectionResult {
    pub fn legacy_found(&self) -> bool {
        self.legacy_count > 0
    }
}

/// Counts legacy text objects in `doc`. Read-only.
pub fn detect<E: Engine + ?Sized>(engine: &E, doc: &DocHandle) -> Result<DetectionResult> {
    match engine.legacy_text_count(doc) {
        Ok(Some(count)) => {
            return Ok(DetectionResult {
                legacy_count: count,
                source: DetectionSource::Authoritative,
            });
        }
        Ok(None) => debug!("doc {}: no authoritative legacy count, probing regions", doc.id()),
        Err(err) => debug!("doc {}: legacy count failed ({err:#}), probing regions", doc.id()),
    }

    let mut legacy_count = 0;
    for region in engine.text_regions(doc)? {
        match engine.probe_region(region) {
            Ok(RegionEncoding::Legacy) => legacy_count += 1,
            Ok(RegionEncoding::Current) => {}
            Err(err) => {
                debug!("doc {} region {}: probe failed: {err:#}", doc.id(), region.index);
                legacy_count += 1;
            }
        }
    }

    Ok(DetectionResult {
        legacy_count,
        source: DetectionSource::Probed,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub rewritten: u32,
    pub skipped: u32,
}

/// Re-encodes every text region by writing its contents back through the engine.
///
/// Each region is cleared and reassigned its own contents. Regions that cannot
/// be read or rewritten are skipped; the rest of the document still converts.
/// Does not re-run detection.
pub fn convert<E: Engine + ?Sized>(engine: &E, doc: &DocHandle) -> Result<ConversionStats> {
    let mut stats = ConversionStats::default();
    for region in engine.text_regions(doc)? {
        let rewritten = engine.region_contents(region).and_then(|original| {
            engine.rewrite_region_contents(region, "")?;
            engine.rewrite_region_contents(region, &original)
        });
        match rewritten {
            Ok(()) => stats.rewritten += 1,
            Err(err) => {
                debug!("doc {} region {}: rewrite skipped: {err:#}", doc.id(), region.index);
                stats.skipped += 1;
            }
        }
    }
    Ok(stats)
}
