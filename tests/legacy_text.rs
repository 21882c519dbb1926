use std::path::Path;
use vecdoc_refresh::{
    engine::{
        memory::{Call, FakeDocument, FakeRegion, MemoryEngine},
        Engine,
    },
    legacy::{convert, detect, DetectionSource},
};

const DOC: &str = "/src/poster.ai";

fn engine_with(doc: FakeDocument) -> MemoryEngine {
    MemoryEngine::new().with_document(DOC, doc)
}

fn probes(engine: &MemoryEngine) -> usize {
    engine
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::ProbeRegion { .. }))
        .count()
}

#[test]
fn authoritative_count_skips_probing() {
    let engine = engine_with(FakeDocument::new().with_regions(vec![
        FakeRegion::legacy("a"),
        FakeRegion::current("b"),
        FakeRegion::legacy("c"),
    ]));
    let doc = engine.open(Path::new(DOC)).unwrap();

    let result = detect(&engine, &doc).unwrap();
    assert_eq!(result.legacy_count, 2);
    assert!(result.legacy_found());
    assert_eq!(result.source, DetectionSource::Authoritative);
    assert_eq!(probes(&engine), 0);

    engine.close(doc, true).unwrap();
}

#[test]
fn authoritative_zero_is_trusted() {
    let engine = engine_with(FakeDocument::new().with_regions(vec![FakeRegion::current("a")]));
    let doc = engine.open(Path::new(DOC)).unwrap();

    let result = detect(&engine, &doc).unwrap();
    assert_eq!(result.legacy_count, 0);
    assert!(!result.legacy_found());
    assert_eq!(probes(&engine), 0);

    engine.close(doc, true).unwrap();
}

#[test]
fn falls_back_to_probing_when_count_unavailable() {
    let engine = engine_with(
        FakeDocument::new()
            .without_legacy_count()
            .with_regions(vec![
                FakeRegion::legacy("a"),
                FakeRegion::current("b"),
                FakeRegion::legacy("c"),
            ]),
    );
    let doc = engine.open(Path::new(DOC)).unwrap();

    let result = detect(&engine, &doc).unwrap();
    assert_eq!(result.legacy_count, 2);
    assert_eq!(result.source, DetectionSource::Probed);
    assert_eq!(probes(&engine), 3);

    engine.close(doc, true).unwrap();
}

#[test]
fn failing_count_query_falls_back_to_probing() {
    let engine = engine_with(
        FakeDocument::new()
            .failing_legacy_count()
            .with_regions(vec![FakeRegion::legacy("a"), FakeRegion::current("b")]),
    );
    let doc = engine.open(Path::new(DOC)).unwrap();

    let result = detect(&engine, &doc).unwrap();
    assert_eq!(result.legacy_count, 1);
    assert_eq!(result.source, DetectionSource::Probed);
    assert_eq!(probes(&engine), 2);

    engine.close(doc, true).unwrap();
}

#[test]
fn failed_probe_counts_as_legacy() {
    let engine = engine_with(
        FakeDocument::new()
            .without_legacy_count()
            .with_regions(vec![FakeRegion::current("a").unprobeable(), FakeRegion::current("b")]),
    );
    let doc = engine.open(Path::new(DOC)).unwrap();

    let result = detect(&engine, &doc).unwrap();
    assert_eq!(result.legacy_count, 1);
    assert_eq!(result.source, DetectionSource::Probed);

    engine.close(doc, true).unwrap();
}

#[test]
fn detection_is_read_only() {
    let engine = engine_with(
        FakeDocument::new()
            .without_legacy_count()
            .with_regions(vec![FakeRegion::legacy("a")]),
    );
    let doc = engine.open(Path::new(DOC)).unwrap();
    detect(&engine, &doc).unwrap();
    engine.close(doc, true).unwrap();

    assert!(engine.calls().iter().all(|c| !c.is_mutation()));
}

#[test]
fn conversion_reencodes_legacy_regions() {
    let engine = engine_with(FakeDocument::new().with_regions(vec![
        FakeRegion::legacy("Hello"),
        FakeRegion::current("World"),
    ]));
    let doc = engine.open(Path::new(DOC)).unwrap();

    let stats = convert(&engine, &doc).unwrap();
    assert_eq!(stats.rewritten, 2);
    assert_eq!(stats.skipped, 0);
    assert_eq!(detect(&engine, &doc).unwrap().legacy_count, 0);

    let contents: Vec<String> = engine
        .text_regions(&doc)
        .unwrap()
        .into_iter()
        .map(|r| engine.region_contents(r).unwrap())
        .collect();
    assert_eq!(contents, vec!["Hello", "World"]);

    engine.close(doc, true).unwrap();
}

#[test]
fn conversion_clears_then_restores_each_region() {
    let engine = engine_with(FakeDocument::new().with_regions(vec![FakeRegion::legacy("Hi")]));
    let doc = engine.open(Path::new(DOC)).unwrap();
    convert(&engine, &doc).unwrap();
    engine.close(doc, true).unwrap();

    let rewrites: Vec<String> = engine
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::RewriteRegion { content, .. } => Some(content),
            _ => None,
        })
        .collect();
    assert_eq!(rewrites, vec!["".to_string(), "Hi".to_string()]);
}

#[test]
fn locked_regions_are_skipped_individually() {
    let engine = engine_with(
        FakeDocument::new()
            .without_legacy_count()
            .with_regions(vec![
                FakeRegion::legacy("a").locked(),
                FakeRegion::legacy("b"),
            ]),
    );
    let doc = engine.open(Path::new(DOC)).unwrap();

    let stats = convert(&engine, &doc).unwrap();
    assert_eq!(stats.rewritten, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(detect(&engine, &doc).unwrap().legacy_count, 1);

    engine.close(doc, true).unwrap();
}

#[test]
fn converting_twice_without_legacy_text_changes_nothing() {
    let original = FakeDocument::new().with_regions(vec![
        FakeRegion::current("one"),
        FakeRegion::current("two"),
    ]);
    let engine = engine_with(original.clone());
    let doc = engine.open(Path::new(DOC)).unwrap();

    convert(&engine, &doc).unwrap();
    let stats = convert(&engine, &doc).unwrap();
    assert_eq!(stats.skipped, 0);
    assert_eq!(detect(&engine, &doc).unwrap().legacy_count, 0);

    engine.save_in_place(&doc).unwrap();
    engine.close(doc, true).unwrap();
    assert_eq!(engine.document(Path::new(DOC)).unwrap(), original);
}
