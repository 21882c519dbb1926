mod common;

use common::{engine_for, folder_with};
use vecdoc_refresh::{
    config::{Config, ScanConfig},
    engine::{
        memory::{FakeDocument, FakeRegion},
        ColorSpace,
    },
    legacy::DetectionSource,
    scan::{run_color_scan, run_scan, run_scan_detailed, ScanRunner},
};

fn legacy(n: usize) -> FakeDocument {
    FakeDocument::new().with_regions((0..n).map(|i| FakeRegion::legacy(&i.to_string())).collect())
}

#[test]
fn scan_counts_legacy_text_without_mutating() {
    let dir = folder_with(&["a.ai", "b.ai", "c.eps"]);
    let engine = engine_for(
        dir.path(),
        vec![
            ("a.ai", legacy(2)),
            ("b.ai", FakeDocument::new()),
            ("c.eps", legacy(3).without_legacy_count()),
        ],
    );

    let cfg = ScanConfig::legacy(&Config::default(), dir.path());
    let run = run_scan_detailed(&engine, cfg.clone(), None).unwrap();
    assert_eq!(run.outcomes[2].source, Some(DetectionSource::Probed));
    let summary = run_scan(&engine, cfg, None).unwrap();
    assert_eq!(summary, run.summary);

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.legacy_files, vec!["a.ai", "c.eps"]);
    assert_eq!(summary.total_legacy_frames, 5);
    assert!(engine.calls().iter().all(|c| !c.is_mutation()));
    assert_eq!(engine.open_documents(), 0);
}

#[test]
fn scan_failures_count_as_zero_and_continue() {
    let dir = folder_with(&["a.ai", "b.ai", "c.ai"]);
    let engine = engine_for(
        dir.path(),
        vec![
            ("a.ai", legacy(1).failing_open()),
            ("b.ai", legacy(1).without_legacy_count().failing_regions()),
            ("c.ai", legacy(4)),
        ],
    );

    let run = ScanRunner::new(&engine, ScanConfig::legacy(&Config::default(), dir.path()))
        .run(None)
        .unwrap();

    assert_eq!(run.outcomes.len(), 3);
    assert_eq!(run.outcomes[0].legacy_count, 0);
    assert!(run.outcomes[0].error.is_some());
    assert_eq!(run.outcomes[1].legacy_count, 0);
    assert!(run.outcomes[1].error.is_some());
    assert_eq!(run.outcomes[2].legacy_count, 4);
    assert_eq!(run.summary.legacy_files, vec!["c.ai"]);
    assert_eq!(run.summary.total_legacy_frames, 4);
}

#[test]
fn color_scan_lists_rgb_documents_and_open_failures() {
    let dir = folder_with(&["a.eps", "b.eps", "c.eps", "d.eps", "e.ai"]);
    let engine = engine_for(
        dir.path(),
        vec![
            ("a.eps", FakeDocument::new().with_color_space(Some(ColorSpace::Rgb))),
            ("b.eps", FakeDocument::new().with_color_space(Some(ColorSpace::Cmyk))),
            ("c.eps", FakeDocument::new().failing_open()),
            ("d.eps", FakeDocument::new().with_color_space(None)),
            ("e.ai", FakeDocument::new().with_color_space(Some(ColorSpace::Rgb))),
        ],
    );

    let cfg = ScanConfig::color(&Config::default(), dir.path());
    let summary = run_color_scan(&engine, cfg, None).unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.rgb_files, vec!["a.eps"]);
    assert_eq!(summary.open_failures, vec!["c.eps"]);
    assert!(engine.calls().iter().all(|c| !c.is_mutation()));
    assert_eq!(engine.open_documents(), 0);
}

#[test]
fn missing_folder_aborts_scan() {
    let dir = folder_with(&[]);
    let engine = engine_for(dir.path(), vec![]);
    let cfg = ScanConfig::legacy(&Config::default(), dir.path().join("missing"));
    assert!(run_scan(&engine, cfg, None).is_err());
    assert!(engine.calls().is_empty());
}
