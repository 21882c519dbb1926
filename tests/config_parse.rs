use vecdoc_refresh::{
    config::{BatchConfig, Config, ScanConfig},
    engine::Compatibility,
    error::BatchError,
};

#[test]
fn parse_example_config() {
    let raw = include_str!("../vecdoc-refresh.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.discovery.batch_extensions, vec!["ai", "eps"]);
    assert_eq!(cfg.save.compatibility, Compatibility::Illustrator17);
    assert!(cfg.batch.overwrite);
    assert!(!cfg.output.report_dir.is_empty());
}

#[test]
fn partial_sections_fall_back_to_defaults() {
    let cfg: Config = toml::from_str("[batch]\nconvert_legacy_text = true\n").expect("parse TOML");
    assert!(cfg.batch.convert_legacy_text);
    assert!(cfg.batch.overwrite);
    assert_eq!(cfg.discovery.color_scan_extensions, vec!["eps"]);
    assert!(cfg.engine.suppress_dialogs);
}

#[test]
fn batch_config_reads_destination_only_when_set() {
    let mut cfg = Config::default();
    let batch = BatchConfig::from_config(&cfg, "/src");
    assert_eq!(batch.destination_dir, None);

    cfg.batch.overwrite = false;
    cfg.batch.destination_dir = "/out".into();
    let batch = BatchConfig::from_config(&cfg, "/src");
    assert!(!batch.overwrite);
    assert_eq!(batch.destination_dir.as_deref(), Some(std::path::Path::new("/out")));
}

#[test]
fn copy_mode_without_destination_is_rejected() {
    let src = tempfile::tempdir().unwrap();
    let mut batch = BatchConfig::overwriting(src.path());
    batch.overwrite = false;
    assert!(matches!(batch.validate(), Err(BatchError::MissingDestination)));
}

#[test]
fn copy_mode_with_missing_destination_is_rejected() {
    let src = tempfile::tempdir().unwrap();
    let batch = BatchConfig::copying(src.path(), src.path().join("nope"));
    assert!(matches!(
        batch.validate(),
        Err(BatchError::NotFound { what: "destination folder", .. })
    ));
}

#[test]
fn missing_source_is_rejected() {
    let src = tempfile::tempdir().unwrap();
    let batch = BatchConfig::overwriting(src.path().join("gone"));
    assert!(matches!(
        batch.validate(),
        Err(BatchError::NotFound { what: "source folder", .. })
    ));
}

#[test]
fn scan_configs_pick_their_extensions() {
    let cfg = Config::default();
    assert_eq!(ScanConfig::legacy(&cfg, "/src").extensions, vec!["ai", "eps"]);
    assert_eq!(ScanConfig::color(&cfg, "/src").extensions, vec!["eps"]);
}
