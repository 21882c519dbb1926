mod common;

use common::folder_with;
use std::collections::BTreeSet;
use vecdoc_refresh::{
    discovery::{discover, SkipRules},
    error::BatchError,
};

fn exts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn picks_only_direct_children_with_matching_extension() {
    let dir = folder_with(&["a.eps", "b.AI", "c.txt"]);
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub").join("d.eps"), b"").unwrap();

    let files = discover(dir.path(), &exts(&["eps", "ai"]), &SkipRules::default()).unwrap();
    let names: BTreeSet<String> = files.iter().map(|f| f.file_name()).collect();

    assert_eq!(files.len(), 2);
    assert_eq!(names, BTreeSet::from(["a.eps".to_string(), "b.AI".to_string()]));
    let b = files.iter().find(|f| f.base_name == "b").unwrap();
    assert_eq!(b.extension, "ai");
}

#[test]
fn groups_follow_declared_extension_order() {
    let dir = folder_with(&["z.ai", "m.eps", "a.eps", "k.ai"]);
    let files = discover(dir.path(), &exts(&["ai", "eps"]), &SkipRules::default()).unwrap();

    let (ai, eps): (Vec<_>, Vec<_>) = files.iter().partition(|f| f.extension == "ai");
    assert_eq!(ai.len(), 2);
    assert_eq!(eps.len(), 2);
    let first_eps = files.iter().position(|f| f.extension == "eps").unwrap();
    assert!(files[..first_eps].iter().all(|f| f.extension == "ai"));
}

#[test]
fn empty_folder_is_not_an_error() {
    let dir = folder_with(&["notes.txt"]);
    let files = discover(dir.path(), &exts(&["ai"]), &SkipRules::default()).unwrap();
    assert!(files.is_empty());
}

#[test]
fn missing_folder_is_not_found() {
    let dir = folder_with(&[]);
    let err = discover(&dir.path().join("missing"), &exts(&["ai"]), &SkipRules::default())
        .unwrap_err();
    assert!(matches!(err, BatchError::NotFound { .. }));
}

#[test]
fn empty_extension_set_is_rejected() {
    let dir = folder_with(&["a.ai"]);
    let err = discover(dir.path(), &[], &SkipRules::default()).unwrap_err();
    assert!(matches!(err, BatchError::NoExtensions));
}

#[test]
fn duplicate_and_dotted_extensions_are_normalized() {
    let dir = folder_with(&["a.ai"]);
    let files = discover(dir.path(), &exts(&[".AI", "ai"]), &SkipRules::default()).unwrap();
    assert_eq!(files.len(), 1);
}

#[test]
fn skip_patterns_exclude_sidecar_files() {
    let dir = folder_with(&["logo.eps", "._logo.eps"]);
    let skip = SkipRules::compile(&["^\\._".to_string()]).unwrap();
    let files = discover(dir.path(), &exts(&["eps"]), &skip).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name(), "logo.eps");
}

#[test]
fn bad_skip_pattern_is_reported() {
    let err = SkipRules::compile(&["(".to_string()]).unwrap_err();
    assert!(matches!(err, BatchError::InvalidPattern { .. }));
}
