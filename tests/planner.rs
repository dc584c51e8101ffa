use std::collections::HashMap;

use roottools::errors::PlanError;
use roottools::planner::{default_by, default_under, fill, BasketData, BranchSelection, ManifestTreeSource, TreeSource};

use test_log::test;

/// Builds an `open` closure over an in-memory map of path -> manifest JSON, the way the CLI's
/// `plan` subcommand does over the filesystem.
fn opener(manifests: HashMap<&'static str, &'static str>) -> impl FnMut(&str) -> Result<Box<dyn TreeSource>, PlanError> {
    move |path: &str| {
        let json = manifests
            .get(path)
            .unwrap_or_else(|| panic!("no manifest registered for {path:?}"));
        let source = ManifestTreeSource::from_json(json).map_err(|e| PlanError::InternalInvariant(e.to_string()))?;
        Ok(Box::new(source) as Box<dyn TreeSource>)
    }
}

const SINGLE_FILE: &str = r#"{
    "numentries": 10,
    "branches": {
        "x": {"dtype": "float64", "baskets": [{"start": 0, "entries": 10, "bytes": 100}], "data": [0,1,2,3,4,5,6,7,8,9]},
        "y": {"dtype": "float64", "baskets": [{"start": 0, "entries": 10, "bytes": 100}], "data": [10,11,12,13,14,15,16,17,18,19]}
    }
}"#;

#[test]
fn single_file_produces_one_partition() {
    let paths = vec!["a.json".to_string()];
    let open = opener(HashMap::from([("a.json", SINGLE_FILE)]));

    let set = fill(&paths, "events", open, &BranchSelection::All, default_by, default_under).unwrap();

    assert_eq!(set.numpartitions, 1);
    assert_eq!(set.numentries, 10);
    assert_eq!(set.partitions[0].ranges.len(), 1);
    assert_eq!(set.partitions[0].ranges[0].path, "a.json");
    assert_eq!(set.partitions[0].ranges[0].entrystart, 0);
    assert_eq!(set.partitions[0].ranges[0].entryend, 10);
}

const MULTI_FILE_B: &str = r#"{
    "numentries": 20,
    "branches": {
        "x": {"dtype": "float64", "baskets": [
            {"start": 0, "entries": 10, "bytes": 100},
            {"start": 10, "entries": 10, "bytes": 100}
        ], "data": []},
        "y": {"dtype": "float64", "baskets": [
            {"start": 0, "entries": 10, "bytes": 100},
            {"start": 10, "entries": 10, "bytes": 100}
        ], "data": []}
    }
}"#;

const MULTI_FILE_C: &str = r#"{
    "numentries": 15,
    "branches": {
        "x": {"dtype": "float64", "baskets": [{"start": 0, "entries": 15, "bytes": 100}], "data": []},
        "y": {"dtype": "float64", "baskets": [{"start": 0, "entries": 15, "bytes": 100}], "data": []}
    }
}"#;

#[test]
fn partition_boundary_crosses_files_cleanly() {
    let paths = vec!["b.json".to_string(), "c.json".to_string()];
    let open = opener(HashMap::from([("b.json", MULTI_FILE_B), ("c.json", MULTI_FILE_C)]));

    // One basket (100 bytes) fits, two (200 bytes) don't.
    let under = |baskets: &[BasketData]| baskets.iter().map(|b| b.numbytes).sum::<u64>() < 150;

    let set = fill(&paths, "events", open, &BranchSelection::All, default_by, under).unwrap();

    assert_eq!(set.numentries, 35);
    assert_eq!(set.numpartitions, 3);

    assert_eq!(set.partitions[0].ranges, vec![roottools::planner::Range {
        path: "b.json".to_string(),
        entrystart: 0,
        entryend: 10,
    }]);
    assert_eq!(set.partitions[1].ranges, vec![roottools::planner::Range {
        path: "b.json".to_string(),
        entrystart: 10,
        entryend: 20,
    }]);
    assert_eq!(set.partitions[2].ranges, vec![roottools::planner::Range {
        path: "c.json".to_string(),
        entrystart: 0,
        entryend: 15,
    }]);
}

const MISSING_BRANCH_FILE: &str = r#"{
    "numentries": 5,
    "branches": {
        "x": {"dtype": "float64", "baskets": [{"start": 0, "entries": 5, "bytes": 50}], "data": []}
    }
}"#;

#[test]
fn schema_mismatch_across_files_is_rejected() {
    let paths = vec!["a.json".to_string(), "missing.json".to_string()];
    let open = opener(HashMap::from([("a.json", SINGLE_FILE), ("missing.json", MISSING_BRANCH_FILE)]));

    let err = fill(&paths, "events", open, &BranchSelection::All, default_by, default_under).unwrap_err();

    match err {
        PlanError::MissingBranch { branch, earlier, later } => {
            assert_eq!(branch, "y");
            assert_eq!(earlier, "a.json");
            assert_eq!(later, "missing.json");
        }
        other => panic!("expected MissingBranch, got {other:?}"),
    }
}
