use std::collections::{BTreeMap, HashMap};

use roottools::errors::PlanError;
use roottools::planner::{ArrayData, DType, ManifestTreeSource, Partition, PartitionIterator, PartitionSet, Range, SequentialExecutor, TreeSource};

use test_log::test;

fn opener(manifests: HashMap<&'static str, &'static str>) -> impl FnMut(&str) -> Result<Box<dyn TreeSource>, PlanError> {
    move |path: &str| {
        let json = manifests
            .get(path)
            .unwrap_or_else(|| panic!("no manifest registered for {path:?}"));
        let source = ManifestTreeSource::from_json(json).map_err(|e| PlanError::InternalInvariant(e.to_string()))?;
        Ok(Box::new(source) as Box<dyn TreeSource>)
    }
}

const FILE_A: &str = r#"{
    "numentries": 10,
    "branches": {
        "x": {"dtype": "float64", "baskets": [
            {"start": 0, "entries": 5, "bytes": 50},
            {"start": 5, "entries": 5, "bytes": 50}
        ], "data": [0,1,2,3,4,5,6,7,8,9]}
    }
}"#;

const FILE_B: &str = r#"{
    "numentries": 5,
    "branches": {
        "x": {"dtype": "float64", "baskets": [{"start": 0, "entries": 5, "bytes": 50}], "data": [100,101,102,103,104]}
    }
}"#;

fn sample_set() -> PartitionSet {
    let mut branchdtypes = BTreeMap::new();
    branchdtypes.insert("x".to_string(), DType::Float64);

    let partitions = vec![
        Partition {
            index: 0,
            ranges: vec![Range {
                path: "a.json".to_string(),
                entrystart: 0,
                entryend: 5,
            }],
        },
        Partition {
            index: 1,
            ranges: vec![
                Range {
                    path: "a.json".to_string(),
                    entrystart: 5,
                    entryend: 10,
                },
                Range {
                    path: "b.json".to_string(),
                    entrystart: 0,
                    entryend: 5,
                },
            ],
        },
    ];

    PartitionSet::new("events".to_string(), branchdtypes, BTreeMap::new(), partitions).unwrap()
}

fn floats(array: &ArrayData) -> Vec<f64> {
    match array {
        ArrayData::Float64(v) => v.clone(),
        other => panic!("expected Float64, got {other:?}"),
    }
}

#[test]
fn emits_partitions_in_order_with_concatenated_values() {
    let set = sample_set();
    let open = opener(HashMap::from([("a.json", FILE_A), ("b.json", FILE_B)]));
    let executor = SequentialExecutor;

    let iter = PartitionIterator::new(&set, open, &executor);
    let records: Vec<BTreeMap<String, ArrayData>> = iter.map(|r| r.unwrap()).collect();

    assert_eq!(records.len(), 2);
    assert_eq!(floats(&records[0]["x"]), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    // The second partition's range crosses from a.json's tail into all of b.json; the arrays for
    // each constituent range must be concatenated in range order, not file-open order.
    assert_eq!(floats(&records[1]["x"]), vec![5.0, 6.0, 7.0, 8.0, 9.0, 100.0, 101.0, 102.0, 103.0, 104.0]);
}

#[test]
fn single_file_single_partition_round_trips() {
    let mut branchdtypes = BTreeMap::new();
    branchdtypes.insert("x".to_string(), DType::Float64);
    let set = PartitionSet::new(
        "events".to_string(),
        branchdtypes,
        BTreeMap::new(),
        vec![Partition {
            index: 0,
            ranges: vec![Range {
                path: "a.json".to_string(),
                entrystart: 0,
                entryend: 10,
            }],
        }],
    )
    .unwrap();

    let open = opener(HashMap::from([("a.json", FILE_A)]));
    let executor = SequentialExecutor;

    let iter = PartitionIterator::new(&set, open, &executor);
    let records: Vec<BTreeMap<String, ArrayData>> = iter.map(|r| r.unwrap()).collect();

    assert_eq!(records.len(), 1);
    assert_eq!(floats(&records[0]["x"]), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
}
