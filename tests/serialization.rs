use std::collections::BTreeMap;

use roottools::planner::{DType, Partition, PartitionSet, Range};

use test_log::test;

fn sample() -> PartitionSet {
    let mut branchdtypes = BTreeMap::new();
    branchdtypes.insert("pt".to_string(), DType::Float64);
    branchdtypes.insert("run".to_string(), DType::Int32);

    let mut branchcounters = BTreeMap::new();
    branchcounters.insert("jets".to_string(), "njets".to_string());

    let partitions = vec![
        Partition {
            index: 0,
            ranges: vec![Range {
                path: "a.root".to_string(),
                entrystart: 0,
                entryend: 10,
            }],
        },
        Partition {
            index: 1,
            ranges: vec![
                Range {
                    path: "a.root".to_string(),
                    entrystart: 10,
                    entryend: 20,
                },
                Range {
                    path: "b.root".to_string(),
                    entrystart: 0,
                    entryend: 5,
                },
            ],
        },
    ];

    PartitionSet::new("events".to_string(), branchdtypes, branchcounters, partitions).unwrap()
}

#[test]
fn round_trips_through_json() {
    let set = sample();
    let json = set.to_json().unwrap();
    let parsed = PartitionSet::from_json(&json).unwrap();

    assert_eq!(parsed.treepath, set.treepath);
    assert_eq!(parsed.branchdtypes, set.branchdtypes);
    assert_eq!(parsed.branchcounters, set.branchcounters);
    assert_eq!(parsed.numpartitions, set.numpartitions);
    assert_eq!(parsed.numentries, set.numentries);
    assert_eq!(parsed.partitions, set.partitions);
}

#[test]
fn dtype_serializes_as_a_plain_string() {
    let set = sample();
    let json = set.to_json().unwrap();
    assert!(json.contains("\"float64\""));
    assert!(json.contains("\"int32\""));
}

#[test]
fn rejects_a_partition_set_with_a_gap() {
    let json = r#"{
        "treepath": "events",
        "branchdtypes": {},
        "branchcounters": {},
        "numpartitions": 1,
        "numentries": 10,
        "partitions": [
            {"index": 0, "ranges": [{"path": "a.root", "entrystart": 5, "entryend": 10}]}
        ]
    }"#;

    let err = PartitionSet::from_json(json).unwrap_err();
    assert!(matches!(err, roottools::errors::PartitionSetJsonError::Invalid(_)));
}
