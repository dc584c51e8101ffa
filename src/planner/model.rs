//! Plain data types shared by the planner: basket geometry, ranges, partitions, and the
//! serializable `PartitionSet`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::errors::PlanError;

/// The primitive element type a branch's values are read into.
///
/// No numerics crate appears anywhere in the corpus this crate was built against, so this is a
/// small hand-rolled enum rather than a dependency on one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DType {
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Bool => "bool",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int32" => Ok(DType::Int32),
            "int64" => Ok(DType::Int64),
            "float32" => Ok(DType::Float32),
            "float64" => Ok(DType::Float64),
            "bool" => Ok(DType::Bool),
            other => Err(format!("unrecognized dtype {other:?}")),
        }
    }
}

impl Serialize for DType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Static per-branch metadata, as exposed by a [`crate::planner::tree::TreeSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct BranchInfo {
    pub name: String,
    pub dtype: DType,
    pub itemdims: Vec<u64>,
}

/// How the caller selects which branches to load, mirroring the distilled spec's four forms.
#[derive(Debug, Clone)]
pub enum BranchSelection {
    All,
    Names(Vec<String>),
    Map(BTreeMap<String, DType>),
}

/// Describes one basket's contribution to a branch, accumulated while planning. Never persisted.
#[derive(Debug, Clone)]
pub struct BasketData {
    pub path: String,
    pub branchname: String,
    pub dtype: DType,
    pub itemdims: Vec<u64>,
    pub entrystart: u64,
    pub entryend: u64,
    pub numbytes: u64,
}

impl BasketData {
    pub fn numentries(&self) -> u64 {
        self.entryend - self.entrystart
    }
}

/// A partition's slice within a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub path: String,
    pub entrystart: u64,
    pub entryend: u64,
}

impl Range {
    pub fn numentries(&self) -> u64 {
        self.entryend - self.entrystart
    }
}

/// A contiguous entry interval, possibly crossing file boundaries, treated as one I/O chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub index: usize,
    pub ranges: Vec<Range>,
}

impl Partition {
    pub fn numentries(&self) -> u64 {
        self.ranges.iter().map(Range::numentries).sum()
    }
}

/// A complete, validated plan for tiling a tree's entries across one or more files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSet {
    pub treepath: String,
    pub branchdtypes: BTreeMap<String, DType>,
    pub branchcounters: BTreeMap<String, String>,
    pub numpartitions: usize,
    pub numentries: u64,
    pub partitions: Vec<Partition>,
}

impl PartitionSet {
    /// Builds a `PartitionSet`, checking the invariants the distilled spec places on construction:
    /// partition count and indices match `partitions`, `numentries` matches the sum of partition
    /// sizes, and per-path ranges tile `[0, N)` with no gaps or overlaps.
    pub fn new(
        treepath: String,
        branchdtypes: BTreeMap<String, DType>,
        branchcounters: BTreeMap<String, String>,
        partitions: Vec<Partition>,
    ) -> Result<Self, PlanError> {
        let numpartitions = partitions.len();
        let numentries = partitions.iter().map(Partition::numentries).sum();

        let set = PartitionSet {
            treepath,
            branchdtypes,
            branchcounters,
            numpartitions,
            numentries,
            partitions,
        };
        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> Result<(), PlanError> {
        if self.numpartitions != self.partitions.len() {
            return Err(PlanError::InternalInvariant(format!(
                "numpartitions {} does not match {} partitions",
                self.numpartitions,
                self.partitions.len()
            )));
        }
        for (i, partition) in self.partitions.iter().enumerate() {
            if partition.index != i {
                return Err(PlanError::InternalInvariant(format!(
                    "partition at position {i} claims index {}",
                    partition.index
                )));
            }
        }
        let computed: u64 = self.partitions.iter().map(Partition::numentries).sum();
        if computed != self.numentries {
            return Err(PlanError::InternalInvariant(format!(
                "numentries {} does not match the sum of partition sizes {computed}",
                self.numentries
            )));
        }

        let mut last_path: Option<String> = None;
        let mut last_end = 0u64;
        for partition in &self.partitions {
            for range in &partition.ranges {
                if last_path.as_deref() != Some(range.path.as_str()) {
                    if range.entrystart != 0 {
                        return Err(PlanError::InternalInvariant(format!(
                            "range in {:?} starts at {} instead of 0 after switching files",
                            range.path, range.entrystart
                        )));
                    }
                } else if range.entrystart != last_end {
                    return Err(PlanError::InternalInvariant(format!(
                        "range in {:?} starts at {} but the previous range ended at {last_end}",
                        range.path, range.entrystart
                    )));
                }
                last_path = Some(range.path.clone());
                last_end = range.entryend;
            }
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String, crate::errors::PartitionSetJsonError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, crate::errors::PartitionSetJsonError> {
        let set: PartitionSet = serde_json::from_str(s)?;
        set.validate()
            .map_err(|e| crate::errors::PartitionSetJsonError::Invalid(e.to_string()))?;
        Ok(set)
    }
}
