//! The opaque tree-reader contract the planner depends on, plus a JSON-manifest-backed
//! implementation used by this crate's own tests and the CLI's `plan` subcommand in place of a
//! real ROOT parser.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::model::{BasketData, BranchInfo, BranchSelection, DType};

/// One branch's worth of values for some entry range.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Bool(Vec<bool>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int32(v) => v.len(),
            ArrayData::Int64(v) => v.len(),
            ArrayData::Float32(v) => v.len(),
            ArrayData::Float64(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::Int32(_) => DType::Int32,
            ArrayData::Int64(_) => DType::Int64,
            ArrayData::Float32(_) => DType::Float32,
            ArrayData::Float64(_) => DType::Float64,
            ArrayData::Bool(_) => DType::Bool,
        }
    }

    pub fn empty(dtype: DType) -> Self {
        match dtype {
            DType::Int32 => ArrayData::Int32(Vec::new()),
            DType::Int64 => ArrayData::Int64(Vec::new()),
            DType::Float32 => ArrayData::Float32(Vec::new()),
            DType::Float64 => ArrayData::Float64(Vec::new()),
            DType::Bool => ArrayData::Bool(Vec::new()),
        }
    }

    /// Concatenates same-dtype pieces in order, the way the iterator stitches per-range arrays
    /// back together for one partition.
    pub fn concat(pieces: Vec<ArrayData>) -> ArrayData {
        let dtype = pieces.first().map(ArrayData::dtype).unwrap_or(DType::Float64);
        if pieces.is_empty() {
            return ArrayData::empty(dtype);
        }

        match dtype {
            DType::Int32 => ArrayData::Int32(
                pieces
                    .into_iter()
                    .flat_map(|p| match p {
                        ArrayData::Int32(v) => v,
                        _ => Vec::new(),
                    })
                    .collect(),
            ),
            DType::Int64 => ArrayData::Int64(
                pieces
                    .into_iter()
                    .flat_map(|p| match p {
                        ArrayData::Int64(v) => v,
                        _ => Vec::new(),
                    })
                    .collect(),
            ),
            DType::Float32 => ArrayData::Float32(
                pieces
                    .into_iter()
                    .flat_map(|p| match p {
                        ArrayData::Float32(v) => v,
                        _ => Vec::new(),
                    })
                    .collect(),
            ),
            DType::Float64 => ArrayData::Float64(
                pieces
                    .into_iter()
                    .flat_map(|p| match p {
                        ArrayData::Float64(v) => v,
                        _ => Vec::new(),
                    })
                    .collect(),
            ),
            DType::Bool => ArrayData::Bool(
                pieces
                    .into_iter()
                    .flat_map(|p| match p {
                        ArrayData::Bool(v) => v,
                        _ => Vec::new(),
                    })
                    .collect(),
            ),
        }
    }
}

/// A unit of deferred work handed to an [`Executor`]: read and decode one branch's slice.
pub type Task<'a> = Box<dyn FnOnce() -> (String, ArrayData) + Send + 'a>;

/// Stands in for the distilled spec's opaque parallel basket-decompression executor.
///
/// The planner and iterator never decompress baskets themselves; they hand a batch of
/// independent per-branch read tasks to an `Executor` and wait for all of them.
pub trait Executor {
    fn run(&self, tasks: Vec<Task<'_>>) -> Vec<(String, ArrayData)>;
}

/// Runs every task serially on the calling thread. The only executor this crate ships — real
/// parallelism is delegated to the caller, per the distilled spec's scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn run(&self, tasks: Vec<Task<'_>>) -> Vec<(String, ArrayData)> {
        tasks.into_iter().map(|task| task()).collect()
    }
}

/// The opaque tree-reader contract the planner and iterator are written against.
///
/// A real implementation would parse ROOT basket headers; this crate ships only
/// [`ManifestTreeSource`], which reads the same information from a small JSON manifest.
pub trait TreeSource {
    fn numentries(&self) -> u64;
    fn all_branches(&self) -> &[BranchInfo];
    fn numbaskets(&self, branch: &str) -> usize;
    fn basketstart(&self, branch: &str, i: usize) -> u64;
    fn basketentries(&self, branch: &str, i: usize) -> u64;
    fn basketbytes(&self, branch: &str, i: usize) -> u64;
    /// The counter branch for a variable-width branch, if any.
    fn counter(&self, branch: &str) -> Option<&str>;

    /// Turns a caller-supplied selection into an ordered `(branch, dtype)` sequence, the way
    /// `TTree._normalizeselection` does in the source this crate was modeled on.
    fn normalize_selection(&self, selection: &BranchSelection) -> Vec<(String, DType)> {
        match selection {
            BranchSelection::All => self
                .all_branches()
                .iter()
                .map(|b| (b.name.clone(), b.dtype))
                .collect(),
            BranchSelection::Names(names) => names
                .iter()
                .filter_map(|name| {
                    self.all_branches()
                        .iter()
                        .find(|b| &b.name == name)
                        .map(|b| (b.name.clone(), b.dtype))
                })
                .collect(),
            BranchSelection::Map(map) => map.iter().map(|(name, dtype)| (name.clone(), *dtype)).collect(),
        }
    }

    /// Reads every selected branch over the given `(entrystart, entryend)` ranges, batching the
    /// per-branch reads through `executor`. Returns one `(entrystart, entryend, arrays)` tuple per
    /// requested range, in order.
    fn iterate(
        &self,
        entries: &[(u64, u64)],
        selection: &[(String, DType)],
        executor: &dyn Executor,
    ) -> Vec<(u64, u64, BTreeMap<String, ArrayData>)>;
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestBasket {
    start: u64,
    entries: u64,
    bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestBranch {
    dtype: DType,
    #[serde(default)]
    itemdims: Vec<u64>,
    #[serde(default)]
    counter: Option<String>,
    baskets: Vec<ManifestBasket>,
    #[serde(default)]
    data: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestFile {
    numentries: u64,
    branches: BTreeMap<String, ManifestBranch>,
}

/// A [`TreeSource`] backed by a JSON manifest describing basket geometry (and, optionally, flat
/// numeric data so `iterate` can return real values). Used by this crate's planner tests and by
/// the CLI's `plan` subcommand in place of a real ROOT parser.
pub struct ManifestTreeSource {
    numentries: u64,
    branches: Vec<BranchInfo>,
    by_name: BTreeMap<String, ManifestBranch>,
}

impl ManifestTreeSource {
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let file: ManifestFile = serde_json::from_str(s)?;
        let branches = file
            .branches
            .iter()
            .map(|(name, b)| BranchInfo {
                name: name.clone(),
                dtype: b.dtype,
                itemdims: b.itemdims.clone(),
            })
            .collect();
        Ok(ManifestTreeSource {
            numentries: file.numentries,
            branches,
            by_name: file.branches,
        })
    }

    fn branch(&self, name: &str) -> &ManifestBranch {
        self.by_name
            .get(name)
            .unwrap_or_else(|| panic!("branch {name:?} not present in manifest"))
    }
}

impl TreeSource for ManifestTreeSource {
    fn numentries(&self) -> u64 {
        self.numentries
    }

    fn all_branches(&self) -> &[BranchInfo] {
        &self.branches
    }

    fn numbaskets(&self, branch: &str) -> usize {
        self.branch(branch).baskets.len()
    }

    fn basketstart(&self, branch: &str, i: usize) -> u64 {
        self.branch(branch).baskets[i].start
    }

    fn basketentries(&self, branch: &str, i: usize) -> u64 {
        self.branch(branch).baskets[i].entries
    }

    fn basketbytes(&self, branch: &str, i: usize) -> u64 {
        self.branch(branch).baskets[i].bytes
    }

    fn counter(&self, branch: &str) -> Option<&str> {
        self.by_name.get(branch).and_then(|b| b.counter.as_deref())
    }

    fn iterate(
        &self,
        entries: &[(u64, u64)],
        selection: &[(String, DType)],
        executor: &dyn Executor,
    ) -> Vec<(u64, u64, BTreeMap<String, ArrayData>)> {
        entries
            .iter()
            .map(|&(start, end)| {
                let tasks: Vec<Task<'_>> = selection
                    .iter()
                    .map(|(name, dtype)| -> Task<'_> {
                        let branch = self.branch(name);
                        let slice: Vec<f64> = branch
                            .data
                            .get(start as usize..end.min(branch.data.len() as u64) as usize)
                            .unwrap_or(&[])
                            .to_vec();
                        let dtype = *dtype;
                        let name = name.clone();
                        Box::new(move || {
                            let array = match dtype {
                                DType::Int32 => ArrayData::Int32(slice.iter().map(|&x| x as i32).collect()),
                                DType::Int64 => ArrayData::Int64(slice.iter().map(|&x| x as i64).collect()),
                                DType::Float32 => ArrayData::Float32(slice.iter().map(|&x| x as f32).collect()),
                                DType::Float64 => ArrayData::Float64(slice),
                                DType::Bool => ArrayData::Bool(slice.iter().map(|&x| x != 0.0).collect()),
                            };
                            (name, array)
                        })
                    })
                    .collect();

                let arrays: BTreeMap<String, ArrayData> = executor.run(tasks).into_iter().collect();
                (start, end, arrays)
            })
            .collect()
    }
}
