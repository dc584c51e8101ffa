//! Consumes a planned [`PartitionSet`] and yields one output record per partition, pulling data
//! from each file exactly once and buffering only what hasn't yet been claimed by a partition.

use std::collections::{BTreeMap, VecDeque};

use crate::errors::PlanError;

use super::model::{DType, PartitionSet};
use super::tree::{ArrayData, Executor, TreeSource};

type TreeBatch = Vec<(u64, u64, BTreeMap<String, ArrayData>)>;

/// Pull-driven iterator over a [`PartitionSet`]'s data.
///
/// Call [`PartitionIterator::new`] with a function that opens a [`TreeSource`] for a given path
/// and an [`Executor`] to batch basket reads through; then drive it as a normal `Iterator`.
pub struct PartitionIterator<'a> {
    partitionset: &'a PartitionSet,
    open: Box<dyn FnMut(&str) -> Result<Box<dyn TreeSource>, PlanError> + 'a>,
    executor: &'a dyn Executor,
    selection: Vec<(String, DType)>,

    treedata: BTreeMap<String, TreeBatch>,
    oldpath: Option<String>,
    current_tree: Option<Box<dyn TreeSource>>,
    entries: Vec<(u64, u64)>,

    remaining: VecDeque<(usize, usize)>,
    next_partition_to_emit: usize,
}

impl<'a> PartitionIterator<'a> {
    pub fn new(
        partitionset: &'a PartitionSet,
        open: impl FnMut(&str) -> Result<Box<dyn TreeSource>, PlanError> + 'a,
        executor: &'a dyn Executor,
    ) -> Self {
        let selection: Vec<(String, DType)> = partitionset
            .branchdtypes
            .iter()
            .map(|(name, dtype)| (name.clone(), *dtype))
            .collect();

        let mut remaining = VecDeque::new();
        for (pidx, partition) in partitionset.partitions.iter().enumerate() {
            for ridx in 0..partition.ranges.len() {
                remaining.push_back((pidx, ridx));
            }
        }

        PartitionIterator {
            partitionset,
            open: Box::new(open),
            executor,
            selection,
            treedata: BTreeMap::new(),
            oldpath: None,
            current_tree: None,
            entries: Vec::new(),
            remaining,
            next_partition_to_emit: 0,
        }
    }

    fn complete(&self, index: usize) -> bool {
        self.partitionset.partitions[index].ranges.iter().all(|r| {
            self.treedata
                .get(&r.path)
                .is_some_and(|batch| batch.iter().any(|(es, ee, _)| *es == r.entrystart && *ee == r.entryend))
        })
    }

    fn output(&mut self, index: usize) -> BTreeMap<String, ArrayData> {
        let mut arraylists: BTreeMap<String, Vec<ArrayData>> =
            self.selection.iter().map(|(name, _)| (name.clone(), Vec::new())).collect();

        for r in &self.partitionset.partitions[index].ranges {
            let batch = self.treedata.get_mut(&r.path).expect("a complete partition's path must be buffered");
            let used = batch
                .iter()
                .position(|(es, ee, _)| *es == r.entrystart && *ee == r.entryend)
                .expect("a complete partition's range must be present in its path's batch");
            let (_, _, arrays) = batch.drain(0..=used).last().unwrap();
            for (name, array) in arrays {
                if let Some(list) = arraylists.get_mut(&name) {
                    list.push(array);
                }
            }
            if batch.is_empty() {
                self.treedata.remove(&r.path);
            }
        }

        arraylists
            .into_iter()
            .map(|(name, pieces)| {
                if pieces.is_empty() {
                    let dtype = self.partitionset.branchdtypes[&name];
                    (name, ArrayData::empty(dtype))
                } else {
                    (name, ArrayData::concat(pieces))
                }
            })
            .collect()
    }

    fn flush(&mut self, path: &str) -> Result<(), PlanError> {
        let tree = self.current_tree.take().expect("flush called without an open tree");
        let batch = tree.iterate(&self.entries, &self.selection, self.executor);
        self.treedata.insert(path.to_string(), batch);
        Ok(())
    }
}

impl<'a> Iterator for PartitionIterator<'a> {
    type Item = Result<BTreeMap<String, ArrayData>, PlanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.next_partition_to_emit < self.partitionset.partitions.len() && self.complete(self.next_partition_to_emit)
            {
                let out = self.output(self.next_partition_to_emit);
                self.next_partition_to_emit += 1;
                return Some(Ok(out));
            }

            match self.remaining.pop_front() {
                Some((pidx, ridx)) => {
                    let range = self.partitionset.partitions[pidx].ranges[ridx].clone();

                    if self.oldpath.as_deref() != Some(range.path.as_str()) {
                        if let Some(old) = self.oldpath.take() {
                            if let Err(e) = self.flush(&old) {
                                return Some(Err(e));
                            }
                        }
                        match (self.open)(&range.path) {
                            Ok(tree) => self.current_tree = Some(tree),
                            Err(e) => return Some(Err(e)),
                        }
                        self.entries.clear();
                    }

                    self.entries.push((range.entrystart, range.entryend));
                    self.oldpath = Some(range.path);
                }
                None => {
                    if let Some(old) = self.oldpath.take() {
                        if let Err(e) = self.flush(&old) {
                            return Some(Err(e));
                        }
                        continue;
                    }

                    if self.next_partition_to_emit < self.partitionset.partitions.len() {
                        // Ranges are exhausted and every path has been flushed; if the next
                        // partition still isn't complete, something upstream is inconsistent.
                        return None;
                    }

                    return None;
                }
            }
        }
    }
}
