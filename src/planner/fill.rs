//! The partitioning algorithm: greedy per-branch basket growth arbitrated across branches into a
//! single cross-branch partition boundary.

use std::collections::BTreeMap;

use log::{debug, trace};

use crate::errors::PlanError;

use super::model::{BasketData, BranchSelection, DType, Partition, PartitionSet, Range};
use super::tree::TreeSource;

/// Default cross-branch arbitrator: picks the candidate with the fewest entries, breaking ties by
/// first occurrence.
pub fn default_by(candidates: &[Partition]) -> Partition {
    candidates
        .iter()
        .min_by_key(|p| p.numentries())
        .expect("fill never calls `by` with an empty candidate list")
        .clone()
}

/// Default per-branch growth predicate: stop before a partition's baskets exceed 10 MiB.
pub fn default_under(baskets: &[BasketData]) -> bool {
    baskets.iter().map(|b| b.numbytes).sum::<u64>() < 10 * 1024 * 1024
}

fn open_and_validate(
    open: &mut dyn FnMut(&str) -> Result<Box<dyn TreeSource>, PlanError>,
    path: &str,
    prev_path: &str,
    selection: &BranchSelection,
    toget: &BTreeMap<String, DType>,
    counters: &BTreeMap<String, String>,
) -> Result<Box<dyn TreeSource>, PlanError> {
    let tree = open(path)?;
    let newtoget: BTreeMap<String, DType> = tree.normalize_selection(selection).into_iter().collect();

    let mut keys: std::collections::BTreeSet<&String> = toget.keys().collect();
    keys.extend(newtoget.keys());
    for key in keys {
        match (toget.get(key), newtoget.get(key)) {
            (Some(_), None) => {
                return Err(PlanError::MissingBranch {
                    branch: key.clone(),
                    earlier: prev_path.to_string(),
                    later: path.to_string(),
                })
            }
            (Some(old_dtype), Some(new_dtype)) if old_dtype != new_dtype => {
                return Err(PlanError::DtypeMismatch {
                    branch: key.clone(),
                    earlier: prev_path.to_string(),
                    earlier_dtype: old_dtype.to_string(),
                    later: path.to_string(),
                    later_dtype: new_dtype.to_string(),
                })
            }
            _ => {}
        }
    }

    let newcounters: BTreeMap<String, String> = toget
        .keys()
        .filter_map(|b| tree.counter(b).map(|c| (b.clone(), c.to_string())))
        .collect();
    let mut ckeys: std::collections::BTreeSet<&String> = counters.keys().collect();
    ckeys.extend(newcounters.keys());
    for key in ckeys {
        match (counters.get(key), newcounters.get(key)) {
            (Some(earlier_counter), None) => {
                return Err(PlanError::MissingCounter {
                    branch: key.clone(),
                    earlier: prev_path.to_string(),
                    earlier_counter: earlier_counter.clone(),
                    later: path.to_string(),
                })
            }
            (Some(a), Some(b)) if a != b => {
                return Err(PlanError::CounterMismatch {
                    branch: key.clone(),
                    earlier: prev_path.to_string(),
                    earlier_counter: a.clone(),
                    later: path.to_string(),
                    later_counter: b.clone(),
                })
            }
            _ => {}
        }
    }

    Ok(tree)
}

fn ensure_tree(
    trees: &mut BTreeMap<usize, Box<dyn TreeSource>>,
    paths: &[String],
    i: usize,
    selection: &BranchSelection,
    toget: &BTreeMap<String, DType>,
    counters: &BTreeMap<String, String>,
    open: &mut dyn FnMut(&str) -> Result<Box<dyn TreeSource>, PlanError>,
) -> Result<(), PlanError> {
    if trees.contains_key(&i) {
        return Ok(());
    }
    let tree = open_and_validate(open, &paths[i], &paths[i - 1], selection, toget, counters)?;
    trees.insert(i, tree);
    Ok(())
}

/// Walks `paths` once, greedily growing each branch's basket coverage under `under` and
/// arbitrating the cross-branch boundary with `by`, producing a validated [`PartitionSet`].
///
/// `open` lazily opens a [`TreeSource`] for one path; it is never called twice for the same path.
pub fn fill<Open, By, Under>(
    paths: &[String],
    treepath: &str,
    mut open: Open,
    selection: &BranchSelection,
    by: By,
    under: Under,
) -> Result<PartitionSet, PlanError>
where
    Open: FnMut(&str) -> Result<Box<dyn TreeSource>, PlanError>,
    By: Fn(&[Partition]) -> Partition,
    Under: Fn(&[BasketData]) -> bool,
{
    if paths.is_empty() {
        return Err(PlanError::InternalInvariant("fill called with no paths".to_string()));
    }

    let mut trees: BTreeMap<usize, Box<dyn TreeSource>> = BTreeMap::new();
    trees.insert(0, open(&paths[0])?);

    let toget: BTreeMap<String, DType> = trees[&0].normalize_selection(selection).into_iter().collect();
    let counters: BTreeMap<String, String> = toget
        .keys()
        .filter_map(|b| trees[&0].counter(b).map(|c| (b.clone(), c.to_string())))
        .collect();

    let last_path_index = paths.len() - 1;

    let mut partitions: Vec<Partition> = Vec::new();
    let mut partitioni = 0usize;

    loop {
        ensure_tree(&mut trees, paths, last_path_index, selection, &toget, &counters, &mut open)?;
        let last_numentries = trees[&last_path_index].numentries();

        if let Some(last_partition) = partitions.last() {
            let last_range = last_partition.ranges.last().expect("a partition always has at least one range");
            if last_range.path == paths[last_path_index] && last_range.entryend >= last_numentries {
                break;
            }
        }

        let mut candidates: Vec<Partition> = Vec::with_capacity(toget.len());

        for (branchname, dtype) in &toget {
            let (mut pathi, entryi) = match partitions.last() {
                None => (0usize, 0u64),
                Some(p) => {
                    let r = p.ranges.last().unwrap();
                    let idx = paths
                        .iter()
                        .position(|s| s == &r.path)
                        .expect("a partition's range path must be one of the planned paths");
                    (idx, r.entryend)
                }
            };

            ensure_tree(&mut trees, paths, pathi, selection, &toget, &counters, &mut open)?;

            // If the previous partition's tail exactly reached this file's last entry, this
            // branch has no more baskets left here; continue from the start of the next file
            // rather than re-selecting the already-consumed last basket (which `basketstart` of
            // a one-past-the-end basket can't distinguish, since there is no such basket).
            let mut basketi = if partitions.is_empty() {
                0
            } else if entryi >= trees[&pathi].numentries() {
                pathi += 1;
                if pathi < paths.len() {
                    ensure_tree(&mut trees, paths, pathi, selection, &toget, &counters, &mut open)?;
                }
                0
            } else {
                let tree = trees[&pathi].as_ref();
                let nb = tree.numbaskets(branchname);
                let mut bi = 0;
                while bi + 1 < nb && tree.basketstart(branchname, bi + 1) <= entryi {
                    bi += 1;
                }
                bi
            };

            let mut basketdata: Vec<BasketData> = Vec::new();

            loop {
                ensure_tree(&mut trees, paths, pathi, selection, &toget, &counters, &mut open)?;
                let nb = trees[&pathi].numbaskets(branchname);
                if basketi >= nb {
                    pathi += 1;
                    basketi = 0;
                    if pathi >= paths.len() {
                        break;
                    }
                    ensure_tree(&mut trees, paths, pathi, selection, &toget, &counters, &mut open)?;
                }

                let tree = trees[&pathi].as_ref();
                let start = tree.basketstart(branchname, basketi);
                let basket_entries = tree.basketentries(branchname, basketi);
                let numbytes = tree.basketbytes(branchname, basketi);
                let itemdims = tree
                    .all_branches()
                    .iter()
                    .find(|b| &b.name == branchname)
                    .map(|b| b.itemdims.clone())
                    .unwrap_or_default();

                basketdata.push(BasketData {
                    path: paths[pathi].clone(),
                    branchname: branchname.clone(),
                    dtype: *dtype,
                    itemdims,
                    entrystart: start,
                    entryend: start + basket_entries,
                    numbytes,
                });

                if !under(&basketdata) {
                    basketdata.pop();
                    break;
                } else {
                    basketi += 1;
                }
            }

            if basketdata.is_empty() {
                return Err(PlanError::Unsatisfiable {
                    branch: branchname.clone(),
                    entry: entryi,
                    path: paths[pathi].clone(),
                });
            }

            let mut ranges: Vec<Range> = Vec::new();
            for b in &basketdata {
                match ranges.last_mut() {
                    Some(last) if last.path == b.path => last.entryend = b.entryend,
                    _ => ranges.push(Range {
                        path: b.path.clone(),
                        entrystart: b.entrystart,
                        entryend: b.entryend,
                    }),
                }
            }

            if let Some(prev_partition) = partitions.last() {
                let prev_range = prev_partition.ranges.last().unwrap();
                if ranges[0].path == prev_range.path {
                    ranges[0].entrystart = prev_range.entryend;
                } else {
                    ranges[0].entrystart = 0;
                }
            }

            ranges.retain(|r| r.entrystart != r.entryend);

            candidates.push(Partition { index: partitioni, ranges });
        }

        let chosen = by(&candidates);
        trace!(
            target: "roottools",
            "partition {partitioni}: {} entries across {} ranges",
            chosen.numentries(),
            chosen.ranges.len()
        );
        partitions.push(chosen);

        let first_index = partitions
            .last()
            .unwrap()
            .ranges
            .first()
            .and_then(|r| paths.iter().position(|p| p == &r.path))
            .unwrap_or(0);
        trees.retain(|&i, _| i >= first_index);

        partitioni += 1;
    }

    debug!(target: "roottools", "fill produced {} partitions for {treepath:?}", partitions.len());

    PartitionSet::new(treepath.to_string(), toget, counters, partitions)
}
