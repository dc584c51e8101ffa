//! Core B: plans how to tile a set of ROOT files into fixed-size partitions, and iterates over
//! the data those partitions describe.

pub mod fill;
pub mod iterator;
pub mod model;
pub mod path;
pub mod tree;

pub use fill::{default_by, default_under, fill};
pub use iterator::PartitionIterator;
pub use model::{BasketData, BranchInfo, BranchSelection, DType, Partition, PartitionSet, Range};
pub use path::{enumerate_paths, PathSpec};
pub use tree::{ArrayData, Executor, ManifestTreeSource, SequentialExecutor, Task, TreeSource};
