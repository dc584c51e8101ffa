//! Error types for both cores, following one enum per fallible public operation.

use thiserror::Error;

/// An error triggered while inserting an object into an archive being written.
#[derive(Debug, Error)]
pub enum InsertError {
    #[error(transparent)]
    /// An IO error occurred while writing to the underlying storage.
    Io(#[from] std::io::Error),
}

/// An error triggered while creating a new archive.
#[derive(Debug, Error)]
pub enum CreateError {
    #[error(transparent)]
    /// An IO error occurred while writing to the underlying storage.
    Io(#[from] std::io::Error),
}

/// An error triggered while parsing a previously written archive back (used for round-trip
/// testing; this is not a general-purpose ROOT reader).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file does not start with the expected magic number")]
    MismatchedMagic,

    #[error("key at {offset} claims fNbytes = {fnbytes} but fKeylen ({fkeylen}) + fObjlen ({fobjlen}) = {sum}")]
    KeySizeMismatch {
        offset: u64,
        fnbytes: i32,
        fkeylen: i16,
        fobjlen: i32,
        sum: i64,
    },

    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An error raised while planning a [`PartitionSet`](crate::planner::PartitionSet).
///
/// [`SchemaMismatch`](PlanError::MissingBranch)-family variants and
/// [`Unsatisfiable`](PlanError::Unsatisfiable) are fatal to the planning run that raised them;
/// [`IOFault`](PlanError::IOFault) is surfaced unchanged from the path opener or tree reader.
/// [`InternalInvariant`](PlanError::InternalInvariant) indicates a bug in this crate, not a
/// problem with the input.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("branch {branch:?} is present in {earlier:?} but missing from {later:?}")]
    MissingBranch {
        branch: String,
        earlier: String,
        later: String,
    },

    #[error("branch {branch:?} has dtype {earlier_dtype} in {earlier:?} but {later_dtype} in {later:?}")]
    DtypeMismatch {
        branch: String,
        earlier: String,
        earlier_dtype: String,
        later: String,
        later_dtype: String,
    },

    #[error("branch {branch:?} is counted by {earlier_counter:?} in {earlier:?} but has no counter in {later:?}")]
    MissingCounter {
        branch: String,
        earlier: String,
        earlier_counter: String,
        later: String,
    },

    #[error("branch {branch:?} is counted by {earlier_counter:?} in {earlier:?} but by {later_counter:?} in {later:?}")]
    CounterMismatch {
        branch: String,
        earlier: String,
        earlier_counter: String,
        later: String,
        later_counter: String,
    },

    #[error("branch {branch:?} starting at entry {entry} in {path:?} cannot satisfy the `under` constraint with a single basket")]
    Unsatisfiable {
        branch: String,
        entry: u64,
        path: String,
    },

    #[error("path enumeration or tree reading failed: {0}")]
    IOFault(#[source] std::io::Error),

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// An error raised while (de)serializing a [`PartitionSet`](crate::planner::PartitionSet).
#[derive(Debug, Error)]
pub enum PartitionSetJsonError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}
