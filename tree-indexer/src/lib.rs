//! Working-tree indexing and dual-branch structural diffing.
//!
//! Two public entrypoints:
//! - [`build_index`] walks one working tree into a [`RepositoryIndex`]
//!   (file set, per-file metadata, content hashes, language/extension maps,
//!   aggregate stats), consulting the cache first.
//! - [`build_dual_indices`] builds both branch indices (in parallel by
//!   default) and derives the branch diff: added / removed / modified /
//!   unchanged plus a move relation detected by content-hash equality,
//!   a per-path cross-reference, and an impact score.
//!
//! Determinism notes:
//! - All maps are `BTreeMap`, so walks and serialized forms are stable.
//! - Move detection under duplicate content hashes picks the first
//!   candidate in ascending path order, and consumes the main-side path
//!   before add/remove processing.

pub mod errors;
pub mod languages;
pub mod types;

mod dual;
mod indexer;
mod walk;

pub use dual::{BranchSource, DualIndexOptions, build_dual_indices};
pub use errors::{IndexError, IndexResult};
pub use indexer::{
    IndexOptions, IndexRequest, UNKNOWN_COMMIT, build_index, build_index_blocking,
};
pub use types::{
    BranchDiff, ChangeStatus, CrossRef, DiffTotals, DualIndices, FileMeta, IndexStats,
    RepositoryIndex,
};
