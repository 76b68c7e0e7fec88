//! Memory subsystem for Mentat.
//!
//! Two complementary stores back retrieval:
//! - the [`FactStore`]: an append-only list of timestamped facts with
//!   keyword relevance scoring, and
//! - the [`VectorIndex`]: a fixed-dimension flat nearest-neighbor store
//!   with parallel metadata, plus neighbor-based context expansion.
//!
//! Both are process-wide, shared by reference across requests, and mutated
//! only through their own append/add operations. Persistence is local-file
//! snapshotting with size-based rotation.

pub mod expand;
pub mod facts;
pub mod ingest;
pub mod snapshot;
pub mod vector;

pub use expand::{ExpandedContext, deep_link, expand_with_neighbors};
pub use facts::{FactQuery, FactStore, MemoryFact};
pub use ingest::{IngestState, IngestStatus, IngestTracker, RawSegment, group_segments};
pub use snapshot::{MemorySnapshot, SnapshotStore};
pub use vector::{SearchHit, VectorIndex, VectorRecord};
