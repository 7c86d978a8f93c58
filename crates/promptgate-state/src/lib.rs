//! promptgate-state: storage layer for promptgate
//!
//! Defines the storage traits the engine is written against and the
//! in-memory backends that implement them.
//!
//! ## Key Components
//!
//! - `PromptStore`: prompt versions in creation order
//! - `ScoreStore`: latest evaluation record per version
//! - `SlotStore`: `staging` / `production` pointers with compare-and-set
//! - `StateSnapshot`: JSON capture of the memory backends
//! - `StateLock`: exclusive cross-process lock on a snapshot file

mod error;
pub mod lock;
pub mod memory;
pub mod snapshot;
pub mod storage_traits;

pub use error::StorageError;
pub use lock::StateLock;
pub use memory::{MemoryPromptStore, MemoryScoreStore, MemorySlotStore};
pub use snapshot::{StateSnapshot, SNAPSHOT_SCHEMA_VERSION};
pub use storage_traits::{
    ActiveSlots, BandCounts, ContentDigest, EvaluationRecord, EvaluationSummary, FixtureResult,
    PromptStore, PromptVersion, ScoreBand, ScoreStore, SlotStore, StorageResult, VersionId,
};
