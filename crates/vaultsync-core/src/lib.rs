//! Synchronization engine for vaultsync
//!
//! Keeps word-processor documents and plain-text vault files in step:
//!
//! - **Change detection**: compares current modification times with the
//!   watermarks stored per target path, confirmed by content fingerprints
//! - **Direction inference**: document → file, file → document, or nothing
//! - **Conflict classification**: both sides changed, logged for a human
//! - **State bookkeeping**: crash-safe persisted sync records
//!
//! # Architecture
//!
//! ```text
//!            vaultsync-cli
//!                  |
//!     Poller -> SyncEngine -> SyncStateStore / ConflictLog
//!                  |
//!   DocumentStore  FileStore  FormatConverter  MappingSource
//!                  |
//!       vaultsync-fs   vaultsync-content
//! ```

pub mod adapters;
pub mod config;
pub mod conflict;
pub mod error;
pub mod mapping;
pub mod model;
pub mod scheduler;
pub mod state;
pub mod sync;
pub mod time;

pub use adapters::{
    AdapterError, DocMetadata, DocumentStore, FileMetadata, FileStore, LocalDocumentStore,
    LocalFileStore,
};
pub use config::{MappingsConfig, SyncConfig};
pub use conflict::{ConflictLog, suggest_resolution};
pub use error::{Error, Result};
pub use mapping::{EnvMappings, MappingSource, StaticMappings, TableMappings, find_mapping};
pub use model::{ConflictEntry, Mapping, Resolution, SyncDirection, SyncRecord};
pub use scheduler::{PollSummary, Poller, Sleeper, StopHandle, ThreadSleeper};
pub use state::SyncStateStore;
pub use sync::{CycleReport, CycleSummary, MappingOutcome, MappingReport, SyncEngine};
pub use time::{Clock, MtimeTolerance, SystemClock, Timestamp};
