//! Shared test utilities for the vaultsync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`stores`]: in-memory document and file stores with failure injection
//! - [`time`]: [`ManualClock`](time::ManualClock), [`ManualSleeper`](time::ManualSleeper)
//!   and fixed timestamps
//! - [`workspace`]: [`TestWorkspace`](workspace::TestWorkspace), a temporary
//!   docs/vault layout for the local adapters

pub mod stores;
pub mod time;
pub mod workspace;

pub use stores::{Failure, MemoryDocumentStore, MemoryFileStore};
pub use time::{ManualClock, ManualSleeper, ts};
pub use workspace::TestWorkspace;
