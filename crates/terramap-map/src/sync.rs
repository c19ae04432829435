//! Hash-manifest synchronization between the world side and the storage side.
//!
//! Both sides describe what they know as a list of [`ChunkHashRecord`](terramap_core::ChunkHashRecord)s. Whoever receives
//! the other side's manifest computes the transfer set (chunks it has that the other side lacks or holds with a different
//! hash) and only those chunks travel as full summaries. Every transfer is an idempotent upsert, so duplicated or reordered
//! delivery only costs bandwidth.

mod agent;
mod diff;
mod message;
mod transport;

pub use agent::SyncAgent;
pub use diff::*;
pub use message::*;
pub use transport::*;
