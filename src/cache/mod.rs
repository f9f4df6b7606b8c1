//! Local persistent cache for instant display before the remote store answers.
//!
//! This module provides a small slot-based store that:
//! - Keeps one serialized value per named slot
//! - Never fails observably (errors are logged and read as a miss)
//! - Backs the project collection through `ProjectCache`

mod layer;
mod storage;
mod traits;

pub use layer::ProjectCache;
pub use storage::{MemoryCache, NoopCache, SqliteCache};
pub use traits::LocalCache;
