//! Deduplicating ranked set over scored items
//!
//! The building block behind the leaderboard caches:
//! - Array-backed binary max-heap ordered by score (O(log n) insert, O(1) peek)
//! - Companion id set for O(1) duplicate detection (first write wins)
//! - Strictly increasing arrival stamps for recency queries
//! - JSON snapshots that round-trip the backing array verbatim
//!
//! Queries (`top_by_score`, `top_by_recency`, `max_score_group`) never
//! mutate the heap; they sort a view of the current contents.

mod clock;
mod error;
mod heap;
mod item;
mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{RankedSetError, RankedSetResult};
pub use heap::RankedSet;
pub use item::{normalize_id, ScoredItem};
pub use snapshot::{RestoreReport, SnapshotStore};
