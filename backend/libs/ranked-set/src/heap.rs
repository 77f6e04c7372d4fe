use crate::clock::{Clock, SystemClock};
use crate::error::RankedSetResult;
use crate::item::ScoredItem;
use crate::snapshot::RestoreReport;
use std::collections::HashSet;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::warn;

/// Deduplicating, insertion-stamped max-heap over [`ScoredItem`]s.
///
/// Invariants:
/// - no two items share an `id`
/// - for every non-root index `i`, `score[parent(i)] >= score[i]`
/// - arrival stamps are strictly increasing in insertion order
#[derive(Clone)]
pub struct RankedSet {
    items: Vec<ScoredItem>,
    ids: HashSet<String>,
    last_arrival: i64,
    clock: Arc<dyn Clock>,
}

impl Default for RankedSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RankedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankedSet")
            .field("len", &self.items.len())
            .field("last_arrival", &self.last_arrival)
            .finish()
    }
}

impl RankedSet {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            items: Vec::new(),
            ids: HashSet::new(),
            last_arrival: 0,
            clock,
        }
    }

    /// Insert an item unless its id is already present.
    ///
    /// Returns `false` for a duplicate, in which case nothing changes.
    /// Otherwise the item is stamped with its arrival time, appended, and
    /// sifted up past every parent with a strictly lower score. Parents with
    /// an equal score are never displaced, so earlier items stay closer to
    /// the root on ties.
    pub fn insert(&mut self, mut item: ScoredItem) -> bool {
        if self.ids.contains(&item.id) {
            return false;
        }

        item.arrival_time = self.next_arrival();
        self.ids.insert(item.id.clone());
        self.items.push(item);
        self.sift_up(self.items.len() - 1);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// The current maximum, without removing it.
    pub fn peek(&self) -> Option<&ScoredItem> {
        self.items.first()
    }

    /// Items in backing-array (heap) order.
    pub fn iter(&self) -> impl Iterator<Item = &ScoredItem> {
        self.items.iter()
    }

    /// First `n` items of a stable descending sort by score.
    ///
    /// Ties keep their relative backing-array order. The heap is untouched.
    pub fn top_by_score(&self, n: usize) -> Vec<ScoredItem> {
        let mut view: Vec<&ScoredItem> = self.items.iter().collect();
        view.sort_by(|a, b| b.score.cmp(&a.score));
        view.into_iter().take(n).cloned().collect()
    }

    /// First `n` items by descending arrival stamp (most recent first).
    pub fn top_by_recency(&self, n: usize) -> Vec<ScoredItem> {
        let mut view: Vec<&ScoredItem> = self.items.iter().collect();
        view.sort_by(|a, b| b.arrival_time.cmp(&a.arrival_time));
        view.into_iter().take(n).cloned().collect()
    }

    /// Every item whose score equals the current maximum, in array order.
    pub fn max_score_group(&self) -> Vec<ScoredItem> {
        let Some(root) = self.items.first() else {
            return Vec::new();
        };
        let max = root.score;
        self.items
            .iter()
            .filter(|item| item.score == max)
            .cloned()
            .collect()
    }

    /// True when every parent scores at least as high as its children.
    pub fn is_heap_valid(&self) -> bool {
        (1..self.items.len()).all(|i| self.items[(i - 1) / 2].score >= self.items[i].score)
    }

    /// Backing array as pretty-printed JSON, in heap order.
    pub fn serialize(&self) -> RankedSetResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.items)?)
    }

    pub fn serialize_to<W: Write>(&self, writer: W) -> RankedSetResult<()> {
        serde_json::to_writer_pretty(writer, &self.items)?;
        Ok(())
    }

    /// Replace the contents with a previously serialized snapshot.
    ///
    /// On a decode error the set is left as it was. Repeated ids keep their
    /// first record. A snapshot that already satisfies the heap invariant is
    /// kept verbatim; otherwise it is re-heapified.
    pub fn restore(&mut self, bytes: &[u8]) -> RankedSetResult<RestoreReport> {
        let records: Vec<ScoredItem> = serde_json::from_slice(bytes)?;
        Ok(self.replace_with(records))
    }

    pub fn restore_from_reader<R: Read>(&mut self, reader: R) -> RankedSetResult<RestoreReport> {
        let records: Vec<ScoredItem> = serde_json::from_reader(reader)?;
        Ok(self.replace_with(records))
    }

    fn replace_with(&mut self, records: Vec<ScoredItem>) -> RestoreReport {
        let total = records.len();
        let mut ids = HashSet::with_capacity(total);
        let mut items = Vec::with_capacity(total);
        for record in records {
            if ids.insert(record.id.clone()) {
                items.push(record);
            }
        }

        self.items = items;
        self.ids = ids;

        let reheapified = !self.is_heap_valid();
        if reheapified {
            warn!(
                items = self.items.len(),
                "Snapshot violates heap order, rebuilding heap"
            );
            self.heapify();
        }

        let newest = self.items.iter().map(|item| item.arrival_time).max();
        if let Some(newest) = newest {
            self.last_arrival = self.last_arrival.max(newest);
        }

        RestoreReport {
            loaded: self.items.len(),
            duplicates_dropped: total - self.items.len(),
            reheapified,
        }
    }

    fn next_arrival(&mut self) -> i64 {
        let now = self.clock.now_millis();
        let stamp = if now > self.last_arrival {
            now
        } else {
            self.last_arrival + 1
        };
        self.last_arrival = stamp;
        stamp
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.items[parent].score >= self.items[index].score {
                break;
            }
            self.items.swap(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut largest = index;

            if left < len && self.items[left].score > self.items[largest].score {
                largest = left;
            }
            if right < len && self.items[right].score > self.items[largest].score {
                largest = right;
            }
            if largest == index {
                break;
            }
            self.items.swap(index, largest);
            index = largest;
        }
    }

    fn heapify(&mut self) {
        for index in (0..self.items.len() / 2).rev() {
            self.sift_down(index);
        }
    }
}
