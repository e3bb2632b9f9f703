use std::collections::VecDeque;
use std::sync::Arc;

use crate::tick::TickService;

/// A FIFO whose entries carry a time-to-live.
///
/// Storage is a ring of buckets indexed by expiry tick: a push with TTL `t`
/// lands in bucket `(now + t) % capacity`, so a whole bucket of entries ages
/// out together when its tick passes. A side FIFO preserves pop order across
/// buckets. Expired entries are never returned; they are skipped and counted.
pub struct TimeQueue<T> {
    interval_ms: u64,
    total_buckets: usize,
    buckets: Vec<Bucket<T>>,

    /// Pop order across buckets.
    fifo: VecDeque<QueueItem>,

    /// Entries currently stored (live or lazily expired).
    stored: usize,

    capacity: usize,
    tick: Arc<dyn TickService>,
    expired: u64,
}

struct Bucket<T> {
    /// The absolute tick at which this bucket's entries expire.
    expiry_tick: u64,
    slots: Vec<Option<T>>,
}

struct QueueItem {
    bucket: usize,
    slot: usize,
    expiry_tick: u64,
}

impl<T> TimeQueue<T> {
    /// `duration_ms` is the maximum TTL the queue can hold, `interval_ms` the
    /// bucket granularity, and `capacity` the maximum number of stored entries.
    pub fn new(
        duration_ms: u64,
        interval_ms: u64,
        tick: Arc<dyn TickService>,
        capacity: usize,
    ) -> Self {
        let interval_ms = interval_ms.max(1);
        // At least two buckets so a TTL of one tick has somewhere to land.
        let total_buckets = (duration_ms / interval_ms).max(2) as usize;

        let buckets = (0..total_buckets)
            .map(|_| Bucket {
                expiry_tick: 0,
                slots: Vec::new(),
            })
            .collect();

        Self {
            interval_ms,
            total_buckets,
            buckets,
            fifo: VecDeque::new(),
            stored: 0,
            capacity,
            tick,
            expired: 0,
        }
    }

    fn now_tick(&self) -> u64 {
        self.tick.milliseconds() / self.interval_ms
    }

    /// Push a value that expires `ttl_ms` from now.
    ///
    /// Returns the value back if the queue is at capacity; the caller decides
    /// whether that is a drop worth counting.
    pub fn push(&mut self, value: T, ttl_ms: u64) -> Result<(), T> {
        if self.stored >= self.capacity {
            return Err(value);
        }

        let ttl_ticks = (ttl_ms / self.interval_ms).clamp(1, self.total_buckets as u64 - 1);
        let expiry_tick = self.now_tick() + ttl_ticks;
        let index = (expiry_tick % self.total_buckets as u64) as usize;

        let bucket = &mut self.buckets[index];
        if bucket.expiry_tick != expiry_tick {
            // Recycled from a previous ring cycle; whatever is left is long expired.
            let stale = bucket.slots.iter().filter(|slot| slot.is_some()).count();
            self.stored -= stale;
            self.expired += stale as u64;
            bucket.slots.clear();
            bucket.expiry_tick = expiry_tick;
        }

        let slot = bucket.slots.len();
        bucket.slots.push(Some(value));
        self.fifo.push_back(QueueItem {
            bucket: index,
            slot,
            expiry_tick,
        });
        self.stored += 1;

        Ok(())
    }

    /// Remove and return the oldest live entry, skipping and counting any
    /// whose TTL has lapsed.
    pub fn pop_front(&mut self) -> Option<T> {
        let now = self.now_tick();

        while let Some(item) = self.fifo.pop_front() {
            let bucket = &mut self.buckets[item.bucket];
            if bucket.expiry_tick != item.expiry_tick {
                // The bucket was recycled; this entry was dropped there.
                continue;
            }

            let value = match bucket.slots[item.slot].take() {
                Some(value) => value,
                None => continue,
            };
            self.stored -= 1;

            if item.expiry_tick < now {
                self.expired += 1;
                continue;
            }

            return Some(value);
        }

        None
    }

    /// Discard the front entry.
    pub fn pop(&mut self) {
        let _ = self.pop_front();
    }

    pub fn size(&self) -> usize {
        self.stored
    }

    pub fn is_empty(&self) -> bool {
        self.stored == 0
    }

    /// Drop every stored entry, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.stored;
        for bucket in &mut self.buckets {
            bucket.slots.clear();
        }
        self.fifo.clear();
        self.stored = 0;
        discarded
    }

    /// Cumulative count of entries that aged out instead of being popped.
    pub fn expired_count(&self) -> u64 {
        self.expired
    }
}
