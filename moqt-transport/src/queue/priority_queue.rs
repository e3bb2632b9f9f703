use std::sync::Arc;

use crate::tick::TickService;

use super::TimeQueue;

/// Counters reported by an outbound queue.
#[derive(Default, Clone, Copy, Debug, Eq, PartialEq)]
pub struct QueueMetrics {
    /// Pushes rejected because a band was at capacity.
    pub tx_buffer_drops: u64,

    /// Entries that aged out before being popped.
    pub tx_queue_expired: u64,

    /// Entries removed by an explicit clear.
    pub tx_queue_discards: u64,
}

/// `PRIORITIES` TTL-expiring FIFO bands; lower band index pops first.
///
/// Bands are created on first use. Within a band order is strictly FIFO by
/// enqueue; across bands the lowest-numbered non-empty band always wins.
pub struct PriorityQueue<T, const PRIORITIES: usize> {
    duration_ms: u64,
    interval_ms: u64,
    capacity: usize,
    tick: Arc<dyn TickService>,
    bands: [Option<TimeQueue<T>>; PRIORITIES],
    buffer_drops: u64,
    discards: u64,
}

impl<T, const PRIORITIES: usize> PriorityQueue<T, PRIORITIES> {
    /// `duration_ms` bounds entry TTLs, `interval_ms` is the expiry tick
    /// granularity, and `capacity` limits each band's stored entries.
    pub fn new(
        duration_ms: u64,
        interval_ms: u64,
        tick: Arc<dyn TickService>,
        capacity: usize,
    ) -> Self {
        Self {
            duration_ms,
            interval_ms,
            capacity,
            tick,
            bands: std::array::from_fn(|_| None),
            buffer_drops: 0,
            discards: 0,
        }
    }

    fn band(&mut self, priority: u8) -> &mut TimeQueue<T> {
        // Out-of-range priorities collapse into the lowest band.
        let index = (priority as usize).min(PRIORITIES - 1);
        let (duration_ms, interval_ms, capacity) = (self.duration_ms, self.interval_ms, self.capacity);
        let tick = self.tick.clone();
        self.bands[index]
            .get_or_insert_with(|| TimeQueue::new(duration_ms, interval_ms, tick, capacity))
    }

    /// Queue a value at the given priority with a TTL. Values that do not
    /// fit are dropped and counted.
    pub fn push(&mut self, priority: u8, value: T, ttl_ms: u64) {
        if self.band(priority).push(value, ttl_ms).is_err() {
            self.buffer_drops += 1;
            log::debug!("priority queue full, dropping entry: priority={}", priority);
        }
    }

    /// Remove and return the first live entry of the highest-priority
    /// non-empty band.
    pub fn pop_front(&mut self) -> Option<T> {
        for band in self.bands.iter_mut().flatten() {
            if let Some(value) = band.pop_front() {
                return Some(value);
            }
        }
        None
    }

    /// Discard the front entry.
    pub fn pop(&mut self) {
        let _ = self.pop_front();
    }

    /// Stored entries across all bands.
    pub fn size(&self) -> usize {
        self.bands
            .iter()
            .flatten()
            .map(|band| band.size())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.iter().flatten().all(|band| band.is_empty())
    }

    /// Drop everything, counting the entries as discards.
    pub fn clear(&mut self) {
        let mut discarded = 0;
        for band in self.bands.iter_mut().flatten() {
            discarded += band.clear() as u64;
        }
        self.discards += discarded;
    }

    pub fn metrics(&self) -> QueueMetrics {
        QueueMetrics {
            tx_buffer_drops: self.buffer_drops,
            tx_queue_expired: self
                .bands
                .iter()
                .flatten()
                .map(|band| band.expired_count())
                .sum(),
            tx_queue_discards: self.discards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick::MockTickService;

    #[test]
    fn push_pop_one_group() {
        let tick = Arc::new(MockTickService::new());
        let mut pq: PriorityQueue<Vec<u8>, 3> = PriorityQueue::new(30_000, 1, tick, 1000);

        for i in 0..500usize {
            let mut data = vec![0u8; 1000];
            data[..8].copy_from_slice(&(i as u64).to_le_bytes());
            pq.push((i / 15) as u8, data, 2000);
        }

        for i in 0..500usize {
            assert!(!pq.is_empty());
            let elem = pq.pop_front().unwrap();
            assert_eq!(u64::from_le_bytes(elem[..8].try_into().unwrap()), i as u64);
        }

        pq.pop();
        assert!(pq.is_empty());
    }

    #[test]
    fn push_pop_multi_group() {
        let tick = Arc::new(MockTickService::new());
        let mut pq: PriorityQueue<Vec<u8>, 3> = PriorityQueue::new(30_000, 1, tick, 1000);

        for i in 0..500usize {
            let mut data = vec![0u8; 1000];
            data[..8].copy_from_slice(&(i as u64).to_le_bytes());
            pq.push((i / 20) as u8, data, 2000);
        }

        for i in 0..500usize {
            assert!(!pq.is_empty());
            let elem = pq.pop_front().unwrap();
            assert_eq!(u64::from_le_bytes(elem[..8].try_into().unwrap()), i as u64);
        }

        pq.pop();
        assert!(pq.is_empty());
    }

    #[test]
    fn priority_bands_pop_in_order() {
        let tick = Arc::new(MockTickService::new());
        let mut pq: PriorityQueue<&'static str, 4> = PriorityQueue::new(10_000, 1, tick, 100);

        pq.push(2, "low-a", 2000);
        pq.push(0, "high-a", 2000);
        pq.push(2, "low-b", 2000);
        pq.push(1, "mid", 2000);
        pq.push(0, "high-b", 2000);

        assert_eq!(pq.pop_front(), Some("high-a"));
        assert_eq!(pq.pop_front(), Some("high-b"));
        assert_eq!(pq.pop_front(), Some("mid"));
        assert_eq!(pq.pop_front(), Some("low-a"));
        assert_eq!(pq.pop_front(), Some("low-b"));
        assert_eq!(pq.pop_front(), None);
    }

    #[test]
    fn expired_never_returned() {
        let tick = Arc::new(MockTickService::new());
        let mut pq: PriorityQueue<u32, 2> = PriorityQueue::new(10_000, 1, tick.clone(), 100);

        pq.push(0, 1, 50);
        pq.push(0, 2, 5000);
        pq.push(1, 3, 50);

        tick.advance(1000);

        assert_eq!(pq.pop_front(), Some(2));
        assert_eq!(pq.pop_front(), None);
        assert_eq!(pq.metrics().tx_queue_expired, 2);
    }

    #[test]
    fn drops_and_discards_counted() {
        let tick = Arc::new(MockTickService::new());
        let mut pq: PriorityQueue<u32, 2> = PriorityQueue::new(10_000, 1, tick, 2);

        pq.push(0, 1, 1000);
        pq.push(0, 2, 1000);
        pq.push(0, 3, 1000); // over capacity
        assert_eq!(pq.metrics().tx_buffer_drops, 1);

        pq.clear();
        assert_eq!(pq.metrics().tx_queue_discards, 2);
        assert!(pq.is_empty());
    }
}
