use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock readings published as ticks.
///
/// Queues and caches take this as an explicit dependency so tests can inject
/// a deterministic source.
pub trait TickService: Send + Sync {
    fn milliseconds(&self) -> u64;
    fn microseconds(&self) -> u64;
}

/// Tick service backed by a single updater thread.
///
/// The thread samples a monotonic clock and publishes elapsed time through
/// atomics; readers only perform an atomic load.
pub struct ThreadedTickService {
    millis: Arc<AtomicU64>,
    micros: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    updater: Option<thread::JoinHandle<()>>,
}

impl ThreadedTickService {
    pub fn new() -> Self {
        let millis = Arc::new(AtomicU64::new(0));
        let micros = Arc::new(AtomicU64::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let updater = {
            let millis = millis.clone();
            let micros = micros.clone();
            let stop = stop.clone();

            thread::spawn(move || {
                let start = Instant::now();
                while !stop.load(Ordering::Relaxed) {
                    let elapsed = start.elapsed();
                    micros.store(elapsed.as_micros() as u64, Ordering::Release);
                    millis.store(elapsed.as_millis() as u64, Ordering::Release);
                    thread::sleep(Duration::from_micros(500));
                }
            })
        };

        Self {
            millis,
            micros,
            stop,
            updater: Some(updater),
        }
    }
}

impl Default for ThreadedTickService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadedTickService {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(updater) = self.updater.take() {
            let _ = updater.join();
        }
    }
}

impl TickService for ThreadedTickService {
    fn milliseconds(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }

    fn microseconds(&self) -> u64 {
        self.micros.load(Ordering::Acquire)
    }
}

/// Manually-driven tick source for tests.
#[derive(Default)]
pub struct MockTickService {
    millis: AtomicU64,
}

impl MockTickService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_milliseconds(&self, ms: u64) {
        self.millis.store(ms, Ordering::Release);
    }

    pub fn advance(&self, ms: u64) {
        self.millis.fetch_add(ms, Ordering::AcqRel);
    }
}

impl TickService for MockTickService {
    fn milliseconds(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }

    fn microseconds(&self) -> u64 {
        self.milliseconds() * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threaded_ticks_advance() {
        let tick = ThreadedTickService::new();

        let start_ms = tick.milliseconds();
        let start_us = tick.microseconds();
        thread::sleep(Duration::from_millis(5));

        // Allow generous scheduling variance; only monotonic progress matters.
        assert!(tick.milliseconds() >= start_ms);
        assert!(tick.microseconds() > start_us);
    }

    #[test]
    fn mock_is_deterministic() {
        let tick = MockTickService::new();
        assert_eq!(tick.milliseconds(), 0);

        tick.set_milliseconds(100);
        assert_eq!(tick.milliseconds(), 100);
        assert_eq!(tick.microseconds(), 100_000);

        tick.advance(50);
        assert_eq!(tick.milliseconds(), 150);
    }
}
