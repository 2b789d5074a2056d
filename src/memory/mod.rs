//! Process-wide tier-based memory pressure regulator. Ticks every 30s,
//! classifies heap usage against four thresholds derived from `highMB`, and
//! broadcasts the tier to subscribers over a `watch` channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info};

const TICK_INTERVAL: Duration = Duration::from_secs(30);
const GC_HINT_COOLDOWN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pressure {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Pressure {
    /// Tier boundaries: LOW below `0.3H`, MEDIUM in `[0.3H, 0.6H)`, HIGH in
    /// `[0.6H, H)`, CRITICAL at or above `H`.
    fn classify(heap_mb: f64, high_mb: u64) -> Self {
        let h = high_mb as f64;
        if heap_mb >= h {
            Pressure::Critical
        } else if heap_mb >= 0.6 * h {
            Pressure::High
        } else if heap_mb >= 0.3 * h {
            Pressure::Medium
        } else {
            Pressure::Low
        }
    }
}

/// `pressure → {chunk, toolCall, lineBuffer}` pool-size tier table.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PoolSizes {
    pub chunk: usize,
    pub tool_call: usize,
    pub line_buffer: usize,
}

fn pool_sizes_for(pressure: Pressure) -> PoolSizes {
    match pressure {
        Pressure::Low => PoolSizes { chunk: 256, tool_call: 64, line_buffer: 128 },
        Pressure::Medium => PoolSizes { chunk: 128, tool_call: 32, line_buffer: 64 },
        Pressure::High => PoolSizes { chunk: 32, tool_call: 8, line_buffer: 16 },
        Pressure::Critical => PoolSizes { chunk: 4, tool_call: 1, line_buffer: 4 },
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MemoryReport {
    pub pressure: Pressure,
    pub heap_mb: f64,
    pub peak_heap_mb: f64,
    pub cleanup_count: u64,
    pub pool_sizes: PoolSizes,
}

struct Inner {
    high_mb: u64,
    tx: watch::Sender<Pressure>,
    peak_heap_kb: AtomicU64,
    cleanup_count: AtomicU64,
    last_heap_kb: AtomicU64,
}

/// Cloneable handle: subscribe to pressure changes, or pull a point-in-time report.
#[derive(Clone)]
pub struct MemoryRegulator {
    inner: Arc<Inner>,
}

impl MemoryRegulator {
    pub fn new(high_mb: u64) -> Self {
        let (tx, _rx) = watch::channel(Pressure::Low);
        Self {
            inner: Arc::new(Inner {
                high_mb,
                tx,
                peak_heap_kb: AtomicU64::new(0),
                cleanup_count: AtomicU64::new(0),
                last_heap_kb: AtomicU64::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Pressure> {
        self.inner.tx.subscribe()
    }

    pub fn report(&self) -> MemoryReport {
        let heap_kb = self.inner.last_heap_kb.load(Ordering::Relaxed);
        let heap_mb = heap_kb as f64 / 1024.0;
        let pressure = *self.inner.tx.borrow();
        MemoryReport {
            pressure,
            heap_mb,
            peak_heap_mb: self.inner.peak_heap_kb.load(Ordering::Relaxed) as f64 / 1024.0,
            cleanup_count: self.inner.cleanup_count.load(Ordering::Relaxed),
            pool_sizes: pool_sizes_for(pressure),
        }
    }

    /// Spawns the 30s tick loop on the current Tokio runtime. Returns
    /// immediately; the loop runs for the process lifetime.
    pub fn spawn_ticker(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            let mut last_gc_hint: Option<Instant> = None;
            loop {
                ticker.tick().await;
                this.tick(&mut last_gc_hint);
            }
        });
    }

    fn tick(&self, last_gc_hint: &mut Option<Instant>) {
        let Some(usage) = memory_stats::memory_stats() else {
            debug!("memory stats unavailable on this platform, skipping tick");
            return;
        };
        let heap_kb = (usage.physical_mem / 1024) as u64;
        self.inner.last_heap_kb.store(heap_kb, Ordering::Relaxed);
        self.inner.peak_heap_kb.fetch_max(heap_kb, Ordering::Relaxed);

        let heap_mb = heap_kb as f64 / 1024.0;
        let next = Pressure::classify(heap_mb, self.inner.high_mb);
        let prev = *self.inner.tx.borrow();

        if next != prev {
            info!(?prev, ?next, heap_mb, "memory pressure tier changed");
            self.inner.cleanup_count.fetch_add(1, Ordering::Relaxed);
            let _ = self.inner.tx.send(next);
        }

        let now = Instant::now();
        match next {
            Pressure::High => {
                let should_hint = last_gc_hint.is_none_or(|t| now.duration_since(t) >= GC_HINT_COOLDOWN);
                if should_hint {
                    *last_gc_hint = Some(now);
                    gc_hint();
                }
            }
            Pressure::Critical => {
                *last_gc_hint = Some(now);
                gc_hint();
            }
            Pressure::Low | Pressure::Medium => {}
        }
    }
}

fn gc_hint() {
    // mimalloc doesn't expose a forced-collect hook; this is a no-op placeholder
    // for allocators that do (jemalloc's purge, etc).
    debug!("gc hint requested");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_follows_tier_thresholds() {
        assert_eq!(Pressure::classify(25.0, 100), Pressure::Low);
        assert_eq!(Pressure::classify(50.0, 100), Pressure::Medium);
        assert_eq!(Pressure::classify(80.0, 100), Pressure::High);
        assert_eq!(Pressure::classify(100.0, 100), Pressure::Critical);
        assert_eq!(Pressure::classify(110.0, 100), Pressure::Critical);
    }

    #[test]
    fn pressure_cascade_matches_scenario() {
        let high_mb = 100;
        let readings = [25.0, 50.0, 80.0, 110.0];
        let expected = [Pressure::Low, Pressure::Medium, Pressure::High, Pressure::Critical];
        for (reading, exp) in readings.iter().zip(expected.iter()) {
            assert_eq!(Pressure::classify(*reading, high_mb), *exp);
        }
    }

    #[test]
    fn report_reflects_subscribed_pressure() {
        let regulator = MemoryRegulator::new(100);
        assert_eq!(regulator.report().pressure, Pressure::Low);
    }
}
