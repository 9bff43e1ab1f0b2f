use std::time::Duration;

use serde::Serialize;

use crate::{
    cache::{CacheStats, IsCache},
    config::Config,
    error::Result,
    replace::AccessResult,
    trace::{Access, AccessKind},
};

/// Run-wide counters, bumped once per access.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GlobalCounters {
    pub reads: u64,
    pub writes: u64,
}

impl GlobalCounters {
    pub fn accesses(&self) -> u64 {
        self.reads + self.writes
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Report {
    pub reads: u64,
    pub writes: u64,
    /// Wall-clock time spent replaying the trace, zero until `timed` is called.
    pub duration_ms: u64,
    pub levels: Vec<CacheStats>,
}

impl Report {
    pub fn timed(mut self, elapsed: Duration) -> Self {
        self.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// Ordered cache levels driven strictly one access at a time.
pub struct Hierarchy {
    caches: Vec<Box<dyn IsCache>>,
    counters: GlobalCounters,
}

impl Hierarchy {
    pub fn new(caches: Vec<Box<dyn IsCache>>) -> Self {
        Hierarchy {
            caches,
            counters: GlobalCounters::default(),
        }
    }

    pub fn from_config(config: Config) -> Result<Self> {
        Ok(Hierarchy::new(config.to_caches()?))
    }

    pub fn levels(&self) -> &[Box<dyn IsCache>] {
        &self.caches
    }

    pub fn counters(&self) -> &GlobalCounters {
        &self.counters
    }

    /// Resolves one access across the levels. Returns the index of the level
    /// that hit, or `None` when it went all the way to memory. Every level
    /// that misses is filled on the way down.
    pub fn access(&mut self, access: Access) -> Option<usize> {
        match access.kind {
            AccessKind::Load => self.counters.reads += 1,
            AccessKind::Store => self.counters.writes += 1,
        }

        for (level, cache) in self.caches.iter_mut().enumerate() {
            let addr = cache.split_addr(access.addr);
            match cache.locate(&addr) {
                Some(slot) => {
                    cache.hit();
                    cache.update(&access, slot, AccessResult::Hit);
                    return Some(level);
                }
                None => {
                    cache.miss();
                    let slot = cache.victim(&addr);
                    cache.insert(&access, &addr, slot);
                    cache.update(&access, slot, AccessResult::Miss);
                }
            }
        }
        None
    }

    /// Ends the run: anything still buffered in a level is written back.
    pub fn finish(&mut self) {
        self.caches.iter_mut().for_each(|c| c.drain());
    }

    pub fn clear_stats(&mut self) {
        self.counters = GlobalCounters::default();
        self.caches.iter_mut().for_each(|c| c.clear_stats());
    }

    pub fn report(&self) -> Report {
        Report {
            reads: self.counters.reads,
            writes: self.counters.writes,
            duration_ms: 0,
            levels: self.caches.iter().map(|c| c.make_stats()).collect(),
        }
    }
}
