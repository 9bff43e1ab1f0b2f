//! Sectored write-back LRU (`upgradedLRU`).
//!
//! Every block is split into `block_size / sector_size` sectors that are
//! filled, dirtied and written back independently. Dirty data leaves the
//! cache through a [`WriteBuffer`] that coalesces writes to the same address
//! and is flushed to memory once it holds more than its threshold.
//!
//! Sector life cycle: invalid -> clean (fill by load) -> dirty (store) ->
//! staged in the write buffer when its slot is reused -> invalid.

use crate::{
    cache::{alloc_with, Addr, CacheStats, Counters, Geometry, IsCache},
    error::{Error, Result},
    replace::{min_way, AccessResult},
    trace::{Access, AccessKind},
    write_buffer::WriteBuffer,
};

pub const DEFAULT_SECTOR_SIZE: usize = 16;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sector {
    pub valid: bool,
    pub dirty: bool,
    pub tag: usize,
    /// Address that last filled or wrote this sector. Write-backs are keyed by it.
    pub origin: usize,
}

#[derive(Debug)]
pub struct SectoredCache {
    name: String,
    index: usize,
    geom: Geometry,
    sector_size: usize,
    n_sectors: usize,
    sectors: Vec<Sector>,
    last_used: Vec<u64>,
    clock: u64,
    write_buffer: WriteBuffer,
    counters: Counters,
}

impl SectoredCache {
    pub const NAME: &'static str = "upgradedLRU";

    pub fn new(
        name: String,
        index: usize,
        geom: Geometry,
        sector_size: usize,
        flush_threshold: usize,
    ) -> Result<Self> {
        if !sector_size.is_power_of_two() || sector_size > geom.block_size {
            return Err(Error::SectorSize {
                level: index + 1,
                sector_size,
                block_size: geom.block_size,
            });
        }
        let n_sectors = geom.block_size / sector_size;
        let len = geom.n_blocks() * n_sectors;
        let sectors = alloc_with(index, len, Sector::default)?;
        let last_used = alloc_with(index, len, || 0)?;
        tracing::debug!(
            cache = %name,
            policy = Self::NAME,
            sets = geom.n_sets,
            ways = geom.n_ways,
            sectors = n_sectors,
            flush_threshold,
            "built cache level"
        );
        Ok(SectoredCache {
            name,
            index,
            geom,
            sector_size,
            n_sectors,
            sectors,
            last_used,
            clock: 0,
            write_buffer: WriteBuffer::new(flush_threshold),
            counters: Counters::default(),
        })
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn write_buffer(&self) -> &WriteBuffer {
        &self.write_buffer
    }

    pub fn sectors(&self, slot: usize) -> &[Sector] {
        let base = slot * self.n_sectors;
        &self.sectors[base..base + self.n_sectors]
    }

    fn sector_of(&self, addr: &Addr) -> usize {
        addr.offset / self.sector_size
    }

    fn sector_index(&self, slot: usize, sector: usize) -> usize {
        slot * self.n_sectors + sector
    }

    /// Stamp of the most recently touched valid sector in the block.
    fn recency(&self, slot: usize) -> u64 {
        let base = slot * self.n_sectors;
        (base..base + self.n_sectors)
            .filter(|&i| self.sectors[i].valid)
            .map(|i| self.last_used[i])
            .max()
            .unwrap_or(0)
    }

    /// Writes every pending entry back to memory, one access each.
    pub fn flush_write_buffer(&mut self) {
        let flushed = self.write_buffer.drain();
        self.counters.memory_accesses += flushed as u64;
        tracing::debug!(cache = %self.name, flushed, "flushed write buffer");
    }
}

impl IsCache for SectoredCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn policy(&self) -> &'static str {
        Self::NAME
    }

    fn geometry(&self) -> &Geometry {
        &self.geom
    }

    fn split_addr(&self, addr: usize) -> Addr {
        self.geom.split(addr)
    }

    fn locate(&self, addr: &Addr) -> Option<usize> {
        let sector = self.sector_of(addr);
        self.geom.set_range(addr.set).find(|&slot| {
            let s = &self.sectors[self.sector_index(slot, sector)];
            s.valid && s.tag == addr.tag
        })
    }

    /// A block already holding sectors of `addr.tag` takes the missing sector,
    /// so one tag never spreads across ways. Otherwise an empty block, then
    /// the least recently touched one.
    fn victim(&mut self, addr: &Addr) -> usize {
        let set_range = self.geom.set_range(addr.set);
        if let Some(slot) = set_range
            .clone()
            .find(|&slot| self.sectors(slot).iter().any(|s| s.valid && s.tag == addr.tag))
        {
            return slot;
        }
        if let Some(slot) = set_range
            .clone()
            .find(|&slot| !self.sectors[self.sector_index(slot, 0)].valid)
        {
            return slot;
        }
        set_range.start + min_way(set_range.map(|slot| self.recency(slot)))
    }

    fn insert(&mut self, access: &Access, addr: &Addr, slot: usize) {
        debug_assert!(self.geom.set_range(addr.set).contains(&slot));
        let idx = self.sector_index(slot, self.sector_of(addr));

        let old = self.sectors[idx];
        if old.valid && old.dirty {
            let coalesced = self.write_buffer.stage(old.origin, old.tag);
            tracing::trace!(
                cache = %self.name,
                slot,
                origin = old.origin,
                coalesced,
                "staged dirty sector"
            );
            self.sectors[idx] = Sector::default();
        }

        // Anything already pending in the buffer is served from there
        if !self.write_buffer.contains(access.addr) {
            self.counters.memory_accesses += 1;
        }

        let dirty = access.kind == AccessKind::Store;
        self.sectors[idx] = Sector {
            valid: true,
            dirty,
            tag: addr.tag,
            origin: access.addr,
        };
        if dirty {
            self.write_buffer.stage(access.addr, addr.tag);
        }
    }

    fn update(&mut self, access: &Access, slot: usize, result: AccessResult) {
        if result == AccessResult::Hit && access.kind == AccessKind::Store {
            let addr = self.geom.split(access.addr);
            let idx = self.sector_index(slot, self.sector_of(&addr));
            let sector = &mut self.sectors[idx];
            sector.dirty = true;
            sector.origin = access.addr;
            self.write_buffer.stage(access.addr, addr.tag);
        }

        self.clock += 1;
        let base = slot * self.n_sectors;
        for i in base..base + self.n_sectors {
            if self.sectors[i].valid {
                self.last_used[i] = self.clock;
            }
        }

        if self.write_buffer.over_threshold() {
            self.flush_write_buffer();
        }
    }

    fn drain(&mut self) {
        if !self.write_buffer.is_empty() {
            self.flush_write_buffer();
        }
    }

    fn hit(&mut self) {
        self.counters.hits += 1;
    }

    fn miss(&mut self) {
        self.counters.misses += 1;
    }

    fn clear_stats(&mut self) {
        self.counters = Counters::default();
    }

    fn make_stats(&self) -> CacheStats {
        CacheStats::new(&self.name, self.index, Self::NAME, &self.counters)
    }
}
