use std::{
    iter,
    ops::{Not, Range},
};

use serde::Serialize;

use crate::{
    error::{Error, Result},
    replace::{AccessResult, MakeS, Replace},
    trace::Access,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub offset: usize,
    pub set: usize,
    pub tag: usize,
}

#[derive(Debug, Clone)]
pub struct BitSection {
    shift: usize,
    mask: usize,
}

impl BitSection {
    fn apply(&self, num: usize) -> usize {
        (num >> self.shift) & self.mask
    }

    fn place(&self, field: usize) -> usize {
        (field & self.mask) << self.shift
    }
}

/// Validated shape of one cache level and the address split it implies.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub size: usize,
    pub block_size: usize,
    pub n_ways: usize,
    pub n_sets: usize,
    pub offset_bits: u32,
    pub index_bits: u32,
    offset_sec: BitSection,
    set_sec: BitSection,
    tag_sec: BitSection,
}

fn check_pow2(index: usize, field: &'static str, value: usize) -> Result<()> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(Error::NotPowerOfTwo {
            level: index + 1,
            field,
            value,
        })
    }
}

impl Geometry {
    /// `index` is the 0-based position of the level in the hierarchy and is
    /// only used to label errors.
    pub fn new(index: usize, size: usize, block_size: usize, n_ways: usize) -> Result<Self> {
        check_pow2(index, "block size", block_size)?;
        check_pow2(index, "associativity", n_ways)?;

        let mismatch = || Error::SizeMismatch {
            level: index + 1,
            size,
            block_size,
            ways: n_ways,
        };
        let stride = block_size.checked_mul(n_ways).ok_or_else(mismatch)?;
        if size == 0 || size % stride != 0 {
            return Err(mismatch());
        }
        let n_sets = size / stride;
        check_pow2(index, "number of sets", n_sets)?;

        let offset_bits = block_size.ilog2();
        let index_bits = n_sets.ilog2();

        let offset_sec = BitSection {
            shift: 0,
            mask: block_size - 1,
        };
        let set_sec = BitSection {
            shift: offset_bits as usize,
            mask: n_sets - 1,
        };
        let tag_sec = BitSection {
            shift: (offset_bits + index_bits) as usize,
            mask: 0usize.not(),
        };

        Ok(Geometry {
            size,
            block_size,
            n_ways,
            n_sets,
            offset_bits,
            index_bits,
            offset_sec,
            set_sec,
            tag_sec,
        })
    }

    pub fn split(&self, addr: usize) -> Addr {
        Addr {
            offset: self.offset_sec.apply(addr),
            set: self.set_sec.apply(addr),
            tag: self.tag_sec.apply(addr),
        }
    }

    /// Inverse of [`Geometry::split`].
    pub fn join(&self, addr: &Addr) -> usize {
        self.tag_sec.place(addr.tag) | self.set_sec.place(addr.set) | self.offset_sec.place(addr.offset)
    }

    pub fn set_range(&self, set: usize) -> Range<usize> {
        set * self.n_ways..(set + 1) * self.n_ways
    }

    pub fn n_blocks(&self) -> usize {
        self.n_sets * self.n_ways
    }
}

/// Allocates `len` entries up front, failing instead of aborting when the
/// allocator cannot satisfy the request.
pub(crate) fn alloc_with<T>(index: usize, len: usize, f: impl FnMut() -> T) -> Result<Vec<T>> {
    let mut entries = Vec::new();
    entries
        .try_reserve_exact(len)
        .map_err(|source| Error::Allocation {
            level: index + 1,
            entries: len,
            source,
        })?;
    entries.extend(iter::repeat_with(f).take(len));
    Ok(entries)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub memory_accesses: u64,
}

impl Counters {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub name: String,
    pub level: usize,
    pub policy: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub memory_accesses: u64,
}

impl CacheStats {
    pub(crate) fn new(name: &str, level: usize, policy: &'static str, counters: &Counters) -> Self {
        CacheStats {
            name: name.to_owned(),
            level,
            policy,
            hits: counters.hits,
            misses: counters.misses,
            hit_rate: counters.hit_rate(),
            memory_accesses: counters.memory_accesses,
        }
    }
}

/// One level of the hierarchy as the controller sees it. Slots are global
/// block positions, always inside the window of the set they were found in.
pub trait IsCache {
    fn name(&self) -> &str;
    fn policy(&self) -> &'static str;
    fn geometry(&self) -> &Geometry;
    fn split_addr(&self, addr: usize) -> Addr;
    fn locate(&self, addr: &Addr) -> Option<usize>;
    fn victim(&mut self, addr: &Addr) -> usize;
    fn insert(&mut self, access: &Access, addr: &Addr, slot: usize);
    fn update(&mut self, access: &Access, slot: usize, result: AccessResult);
    /// Pushes out anything still pending at the end of a run.
    fn drain(&mut self) {}
    fn hit(&mut self);
    fn miss(&mut self);
    fn clear_stats(&mut self);
    fn make_stats(&self) -> CacheStats;
}

#[derive(Debug)]
pub struct Cache<S: MakeS, B: Default, R: Replace<S, B>> {
    name: String,
    index: usize,
    geom: Geometry,
    pub blocks: Vec<Block<B>>,
    pub set_data: Vec<S>,
    pub repl: R,
    counters: Counters,
}

impl<S: MakeS, B: Default, R: Replace<S, B>> Cache<S, B, R> {
    pub fn new(name: String, index: usize, geom: Geometry, repl: R) -> Result<Self> {
        let n_ways = geom.n_ways;
        let blocks = alloc_with(index, geom.n_blocks(), Block::default)?;
        let set_data = alloc_with(index, geom.n_sets, || S::new(n_ways))?;
        tracing::debug!(
            cache = %name,
            policy = R::NAME,
            sets = geom.n_sets,
            ways = n_ways,
            block_size = geom.block_size,
            "built cache level"
        );
        Ok(Cache {
            name,
            index,
            geom,
            blocks,
            set_data,
            repl,
            counters: Counters::default(),
        })
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }
}

impl<S: MakeS, B: Default, R: Replace<S, B>> IsCache for Cache<S, B, R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn policy(&self) -> &'static str {
        R::NAME
    }

    fn geometry(&self) -> &Geometry {
        &self.geom
    }

    fn split_addr(&self, addr: usize) -> Addr {
        self.geom.split(addr)
    }

    fn locate(&self, addr: &Addr) -> Option<usize> {
        let set_range = self.geom.set_range(addr.set);
        let start = set_range.start;
        self.blocks[set_range]
            .iter()
            .position(|b| b.valid && b.tag == addr.tag)
            .map(|way| start + way)
    }

    fn victim(&mut self, addr: &Addr) -> usize {
        let set_range = self.geom.set_range(addr.set);
        let start = set_range.start;
        let set_slice = &mut self.blocks[set_range];
        let vacant = set_slice.iter().position(|b| !b.valid);
        let way = match vacant {
            // Empty block, no eviction needed
            Some(way) => way,
            None => self.repl.victim(&mut self.set_data[addr.set], set_slice),
        };
        start + way
    }

    fn insert(&mut self, _access: &Access, addr: &Addr, slot: usize) {
        debug_assert!(self.geom.set_range(addr.set).contains(&slot));
        let block = &mut self.blocks[slot];
        if block.valid {
            tracing::trace!(
                cache = %self.name,
                set = addr.set,
                evicted = block.tag,
                inserted = addr.tag,
                "evict"
            );
        }
        block.apply(addr);
        self.counters.memory_accesses += 1;
    }

    fn update(&mut self, _access: &Access, slot: usize, result: AccessResult) {
        let set = slot / self.geom.n_ways;
        let way = slot % self.geom.n_ways;
        let set_range = self.geom.set_range(set);
        self.repl.touch(
            &mut self.set_data[set],
            &mut self.blocks[set_range],
            way,
            result,
        );
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
        CacheStats::new(&self.name, self.index, R::NAME, &self.counters)
    }
}

#[derive(Debug, Default)]
pub struct Block<B: Default> {
    pub valid: bool,
    pub tag: usize,

    // Replace Data
    pub repl_block: B,
}

impl<B: Default> Block<B> {
    pub fn apply(&mut self, addr: &Addr) {
        self.valid = true;
        self.tag = addr.tag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_derives_sets_and_bits() {
        let geom = Geometry::new(0, 64, 16, 2).unwrap();
        assert_eq!(geom.n_sets, 2);
        assert_eq!(geom.offset_bits, 4);
        assert_eq!(geom.index_bits, 1);
        assert_eq!(geom.n_sets * geom.n_ways * geom.block_size, geom.size);
    }

    #[test]
    fn split_matches_shift_and_mask() {
        let geom = Geometry::new(0, 256, 16, 4).unwrap();
        let addr = geom.split(0xabcd);
        assert_eq!(addr.offset, 0xd);
        assert_eq!(addr.set, (0xabcd >> 4) & 0b11);
        assert_eq!(addr.tag, 0xabcd >> 6);
    }

    #[test]
    fn join_reconstructs_random_addresses() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for (size, block, ways) in [(64, 16, 2), (32768, 64, 8), (4096, 4, 1), (1 << 20, 128, 16)] {
            let geom = Geometry::new(0, size, block, ways).unwrap();
            for _ in 0..1000 {
                let addr = rng.usize(..);
                let parts = geom.split(addr);
                assert_eq!(geom.join(&parts), addr);
                assert_eq!(
                    (parts.tag << (geom.index_bits + geom.offset_bits))
                        | (parts.set << geom.offset_bits)
                        | (addr & (block - 1)),
                    addr
                );
            }
        }
    }

    #[test]
    fn fully_associative_has_no_index_bits() {
        let geom = Geometry::new(0, 128, 16, 8).unwrap();
        assert_eq!(geom.n_sets, 1);
        assert_eq!(geom.index_bits, 0);
        assert_eq!(geom.split(0xfff0).set, 0);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(
            Geometry::new(0, 96, 12, 2),
            Err(Error::NotPowerOfTwo { field: "block size", .. })
        ));
        assert!(matches!(
            Geometry::new(1, 96, 16, 3),
            Err(Error::NotPowerOfTwo { level: 2, field: "associativity", .. })
        ));
        assert!(matches!(
            Geometry::new(0, 100, 16, 2),
            Err(Error::SizeMismatch { .. })
        ));
        assert!(matches!(
            Geometry::new(0, 96, 16, 2),
            Err(Error::NotPowerOfTwo { field: "number of sets", value: 3, .. })
        ));
        assert!(matches!(Geometry::new(0, 0, 16, 2), Err(Error::SizeMismatch { .. })));
        assert!(matches!(
            Geometry::new(0, 64, 0, 2),
            Err(Error::NotPowerOfTwo { value: 0, .. })
        ));
    }

    #[test]
    fn hit_rate_is_zero_without_accesses() {
        let mut counters = Counters::default();
        assert_eq!(counters.hit_rate(), 0.0);
        counters.hits = 1;
        counters.misses = 1;
        assert_eq!(counters.hit_rate(), 0.5);
    }

    #[test]
    fn counters_track_fills_and_reset_on_clear() {
        use crate::replace::{testing, Lru};

        let mut cache = testing::one_set(2, Lru::new());
        for tag in [1, 2, 1, 3] {
            testing::load(&mut cache, tag);
        }
        let expected = Counters {
            hits: 1,
            misses: 3,
            memory_accesses: 3,
        };
        assert_eq!(cache.counters(), &expected);
        assert_eq!(cache.make_stats().hit_rate, 0.25);

        cache.clear_stats();
        assert_eq!(cache.counters(), &Counters::default());
        assert!(testing::resident(&cache, 3));
    }
}
