pub mod fifo;
pub mod lfu;
pub mod lru;
pub mod nru;
pub mod plru;
pub mod srrip;

use crate::cache::Block;

pub use self::{fifo::Fifo, lfu::Lfu, lru::Lru, nru::Nru, plru::Plru, srrip::Srrip};

pub trait MakeS {
    fn new(n_ways: usize) -> Self;
}

impl MakeS for () {
    fn new(_n_ways: usize) {}
}

/// Bookkeeping for one replacement policy. `blocks` is always the window of
/// the set the access maps to, so ways are indices into it.
pub trait Replace<S: MakeS, B: Default> {
    const NAME: &'static str;

    /// Picks the way to evict. Only called when every way in the set is valid.
    fn victim(&mut self, set: &mut S, blocks: &mut [Block<B>]) -> usize;

    /// Records a hit on `way`, or the fill of `way` after a miss.
    fn touch(&mut self, set: &mut S, blocks: &mut [Block<B>], way: usize, result: AccessResult);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
}

/// Index of the first minimum, so ties go to the lowest way.
pub(crate) fn min_way<T: Ord>(keys: impl Iterator<Item = T>) -> usize {
    keys.enumerate()
        .min_by(|(wa, a), (wb, b)| a.cmp(b).then(wa.cmp(wb)))
        .map(|(way, _)| way)
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::{
        cache::{Cache, Geometry, IsCache},
        trace::Access,
    };

    use super::*;

    /// A single-set cache of `ways` 16-byte blocks.
    pub fn one_set<S: MakeS, B: Default, R: Replace<S, B>>(ways: usize, repl: R) -> Cache<S, B, R> {
        let geom = Geometry::new(0, 16 * ways, 16, ways).unwrap();
        Cache::new("L1".into(), 0, geom, repl).unwrap()
    }

    /// Drives one access through a single level the way the hierarchy does.
    pub fn access(cache: &mut dyn IsCache, access: Access) -> AccessResult {
        let addr = cache.split_addr(access.addr);
        match cache.locate(&addr) {
            Some(slot) => {
                cache.hit();
                cache.update(&access, slot, AccessResult::Hit);
                AccessResult::Hit
            }
            None => {
                cache.miss();
                let slot = cache.victim(&addr);
                cache.insert(&access, &addr, slot);
                cache.update(&access, slot, AccessResult::Miss);
                AccessResult::Miss
            }
        }
    }

    /// Loads the first byte of the block carrying `tag` in a 16-byte-block
    /// single-set level.
    pub fn load(cache: &mut dyn IsCache, tag: usize) -> AccessResult {
        access(cache, Access::load(tag << 4))
    }

    pub fn resident(cache: &dyn IsCache, tag: usize) -> bool {
        cache.locate(&cache.split_addr(tag << 4)).is_some()
    }
}
