use crate::cache::Block;

use super::{min_way, AccessResult, Replace};

/// True LRU: every touch stamps the block with a policy-wide clock and the
/// victim is the block with the oldest stamp.
#[derive(Debug, Default)]
pub struct Lru {
    clock: u64,
}

impl Lru {
    pub fn new() -> Self {
        Lru { clock: 0 }
    }
}

#[derive(Debug, Default)]
pub struct LruBlockData {
    last_used: u64,
}

impl Replace<(), LruBlockData> for Lru {
    const NAME: &'static str = "lru";

    fn victim(&mut self, _set: &mut (), blocks: &mut [Block<LruBlockData>]) -> usize {
        min_way(blocks.iter().map(|b| b.repl_block.last_used))
    }

    fn touch(
        &mut self,
        _set: &mut (),
        blocks: &mut [Block<LruBlockData>],
        way: usize,
        _result: AccessResult,
    ) {
        self.clock += 1;
        blocks[way].repl_block.last_used = self.clock;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::testing::{load, one_set, resident};

    #[test]
    fn retouched_block_survives() {
        let mut lru = Lru::new();
        let mut blocks: Vec<Block<LruBlockData>> = (0..3).map(|_| Block::default()).collect();
        for way in 0..3 {
            lru.touch(&mut (), &mut blocks, way, AccessResult::Miss);
        }
        lru.touch(&mut (), &mut blocks, 0, AccessResult::Hit);
        assert_eq!(lru.victim(&mut (), &mut blocks), 1);
    }

    #[test]
    fn retouched_tag_survives_in_a_level() {
        let mut cache = one_set(4, Lru::new());
        for tag in [0xa, 0xb, 0xc, 0xe, 0xa] {
            load(&mut cache, tag);
        }
        assert_eq!(load(&mut cache, 0xd), AccessResult::Miss);
        assert!(resident(&cache, 0xa));
        assert!(!resident(&cache, 0xb));
        assert!(resident(&cache, 0xc));
    }

    #[test]
    fn evicts_in_recency_order() {
        let mut cache = one_set(2, Lru::new());
        load(&mut cache, 1);
        load(&mut cache, 2);
        load(&mut cache, 3);
        assert!(!resident(&cache, 1));
        load(&mut cache, 2);
        load(&mut cache, 4);
        assert!(!resident(&cache, 3));
        assert!(resident(&cache, 2));
    }
}
