//! Tree pseudo-LRU.
//!
//! Each set keeps `ways - 1` direction bits laid out as an implicit binary
//! tree (node `n` has children `2n + 1` and `2n + 2`, leaves are the ways).
//! A set bit means the pseudo-LRU side is the right subtree. Finding a victim
//! walks from the root following the bits; touching a way flips every node on
//! its path to point away from it.

use crate::cache::Block;

use super::{AccessResult, MakeS, Replace};

#[derive(Debug, Default)]
pub struct Plru {}

impl Plru {
    /// Tree bits live in one `u64` per set.
    pub const MAX_WAYS: usize = 64;

    pub fn new() -> Self {
        Plru {}
    }
}

#[derive(Debug, Default)]
pub struct PlruSetData {
    tree: u64,
}

impl MakeS for PlruSetData {
    fn new(n_ways: usize) -> Self {
        debug_assert!(n_ways <= Plru::MAX_WAYS);
        PlruSetData { tree: 0 }
    }
}

impl PlruSetData {
    fn points_right(&self, node: usize) -> bool {
        (self.tree >> node) & 1 == 1
    }

    fn point(&mut self, node: usize, right: bool) {
        if right {
            self.tree |= 1 << node;
        } else {
            self.tree &= !(1 << node);
        }
    }
}

impl Replace<PlruSetData, ()> for Plru {
    const NAME: &'static str = "plru";

    fn victim(&mut self, set: &mut PlruSetData, blocks: &mut [Block<()>]) -> usize {
        let leaves = blocks.len() - 1;
        let mut node = 0;
        while node < leaves {
            node = 2 * node + 1 + set.points_right(node) as usize;
        }
        node - leaves
    }

    fn touch(
        &mut self,
        set: &mut PlruSetData,
        blocks: &mut [Block<()>],
        way: usize,
        _result: AccessResult,
    ) {
        let mut node = way + blocks.len() - 1;
        while node > 0 {
            let parent = (node - 1) / 2;
            let came_from_left = node == 2 * parent + 1;
            set.point(parent, came_from_left);
            node = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::testing::{load, one_set, resident};

    #[test]
    fn in_order_fill_points_at_way_zero() {
        let mut cache = one_set(4, Plru::new());
        for tag in 0..4 {
            load(&mut cache, tag);
        }
        assert_eq!(cache.set_data[0].tree, 0);
        load(&mut cache, 4);
        assert!(!resident(&cache, 0));
    }

    #[test]
    fn victim_differs_from_true_lru() {
        let mut cache = one_set(4, Plru::new());
        for tag in 0..5 {
            load(&mut cache, tag);
        }
        // true LRU would now pick tag 1; the tree only remembers that the
        // left half was touched last
        load(&mut cache, 5);
        assert!(resident(&cache, 1));
        assert!(!resident(&cache, 2));
    }

    #[test]
    fn touched_way_is_never_next_victim() {
        let mut plru = Plru::new();
        let mut set = PlruSetData::new(8);
        let mut blocks: Vec<Block<()>> = (0..8).map(|_| Block::default()).collect();
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..500 {
            let way = rng.usize(0..8);
            plru.touch(&mut set, &mut blocks, way, AccessResult::Hit);
            assert_ne!(plru.victim(&mut set, &mut blocks), way);
        }
    }

    #[test]
    fn direct_mapped_always_way_zero() {
        let mut plru = Plru::new();
        let mut set = PlruSetData::new(1);
        let mut blocks = vec![Block::<()>::default()];
        plru.touch(&mut set, &mut blocks, 0, AccessResult::Miss);
        assert_eq!(plru.victim(&mut set, &mut blocks), 0);
        assert_eq!(set.tree, 0);
    }
}
