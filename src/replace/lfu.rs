use crate::cache::Block;

use super::{min_way, AccessResult, Replace};

/// Least frequently used. Ties between equal counts go to the block that was
/// filled first.
#[derive(Debug, Default)]
pub struct Lfu {
    clock: u64,
}

impl Lfu {
    pub fn new() -> Self {
        Lfu { clock: 0 }
    }
}

#[derive(Debug, Default)]
pub struct LfuBlockData {
    count: u64,
    inserted: u64,
}

impl Replace<(), LfuBlockData> for Lfu {
    const NAME: &'static str = "lfu";

    fn victim(&mut self, _set: &mut (), blocks: &mut [Block<LfuBlockData>]) -> usize {
        min_way(
            blocks
                .iter()
                .map(|b| (b.repl_block.count, b.repl_block.inserted)),
        )
    }

    fn touch(
        &mut self,
        _set: &mut (),
        blocks: &mut [Block<LfuBlockData>],
        way: usize,
        result: AccessResult,
    ) {
        let data = &mut blocks[way].repl_block;
        match result {
            AccessResult::Hit => data.count += 1,
            AccessResult::Miss => {
                self.clock += 1;
                data.count = 1;
                data.inserted = self.clock;
            }
        }
    }
}
