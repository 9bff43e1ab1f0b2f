use crate::cache::Block;

use super::{min_way, AccessResult, Replace};

/// Evicts in insertion order; hits leave the order untouched.
#[derive(Debug, Default)]
pub struct Fifo {
    clock: u64,
}

impl Fifo {
    pub fn new() -> Self {
        Fifo { clock: 0 }
    }
}

#[derive(Debug, Default)]
pub struct FifoBlockData {
    inserted: u64,
}

impl Replace<(), FifoBlockData> for Fifo {
    const NAME: &'static str = "fifo";

    fn victim(&mut self, _set: &mut (), blocks: &mut [Block<FifoBlockData>]) -> usize {
        min_way(blocks.iter().map(|b| b.repl_block.inserted))
    }

    fn touch(
        &mut self,
        _set: &mut (),
        blocks: &mut [Block<FifoBlockData>],
        way: usize,
        result: AccessResult,
    ) {
        if result == AccessResult::Miss {
            self.clock += 1;
            blocks[way].repl_block.inserted = self.clock;
        }
    }
}
