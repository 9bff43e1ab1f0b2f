use crate::cache::Block;

use super::{AccessResult, Replace};

/// Not recently used: one reference bit per block.
#[derive(Debug, Default)]
pub struct Nru {}

impl Nru {
    pub fn new() -> Self {
        Nru {}
    }
}

#[derive(Debug, Default)]
pub struct NruBlockData {
    referenced: bool,
}

impl Replace<(), NruBlockData> for Nru {
    const NAME: &'static str = "nru";

    fn victim(&mut self, _set: &mut (), blocks: &mut [Block<NruBlockData>]) -> usize {
        if let Some(way) = blocks.iter().position(|b| !b.repl_block.referenced) {
            return way;
        }
        // Everything was referenced, start a new epoch
        blocks
            .iter_mut()
            .for_each(|b| b.repl_block.referenced = false);
        0
    }

    fn touch(
        &mut self,
        _set: &mut (),
        blocks: &mut [Block<NruBlockData>],
        way: usize,
        _result: AccessResult,
    ) {
        blocks[way].repl_block.referenced = true;
    }
}
