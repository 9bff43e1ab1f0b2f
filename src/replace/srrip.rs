//! Static re-reference interval prediction with 2-bit counters.

use crate::cache::Block;

use super::{AccessResult, Replace};

const RRPV_BITS: u32 = 2;
const MAX_RRPV: u8 = (1 << RRPV_BITS) - 1;

/// Fills are predicted to be re-referenced in the long interval, one short of
/// distant, so a block must hit once before it outlives a streaming scan.
const INSERT_RRPV: u8 = MAX_RRPV - 1;

#[derive(Debug, Default)]
pub struct Srrip {}

impl Srrip {
    pub fn new() -> Self {
        Srrip {}
    }
}

#[derive(Debug)]
pub struct SrripBlockData {
    rrpv: u8,
}

impl Default for SrripBlockData {
    fn default() -> Self {
        Self { rrpv: MAX_RRPV }
    }
}

impl Replace<(), SrripBlockData> for Srrip {
    const NAME: &'static str = "srrip";

    fn victim(&mut self, _set: &mut (), blocks: &mut [Block<SrripBlockData>]) -> usize {
        loop {
            if let Some(way) = blocks.iter().position(|b| b.repl_block.rrpv == MAX_RRPV) {
                return way;
            }
            for block in blocks.iter_mut() {
                block.repl_block.rrpv = (block.repl_block.rrpv + 1).min(MAX_RRPV);
            }
        }
    }

    fn touch(
        &mut self,
        _set: &mut (),
        blocks: &mut [Block<SrripBlockData>],
        way: usize,
        result: AccessResult,
    ) {
        blocks[way].repl_block.rrpv = match result {
            AccessResult::Hit => 0,
            AccessResult::Miss => INSERT_RRPV,
        };
    }
}
