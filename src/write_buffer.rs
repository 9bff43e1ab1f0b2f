use std::collections::HashMap;

/// Dirty sectors waiting to be written back, keyed by the exact address that
/// produced them. Staging an address that is already pending replaces the
/// entry, so repeated writes coalesce into a single write-back.
#[derive(Debug)]
pub struct WriteBuffer {
    pending: HashMap<usize, usize>,
    threshold: usize,
}

impl WriteBuffer {
    pub const DEFAULT_THRESHOLD: usize = 20;

    pub fn new(threshold: usize) -> Self {
        WriteBuffer {
            pending: HashMap::new(),
            threshold,
        }
    }

    /// Stages `payload` for `addr`. Returns `true` when it coalesced with an
    /// entry that was already pending.
    pub fn stage(&mut self, addr: usize, payload: usize) -> bool {
        self.pending.insert(addr, payload).is_some()
    }

    pub fn contains(&self, addr: usize) -> bool {
        self.pending.contains_key(&addr)
    }

    pub fn payload(&self, addr: usize) -> Option<usize> {
        self.pending.get(&addr).copied()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn over_threshold(&self) -> bool {
        self.pending.len() > self.threshold
    }

    /// Empties the buffer and returns how many entries went to memory.
    pub fn drain(&mut self) -> usize {
        let flushed = self.pending.len();
        self.pending.clear();
        flushed
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}
