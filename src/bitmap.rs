//! Region-id bitmap.
//!
//! A process-wide bitmap of fixed capacity that reserves region
//! identifiers above `RESERVED_REGION_ID_START`. Bit storage is a
//! `parking_lot::Mutex`-guarded word vector.

use parking_lot::Mutex;

use crate::descriptor::RESERVED_REGION_ID_START;
use crate::error::{OpenFamError, Result};

const BITS_PER_WORD: u64 = 64;

struct BitmapState {
    words: Vec<u64>,
}

pub struct RegionIdBitmap {
    state: Mutex<BitmapState>,
    capacity: u64,
    reserved_start: u64,
}

impl RegionIdBitmap {
    pub fn new(capacity: u64) -> Self {
        Self::with_reserved_start(capacity, RESERVED_REGION_ID_START)
    }

    pub fn with_reserved_start(capacity: u64, reserved_start: u64) -> Self {
        let num_words = (capacity + BITS_PER_WORD - 1) / BITS_PER_WORD;
        Self {
            state: Mutex::new(BitmapState {
                words: vec![0u64; num_words as usize],
            }),
            capacity,
            reserved_start,
        }
    }

    /// Atomically finds and sets the first clear bit at or above
    /// `RESERVED_REGION_ID_START`.
    pub fn reserve(&self) -> Result<u64> {
        let mut state = self.state.lock();
        let mut id = self.reserved_start;
        while id < self.capacity {
            let word_idx = (id / BITS_PER_WORD) as usize;
            let bit_idx = id % BITS_PER_WORD;
            if state.words[word_idx] & (1u64 << bit_idx) == 0 {
                state.words[word_idx] |= 1u64 << bit_idx;
                return Ok(id);
            }
            id += 1;
        }
        Err(OpenFamError::NoFreeRegionId)
    }

    pub fn release(&self, id: u64) {
        if id < self.capacity {
            let mut state = self.state.lock();
            let word_idx = (id / BITS_PER_WORD) as usize;
            let bit_idx = id % BITS_PER_WORD;
            state.words[word_idx] &= !(1u64 << bit_idx);
        }
    }

    pub fn is_reserved(&self, id: u64) -> bool {
        if id >= self.capacity {
            return false;
        }
        let state = self.state.lock();
        let word_idx = (id / BITS_PER_WORD) as usize;
        let bit_idx = id % BITS_PER_WORD;
        state.words[word_idx] & (1u64 << bit_idx) != 0
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}
