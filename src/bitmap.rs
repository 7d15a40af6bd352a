//! Occupancy bitmap: one bit per bucket of a large-layout table.

const WORD_BITS: usize = u64::BITS as usize;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Bitmap {
    words: Box<[u64]>,
    len: usize,
}

impl Bitmap {
    /// Create a bitmap of `len` clear bits.
    pub(crate) fn new(len: usize) -> Self {
        let words = vec![0u64; len.div_ceil(WORD_BITS)].into_boxed_slice();
        Self { words, len }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_set(&self, bit: usize) -> bool {
        debug_assert!(bit < self.len);
        self.words[bit / WORD_BITS] & (1 << (bit % WORD_BITS)) != 0
    }

    #[inline]
    pub(crate) fn set(&mut self, bit: usize) {
        debug_assert!(bit < self.len);
        self.words[bit / WORD_BITS] |= 1 << (bit % WORD_BITS);
    }

    #[inline]
    pub(crate) fn clear(&mut self, bit: usize) {
        debug_assert!(bit < self.len);
        self.words[bit / WORD_BITS] &= !(1 << (bit % WORD_BITS));
    }

    pub(crate) fn clear_all(&mut self) {
        self.words.fill(0);
    }

    #[cfg(test)]
    pub(crate) fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// First set bit at or after `from`, if any.
    pub(crate) fn first_set_from(&self, from: usize) -> Option<usize> {
        self.first_matching_from(from, |w| w)
    }

    /// First clear bit at or after `from`, if any.
    pub(crate) fn first_clear_from(&self, from: usize) -> Option<usize> {
        self.first_matching_from(from, |w| !w)
    }

    // Scans whole words; `view` selects which bits count as a match.
    fn first_matching_from(&self, from: usize, view: impl Fn(u64) -> u64) -> Option<usize> {
        if from >= self.len {
            return None;
        }
        let mut word = from / WORD_BITS;
        let mut bits = view(self.words[word]) & (!0u64 << (from % WORD_BITS));
        loop {
            if bits != 0 {
                let bit = word * WORD_BITS + bits.trailing_zeros() as usize;
                return (bit < self.len).then_some(bit);
            }
            word += 1;
            if word == self.words.len() {
                return None;
            }
            bits = view(self.words[word]);
        }
    }
}
