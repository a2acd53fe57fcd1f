//!
//! CPU bitmask algebra
//!
//! A [CpuBitmask] is an ordered sequence of 64-bit words. Word `i` holds the
//! CPUs `64 * i ..= 64 * i + 63` and bit `b` of that word stands for CPU
//! `64 * i + b`, so the least significant bit is always the lowest CPU index.
//!
//! The mask is sized for a fixed number of CPUs. Bits above the last valid
//! CPU are kept at zero by every constructor and setter of this module, which
//! lets two masks be compared word by word.
use std::fmt;
use thiserror::Error;

/// Number of CPUs held by a single word of the mask.
pub const WORD_BITS: usize = 64;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors raised when a caller addresses a CPU the mask doesn't cover
pub enum BitmaskError {
    #[error("cpu {cpu} is out of range, the mask covers {num_cpus} cpus")]
    /// The CPU index is not in `0..num_cpus`
    CpuOutOfRange {
        /// Requested CPU index
        cpu: usize,
        /// Number of CPUs covered by the mask
        num_cpus: usize,
    },
}

/// Number of words needed to hold `num_cpus` bits.
#[inline]
pub fn words_for(num_cpus: usize) -> usize {
    (num_cpus + WORD_BITS - 1) / WORD_BITS
}

/// Bits of the final word that map onto valid CPUs.
///
/// When `num_cpus` is an exact multiple of the word size the final word is
/// entirely valid and the mask is all ones. Shifting by the remainder would
/// give zero there, so that case is handled before the shift.
#[inline]
pub fn last_word_mask(num_cpus: usize) -> u64 {
    match num_cpus % WORD_BITS {
        0 if num_cpus == 0 => 0,
        0 => !0,
        rem => !(!0u64 << rem),
    }
}

///
/// Fixed-width bit vector over CPU indices.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CpuBitmask {
    words: Vec<u64>,
    num_cpus: usize,
}

impl CpuBitmask {
    /// Creates a mask for `num_cpus` CPUs with every bit cleared.
    pub fn new(num_cpus: usize) -> Self {
        CpuBitmask {
            words: vec![0; words_for(num_cpus)],
            num_cpus,
        }
    }

    /// Creates a mask with exactly one CPU set.
    ///
    /// # Example
    /// ```rust
    /// use numa_bridge_utils::bitmask::CpuBitmask;
    ///
    /// let mask = CpuBitmask::for_one_cpu(96, 70).unwrap();
    /// assert_eq!(mask.words(), &[0, 1 << 6]);
    /// assert!(CpuBitmask::for_one_cpu(96, 96).is_err());
    /// ```
    pub fn for_one_cpu(num_cpus: usize, cpu: usize) -> Result<Self, BitmaskError> {
        let mut mask = CpuBitmask::new(num_cpus);
        mask.set(cpu)?;
        Ok(mask)
    }

    /// Creates a mask with CPUs `0..num_cpus` set and every higher bit cleared.
    pub fn for_all_cpus(num_cpus: usize) -> Self {
        let mut mask = CpuBitmask::new(num_cpus);
        mask.fill_all();
        mask
    }

    /// Builds a mask out of raw words.
    ///
    /// Missing words are treated as zero, extra words are dropped and bits
    /// beyond `num_cpus` are cleared.
    pub fn from_words(num_cpus: usize, words: &[u64]) -> Self {
        let mut mask = CpuBitmask::new(num_cpus);
        for (dst, src) in mask.words.iter_mut().zip(words) {
            *dst = *src;
        }
        mask.clear_tail();
        mask
    }

    /// Number of CPUs this mask covers.
    #[inline]
    pub fn num_cpus(&self) -> usize {
        self.num_cpus
    }

    /// Raw words of the mask, lowest CPUs first.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Sets the bit of `cpu`.
    pub fn set(&mut self, cpu: usize) -> Result<(), BitmaskError> {
        self.check(cpu)?;
        self.words[cpu / WORD_BITS] |= 1 << (cpu % WORD_BITS);
        Ok(())
    }

    /// Clears the bit of `cpu`.
    pub fn clear(&mut self, cpu: usize) -> Result<(), BitmaskError> {
        self.check(cpu)?;
        self.words[cpu / WORD_BITS] &= !(1 << (cpu % WORD_BITS));
        Ok(())
    }

    /// Returns whether `cpu` is set. CPUs outside the mask are never set.
    #[inline]
    pub fn is_set(&self, cpu: usize) -> bool {
        cpu < self.num_cpus && self.words[cpu / WORD_BITS] & (1 << (cpu % WORD_BITS)) != 0
    }

    /// Sets every valid CPU.
    pub fn fill_all(&mut self) {
        for word in self.words.iter_mut() {
            *word = !0;
        }
        self.clear_tail();
    }

    /// Clears every CPU.
    pub fn clear_all(&mut self) {
        for word in self.words.iter_mut() {
            *word = 0;
        }
    }

    /// Number of CPUs set.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns true if no CPU is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Iterates over the indices of the set CPUs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_cpus).filter(move |cpu| self.is_set(*cpu))
    }

    fn check(&self, cpu: usize) -> Result<(), BitmaskError> {
        if cpu < self.num_cpus {
            Ok(())
        } else {
            Err(BitmaskError::CpuOutOfRange {
                cpu,
                num_cpus: self.num_cpus,
            })
        }
    }

    fn clear_tail(&mut self) {
        if let Some(last) = self.words.last_mut() {
            *last &= last_word_mask(self.num_cpus);
        }
    }
}

impl fmt::Debug for CpuBitmask {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("CpuBitmask")
            .field("num_cpus", &self.num_cpus)
            .field("cpus", &self.to_string())
            .finish()
    }
}

/// Renders the set CPUs in the kernel's cpulist notation, e.g. `0-3,8,10-11`.
impl fmt::Display for CpuBitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut cpus = self.iter().peekable();
        while let Some(start) = cpus.next() {
            let mut end = start;
            while cpus.peek() == Some(&(end + 1)) {
                end += 1;
                cpus.next();
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}-{}", start, end)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mask_is_zeroed() {
        let mask = CpuBitmask::new(65);
        assert_eq!(mask.words(), &[0, 0]);
        assert!(mask.is_empty());
        assert_eq!(CpuBitmask::new(0).words().len(), 0);
        assert_eq!(CpuBitmask::new(64).words().len(), 1);
    }

    #[test]
    fn all_cpus_on_word_boundary() {
        assert_eq!(CpuBitmask::for_all_cpus(64).words(), &[!0]);
        assert_eq!(CpuBitmask::for_all_cpus(128).words(), &[!0, !0]);
    }

    #[test]
    fn all_cpus_off_word_boundary() {
        assert_eq!(CpuBitmask::for_all_cpus(1).words(), &[1]);
        assert_eq!(CpuBitmask::for_all_cpus(63).words(), &[!0 >> 1]);
        assert_eq!(CpuBitmask::for_all_cpus(65).words(), &[!0, 1]);
        assert_eq!(CpuBitmask::for_all_cpus(100).count(), 100);
    }

    #[test]
    fn last_word_mask_edges() {
        assert_eq!(last_word_mask(0), 0);
        assert_eq!(last_word_mask(1), 1);
        assert_eq!(last_word_mask(64), !0);
        assert_eq!(last_word_mask(127), !0 >> 1);
    }

    #[test]
    fn one_cpu_rejects_out_of_range() {
        assert_eq!(
            CpuBitmask::for_one_cpu(8, 8),
            Err(BitmaskError::CpuOutOfRange {
                cpu: 8,
                num_cpus: 8
            })
        );
        assert!(CpuBitmask::for_one_cpu(0, 0).is_err());
    }

    #[test]
    fn from_words_clears_tail() {
        let mask = CpuBitmask::from_words(4, &[!0, !0]);
        assert_eq!(mask.words(), &[0b1111]);
        assert_eq!(mask, CpuBitmask::for_all_cpus(4));
    }

    #[test]
    fn set_and_clear() {
        let mut mask = CpuBitmask::new(130);
        mask.set(0).unwrap();
        mask.set(129).unwrap();
        assert!(mask.is_set(129));
        assert!(!mask.is_set(130));
        mask.clear(0).unwrap();
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![129]);
        assert!(mask.clear(130).is_err());
    }

    #[test]
    fn display_as_cpulist() {
        let mut mask = CpuBitmask::new(16);
        for cpu in &[0, 1, 2, 3, 8, 10, 11] {
            mask.set(*cpu).unwrap();
        }
        assert_eq!(mask.to_string(), "0-3,8,10-11");
        assert_eq!(CpuBitmask::new(16).to_string(), "");
    }
}
