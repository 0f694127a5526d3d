use core::ops::Range;

/// 一个块组的位图块。
///
/// 前 `bits` 位与组内的块 (或 inode) 一一对应，其后的填充位恒为 1，永远不会被分配。
#[derive(Debug)]
pub struct Bitmap<'a> {
    words: &'a mut [u64],
    bits: usize,
}

impl<'a> Bitmap<'a> {
    #[inline]
    pub fn new(words: &'a mut [u64], bits: usize) -> Self {
        debug_assert!(bits <= words.len() * 64);
        Self { words, bits }
    }

    /// 找到首个空闲位并置位，返回其编号。
    /// 若位图的空间用尽，则返回空。
    pub fn alloc(&mut self) -> Option<usize> {
        let (word_index, inword_index) =
            self.words
                .iter()
                .enumerate()
                .find_map(|(word_index, &bits)| {
                    (bits != u64::MAX).then_some((word_index, bits.trailing_ones() as usize))
                })?;

        let bit = word_index * 64 + inword_index;
        if bit >= self.bits {
            return None;
        }
        self.words[word_index] |= 1 << inword_index;

        Some(bit)
    }

    /// 清除 `bit`；若该位本就空闲则返回 `false`，位图保持不变
    pub fn dealloc(&mut self, bit: usize) -> bool {
        if !self.is_set(bit) {
            return false;
        }
        self.words[bit / 64] &= !(1 << (bit % 64));

        true
    }

    #[inline]
    pub fn is_set(&self, bit: usize) -> bool {
        self.words[bit / 64] & 1 << (bit % 64) != 0
    }

    #[inline]
    pub fn set(&mut self, bit: usize) {
        self.words[bit / 64] |= 1 << (bit % 64);
    }

    pub fn set_range(&mut self, range: Range<usize>) {
        for bit in range {
            self.set(bit);
        }
    }

    /// 把有效位之后直到块末尾的填充位全部置 1
    pub fn pad(&mut self) {
        let total = self.words.len() * 64;
        self.set_range(self.bits..total);
    }

    /// 有效位中已被占用的个数
    pub fn count_used(&self) -> usize {
        let full = self.bits / 64;
        let rest = self.bits % 64;

        let mut used: usize = self.words[..full]
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum();
        if rest != 0 {
            used += (self.words[full] & ((1 << rest) - 1)).count_ones() as usize;
        }

        used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit() {
        let mut words = [0u64; 16];
        let mut bitmap = Bitmap::new(&mut words, 1000);
        bitmap.set_range(0..70);
        bitmap.pad();

        assert_eq!(Some(70), bitmap.alloc());
        assert_eq!(Some(71), bitmap.alloc());
        assert!(bitmap.dealloc(70));
        assert!(!bitmap.dealloc(70));
        assert_eq!(Some(70), bitmap.alloc());
        assert_eq!(72, bitmap.count_used());
    }

    #[test]
    fn padding_is_never_granted() {
        let mut words = [0u64; 2];
        let mut bitmap = Bitmap::new(&mut words, 3);
        bitmap.pad();

        assert_eq!(Some(0), bitmap.alloc());
        assert_eq!(Some(1), bitmap.alloc());
        assert_eq!(Some(2), bitmap.alloc());
        assert_eq!(None, bitmap.alloc());
        assert_eq!(3, bitmap.count_used());
    }

    #[test]
    fn unpadded_tail() {
        let mut words = [u64::MAX, 0];
        let mut bitmap = Bitmap::new(&mut words, 64);
        assert_eq!(None, bitmap.alloc());
    }
}
