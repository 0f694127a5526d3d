//! # 块缓冲
//!
//! 一块磁盘数据在内存中的副本，大小取自挂载卷的块大小。
//! 底层以 `u64` 存储，保证按 8 字节对齐，便于把磁盘结构直接映射到缓冲区上。

use alloc::vec;
use alloc::vec::Vec;
use core::mem;
use core::slice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBuf {
    words: Vec<u64>,
}

impl BlockBuf {
    /// 分配 `len` 字节的全零缓冲区，`len` 必须是 8 的倍数
    pub fn new(len: usize) -> Self {
        assert_eq!(0, len % 8, "block size must be a multiple of 8");
        Self {
            words: vec![0; len / 8],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.words.len() * 8
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.words.as_ptr().cast(), self.len()) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        unsafe { slice::from_raw_parts_mut(self.words.as_mut_ptr().cast(), len) }
    }

    /// 以 64 位为一组的视图，位图按此扫描
    #[inline]
    pub fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }

    /// 把 `offset` 处的字节解释为 `T`。
    ///
    /// `T` 只能是 `repr(C)` 的纯数据结构，且 `offset` 须满足其对齐。
    pub fn get<T>(&self, offset: usize) -> &T {
        Self::check::<T>(offset, self.len());
        unsafe { &*self.as_bytes().as_ptr().add(offset).cast() }
    }

    pub fn get_mut<T>(&mut self, offset: usize) -> &mut T {
        Self::check::<T>(offset, self.len());
        unsafe { &mut *self.as_bytes_mut().as_mut_ptr().add(offset).cast() }
    }

    #[inline]
    pub fn map<T, V>(&self, offset: usize, f: impl FnOnce(&T) -> V) -> V {
        f(self.get(offset))
    }

    #[inline]
    pub fn map_mut<T, V>(&mut self, offset: usize, f: impl FnOnce(&mut T) -> V) -> V {
        f(self.get_mut(offset))
    }

    #[inline]
    pub fn zeroize(&mut self) {
        self.words.fill(0);
    }

    fn check<T>(offset: usize, len: usize) {
        assert!(offset + mem::size_of::<T>() <= len);
        assert_eq!(0, offset % mem::align_of::<T>());
    }
}
