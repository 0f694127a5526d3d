//! # 文件数据层
//!
//! 文件内容只存放在 12 个直接块中。写入总是整体重写：
//! 先释放原有的块，再逐块分配新块，最后一块的尾部补零。

use vfs::Error;

use crate::layout::Inode;
use crate::{DIRECT_BLOCKS, Ext2FileSystem, Result};

impl Ext2FileSystem {
    /// 从 `offset` 起读取文件内容，返回读到的字节数，不会越过文件末尾
    pub fn read_file(&self, inode: &Inode, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let block_size = self.block_size();
        let size = (inode.size as usize).min(DIRECT_BLOCKS * block_size);
        if offset >= size {
            return Ok(0);
        }

        let end = size.min(offset + buf.len());
        let mut block_buf = self.block_buf();
        let mut pos = offset;
        while pos < end {
            let block = inode.block[pos / block_size];
            if block == 0 {
                break;
            }

            let inner = pos % block_size;
            let n = (block_size - inner).min(end - pos);
            self.read_block(block, block_buf.as_bytes_mut())?;
            let at = pos - offset;
            buf[at..at + n].copy_from_slice(&block_buf.as_bytes()[inner..inner + n]);
            pos += n;
        }

        Ok(pos - offset)
    }

    /// 以 `data` 重写整个文件，只接受 `offset == 0`。
    ///
    /// 更新的是调用者手中的 `inode`，写回磁盘由调用者负责 (见 [`Self::write_file_at`])。
    pub fn write_file(&mut self, inode: &mut Inode, offset: usize, data: &[u8]) -> Result<usize> {
        if offset != 0 {
            return Err(Error::UnsupportedWriteOffset);
        }
        if inode.is_dir() {
            return Err(Error::IsADirectory);
        }

        let block_size = self.block_size();
        if data.len() > DIRECT_BLOCKS * block_size {
            return Err(Error::FileTooLarge);
        }
        let needed = data.len().div_ceil(block_size) as u32;
        let held = inode.direct_blocks().count() as u32;
        if needed > self.super_block.free_blocks_count + held {
            return Err(Error::NoFreeBlocks);
        }

        self.free_data(inode)?;

        let mut buf = self.block_buf();
        for (index, chunk) in data.chunks(block_size).enumerate() {
            let block = self.alloc_block()?;
            buf.zeroize();
            buf.as_bytes_mut()[..chunk.len()].copy_from_slice(chunk);
            self.write_block(block, buf.as_bytes())?;

            inode.block[index] = block;
            inode.blocks += self.sectors_per_block();
            inode.size += chunk.len() as u32;
        }
        inode.mtime = self.now();
        log::debug!("ext2: wrote {} bytes in {needed} blocks", data.len());

        Ok(data.len())
    }

    /// 读出 inode `ino`，重写其内容并写回
    pub fn write_file_at(&mut self, ino: u32, data: &[u8]) -> Result<usize> {
        let mut inode = self.read_inode(ino)?;
        let written = self.write_file(&mut inode, 0, data);
        // 失败时 inode 也可能已经改变，照样写回
        self.write_inode(ino, &inode)?;

        written
    }

    /// 释放 inode 的全部直接块，把大小与块数清零
    pub(crate) fn free_data(&mut self, inode: &mut Inode) -> Result<()> {
        let blocks = inode.block;
        for (slot, &block) in blocks[..DIRECT_BLOCKS].iter().enumerate() {
            if block != 0 {
                self.free_block(block)?;
                inode.block[slot] = 0;
            }
        }
        inode.size = 0;
        inode.blocks = 0;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;

    use block_dev::RamDisk;

    use super::*;
    use crate::{Mismatch, ROOT_INO};

    fn fresh() -> (Ext2FileSystem, u32) {
        let mut fs = Ext2FileSystem::mount(Arc::new(RamDisk::new(8192)), 0).unwrap();
        let ino = fs.create_file(ROOT_INO, "f", 0o644).unwrap();
        (fs, ino)
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
    }

    fn read_all(fs: &Ext2FileSystem, ino: u32) -> Vec<u8> {
        let inode = fs.read_inode(ino).unwrap();
        let mut buf = vec![0; inode.size as usize + 100];
        let n = fs.read_file(&inode, 0, &mut buf).unwrap();
        buf.truncate(n);
        buf
    }

    #[test]
    fn round_trip() {
        let (mut fs, ino) = fresh();
        let bs = fs.block_size();
        for len in [0, 1, bs - 1, bs, bs + 1, 12 * bs] {
            let data = pattern(len);
            assert_eq!(Ok(len), fs.write_file_at(ino, &data));
            assert_eq!(data, read_all(&fs, ino));

            let inode = fs.read_inode(ino).unwrap();
            assert_eq!(len as u32, inode.size);
            assert_eq!(len.div_ceil(bs) as u32 * 2, inode.blocks);
        }
        assert_eq!(Vec::<Mismatch>::new(), fs.check().unwrap());
    }

    #[test]
    fn too_large_keeps_content() {
        let (mut fs, ino) = fresh();
        let bs = fs.block_size();
        let data = pattern(3 * bs);
        fs.write_file_at(ino, &data).unwrap();
        let free = fs.superblock().free_blocks_count;

        assert_eq!(
            Err(Error::FileTooLarge),
            fs.write_file_at(ino, &pattern(12 * bs + 1))
        );
        assert_eq!(data, read_all(&fs, ino));
        assert_eq!(free, fs.superblock().free_blocks_count);
    }

    #[test]
    fn rewrite_releases_blocks() {
        let (mut fs, ino) = fresh();
        let free = fs.superblock().free_blocks_count;
        fs.write_file_at(ino, &pattern(5000)).unwrap();
        assert_eq!(free - 5, fs.superblock().free_blocks_count);

        fs.write_file_at(ino, b"short").unwrap();
        assert_eq!(free - 1, fs.superblock().free_blocks_count);
        assert_eq!(b"short".to_vec(), read_all(&fs, ino));
    }

    #[test]
    fn partial_reads() {
        let (mut fs, ino) = fresh();
        let data = pattern(3000);
        fs.write_file_at(ino, &data).unwrap();
        let inode = fs.read_inode(ino).unwrap();

        let mut buf = [0; 100];
        assert_eq!(Ok(100), fs.read_file(&inode, 1000, &mut buf));
        assert_eq!(&data[1000..1100], &buf[..]);
        assert_eq!(Ok(50), fs.read_file(&inode, 2950, &mut buf));
        assert_eq!(&data[2950..], &buf[..50]);
        assert_eq!(Ok(0), fs.read_file(&inode, 3000, &mut buf));
        assert_eq!(Ok(0), fs.read_file(&inode, 9999, &mut buf));
    }

    #[test]
    fn tail_is_zero_padded() {
        let (mut fs, ino) = fresh();
        fs.write_file_at(ino, &[0xAB; 10]).unwrap();
        let inode = fs.read_inode(ino).unwrap();

        let mut buf = fs.block_buf();
        fs.read_block(inode.block[0], buf.as_bytes_mut()).unwrap();
        assert!(buf.as_bytes()[..10].iter().all(|&b| b == 0xAB));
        assert!(buf.as_bytes()[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn rejected_writes() {
        let (mut fs, ino) = fresh();
        let mut inode = fs.read_inode(ino).unwrap();
        assert_eq!(
            Err(Error::UnsupportedWriteOffset),
            fs.write_file(&mut inode, 1, b"x")
        );
        assert_eq!(Err(Error::IsADirectory), fs.write_file_at(ROOT_INO, b"x"));
        assert_eq!(1024, fs.read_inode(ROOT_INO).unwrap().size);
    }

    #[test]
    fn no_space_keeps_content() {
        let (mut fs, ino) = fresh();
        fs.write_file_at(ino, b"keep").unwrap();
        while fs.superblock().free_blocks_count > 1 {
            fs.alloc_block().unwrap();
        }

        let bs = fs.block_size();
        assert_eq!(Err(Error::NoFreeBlocks), fs.write_file_at(ino, &pattern(3 * bs)));
        assert_eq!(b"keep".to_vec(), read_all(&fs, ino));
        // 原有的一块加上剩下的一块，恰好够写两块
        assert_eq!(Ok(2 * bs), fs.write_file_at(ino, &pattern(2 * bs)));
    }
}
