//! # inode 表层
//!
//! inode 号从 1 开始。第 n 个 inode 位于块组 `(n-1) / inodes_per_group` 的 inode 表中，
//! 组内下标为 `(n-1) % inodes_per_group`。不做缓存，每次读写都直达磁盘。

use vfs::Error;

use crate::layout::{INODE_RECORD_SIZE, Inode};
use crate::{Ext2FileSystem, Result};

impl Ext2FileSystem {
    /// 通过 inode 号获取其在磁盘上的位置：**块号**以及**块内偏移**
    pub fn inode_pos(&self, ino: u32) -> Result<(u32, usize)> {
        if ino < 1 || ino > self.super_block.inodes_count {
            return Err(Error::InodeOutOfRange);
        }

        let ipg = self.super_block.inodes_per_group;
        let group = ((ino - 1) / ipg) as usize;
        let index = ((ino - 1) % ipg) as usize;
        let byte = index * self.inode_size();
        let desc = self.groups.get(group).ok_or(Error::InodeOutOfRange)?;

        Ok((
            desc.inode_table + (byte / self.block_size()) as u32,
            byte % self.block_size(),
        ))
    }

    pub fn read_inode(&self, ino: u32) -> Result<Inode> {
        let (block, offset) = self.inode_pos(ino)?;
        let mut buf = self.block_buf();
        self.read_block(block, buf.as_bytes_mut())?;

        Ok(buf.get::<Inode>(offset).clone())
    }

    /// 写回 inode 的前 128 字节，记录中其余的字节保持不变
    pub fn write_inode(&mut self, ino: u32, inode: &Inode) -> Result<()> {
        let (block, offset) = self.inode_pos(ino)?;
        let mut buf = self.block_buf();
        self.read_block(block, buf.as_bytes_mut())?;

        debug_assert!(offset + INODE_RECORD_SIZE <= buf.len());
        *buf.get_mut::<Inode>(offset) = inode.clone();
        self.write_block(block, buf.as_bytes())?;
        log::trace!("ext2: wrote inode {ino} at block {block}+{offset}");

        Ok(())
    }
}
