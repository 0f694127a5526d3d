//! # 分配器层
//!
//! 块与 inode 都按块组从小到大、组内首个空闲位的顺序分配。
//! 每次分配或释放都立即写回位图块、描述符表块和超级块，
//! 因此两次调用之间总有 `空闲计数 == 总数 - 位图中已置位数`。

use alloc::vec::Vec;

use vfs::Error;

use crate::layout::Bitmap;
use crate::{Ext2FileSystem, Result};

/// 描述符或超级块中的空闲计数与位图不一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    FreeBlocks { group: usize, recorded: u32, actual: u32 },
    FreeInodes { group: usize, recorded: u32, actual: u32 },
    TotalFreeBlocks { recorded: u32, actual: u32 },
    TotalFreeInodes { recorded: u32, actual: u32 },
}

impl Ext2FileSystem {
    /// 分配一个数据块并清零，返回其块号
    pub fn alloc_block(&mut self) -> Result<u32> {
        let mut buf = self.block_buf();

        for g in 0..self.groups.len() {
            if self.groups[g].free_blocks_count == 0 {
                continue;
            }

            let bitmap_block = self.groups[g].block_bitmap;
            self.read_block(bitmap_block, buf.as_bytes_mut())?;
            let Some(bit) = Bitmap::new(buf.words_mut(), self.blocks_in_group(g) as usize).alloc()
            else {
                log::warn!("ext2: group {g} claims free blocks but its bitmap is full");
                continue;
            };
            self.write_block(bitmap_block, buf.as_bytes())?;

            self.groups[g].free_blocks_count -= 1;
            self.super_block.free_blocks_count -= 1;
            self.sync_group(g)?;
            self.sync_super()?;

            let block = self.group_base(g) + bit as u32;
            buf.zeroize();
            self.write_block(block, buf.as_bytes())?;
            log::debug!("ext2: alloc block {block}");

            return Ok(block);
        }

        Err(Error::NoFreeBlocks)
    }

    /// 释放一个数据块。元数据块与卷外的块号是 [`Error::OutOfRange`]，
    /// 释放空闲块是 [`Error::DoubleFree`]，两者都不改变任何计数。
    pub fn free_block(&mut self, block: u32) -> Result<()> {
        let sb = &self.super_block;
        if block < sb.first_data_block || block >= sb.blocks_count {
            return Err(Error::OutOfRange);
        }

        let g = ((block - sb.first_data_block) / sb.blocks_per_group) as usize;
        if block < self.data_start(g) {
            log::warn!("ext2: refusing to free metadata block {block}");
            return Err(Error::OutOfRange);
        }

        let bitmap_block = self.groups[g].block_bitmap;
        let mut buf = self.block_buf();
        self.read_block(bitmap_block, buf.as_bytes_mut())?;
        let bit = (block - self.group_base(g)) as usize;
        if !Bitmap::new(buf.words_mut(), self.blocks_in_group(g) as usize).dealloc(bit) {
            log::error!("ext2: double free of block {block}");
            return Err(Error::DoubleFree);
        }
        self.write_block(bitmap_block, buf.as_bytes())?;

        self.groups[g].free_blocks_count += 1;
        self.super_block.free_blocks_count += 1;
        self.sync_group(g)?;
        self.sync_super()?;
        log::debug!("ext2: free block {block}");

        Ok(())
    }

    /// 分配一个 inode 并返回其编号；保留的 inode 永远不会被分配
    pub fn alloc_inode(&mut self, is_dir: bool) -> Result<u32> {
        let ipg = self.super_block.inodes_per_group;
        let mut buf = self.block_buf();

        for g in 0..self.groups.len() {
            if self.groups[g].free_inodes_count == 0 {
                continue;
            }

            let bitmap_block = self.groups[g].inode_bitmap;
            self.read_block(bitmap_block, buf.as_bytes_mut())?;
            let Some(bit) = Bitmap::new(buf.words_mut(), ipg as usize).alloc() else {
                log::warn!("ext2: group {g} claims free inodes but its bitmap is full");
                continue;
            };

            let ino = g as u32 * ipg + bit as u32 + 1;
            if ino < self.super_block.first_ino() || ino > self.super_block.inodes_count {
                log::error!("ext2: inode bitmap of group {g} grants reserved inode {ino}");
                return Err(Error::InodeOutOfRange);
            }
            self.write_block(bitmap_block, buf.as_bytes())?;

            let group = &mut self.groups[g];
            group.free_inodes_count -= 1;
            if is_dir {
                group.used_dirs_count += 1;
            }
            self.super_block.free_inodes_count -= 1;
            self.sync_group(g)?;
            self.sync_super()?;
            log::debug!("ext2: alloc inode {ino}");

            return Ok(ino);
        }

        Err(Error::NoFreeInodes)
    }

    pub fn free_inode(&mut self, ino: u32, is_dir: bool) -> Result<()> {
        if ino < self.super_block.first_ino() || ino > self.super_block.inodes_count {
            return Err(Error::InodeOutOfRange);
        }

        let ipg = self.super_block.inodes_per_group;
        let g = ((ino - 1) / ipg) as usize;
        let bitmap_block = self.groups[g].inode_bitmap;
        let mut buf = self.block_buf();
        self.read_block(bitmap_block, buf.as_bytes_mut())?;
        if !Bitmap::new(buf.words_mut(), ipg as usize).dealloc(((ino - 1) % ipg) as usize) {
            log::error!("ext2: double free of inode {ino}");
            return Err(Error::DoubleFree);
        }
        self.write_block(bitmap_block, buf.as_bytes())?;

        let group = &mut self.groups[g];
        group.free_inodes_count += 1;
        if is_dir {
            group.used_dirs_count = group.used_dirs_count.saturating_sub(1);
        }
        self.super_block.free_inodes_count += 1;
        self.sync_group(g)?;
        self.sync_super()?;
        log::debug!("ext2: free inode {ino}");

        Ok(())
    }

    /// 由位图重新统计各组的空闲数，列出与记录不符之处
    pub fn check(&self) -> Result<Vec<Mismatch>> {
        let ipg = self.super_block.inodes_per_group;
        let mut buf = self.block_buf();
        let mut mismatches = Vec::new();
        let (mut free_blocks, mut free_inodes) = (0, 0);

        for (g, desc) in self.groups.iter().enumerate() {
            let total = self.blocks_in_group(g);
            self.read_block(desc.block_bitmap, buf.as_bytes_mut())?;
            let actual = total - Bitmap::new(buf.words_mut(), total as usize).count_used() as u32;
            if actual != desc.free_blocks_count as u32 {
                mismatches.push(Mismatch::FreeBlocks {
                    group: g,
                    recorded: desc.free_blocks_count as u32,
                    actual,
                });
            }
            free_blocks += actual;

            self.read_block(desc.inode_bitmap, buf.as_bytes_mut())?;
            let actual = ipg - Bitmap::new(buf.words_mut(), ipg as usize).count_used() as u32;
            if actual != desc.free_inodes_count as u32 {
                mismatches.push(Mismatch::FreeInodes {
                    group: g,
                    recorded: desc.free_inodes_count as u32,
                    actual,
                });
            }
            free_inodes += actual;
        }

        let sb = &self.super_block;
        if free_blocks != sb.free_blocks_count {
            mismatches.push(Mismatch::TotalFreeBlocks {
                recorded: sb.free_blocks_count,
                actual: free_blocks,
            });
        }
        if free_inodes != sb.free_inodes_count {
            mismatches.push(Mismatch::TotalFreeInodes {
                recorded: sb.free_inodes_count,
                actual: free_inodes,
            });
        }

        Ok(mismatches)
    }
}
