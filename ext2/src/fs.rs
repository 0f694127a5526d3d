//! # 卷管理层
//!
//! 读写超级块与块组描述符表，构建 (格式化) 与挂载整个卷。
//!
//! 分区内的布局：
//!
//! 引导块 | 块组 0 | 块组 1 | ...
//!
//! 块组 g 起始于 `first_data_block + g * blocks_per_group`，内部依次为
//! (仅块组 0：超级块、描述符表) | 块位图 | inode 位图 | inode 表 | 数据块

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::mem;

use block_dev::{BlockDevice, SECTOR_SIZE};
use vfs::Error;

use crate::dir::init_dir_block;
use crate::layout::*;
use crate::{
    BlockBuf, DEFAULT_SECTORS, FIRST_INO, ROOT_INO, Result, SUPER_BLOCK_OFFSET, SUPER_BLOCK_SIZE,
};

/// 时间戳来源，返回自纪元以来的秒数
pub type Clock = fn() -> u32;

fn epoch() -> u32 {
    0
}

/// 格式化参数
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// 块大小为 `1024 << log_block_size`，取 0..=2
    pub log_block_size: u32,
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,
    pub inode_size: u16,
    pub label: String,
    pub clock: Clock,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            log_block_size: 0,
            blocks_per_group: 8192,
            inodes_per_group: 2048,
            inode_size: INODE_RECORD_SIZE as u16,
            label: "krnel".into(),
            clock: epoch,
        }
    }
}

impl FormatOptions {
    #[inline]
    fn block_size(&self) -> usize {
        1024 << self.log_block_size
    }

    fn validate(&self) -> Result<()> {
        if self.log_block_size > 2 {
            return Err(Error::InvalidGeometry);
        }

        let block_size = self.block_size();
        let bits_per_block = block_size as u32 * 8;
        let inode_size = self.inode_size as usize;
        let valid = (8..=bits_per_block).contains(&self.blocks_per_group)
            && self.blocks_per_group % 8 == 0
            && (16..=bits_per_block).contains(&self.inodes_per_group)
            && self.inodes_per_group % 8 == 0
            && inode_size >= INODE_RECORD_SIZE
            && inode_size <= block_size
            && inode_size.is_power_of_two();

        if valid {
            Ok(())
        } else {
            Err(Error::InvalidGeometry)
        }
    }
}

/// 卷的容量与空闲统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStat {
    pub block_size: usize,
    pub blocks: u32,
    pub free_blocks: u32,
    pub reserved_blocks: u32,
    pub inodes: u32,
    pub free_inodes: u32,
    pub groups: u32,
}

/// 已挂载的 ext2 卷
pub struct Ext2FileSystem {
    device: Arc<dyn BlockDevice>,
    /// 分区起点的扇区号
    partition_start: u64,
    pub(crate) super_block: SuperBlock,
    pub(crate) groups: Vec<GroupDesc>,
    block_size: usize,
    sectors_per_block: u64,
    inode_size: usize,
    clock: Clock,
}

impl Ext2FileSystem {
    /// 以默认参数格式化，`total_sectors` 为 0 时取 64 MiB (不超过设备容量)
    pub fn format(device: Arc<dyn BlockDevice>, partition_start: u64, total_sectors: u64) -> Result<()> {
        Self::format_with(device, partition_start, total_sectors, &FormatOptions::default())
    }

    pub fn format_with(
        device: Arc<dyn BlockDevice>,
        partition_start: u64,
        total_sectors: u64,
        options: &FormatOptions,
    ) -> Result<()> {
        options.validate()?;

        let capacity = device.sector_count().saturating_sub(partition_start);
        let total_sectors = match total_sectors {
            0 => DEFAULT_SECTORS.min(capacity),
            n => n,
        };
        if total_sectors > capacity {
            log::warn!("ext2: cannot format {total_sectors} sectors on a {capacity} sector device");
            return Err(Error::OutOfRange);
        }

        let block_size = options.block_size();
        let sectors_per_block = (block_size / SECTOR_SIZE) as u64;
        let blocks_per_group = options.blocks_per_group;
        let inodes_per_group = options.inodes_per_group;
        let first_data_block = (block_size == 1024) as u32;
        let inode_table_blocks =
            (inodes_per_group as usize * options.inode_size as usize).div_ceil(block_size) as u32;

        let mut blocks_count =
            u32::try_from(total_sectors / sectors_per_block).map_err(|_| Error::InvalidGeometry)?;
        if blocks_count <= first_data_block {
            return Err(Error::InvalidGeometry);
        }

        // 末尾的块组容不下自己的元数据外加一个数据块时将其舍去
        let mut group_count = (blocks_count - first_data_block).div_ceil(blocks_per_group);
        let gdt_blocks = |groups: u32| (groups as usize * GROUP_DESC_SIZE).div_ceil(block_size) as u32;
        let last_blocks = blocks_count - first_data_block - (group_count - 1) * blocks_per_group;
        let last_overhead = 2
            + inode_table_blocks
            + if group_count == 1 { 1 + gdt_blocks(1) } else { 0 };
        if last_blocks <= last_overhead && group_count > 1 {
            group_count -= 1;
            blocks_count = first_data_block + group_count * blocks_per_group;
        }

        let gdt_blocks = gdt_blocks(group_count);
        let group0_meta = 1 + gdt_blocks + 2 + inode_table_blocks;
        if blocks_per_group.min(blocks_count - first_data_block) <= group0_meta {
            log::warn!("ext2: {blocks_count} blocks cannot hold the metadata of group 0");
            return Err(Error::InvalidGeometry);
        }
        let inodes_count = group_count
            .checked_mul(inodes_per_group)
            .ok_or(Error::InvalidGeometry)?;

        let now = (options.clock)();
        let mut super_block = SuperBlock::zeroed();
        super_block.init(
            blocks_count,
            inodes_count,
            first_data_block,
            options.log_block_size,
            blocks_per_group,
            inodes_per_group,
            options.inode_size,
            now,
        );
        super_block.set_label(&options.label);

        let groups = (0..group_count)
            .map(|g| {
                let base = first_data_block + g * blocks_per_group;
                let block_bitmap = if g == 0 { base + 1 + gdt_blocks } else { base };
                GroupDesc::new(block_bitmap, block_bitmap + 1, block_bitmap + 2)
            })
            .collect();

        let mut fs = Self::new(device, partition_start, super_block, groups, options.clock);
        log::info!(
            "ext2: formatting {blocks_count} blocks of {block_size} bytes, {inodes_count} inodes, \
             {group_count} groups"
        );

        let mut buf = fs.block_buf();
        for g in 0..group_count as usize {
            let base = fs.group_base(g);
            let group_blocks = fs.blocks_in_group(g);
            let desc = fs.groups[g].clone();
            // 元数据块，块组 0 还要算上根目录的数据块
            let used_blocks = fs.data_start(g) - base + (g == 0) as u32;

            buf.zeroize();
            let mut bitmap = Bitmap::new(buf.words_mut(), group_blocks as usize);
            bitmap.set_range(0..used_blocks as usize);
            bitmap.pad();
            fs.write_block(desc.block_bitmap, buf.as_bytes())?;

            buf.zeroize();
            let mut bitmap = Bitmap::new(buf.words_mut(), inodes_per_group as usize);
            let used_inodes = if g == 0 { FIRST_INO - 1 } else { 0 };
            bitmap.set_range(0..used_inodes as usize);
            bitmap.pad();
            fs.write_block(desc.inode_bitmap, buf.as_bytes())?;

            fs.zero_blocks(desc.inode_table, inode_table_blocks)?;

            let group = &mut fs.groups[g];
            group.free_blocks_count = (group_blocks - used_blocks) as u16;
            group.free_inodes_count = (inodes_per_group - used_inodes) as u16;
            fs.super_block.free_blocks_count += group_blocks - used_blocks;
            fs.super_block.free_inodes_count += inodes_per_group - used_inodes;
        }

        // 根目录：inode 2，数据块紧随块组 0 的 inode 表
        let root_block = fs.data_start(0);
        init_dir_block(buf.as_bytes_mut(), ROOT_INO, ROOT_INO);
        fs.write_block(root_block, buf.as_bytes())?;

        let mut root = Inode::new(S_IFDIR | 0o755, now);
        root.links_count = 2;
        root.size = block_size as u32;
        root.blocks = sectors_per_block as u32;
        root.block[0] = root_block;
        fs.write_inode(ROOT_INO, &root)?;
        fs.groups[0].used_dirs_count = 1;

        fs.sync_groups()?;
        fs.sync_super()?;
        log::info!(
            "ext2: formatted, {} free blocks, {} free inodes",
            fs.super_block.free_blocks_count,
            fs.super_block.free_inodes_count
        );

        Ok(())
    }

    /// 挂载 `partition_start` 处的卷。
    ///
    /// 魔数不符时视为未格式化：按默认大小 (不超过设备剩余容量) 格式化后重读一次，
    /// 仍不符则返回 [`Error::BadMagic`]。
    pub fn mount(device: Arc<dyn BlockDevice>, partition_start: u64) -> Result<Self> {
        let mut super_block = read_super(&*device, partition_start)?;
        if !super_block.is_valid() {
            log::warn!(
                "ext2: bad magic {:#06x} at sector {partition_start}, formatting",
                super_block.magic
            );
            Self::format(device.clone(), partition_start, 0)?;

            super_block = read_super(&*device, partition_start)?;
            if !super_block.is_valid() {
                return Err(Error::BadMagic);
            }
        }
        super_block.validate()?;

        let mut fs = Self::new(device, partition_start, super_block, Vec::new(), epoch);
        let end = fs.partition_start + fs.super_block.blocks_count as u64 * fs.sectors_per_block;
        if end > fs.device.sector_count() {
            log::error!("ext2: volume ends at sector {end}, beyond the device");
            return Err(Error::InvalidGeometry);
        }
        fs.load_groups()?;

        let sb = &fs.super_block;
        log::info!(
            "ext2: mounted '{}', {} blocks of {} bytes, {} groups, {} free blocks, {} free inodes",
            core::str::from_utf8(sb.label()).unwrap_or("?"),
            sb.blocks_count,
            fs.block_size,
            fs.groups.len(),
            sb.free_blocks_count,
            sb.free_inodes_count,
        );

        Ok(fs)
    }

    /// 写回超级块与描述符表，然后释放句柄
    pub fn close(mut self) -> Result<()> {
        self.super_block.state = FS_CLEAN;
        self.sync_groups()?;
        self.sync_super()?;
        log::info!("ext2: unmounted");

        Ok(())
    }

    fn new(
        device: Arc<dyn BlockDevice>,
        partition_start: u64,
        super_block: SuperBlock,
        groups: Vec<GroupDesc>,
        clock: Clock,
    ) -> Self {
        let block_size = super_block.block_size();
        Self {
            device,
            partition_start,
            block_size,
            sectors_per_block: (block_size / SECTOR_SIZE) as u64,
            inode_size: super_block.inode_size(),
            super_block,
            groups,
            clock,
        }
    }

    /// 读入描述符表，并确认各组的元数据都落在卷内
    fn load_groups(&mut self) -> Result<()> {
        let count = self.super_block.group_count() as usize;
        let per_block = self.block_size / GROUP_DESC_SIZE;
        let first = self.super_block.first_data_block + 1;
        let mut buf = self.block_buf();

        self.groups.clear();
        for i in 0..count.div_ceil(per_block) {
            self.read_block(first + i as u32, buf.as_bytes_mut())?;
            let n = per_block.min(count - self.groups.len());
            self.groups
                .extend((0..n).map(|j| buf.get::<GroupDesc>(j * GROUP_DESC_SIZE).clone()));
        }

        let blocks_count = self.super_block.blocks_count;
        let table_blocks = self.inode_table_blocks();
        for (g, desc) in self.groups.iter().enumerate() {
            if desc.block_bitmap >= blocks_count
                || desc.inode_bitmap >= blocks_count
                || desc
                    .inode_table
                    .checked_add(table_blocks)
                    .is_none_or(|end| end > blocks_count)
            {
                log::error!("ext2: group {g} descriptor points outside the volume: {desc:?}");
                return Err(Error::InvalidGeometry);
            }
        }

        Ok(())
    }

    /* 块读写 */

    /// 一块大小的全零缓冲区
    #[inline]
    pub fn block_buf(&self) -> BlockBuf {
        BlockBuf::new(self.block_size)
    }

    fn block_lba(&self, block: u32) -> Result<u64> {
        if block >= self.super_block.blocks_count {
            return Err(Error::OutOfRange);
        }
        Ok(self.partition_start + block as u64 * self.sectors_per_block)
    }

    /// 读取整块，`buf` 的长度必须等于块大小
    pub fn read_block(&self, block: u32, buf: &mut [u8]) -> Result<()> {
        if buf.len() != self.block_size {
            return Err(Error::OutOfRange);
        }

        let read = self.device.read_sectors(self.block_lba(block)?, buf)?;
        if read != self.block_size {
            log::warn!("ext2: short read of block {block}: {read} bytes");
            return Err(Error::BlockReadFailure);
        }

        Ok(())
    }

    /// 写入整块，`buf` 的长度必须等于块大小
    pub fn write_block(&self, block: u32, buf: &[u8]) -> Result<()> {
        if buf.len() != self.block_size {
            return Err(Error::OutOfRange);
        }

        let written = self.device.write_sectors(self.block_lba(block)?, buf)?;
        if written != self.block_size {
            log::warn!("ext2: short write of block {block}: {written} bytes");
            return Err(Error::DeviceFault);
        }

        Ok(())
    }

    /// 把从 `first` 起的 `count` 块清零，每次最多写 64 KiB
    pub(crate) fn zero_blocks(&self, first: u32, count: u32) -> Result<()> {
        const RUN_BYTES: usize = 64 * 1024;

        let run_blocks = (RUN_BYTES / self.block_size) as u32;
        let zeros = BlockBuf::new(RUN_BYTES);
        let mut block = first;
        while block < first + count {
            let n = run_blocks.min(first + count - block);
            let bytes = n as usize * self.block_size;
            // 末块也必须在卷内
            self.block_lba(block + n - 1)?;
            self.device
                .write_sectors(self.block_lba(block)?, &zeros.as_bytes()[..bytes])?;
            block += n;
        }

        Ok(())
    }

    /* 元数据写回 */

    /// 写回超级块
    pub(crate) fn sync_super(&mut self) -> Result<()> {
        self.super_block.wtime = self.now();
        write_super(&*self.device, self.partition_start, &self.super_block)
    }

    /// 写回第 `g` 组描述符所在的描述符表块
    pub(crate) fn sync_group(&self, g: usize) -> Result<()> {
        let per_block = self.block_size / GROUP_DESC_SIZE;
        self.sync_gdt_block(g / per_block)
    }

    pub(crate) fn sync_groups(&self) -> Result<()> {
        let per_block = self.block_size / GROUP_DESC_SIZE;
        for i in 0..self.groups.len().div_ceil(per_block) {
            self.sync_gdt_block(i)?;
        }
        Ok(())
    }

    fn sync_gdt_block(&self, index: usize) -> Result<()> {
        let per_block = self.block_size / GROUP_DESC_SIZE;
        let start = index * per_block;
        let end = self.groups.len().min(start + per_block);

        let mut buf = self.block_buf();
        for (j, desc) in self.groups[start..end].iter().enumerate() {
            *buf.get_mut::<GroupDesc>(j * GROUP_DESC_SIZE) = desc.clone();
        }
        self.write_block(self.super_block.first_data_block + 1 + index as u32, buf.as_bytes())
    }

    /* 几何参数 */

    #[inline]
    pub fn superblock(&self) -> &SuperBlock {
        &self.super_block
    }

    #[inline]
    pub fn groups(&self) -> &[GroupDesc] {
        &self.groups
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub(crate) fn inode_size(&self) -> usize {
        self.inode_size
    }

    /// 一块所含的 512 字节扇区数，即 inode `blocks` 字段的单位换算
    #[inline]
    pub(crate) fn sectors_per_block(&self) -> u32 {
        self.sectors_per_block as u32
    }

    pub(crate) fn inode_table_blocks(&self) -> u32 {
        (self.super_block.inodes_per_group as usize * self.inode_size).div_ceil(self.block_size)
            as u32
    }

    /// 第 `g` 组的首块
    #[inline]
    pub(crate) fn group_base(&self, g: usize) -> u32 {
        self.super_block.first_data_block + g as u32 * self.super_block.blocks_per_group
    }

    /// 第 `g` 组实际拥有的块数，末组可能不满
    pub(crate) fn blocks_in_group(&self, g: usize) -> u32 {
        let base = self.group_base(g);
        self.super_block
            .blocks_per_group
            .min(self.super_block.blocks_count - base)
    }

    /// 第 `g` 组的首个数据块，在它之前都是元数据
    #[inline]
    pub(crate) fn data_start(&self, g: usize) -> u32 {
        self.groups[g].inode_table + self.inode_table_blocks()
    }

    /* 时钟 */

    /// 设置时间戳来源，默认恒为 0
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    #[inline]
    pub(crate) fn now(&self) -> u32 {
        (self.clock)()
    }

    pub fn statfs(&self) -> FsStat {
        let sb = &self.super_block;
        FsStat {
            block_size: self.block_size,
            blocks: sb.blocks_count,
            free_blocks: sb.free_blocks_count,
            reserved_blocks: sb.r_blocks_count,
            inodes: sb.inodes_count,
            free_inodes: sb.free_inodes_count,
            groups: self.groups.len() as u32,
        }
    }
}

impl fmt::Debug for Ext2FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ext2FileSystem")
            .field("partition_start", &self.partition_start)
            .field("block_size", &self.block_size)
            .field("blocks", &self.super_block.blocks_count)
            .field("inodes", &self.super_block.inodes_count)
            .field("groups", &self.groups.len())
            .finish_non_exhaustive()
    }
}

/// 超级块所在的扇区
#[inline]
fn super_lba(partition_start: u64) -> u64 {
    partition_start + SUPER_BLOCK_OFFSET / SECTOR_SIZE as u64
}

fn read_super(device: &dyn BlockDevice, partition_start: u64) -> Result<SuperBlock> {
    let mut buf = BlockBuf::new(SUPER_BLOCK_SIZE);
    let read = device.read_sectors(super_lba(partition_start), buf.as_bytes_mut())?;
    if read != SUPER_BLOCK_SIZE {
        return Err(Error::BlockReadFailure);
    }

    Ok(buf.get::<SuperBlock>(0).clone())
}

fn write_super(device: &dyn BlockDevice, partition_start: u64, super_block: &SuperBlock) -> Result<()> {
    const _: () = assert!(mem::size_of::<SuperBlock>() == SUPER_BLOCK_SIZE);

    let mut buf = BlockBuf::new(SUPER_BLOCK_SIZE);
    *buf.get_mut::<SuperBlock>(0) = super_block.clone();
    device.write_sectors(super_lba(partition_start), buf.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use block_dev::RamDisk;

    use super::*;

    fn ram(sectors: u64) -> Arc<dyn BlockDevice> {
        Arc::new(RamDisk::new(sectors))
    }

    #[test]
    fn default_geometry() {
        let dev = ram(131072);
        Ext2FileSystem::format(dev.clone(), 0, 131072).unwrap();
        let fs = Ext2FileSystem::mount(dev, 0).unwrap();

        let sb = fs.superblock();
        assert_eq!(65536, sb.blocks_count);
        assert_eq!(8, fs.group_count());
        assert_eq!(16384, sb.inodes_count);
        assert_eq!(16384 - 10, sb.free_inodes_count);
        assert_eq!(65536 * 5 / 100, sb.r_blocks_count);
        assert_eq!(1, sb.first_data_block);
        assert_eq!(b"krnel", sb.label());

        // 块组 0：超级块 + 描述符表 1 块 + 两个位图 + 256 块 inode 表 + 根目录
        assert_eq!(3, fs.groups()[0].block_bitmap);
        assert_eq!(5, fs.groups()[0].inode_table);
        assert_eq!(8192 - 261, fs.groups()[0].free_blocks_count as u32);
        assert_eq!(8193, fs.groups()[1].block_bitmap);

        let free: u32 = fs.groups().iter().map(|g| g.free_blocks_count as u32).sum();
        assert_eq!(sb.free_blocks_count, free);
    }

    #[test]
    fn trailing_group_dropped() {
        // 8192 + 100 个数据块：第二组装不下 258 块元数据
        let dev = ram(2 * (1 + 8192 + 100));
        Ext2FileSystem::format(dev.clone(), 0, 0).unwrap();
        let fs = Ext2FileSystem::mount(dev, 0).unwrap();
        assert_eq!(1, fs.group_count());
        assert_eq!(8193, fs.superblock().blocks_count);
    }

    #[test]
    fn larger_blocks() {
        let dev = ram(16384);
        let options = FormatOptions {
            log_block_size: 2,
            inodes_per_group: 1024,
            inode_size: 256,
            ..Default::default()
        };
        Ext2FileSystem::format_with(dev.clone(), 0, 0, &options).unwrap();

        let fs = Ext2FileSystem::mount(dev, 0).unwrap();
        assert_eq!(4096, fs.block_size());
        assert_eq!(2048, fs.superblock().blocks_count);
        assert_eq!(0, fs.superblock().first_data_block);
        assert_eq!(256, fs.inode_size());
        assert_eq!(2, fs.groups()[0].block_bitmap);
    }

    #[test]
    fn partition_offset() {
        let dev = ram(4096 + 2048);
        Ext2FileSystem::format(dev.clone(), 2048, 4096).unwrap();
        let fs = Ext2FileSystem::mount(dev.clone(), 2048).unwrap();
        assert_eq!(2048, fs.superblock().blocks_count);

        // 分区之前的扇区保持原样
        let mut head = [0xFF; 512];
        dev.read_sectors(2, &mut head).unwrap();
        assert!(head.iter().all(|&b| b == 0));
    }

    #[test]
    fn rejects_bad_options() {
        let dev = ram(8192);
        let options = FormatOptions {
            inode_size: 100,
            ..Default::default()
        };
        assert_eq!(
            Err(Error::InvalidGeometry),
            Ext2FileSystem::format_with(dev.clone(), 0, 0, &options)
        );
        assert_eq!(Err(Error::OutOfRange), Ext2FileSystem::format(dev.clone(), 0, 9000));
        assert_eq!(Err(Error::InvalidGeometry), Ext2FileSystem::format(dev, 0, 200));
    }

    #[test]
    fn mount_formats_blank_device() {
        let dev = ram(8192);
        let fs = Ext2FileSystem::mount(dev, 0).unwrap();
        assert!(fs.superblock().is_valid());
        assert_eq!(4096, fs.superblock().blocks_count);
    }

    #[test]
    fn mount_formats_default_size() {
        // 128 MiB 的空白设备只格式化出默认的 64 MiB
        let dev = ram(262144);
        let fs = Ext2FileSystem::mount(dev, 0).unwrap();
        assert_eq!(65536, fs.superblock().blocks_count);
        assert_eq!(8, fs.group_count());
    }

    #[test]
    fn corrupt_descriptor() {
        let dev = ram(8192);
        Ext2FileSystem::format(dev.clone(), 0, 0).unwrap();

        // 块组 0 描述符的 inode_table 字段，加上表长会溢出
        let mut sector = [0; 512];
        dev.read_sectors(4, &mut sector).unwrap();
        sector[8..12].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        dev.write_sectors(4, &sector).unwrap();

        assert_eq!(
            Err(Error::InvalidGeometry),
            Ext2FileSystem::mount(dev, 0).map(|_| ())
        );
    }

    #[test]
    fn clock() {
        let dev = ram(8192);
        let mut fs = Ext2FileSystem::mount(dev.clone(), 0).unwrap();
        assert_eq!(0, fs.read_inode(ROOT_INO).unwrap().mtime);

        fs.set_clock(|| 1_700_000_000);
        let ino = fs.create_file(ROOT_INO, "stamped", 0o644).unwrap();
        let inode = fs.read_inode(ino).unwrap();
        assert_eq!(1_700_000_000, inode.ctime);
        assert_eq!(1_700_000_000, inode.mtime);
        fs.close().unwrap();

        let fs = Ext2FileSystem::mount(dev, 0).unwrap();
        assert_eq!(1_700_000_000, fs.superblock().wtime);
    }

    #[test]
    fn block_bounds() {
        let dev = ram(8192);
        let fs = Ext2FileSystem::mount(dev, 0).unwrap();
        let mut buf = fs.block_buf();
        assert_eq!(Err(Error::OutOfRange), fs.read_block(4096, buf.as_bytes_mut()));
        assert_eq!(Err(Error::OutOfRange), fs.read_block(0, &mut [0; 512]));
        assert_eq!(Ok(()), fs.read_block(4095, buf.as_bytes_mut()));
    }

    #[test]
    fn stat() {
        let dev = ram(8192);
        let fs = Ext2FileSystem::mount(dev, 0).unwrap();
        let stat = fs.statfs();
        assert_eq!(1024, stat.block_size);
        assert_eq!(4096, stat.blocks);
        assert_eq!(1, stat.groups);
        assert_eq!(2038, stat.free_inodes);
    }
}
