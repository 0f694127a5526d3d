use core::mem;

use vfs::Error;

use crate::{FIRST_INO, MAGIC, Result};

/// 文件系统状态：干净卸载
pub const FS_CLEAN: u16 = 1;
/// 出错时的行为：继续
const ERRORS_CONTINUE: u16 = 1;
/// 动态修订版，`first_ino` 与 `inode_size` 有效
const DYNAMIC_REV: u32 = 1;
const GOOD_OLD_INODE_SIZE: usize = 128;
/// 支持的最大块大小为 `1024 << 2`
const MAX_LOG_BLOCK_SIZE: u32 = 2;

/// 超级块，位于分区起点之后 1024 字节处
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct SuperBlock {
    pub inodes_count: u32,
    pub blocks_count: u32,
    /// 为超级用户保留的块数
    pub r_blocks_count: u32,
    pub free_blocks_count: u32,
    pub free_inodes_count: u32,
    /// 超级块所在的块，块大小为 1024 时为 1，否则为 0
    pub first_data_block: u32,
    /// 块大小为 `1024 << log_block_size`
    pub log_block_size: u32,
    pub log_frag_size: u32,
    pub blocks_per_group: u32,
    pub frags_per_group: u32,
    pub inodes_per_group: u32,
    /// 上次挂载时间
    pub mtime: u32,
    /// 上次写入时间
    pub wtime: u32,
    pub mnt_count: u16,
    pub max_mnt_count: u16,
    pub magic: u16,
    pub state: u16,
    pub errors: u16,
    pub minor_rev_level: u16,
    pub lastcheck: u32,
    pub checkinterval: u32,
    pub creator_os: u32,
    pub rev_level: u32,
    pub def_resuid: u16,
    pub def_resgid: u16,

    /*
     * 动态修订版的扩展字段
     */
    pub first_ino: u32,
    pub inode_size: u16,
    pub block_group_nr: u16,
    pub feature_compat: u32,
    pub feature_incompat: u32,
    pub feature_ro_compat: u32,
    pub uuid: [u8; 16],
    pub volume_name: [u8; 16],
    pub last_mounted: [u8; 64],
    pub algorithm_usage_bitmap: u32,

    _reserved: [u8; 820],
}

impl SuperBlock {
    /// 全零的超级块，各字段之后再逐一填写
    pub fn zeroed() -> Self {
        // 所有字段都是整数或整数数组
        unsafe { mem::zeroed() }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn init(
        &mut self,
        blocks_count: u32,
        inodes_count: u32,
        first_data_block: u32,
        log_block_size: u32,
        blocks_per_group: u32,
        inodes_per_group: u32,
        inode_size: u16,
        now: u32,
    ) {
        *self = Self::zeroed();
        self.inodes_count = inodes_count;
        self.blocks_count = blocks_count;
        // 5% 的块留给超级用户，普通用户可用 95%
        self.r_blocks_count = (blocks_count as u64 * 5 / 100) as u32;
        self.first_data_block = first_data_block;
        self.log_block_size = log_block_size;
        self.log_frag_size = log_block_size;
        self.blocks_per_group = blocks_per_group;
        self.frags_per_group = blocks_per_group;
        self.inodes_per_group = inodes_per_group;
        self.wtime = now;
        self.max_mnt_count = u16::MAX;
        self.magic = MAGIC;
        self.state = FS_CLEAN;
        self.errors = ERRORS_CONTINUE;
        self.lastcheck = now;
        self.rev_level = DYNAMIC_REV;
        self.first_ino = FIRST_INO;
        self.inode_size = inode_size;
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    /// 块的字节数
    #[inline]
    pub fn block_size(&self) -> usize {
        1024 << self.log_block_size
    }

    /// inode 记录的字节数，旧修订版固定为 128
    #[inline]
    pub fn inode_size(&self) -> usize {
        if self.rev_level < DYNAMIC_REV {
            GOOD_OLD_INODE_SIZE
        } else {
            self.inode_size as usize
        }
    }

    #[inline]
    pub fn first_ino(&self) -> u32 {
        if self.rev_level < DYNAMIC_REV {
            FIRST_INO
        } else {
            self.first_ino
        }
    }

    /// 块组个数：数据区按每组块数向上取整
    #[inline]
    pub fn group_count(&self) -> u32 {
        (self.blocks_count - self.first_data_block).div_ceil(self.blocks_per_group)
    }

    /// 卷标，去掉末尾的 NUL
    pub fn label(&self) -> &[u8] {
        let len = self
            .volume_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.volume_name.len());
        &self.volume_name[..len]
    }

    /// 设置卷标，超出 16 字节的部分被截断
    pub fn set_label(&mut self, label: &str) {
        let len = label.len().min(self.volume_name.len());
        self.volume_name = [0; 16];
        self.volume_name[..len].copy_from_slice(&label.as_bytes()[..len]);
    }

    /// 检查几何参数能否支撑后续的寻址计算
    pub fn validate(&self) -> Result<()> {
        let valid = self.log_block_size <= MAX_LOG_BLOCK_SIZE && {
            let block_size = self.block_size();
            let bits_per_block = block_size as u32 * 8;
            let inode_size = self.inode_size();

            self.first_data_block == (block_size == 1024) as u32
                && self.blocks_count > self.first_data_block
                && (1..=bits_per_block).contains(&self.blocks_per_group)
                && (1..=bits_per_block).contains(&self.inodes_per_group)
                && inode_size >= GOOD_OLD_INODE_SIZE
                && inode_size <= block_size
                && inode_size.is_power_of_two()
                && self.inodes_count as u64
                    <= self.group_count() as u64 * self.inodes_per_group as u64
                && self.first_ino() > crate::ROOT_INO
        };

        if valid {
            Ok(())
        } else {
            log::error!(
                "superblock geometry rejected: blocks={} inodes={} log_block_size={} \
                 blocks_per_group={} inodes_per_group={} inode_size={}",
                self.blocks_count,
                self.inodes_count,
                self.log_block_size,
                self.blocks_per_group,
                self.inodes_per_group,
                self.inode_size,
            );
            Err(Error::InvalidGeometry)
        }
    }
}
