use vfs::DirEntryType;

use crate::layout::FileType;
use crate::{BLOCK_POINTERS, DIRECT_BLOCKS};

/// 本实现读写的 inode 记录长度；卷上的记录可以更长，多出的部分原样保留
pub const INODE_RECORD_SIZE: usize = 128;

/// 类型位的掩码
pub const S_IFMT: u16 = 0xF000;
pub const S_IFDIR: u16 = 0x4000;
pub const S_IFREG: u16 = 0x8000;

/// 磁盘上的 inode 记录
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Inode {
    /// 类型与权限位
    pub mode: u16,
    pub uid: u16,
    /// 文件字节数
    pub size: u32,
    pub atime: u32,
    pub ctime: u32,
    pub mtime: u32,
    /// 删除时间
    pub dtime: u32,
    pub gid: u16,
    pub links_count: u16,
    /// 占用的 512 字节扇区数
    pub blocks: u32,
    pub flags: u32,
    _osd1: u32,
    /// 0..12 为直接块指针，12..15 为间接块指针，恒为 0
    pub block: [u32; BLOCK_POINTERS],
    pub generation: u32,
    pub file_acl: u32,
    pub dir_acl: u32,
    _faddr: u32,
    _osd2: [u8; 12],
}

impl Inode {
    /// 类型与权限为 `mode`、时间戳为 `now` 的空 inode
    pub fn new(mode: u16, now: u32) -> Self {
        Self {
            mode,
            atime: now,
            ctime: now,
            mtime: now,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    /// 目录项中记录的类型码
    pub fn file_type(&self) -> FileType {
        FileType::from_mode(self.mode)
    }

    pub fn kind(&self) -> DirEntryType {
        self.file_type().into()
    }

    /// 依次给出已分配的直接块，遇到空指针即止
    pub fn direct_blocks(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.block[..DIRECT_BLOCKS]
            .iter()
            .copied()
            .enumerate()
            .take_while(|&(_, block)| block != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let dir = Inode::new(S_IFDIR | 0o755, 7);
        assert!(dir.is_dir() && !dir.is_file());
        assert_eq!(DirEntryType::Directory, dir.kind());
        assert_eq!(7, dir.mtime);

        let file = Inode::new(S_IFREG | 0o644, 0);
        assert!(file.is_file());
        assert_eq!(FileType::Regular, file.file_type());
    }

    #[test]
    fn block_offset() {
        let inode = Inode::default();
        let base = &inode as *const Inode as usize;
        assert_eq!(40, inode.block.as_ptr() as usize - base);
    }

    #[test]
    fn direct_blocks_stop_at_hole() {
        let mut inode = Inode::default();
        inode.block[0] = 100;
        inode.block[1] = 101;
        inode.block[3] = 103;
        let blocks: alloc::vec::Vec<_> = inode.direct_blocks().collect();
        assert_eq!(alloc::vec![(0, 100), (1, 101)], blocks);
    }
}
