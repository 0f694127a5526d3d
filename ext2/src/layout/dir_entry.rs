//! 目录项
//!
//! 目录的数据块由变长记录首尾相接地填满：
//!
//! inode (u32) | rec_len (u16) | name_len (u8) | file_type (u8) | name
//!
//! `rec_len` 是到下一条记录的距离，按 4 字节对齐，块中最后一条记录一直延伸到块尾。
//! inode 为 0 的记录是墓碑，其空间可被复用。

use vfs::DirEntryType;

use crate::layout::S_IFMT;

/// 记录头的字节数
pub const HEADER_LEN: usize = 8;

/// 容纳 `name_len` 字节名字的最短记录长度
#[inline]
pub const fn rec_len(name_len: usize) -> usize {
    (HEADER_LEN + name_len).next_multiple_of(4)
}

/// 目录项中的类型码
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FileType {
    Unknown   = 0,
    Regular   = 1,
    Directory = 2,
    CharDev   = 3,
    BlockDev  = 4,
    Fifo      = 5,
    Socket    = 6,
    Symlink   = 7,
}

impl FileType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Regular,
            2 => Self::Directory,
            3 => Self::CharDev,
            4 => Self::BlockDev,
            5 => Self::Fifo,
            6 => Self::Socket,
            7 => Self::Symlink,
            _ => Self::Unknown,
        }
    }

    /// 由 inode 的类型位推出
    pub fn from_mode(mode: u16) -> Self {
        match mode & S_IFMT {
            0x8000 => Self::Regular,
            0x4000 => Self::Directory,
            0x2000 => Self::CharDev,
            0x6000 => Self::BlockDev,
            0x1000 => Self::Fifo,
            0xC000 => Self::Socket,
            0xA000 => Self::Symlink,
            _ => Self::Unknown,
        }
    }
}

impl From<FileType> for DirEntryType {
    fn from(ty: FileType) -> Self {
        match ty {
            FileType::Unknown => Self::Unknown,
            FileType::Regular => Self::Regular,
            FileType::Directory => Self::Directory,
            FileType::CharDev => Self::Char,
            FileType::BlockDev => Self::Block,
            FileType::Fifo => Self::Fifo,
            FileType::Socket => Self::Socket,
            FileType::Symlink => Self::SymLink,
        }
    }
}

/// 块内的一条记录
#[derive(Debug, Clone, Copy)]
pub struct DirEntryRef<'a> {
    /// 记录在块内的偏移
    pub offset: usize,
    pub inode: u32,
    pub rec_len: usize,
    pub file_type: u8,
    pub name: &'a [u8],
}

impl DirEntryRef<'_> {
    #[inline]
    pub fn is_live(&self) -> bool {
        self.inode != 0
    }

    /// 记录本身实际需要的长度，`rec_len` 超出它的部分是松弛空间
    #[inline]
    pub fn used_len(&self) -> usize {
        rec_len(self.name.len())
    }
}

/// 沿 `rec_len` 遍历一个目录块。
///
/// 遇到长度为 0、未对齐或越过块尾的记录即停止。
#[derive(Debug, Clone)]
pub struct DirEntryIter<'a> {
    block: &'a [u8],
    offset: usize,
}

impl<'a> DirEntryIter<'a> {
    pub fn new(block: &'a [u8]) -> Self {
        Self { block, offset: 0 }
    }
}

impl<'a> Iterator for DirEntryIter<'a> {
    type Item = DirEntryRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.block;
        let at = self.offset;
        if at + HEADER_LEN > block.len() {
            return None;
        }

        let inode = u32::from_le_bytes(block[at..at + 4].try_into().ok()?);
        let rec_len = u16::from_le_bytes([block[at + 4], block[at + 5]]) as usize;
        let name_len = block[at + 6] as usize;

        if rec_len < HEADER_LEN
            || rec_len % 4 != 0
            || at + rec_len > block.len()
            || HEADER_LEN + name_len > rec_len
        {
            log::error!("corrupt directory record at {at}: rec_len={rec_len}, name_len={name_len}");
            self.offset = block.len();
            return None;
        }
        self.offset += rec_len;

        Some(DirEntryRef {
            offset: at,
            inode,
            rec_len,
            file_type: block[at + 7],
            name: &block[at + HEADER_LEN..at + HEADER_LEN + name_len],
        })
    }
}

pub(crate) fn write_entry(
    block: &mut [u8],
    offset: usize,
    inode: u32,
    rec_len: usize,
    file_type: FileType,
    name: &[u8],
) {
    set_inode(block, offset, inode);
    set_rec_len(block, offset, rec_len);
    block[offset + 6] = name.len() as u8;
    block[offset + 7] = file_type as u8;
    block[offset + HEADER_LEN..offset + HEADER_LEN + name.len()].copy_from_slice(name);
}

#[inline]
pub(crate) fn set_inode(block: &mut [u8], offset: usize, inode: u32) {
    block[offset..offset + 4].copy_from_slice(&inode.to_le_bytes());
}

#[inline]
pub(crate) fn set_rec_len(block: &mut [u8], offset: usize, rec_len: usize) {
    block[offset + 4..offset + 6].copy_from_slice(&(rec_len as u16).to_le_bytes());
}

/// 在块内放入一条新记录：复用足够大的墓碑，或者切分松弛空间足够的记录。
/// 块内没有足够空间时返回 `false`。
pub(crate) fn insert_entry(block: &mut [u8], inode: u32, file_type: FileType, name: &[u8]) -> bool {
    let need = rec_len(name.len());

    let slot = DirEntryIter::new(block).find_map(|entry| {
        if !entry.is_live() && entry.rec_len >= need {
            Some((entry.offset, entry.rec_len, None))
        } else if entry.is_live() && entry.rec_len >= entry.used_len() + need {
            Some((entry.offset, entry.rec_len, Some(entry.used_len())))
        } else {
            None
        }
    });

    match slot {
        Some((offset, len, None)) => write_entry(block, offset, inode, len, file_type, name),
        Some((offset, len, Some(used))) => {
            set_rec_len(block, offset, used);
            write_entry(block, offset + used, inode, len - used, file_type, name);
        }
        None => return false,
    }

    true
}
