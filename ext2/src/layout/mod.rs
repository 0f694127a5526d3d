//! # 磁盘数据结构层
//!
//! 各结构均为 `repr(C)`，字段偏移与标准 ext2 一致，按小端序存放。

mod bitmap;
mod dir_entry;
mod group_desc;
mod inode;
mod super_block;

pub use self::{
    bitmap::Bitmap,
    dir_entry::{DirEntryRef, DirEntryIter, FileType, HEADER_LEN, rec_len},
    group_desc::{GROUP_DESC_SIZE, GroupDesc},
    inode::{INODE_RECORD_SIZE, Inode, S_IFDIR, S_IFMT, S_IFREG},
    super_block::{FS_CLEAN, SuperBlock},
};

pub(crate) use self::dir_entry::{insert_entry, set_inode, set_rec_len, write_entry};
