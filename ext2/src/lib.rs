#![no_std]

extern crate alloc;

/* ext2 的整体架构，自上而下 */

// 挂载点、启动挂载策略与路径会话
mod mount;
mod session;

// 目录与文件数据层：目录项的增删查、文件内容读写
mod dir;
mod file;

// 分配器层：块位图与 inode 位图
mod allocator;

// inode 表层：定位并读写 inode 记录
mod inode_table;

// 卷管理层：超级块、块组描述符表、格式化与挂载
mod fs;

// 磁盘数据结构层
pub mod layout;

// 块缓冲：按挂载卷的块大小分配的临时缓冲区
mod block_buf;

pub use self::{
    allocator::Mismatch,
    block_buf::BlockBuf,
    fs::{Clock, Ext2FileSystem, FormatOptions, FsStat},
    layout::{FileType, Inode, SuperBlock},
    mount::{RootMount, mount_root, mount_root_or_ram},
    session::Session,
};

pub type Result<T> = core::result::Result<T, vfs::Error>;

pub const MAGIC: u16 = 0xEF53;
/// 超级块相对分区起点的字节偏移
pub const SUPER_BLOCK_OFFSET: u64 = 1024;
pub const SUPER_BLOCK_SIZE: usize = 1024;
/// 根目录的 inode 号
pub const ROOT_INO: u32 = 2;
/// 首个非保留的 inode 号，1..=10 保留
pub const FIRST_INO: u32 = 11;
/// 直接块指针的个数，文件最大为 `DIRECT_BLOCKS * block_size`
pub const DIRECT_BLOCKS: usize = 12;
/// inode 中块指针的总槽数，12..15 是间接块指针，恒为 0
pub const BLOCK_POINTERS: usize = 15;
/// 文件名的最大字节数
pub const NAME_MAX: usize = 255;
/// 格式化时未指定大小所用的扇区数 (64 MiB)
pub const DEFAULT_SECTORS: u64 = 131072;
