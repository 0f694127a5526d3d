use crate::DirEntryType;

#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C, align(32))]
pub struct Stat {
    /// Inode number
    pub inode: u64,
    pub mode: DirEntryType,
    /// Hard links
    pub links: u32,
    /// Optimal I/O block size
    pub block_size: u64,
    /// Occupying blocks
    pub blocks: u64,
    /// File size
    pub size: u64,
}
