use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /* 设备层 */
    DeviceAbsent,
    DeviceTimeout,
    DeviceFault,
    OutOfRange,

    /* 卷与元数据 */
    BadMagic,
    InvalidGeometry,
    NotMounted,
    InodeOutOfRange,
    BlockReadFailure,

    /* 分配器 */
    NoFreeBlocks,
    NoFreeInodes,
    DoubleFree,

    /* 目录与文件 */
    DirectoryFull,
    EntryExists,
    EntryNotFound,
    NotADirectory,
    IsADirectory,
    DirectoryNotEmpty,
    InvalidName,
    FileTooLarge,
    UnsupportedWriteOffset,
}

impl From<block_dev::Error> for Error {
    fn from(err: block_dev::Error) -> Self {
        match err {
            block_dev::Error::DeviceAbsent => Self::DeviceAbsent,
            block_dev::Error::DeviceTimeout => Self::DeviceTimeout,
            block_dev::Error::DeviceFault => Self::DeviceFault,
            block_dev::Error::OutOfRange => Self::OutOfRange,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::DeviceAbsent => "device absent",
            Self::DeviceTimeout => "device timed out",
            Self::DeviceFault => "device fault",
            Self::OutOfRange => "out of range",
            Self::BadMagic => "bad superblock magic",
            Self::InvalidGeometry => "invalid filesystem geometry",
            Self::NotMounted => "no filesystem mounted",
            Self::InodeOutOfRange => "inode number out of range",
            Self::BlockReadFailure => "short block read",
            Self::NoFreeBlocks => "no free blocks",
            Self::NoFreeInodes => "no free inodes",
            Self::DoubleFree => "double free",
            Self::DirectoryFull => "directory full",
            Self::EntryExists => "entry already exists",
            Self::EntryNotFound => "entry not found",
            Self::NotADirectory => "not a directory",
            Self::IsADirectory => "is a directory",
            Self::DirectoryNotEmpty => "directory not empty",
            Self::InvalidName => "invalid file name",
            Self::FileTooLarge => "file too large",
            Self::UnsupportedWriteOffset => "writes must start at offset 0",
        };
        f.write_str(msg)
    }
}
