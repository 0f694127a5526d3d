//! # 块设备接口层
//!
//! 块设备是以**扇区**为单位寻址的设备，例如磁盘、U盘等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 文件系统只通过块设备驱动读写块设备，不关心其背后是 ATA 通道、内存还是宿主机文件。

#![no_std]

extern crate alloc;

mod error;
mod ram_disk;

use core::any::Any;

pub use self::{error::Error, ram_disk::RamDisk};

/// 扇区的字节数，所有传输都以此为单位
pub const SECTOR_SIZE: usize = 512;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    /// 可寻址的扇区总数
    fn sector_count(&self) -> u64;

    /// 从 `lba` 起读取 `buf.len() / SECTOR_SIZE` 个扇区，返回读到的字节数
    fn read_sectors(&self, lba: u64, buf: &mut [u8]) -> Result<usize, Error>;

    /// 从 `lba` 起写入 `buf.len() / SECTOR_SIZE` 个扇区，返回写入的字节数
    fn write_sectors(&self, lba: u64, buf: &[u8]) -> Result<usize, Error>;
}

/// 检查一次传输的范围，返回其扇区数。
///
/// 扇区数不得为零，缓冲区必须是整数个扇区，且末尾不得越过 `capacity`。
pub fn check_range(capacity: u64, lba: u64, len: usize) -> Result<u64, Error> {
    if len == 0 || len % SECTOR_SIZE != 0 {
        return Err(Error::OutOfRange);
    }

    let count = (len / SECTOR_SIZE) as u64;
    match lba.checked_add(count) {
        Some(end) if end <= capacity => Ok(count),
        _ => Err(Error::OutOfRange),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range() {
        assert_eq!(Ok(1), check_range(8, 7, 512));
        assert_eq!(Ok(8), check_range(8, 0, 4096));
        assert_eq!(Err(Error::OutOfRange), check_range(8, 8, 512));
        assert_eq!(Err(Error::OutOfRange), check_range(8, 0, 0));
        assert_eq!(Err(Error::OutOfRange), check_range(8, 0, 100));
        assert_eq!(Err(Error::OutOfRange), check_range(8, u64::MAX, 512));
    }
}
