//! 内存盘
//!
//! 没有探测到磁盘时，根文件系统就建立在它上面；测试也用它充当假设备。

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use spin::Mutex;

use crate::{BlockDevice, Error, SECTOR_SIZE, check_range};

pub struct RamDisk {
    data: Mutex<Vec<u8>>,
    sectors: u64,
}

impl RamDisk {
    /// 创建 `sectors` 个扇区、内容全零的内存盘
    pub fn new(sectors: u64) -> Self {
        Self {
            data: Mutex::new(vec![0; sectors as usize * SECTOR_SIZE]),
            sectors,
        }
    }

    /// 以现成的镜像内容创建内存盘，末尾不足一个扇区的部分补零
    pub fn from_image(mut image: Vec<u8>) -> Self {
        let len = image.len().next_multiple_of(SECTOR_SIZE);
        image.resize(len, 0);

        Self {
            sectors: (len / SECTOR_SIZE) as u64,
            data: Mutex::new(image),
        }
    }

    /// 整盘内容的拷贝
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().clone()
    }
}

impl BlockDevice for RamDisk {
    fn sector_count(&self) -> u64 {
        self.sectors
    }

    fn read_sectors(&self, lba: u64, buf: &mut [u8]) -> Result<usize, Error> {
        check_range(self.sectors, lba, buf.len())?;
        let start = lba as usize * SECTOR_SIZE;
        buf.copy_from_slice(&self.data.lock()[start..start + buf.len()]);
        log::trace!("ramdisk: read lba={lba} len={}", buf.len());

        Ok(buf.len())
    }

    fn write_sectors(&self, lba: u64, buf: &[u8]) -> Result<usize, Error> {
        check_range(self.sectors, lba, buf.len())?;
        let start = lba as usize * SECTOR_SIZE;
        self.data.lock()[start..start + buf.len()].copy_from_slice(buf);
        log::trace!("ramdisk: write lba={lba} len={}", buf.len());

        Ok(buf.len())
    }
}

impl fmt::Debug for RamDisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RamDisk")
            .field("sectors", &self.sectors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_back() {
        let disk = RamDisk::new(4);
        let data = [0xA5; 1024];
        assert_eq!(Ok(1024), disk.write_sectors(2, &data));

        let mut buf = [0; 1024];
        assert_eq!(Ok(1024), disk.read_sectors(2, &mut buf));
        assert_eq!(data, buf);

        let mut head = [0xFF; 512];
        disk.read_sectors(0, &mut head).unwrap();
        assert!(head.iter().all(|&b| b == 0));
    }

    #[test]
    fn bounds() {
        let disk = RamDisk::new(4);
        let mut buf = [0; 1024];
        assert_eq!(Err(Error::OutOfRange), disk.read_sectors(3, &mut buf));
        assert_eq!(Err(Error::OutOfRange), disk.write_sectors(4, &buf[..512]));
        assert_eq!(Err(Error::OutOfRange), disk.write_sectors(0, &buf[..0]));
    }

    #[test]
    fn image_padding() {
        let disk = RamDisk::from_image(vec![1; 600]);
        assert_eq!(2, disk.sector_count());
        assert_eq!(1024, disk.snapshot().len());
    }
}
