use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use block_dev::{BlockDevice, Error, SECTOR_SIZE, check_range};
use send_wrapper::SendWrapper;

/// 以宿主机上的镜像文件充当块设备
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
    sectors: u64,
}

impl BlockFile {
    pub fn new(fd: File) -> io::Result<Self> {
        let sectors = fd.metadata()?.len() / SECTOR_SIZE as u64;
        Ok(Self {
            inner: SendWrapper::new(RefCell::new(fd)),
            sectors,
        })
    }
}

fn fault(err: io::Error) -> Error {
    log::error!("image I/O failed: {err}");
    Error::DeviceFault
}

impl BlockDevice for BlockFile {
    fn sector_count(&self) -> u64 {
        self.sectors
    }

    fn read_sectors(&self, lba: u64, buf: &mut [u8]) -> Result<usize, Error> {
        check_range(self.sectors, lba, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start(lba * SECTOR_SIZE as u64))
            .map_err(fault)?;
        file.read_exact(buf).map_err(fault)?;

        Ok(buf.len())
    }

    fn write_sectors(&self, lba: u64, buf: &[u8]) -> Result<usize, Error> {
        check_range(self.sectors, lba, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start(lba * SECTOR_SIZE as u64))
            .map_err(fault)?;
        file.write_all(buf).map_err(fault)?;

        Ok(buf.len())
    }
}
