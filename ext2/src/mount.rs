//! # 挂载点
//!
//! 内核中只有一个根文件系统。它存放在 [`RootMount`] 中，
//! 所有访问都经由同一把自旋锁，因此一次只有一个文件系统调用在进行。

use alloc::sync::Arc;

use block_dev::{BlockDevice, RamDisk};
use spin::Mutex;
use vfs::Error;

use crate::{DEFAULT_SECTORS, Ext2FileSystem, ROOT_INO, Result};

/// 启动后必须存在的顶层目录
const BOOT_DIRS: [&str; 2] = ["bin", "home"];

/// 根文件系统的挂载槽
#[derive(Debug)]
pub struct RootMount {
    slot: Mutex<Option<Ext2FileSystem>>,
}

impl RootMount {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// 装入卷，返回此前挂着的卷
    pub fn install(&self, fs: Ext2FileSystem) -> Option<Ext2FileSystem> {
        self.slot.lock().replace(fs)
    }

    pub fn take(&self) -> Option<Ext2FileSystem> {
        self.slot.lock().take()
    }

    pub fn is_mounted(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// 持锁访问已挂载的卷，未挂载时返回 [`Error::NotMounted`]
    pub fn with<R>(&self, f: impl FnOnce(&mut Ext2FileSystem) -> Result<R>) -> Result<R> {
        let mut slot = self.slot.lock();
        let fs = slot.as_mut().ok_or(Error::NotMounted)?;
        f(fs)
    }

    /// 取下并关闭卷
    pub fn unmount(&self) -> Result<()> {
        self.take().ok_or(Error::NotMounted)?.close()
    }
}

impl Default for RootMount {
    fn default() -> Self {
        Self::new()
    }
}

/// 挂载根文件系统。
///
/// 挂载失败时把整个设备重新格式化后再试一次，第二次失败交由调用者处理。
/// 挂载成功后确保 `/bin` 与 `/home` 存在。
pub fn mount_root(device: Arc<dyn BlockDevice>, partition_start: u64) -> Result<Ext2FileSystem> {
    let mut fs = match Ext2FileSystem::mount(device.clone(), partition_start) {
        Ok(fs) => fs,
        Err(err) => {
            log::warn!("ext2: mount failed: {err}, reformatting");
            Ext2FileSystem::format(device.clone(), partition_start, 0)?;
            Ext2FileSystem::mount(device, partition_start)?
        }
    };

    for name in BOOT_DIRS {
        match fs.mkdir(ROOT_INO, name) {
            Ok(ino) => log::info!("ext2: created /{name} as inode {ino}"),
            Err(Error::EntryExists) => {}
            Err(err) => return Err(err),
        }
    }

    Ok(fs)
}

/// 同 [`mount_root`]，但没有探测到磁盘时改用 64 MiB 的内存盘
pub fn mount_root_or_ram(
    device: Option<Arc<dyn BlockDevice>>,
    partition_start: u64,
) -> Result<Ext2FileSystem> {
    match device {
        Some(device) => mount_root(device, partition_start),
        None => {
            log::warn!("ext2: no disk found, falling back to a {DEFAULT_SECTORS} sector RAM disk");
            mount_root(Arc::new(RamDisk::new(DEFAULT_SECTORS)), 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ROOT: RootMount = RootMount::new();

    #[test]
    fn slot() {
        let root = RootMount::new();
        assert!(!root.is_mounted());
        assert_eq!(Err(Error::NotMounted), root.with(|fs| Ok(fs.group_count())));
        assert_eq!(Err(Error::NotMounted), root.unmount());

        let fs = mount_root(Arc::new(RamDisk::new(8192)), 0).unwrap();
        assert!(root.install(fs).is_none());
        assert_eq!(Ok(1), root.with(|fs| Ok(fs.group_count())));
        assert_eq!(Ok(()), root.unmount());
        assert!(!root.is_mounted());
    }

    #[test]
    fn static_slot() {
        ROOT.install(mount_root(Arc::new(RamDisk::new(8192)), 0).unwrap());
        let ino = ROOT.with(|fs| fs.create_file(ROOT_INO, "motd", 0o644)).unwrap();
        assert_eq!(Ok(4), ROOT.with(|fs| fs.write_file_at(ino, b"hey!")));
        assert!(ROOT.take().is_some());
    }

    #[test]
    fn boot_dirs() {
        let dev: Arc<dyn BlockDevice> = Arc::new(RamDisk::new(8192));
        let fs = mount_root(dev.clone(), 0).unwrap();
        let root = fs.read_inode(ROOT_INO).unwrap();
        for name in BOOT_DIRS {
            assert!(fs.find_inode(&root, name).unwrap().is_some());
        }
        assert_eq!(4, root.links_count);
        fs.close().unwrap();

        // 再次挂载不会重复创建
        let fs = mount_root(dev, 0).unwrap();
        assert_eq!(4, fs.read_inode(ROOT_INO).unwrap().links_count);
    }

    #[test]
    fn garbage_is_reformatted() {
        let dev: Arc<dyn BlockDevice> = Arc::new(RamDisk::new(8192));
        let fs = mount_root(dev.clone(), 0).unwrap();
        fs.close().unwrap();

        // 魔数正确但几何参数损坏
        let mut sector = [0; 512];
        dev.read_sectors(2, &mut sector).unwrap();
        sector[24..28].copy_from_slice(&9u32.to_le_bytes());
        dev.write_sectors(2, &sector).unwrap();
        assert!(Ext2FileSystem::mount(dev.clone(), 0).is_err());

        let fs = mount_root(dev, 0).unwrap();
        assert_eq!(1024, fs.block_size());
    }
}
