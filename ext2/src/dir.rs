//! # 目录层
//!
//! 目录是以目录项为内容的文件。查找、插入与删除都只在 12 个直接块中进行，
//! 名字按字节精确比较，区分大小写。

use alloc::string::String;
use alloc::vec::Vec;

use vfs::{DirEntry, Error, Stat};

use crate::layout::{
    DirEntryIter, FileType, Inode, S_IFDIR, S_IFREG, insert_entry, set_inode, set_rec_len,
    write_entry,
};
use crate::{DIRECT_BLOCKS, Ext2FileSystem, NAME_MAX, Result};

/// 把 `block` 初始化为新目录的首块：`.` 指向自身，`..` 指向父目录并延伸到块尾
pub(crate) fn init_dir_block(block: &mut [u8], ino: u32, parent: u32) {
    block.fill(0);
    write_entry(block, 0, ino, 12, FileType::Directory, b".");
    write_entry(block, 12, parent, block.len() - 12, FileType::Directory, b"..");
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > NAME_MAX || name.contains(['/', '\0']) {
        return Err(Error::InvalidName);
    }
    Ok(())
}

impl Ext2FileSystem {
    /// 在目录 `dir` 中按名字查找，返回 inode 号及其内容
    pub fn find_inode(&self, dir: &Inode, name: &str) -> Result<Option<(u32, Inode)>> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory);
        }

        let mut buf = self.block_buf();
        for (_, block) in dir.direct_blocks() {
            self.read_block(block, buf.as_bytes_mut())?;
            let found = DirEntryIter::new(buf.as_bytes())
                .find(|entry| entry.is_live() && entry.name == name.as_bytes())
                .map(|entry| entry.inode);

            if let Some(ino) = found {
                return Ok(Some((ino, self.read_inode(ino)?)));
            }
        }

        Ok(None)
    }

    /// 在目录 `dir_ino` 中登记一条指向 `child` 的目录项。
    ///
    /// 依次尝试已有块中的墓碑与松弛空间，都放不下时为目录追加一块。
    pub fn add_entry(&mut self, dir_ino: u32, name: &str, child: u32, ty: FileType) -> Result<()> {
        check_name(name)?;
        let mut dir = self.read_inode(dir_ino)?;
        if !dir.is_dir() {
            return Err(Error::NotADirectory);
        }

        let mut buf = self.block_buf();
        let mut used = 0;
        for (slot, block) in dir.direct_blocks() {
            used = slot + 1;
            self.read_block(block, buf.as_bytes_mut())?;
            if insert_entry(buf.as_bytes_mut(), child, ty, name.as_bytes()) {
                self.write_block(block, buf.as_bytes())?;
                log::debug!("ext2: {dir_ino}/{name} -> {child} in block {block}");
                return Ok(());
            }
        }

        if used == DIRECT_BLOCKS {
            log::warn!("ext2: directory {dir_ino} is full");
            return Err(Error::DirectoryFull);
        }

        let block = self.alloc_block()?;
        buf.zeroize();
        let len = buf.len();
        write_entry(buf.as_bytes_mut(), 0, child, len, ty, name.as_bytes());
        self.write_block(block, buf.as_bytes())?;

        dir.block[used] = block;
        dir.size += self.block_size() as u32;
        dir.blocks += self.sectors_per_block();
        dir.mtime = self.now();
        self.write_inode(dir_ino, &dir)?;
        log::debug!("ext2: {dir_ino}/{name} -> {child} in new block {block}");

        Ok(())
    }

    /// 在目录 `dir_ino` 下创建空的普通文件，`mode` 只取权限位
    pub fn create_file(&mut self, dir_ino: u32, name: &str, mode: u16) -> Result<u32> {
        check_name(name)?;
        let dir = self.read_inode(dir_ino)?;
        if self.find_inode(&dir, name)?.is_some() {
            return Err(Error::EntryExists);
        }

        let ino = self.alloc_inode(false)?;
        let mut inode = Inode::new(S_IFREG | (mode & 0o7777), self.now());
        inode.links_count = 1;
        self.write_inode(ino, &inode)?;

        if let Err(err) = self.add_entry(dir_ino, name, ino, FileType::Regular) {
            self.free_inode(ino, false)?;
            return Err(err);
        }
        log::debug!("ext2: created file {name} as inode {ino}");

        Ok(ino)
    }

    pub fn mkdir(&mut self, parent: u32, name: &str) -> Result<u32> {
        check_name(name)?;
        let dir = self.read_inode(parent)?;
        if self.find_inode(&dir, name)?.is_some() {
            return Err(Error::EntryExists);
        }

        let ino = self.alloc_inode(true)?;
        let block = match self.alloc_block() {
            Ok(block) => block,
            Err(err) => {
                self.free_inode(ino, true)?;
                return Err(err);
            }
        };

        let mut buf = self.block_buf();
        init_dir_block(buf.as_bytes_mut(), ino, parent);
        self.write_block(block, buf.as_bytes())?;

        let mut inode = Inode::new(S_IFDIR | 0o755, self.now());
        inode.links_count = 2;
        inode.size = self.block_size() as u32;
        inode.blocks = self.sectors_per_block();
        inode.block[0] = block;
        self.write_inode(ino, &inode)?;

        if let Err(err) = self.add_entry(parent, name, ino, FileType::Directory) {
            self.release(ino, &mut inode)?;
            return Err(err);
        }

        // `..` 是对父目录的一次引用；add_entry 可能已改写父目录的 inode
        let mut dir = self.read_inode(parent)?;
        dir.links_count += 1;
        self.write_inode(parent, &dir)?;
        log::debug!("ext2: created directory {name} as inode {ino}");

        Ok(ino)
    }

    /// 删除目录 `dir_ino` 中名为 `name` 的普通文件；链接数归零时回收其块与 inode
    pub fn unlink(&mut self, dir_ino: u32, name: &str) -> Result<()> {
        let dir = self.read_inode(dir_ino)?;
        let (ino, mut inode) = self.find_inode(&dir, name)?.ok_or(Error::EntryNotFound)?;
        if inode.is_dir() {
            return Err(Error::IsADirectory);
        }

        self.remove_entry(&dir, name)?;
        inode.links_count = inode.links_count.saturating_sub(1);
        if inode.links_count == 0 {
            self.release(ino, &mut inode)?;
        } else {
            inode.ctime = self.now();
            self.write_inode(ino, &inode)?;
        }
        log::debug!("ext2: unlinked {dir_ino}/{name}");

        Ok(())
    }

    /// 删除空目录
    pub fn rmdir(&mut self, parent: u32, name: &str) -> Result<()> {
        if name == "." || name == ".." {
            return Err(Error::InvalidName);
        }

        let dir = self.read_inode(parent)?;
        let (ino, mut inode) = self.find_inode(&dir, name)?.ok_or(Error::EntryNotFound)?;
        if !inode.is_dir() {
            return Err(Error::NotADirectory);
        }
        if self
            .read_dir(&inode)?
            .iter()
            .any(|entry| entry.name != "." && entry.name != "..")
        {
            return Err(Error::DirectoryNotEmpty);
        }

        self.remove_entry(&dir, name)?;
        self.release(ino, &mut inode)?;

        let mut dir = self.read_inode(parent)?;
        dir.links_count = dir.links_count.saturating_sub(1);
        self.write_inode(parent, &dir)?;
        log::debug!("ext2: removed directory {parent}/{name}");

        Ok(())
    }

    /// 按块序列出目录中所有有效的目录项，包括 `.` 与 `..`
    pub fn read_dir(&self, dir: &Inode) -> Result<Vec<DirEntry>> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory);
        }

        let mut entries = Vec::new();
        let mut buf = self.block_buf();
        for (_, block) in dir.direct_blocks() {
            self.read_block(block, buf.as_bytes_mut())?;
            entries.extend(
                DirEntryIter::new(buf.as_bytes())
                    .filter(|entry| entry.is_live())
                    .map(|entry| DirEntry {
                        inode: entry.inode as u64,
                        ty: FileType::from_raw(entry.file_type).into(),
                        name: String::from_utf8_lossy(entry.name).into_owned(),
                    }),
            );
        }

        Ok(entries)
    }

    pub fn stat(&self, ino: u32) -> Result<Stat> {
        let inode = self.read_inode(ino)?;
        Ok(Stat {
            inode: ino as u64,
            mode: inode.kind(),
            links: inode.links_count as u32,
            block_size: self.block_size() as u64,
            blocks: inode.blocks as u64,
            size: inode.size as u64,
        })
    }

    /// 抹去目录项：同块中有前一条记录时并入其 `rec_len`，否则原地置为墓碑
    fn remove_entry(&self, dir: &Inode, name: &str) -> Result<()> {
        let mut buf = self.block_buf();
        for (_, block) in dir.direct_blocks() {
            self.read_block(block, buf.as_bytes_mut())?;

            let mut prev = None;
            let mut target = None;
            for entry in DirEntryIter::new(buf.as_bytes()) {
                if entry.is_live() && entry.name == name.as_bytes() {
                    target = Some((entry.offset, entry.rec_len));
                    break;
                }
                prev = Some((entry.offset, entry.rec_len));
            }

            let Some((offset, len)) = target else {
                continue;
            };
            match prev {
                Some((prev_offset, prev_len)) => {
                    set_rec_len(buf.as_bytes_mut(), prev_offset, prev_len + len)
                }
                None => set_inode(buf.as_bytes_mut(), offset, 0),
            }
            self.write_block(block, buf.as_bytes())?;

            return Ok(());
        }

        Err(Error::EntryNotFound)
    }

    /// 回收 inode 的全部数据块，记下删除时间，再释放 inode 本身
    fn release(&mut self, ino: u32, inode: &mut Inode) -> Result<()> {
        self.free_data(inode)?;
        inode.links_count = 0;
        inode.dtime = self.now();
        self.write_inode(ino, inode)?;
        self.free_inode(ino, inode.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::{format, vec};

    use block_dev::RamDisk;
    use vfs::DirEntryType;

    use super::*;
    use crate::{FIRST_INO, Mismatch, ROOT_INO};

    fn fresh() -> Ext2FileSystem {
        Ext2FileSystem::mount(Arc::new(RamDisk::new(8192)), 0).unwrap()
    }

    fn lookup(fs: &Ext2FileSystem, dir: u32, name: &str) -> Option<u32> {
        let dir = fs.read_inode(dir).unwrap();
        fs.find_inode(&dir, name).unwrap().map(|(ino, _)| ino)
    }

    #[test]
    fn root_listing() {
        let fs = fresh();
        let root = fs.read_inode(ROOT_INO).unwrap();
        let entries = fs.read_dir(&root).unwrap();

        assert_eq!(2, entries.len());
        assert_eq!(".", entries[0].name);
        assert_eq!("..", entries[1].name);
        assert!(entries.iter().all(|entry| entry.inode == ROOT_INO as u64));
        assert!(entries.iter().all(|entry| entry.ty == DirEntryType::Directory));
    }

    #[test]
    fn name_uniqueness() {
        let mut fs = fresh();
        let a = fs.create_file(ROOT_INO, "a.txt", 0o644).unwrap();
        assert_eq!(FIRST_INO, a);

        let free = fs.superblock().free_inodes_count;
        assert_eq!(Err(Error::EntryExists), fs.create_file(ROOT_INO, "a.txt", 0o644));
        assert_eq!(free, fs.superblock().free_inodes_count);

        let b = fs.create_file(ROOT_INO, "b.txt", 0o644).unwrap();
        assert_eq!(Some(b), lookup(&fs, ROOT_INO, "b.txt"));
        assert_eq!(None, lookup(&fs, ROOT_INO, "B.TXT"));

        let inode = fs.read_inode(b).unwrap();
        assert!(inode.is_file());
        assert_eq!((1, 0), (inode.links_count, inode.size));
    }

    #[test]
    fn invalid_names() {
        let mut fs = fresh();
        let long = "n".repeat(NAME_MAX + 1);
        for name in ["", "a/b", long.as_str()] {
            assert_eq!(Err(Error::InvalidName), fs.create_file(ROOT_INO, name, 0o644));
            assert_eq!(Err(Error::InvalidName), fs.mkdir(ROOT_INO, name));
        }
        assert!(fs.create_file(ROOT_INO, &"n".repeat(NAME_MAX), 0o644).is_ok());
    }

    #[test]
    fn second_block() {
        let mut fs = fresh();
        let names: Vec<_> = (0..8).map(|i| format!("{i}{}", "x".repeat(200))).collect();
        for name in &names {
            fs.create_file(ROOT_INO, name, 0o644).unwrap();
        }

        let root = fs.read_inode(ROOT_INO).unwrap();
        assert_eq!(2048, root.size);
        assert_eq!(4, root.blocks);
        assert_ne!(0, root.block[1]);
        for name in &names {
            assert!(lookup(&fs, ROOT_INO, name).is_some());
        }
        assert_eq!(10, fs.read_dir(&root).unwrap().len());
    }

    #[test]
    fn directory_full() {
        let mut fs = fresh();
        // 每块恰好容纳 3 条 260 字节的记录
        for i in 0..36 {
            let name = format!("{i:03}{}", "y".repeat(247));
            fs.create_file(ROOT_INO, &name, 0o644).unwrap();
        }

        let free = fs.superblock().free_inodes_count;
        let name = format!("999{}", "y".repeat(247));
        assert_eq!(Err(Error::DirectoryFull), fs.create_file(ROOT_INO, &name, 0o644));
        assert_eq!(free, fs.superblock().free_inodes_count);
        assert!(fs.create_file(ROOT_INO, "short", 0o644).is_ok());
        assert_eq!(Vec::<Mismatch>::new(), fs.check().unwrap());
    }

    #[test]
    fn mkdir_links() {
        let mut fs = fresh();
        let dirs = fs.groups()[0].used_dirs_count;
        let bin = fs.mkdir(ROOT_INO, "bin").unwrap();
        fs.mkdir(ROOT_INO, "home").unwrap();

        assert_eq!(4, fs.read_inode(ROOT_INO).unwrap().links_count);
        assert_eq!(dirs + 2, fs.groups()[0].used_dirs_count);

        let inode = fs.read_inode(bin).unwrap();
        assert_eq!(2, inode.links_count);
        assert_eq!(Some(bin), lookup(&fs, bin, "."));
        assert_eq!(Some(ROOT_INO), lookup(&fs, bin, ".."));
        assert_eq!(Err(Error::EntryExists), fs.mkdir(ROOT_INO, "bin"));
    }

    #[test]
    fn unlink_frees() {
        let mut fs = fresh();
        let (blocks, inodes) = (
            fs.superblock().free_blocks_count,
            fs.superblock().free_inodes_count,
        );

        let ino = fs.create_file(ROOT_INO, "data", 0o644).unwrap();
        fs.write_file_at(ino, &[7; 3000]).unwrap();
        assert_eq!(blocks - 3, fs.superblock().free_blocks_count);

        fs.unlink(ROOT_INO, "data").unwrap();
        assert_eq!(blocks, fs.superblock().free_blocks_count);
        assert_eq!(inodes, fs.superblock().free_inodes_count);
        assert_eq!(None, lookup(&fs, ROOT_INO, "data"));
        assert_eq!(0, fs.read_inode(ino).unwrap().links_count);
        assert_eq!(Err(Error::EntryNotFound), fs.unlink(ROOT_INO, "data"));
        assert_eq!(Vec::<Mismatch>::new(), fs.check().unwrap());
    }

    #[test]
    fn freed_space_is_reused() {
        let mut fs = fresh();
        fs.create_file(ROOT_INO, "a", 0o644).unwrap();
        fs.create_file(ROOT_INO, "b", 0o644).unwrap();
        fs.unlink(ROOT_INO, "a").unwrap();
        fs.create_file(ROOT_INO, "c", 0o644).unwrap();

        let root = fs.read_inode(ROOT_INO).unwrap();
        let names: Vec<_> = fs
            .read_dir(&root)
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(vec![".", "..", "c", "b"], names);
        assert_eq!(1024, root.size);
    }

    #[test]
    fn unlink_refuses_directories() {
        let mut fs = fresh();
        fs.mkdir(ROOT_INO, "bin").unwrap();
        assert_eq!(Err(Error::IsADirectory), fs.unlink(ROOT_INO, "bin"));
        assert_eq!(Err(Error::IsADirectory), fs.unlink(ROOT_INO, ".."));
    }

    #[test]
    fn rmdir() {
        let mut fs = fresh();
        let (blocks, inodes) = (
            fs.superblock().free_blocks_count,
            fs.superblock().free_inodes_count,
        );
        let home = fs.mkdir(ROOT_INO, "home").unwrap();
        fs.mkdir(home, "alice").unwrap();
        fs.create_file(ROOT_INO, "f", 0o644).unwrap();

        assert_eq!(Err(Error::DirectoryNotEmpty), fs.rmdir(ROOT_INO, "home"));
        assert_eq!(Err(Error::NotADirectory), fs.rmdir(ROOT_INO, "f"));
        assert_eq!(Err(Error::InvalidName), fs.rmdir(home, ".."));

        fs.rmdir(home, "alice").unwrap();
        assert_eq!(2, fs.read_inode(home).unwrap().links_count);
        fs.rmdir(ROOT_INO, "home").unwrap();
        fs.unlink(ROOT_INO, "f").unwrap();

        assert_eq!(2, fs.read_inode(ROOT_INO).unwrap().links_count);
        assert_eq!(blocks, fs.superblock().free_blocks_count);
        assert_eq!(inodes, fs.superblock().free_inodes_count);
        assert_eq!(Vec::<Mismatch>::new(), fs.check().unwrap());
    }

    #[test]
    fn not_a_directory() {
        let mut fs = fresh();
        let ino = fs.create_file(ROOT_INO, "f", 0o644).unwrap();
        let file = fs.read_inode(ino).unwrap();
        assert_eq!(Err(Error::NotADirectory), fs.find_inode(&file, "x"));
        assert_eq!(Err(Error::NotADirectory), fs.read_dir(&file));
        assert_eq!(Err(Error::NotADirectory), fs.create_file(ino, "x", 0o644));
    }

    #[test]
    fn stat() {
        let mut fs = fresh();
        let ino = fs.create_file(ROOT_INO, "f", 0o644).unwrap();
        fs.write_file_at(ino, b"hello").unwrap();

        let stat = fs.stat(ino).unwrap();
        assert_eq!(ino as u64, stat.inode);
        assert_eq!(DirEntryType::Regular, stat.mode);
        assert_eq!((1, 2, 5), (stat.links, stat.blocks, stat.size));
        assert_eq!(DirEntryType::Directory, fs.stat(ROOT_INO).unwrap().mode);
    }
}
