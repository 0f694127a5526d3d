//! # 路径会话
//!
//! 外壳与用户管理通过 [`Session`] 按路径访问文件系统。
//! 会话只记住工作目录，文件系统本身由调用者传入 (通常取自 [`crate::RootMount::with`])。

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use vfs::{DirEntry, DirEntryType, Error};

use crate::{Ext2FileSystem, ROOT_INO, Result};

#[derive(Debug, Clone)]
pub struct Session {
    /// 工作目录的 inode 号
    cwd: u32,
    /// 工作目录的绝对路径
    path: String,
}

impl Session {
    /// 从根目录开始的会话
    pub fn new() -> Self {
        Self {
            cwd: ROOT_INO,
            path: String::from("/"),
        }
    }

    #[inline]
    pub fn cwd(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn cwd_inode(&self) -> u32 {
        self.cwd
    }

    /// 把绝对或相对路径解析为 inode 号，`.` 与 `..` 按磁盘上的目录项解析
    pub fn resolve(&self, fs: &Ext2FileSystem, path: &str) -> Result<u32> {
        let mut ino = if path.starts_with('/') { ROOT_INO } else { self.cwd };
        for name in path.split('/').filter(|name| !name.is_empty()) {
            let dir = fs.read_inode(ino)?;
            (ino, _) = fs.find_inode(&dir, name)?.ok_or(Error::EntryNotFound)?;
        }

        Ok(ino)
    }

    pub fn chdir(&mut self, fs: &Ext2FileSystem, path: &str) -> Result<()> {
        let ino = self.resolve(fs, path)?;
        if !fs.read_inode(ino)?.is_dir() {
            return Err(Error::NotADirectory);
        }

        self.cwd = ino;
        self.path = join(&self.path, path);
        log::trace!("session: cwd is now {} ({ino})", self.path);

        Ok(())
    }

    pub fn exists(&self, fs: &Ext2FileSystem, path: &str) -> bool {
        self.resolve(fs, path).is_ok()
    }

    pub fn size(&self, fs: &Ext2FileSystem, path: &str) -> Result<u32> {
        Ok(fs.read_inode(self.resolve(fs, path)?)?.size)
    }

    pub fn kind(&self, fs: &Ext2FileSystem, path: &str) -> Result<DirEntryType> {
        Ok(fs.read_inode(self.resolve(fs, path)?)?.kind())
    }

    /// 读出整个文件
    pub fn read(&self, fs: &Ext2FileSystem, path: &str) -> Result<Vec<u8>> {
        let inode = fs.read_inode(self.resolve(fs, path)?)?;
        if inode.is_dir() {
            return Err(Error::IsADirectory);
        }

        let mut buf = vec![0; inode.size as usize];
        let n = fs.read_file(&inode, 0, &mut buf)?;
        buf.truncate(n);

        Ok(buf)
    }

    /// 以 `data` 重写文件，文件不存在时先创建
    pub fn write(&self, fs: &mut Ext2FileSystem, path: &str, data: &[u8]) -> Result<usize> {
        let (parent, name) = self.split(fs, path)?;
        let dir = fs.read_inode(parent)?;
        let ino = match fs.find_inode(&dir, name)? {
            Some((ino, _)) => ino,
            None => fs.create_file(parent, name, 0o644)?,
        };

        fs.write_file_at(ino, data)
    }

    pub fn create(&self, fs: &mut Ext2FileSystem, path: &str) -> Result<u32> {
        let (parent, name) = self.split(fs, path)?;
        fs.create_file(parent, name, 0o644)
    }

    pub fn mkdir(&self, fs: &mut Ext2FileSystem, path: &str) -> Result<u32> {
        let (parent, name) = self.split(fs, path)?;
        fs.mkdir(parent, name)
    }

    /// 删除文件或空目录
    pub fn remove(&self, fs: &mut Ext2FileSystem, path: &str) -> Result<()> {
        let (parent, name) = self.split(fs, path)?;
        match fs.unlink(parent, name) {
            Err(Error::IsADirectory) => fs.rmdir(parent, name),
            result => result,
        }
    }

    pub fn list(&self, fs: &Ext2FileSystem, path: &str) -> Result<Vec<DirEntry>> {
        let inode = fs.read_inode(self.resolve(fs, path)?)?;
        fs.read_dir(&inode)
    }

    /// 为用户在 `/home` 下建立主目录
    pub fn create_home(&self, fs: &mut Ext2FileSystem, user: &str) -> Result<u32> {
        let home = self.resolve(fs, "/home")?;
        fs.mkdir(home, user)
    }

    /// 拆分出父目录的 inode 号与末级名字
    fn split<'p>(&self, fs: &Ext2FileSystem, path: &'p str) -> Result<(u32, &'p str)> {
        let path = path.trim_end_matches('/');
        match path.rsplit_once('/') {
            Some(("", name)) => Ok((ROOT_INO, name)),
            Some((parent, name)) => Ok((self.resolve(fs, parent)?, name)),
            None => Ok((self.cwd, path)),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// 在字面上把 `path` 接到 `base` 之后并规范化
fn join(base: &str, path: &str) -> String {
    let mut parts: Vec<&str> = if path.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|part| !part.is_empty()).collect()
    };

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }

    let mut joined = String::new();
    for part in parts {
        joined.push('/');
        joined.push_str(part);
    }
    if joined.is_empty() {
        joined.push('/');
    }

    joined
}
