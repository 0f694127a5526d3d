use std::sync::Arc;

use block_dev::{BlockDevice, RamDisk};
use ext2::{Ext2FileSystem, Mismatch, ROOT_INO};
use vfs::Error;

fn ram(sectors: u64) -> Arc<dyn BlockDevice> {
    Arc::new(RamDisk::new(sectors))
}

fn assert_consistent(fs: &Ext2FileSystem) {
    assert_eq!(Vec::<Mismatch>::new(), fs.check().unwrap());
}

#[test]
fn default_volume() {
    let dev = ram(131072);
    Ext2FileSystem::format(dev.clone(), 0, 131072).unwrap();
    let mut fs = Ext2FileSystem::mount(dev, 0).unwrap();

    assert_eq!(65536, fs.superblock().blocks_count);
    assert_eq!(8, fs.group_count());
    assert_eq!(2, fs.read_inode(ROOT_INO).unwrap().links_count);

    let bin = fs.mkdir(ROOT_INO, "bin").unwrap();
    let home = fs.mkdir(ROOT_INO, "home").unwrap();
    let root = fs.read_inode(ROOT_INO).unwrap();
    assert_eq!(Some(bin), fs.find_inode(&root, "bin").unwrap().map(|(ino, _)| ino));
    assert_eq!(Some(home), fs.find_inode(&root, "home").unwrap().map(|(ino, _)| ino));
    assert_eq!(4, root.links_count);
    assert_consistent(&fs);
}

#[test]
fn remount_is_idempotent() {
    let dev = ram(16384);
    Ext2FileSystem::format(dev.clone(), 0, 0).unwrap();

    // 1 KiB 块：超级块在扇区 2..4，描述符表在扇区 4..6
    let mut formatted = [0; 4 * 512];
    dev.read_sectors(2, &mut formatted).unwrap();

    let fs = Ext2FileSystem::mount(dev.clone(), 0).unwrap();
    let super_block = fs.superblock().clone();
    let groups = fs.groups().to_vec();
    fs.close().unwrap();

    let mut closed = [0; 4 * 512];
    dev.read_sectors(2, &mut closed).unwrap();
    assert_eq!(formatted, closed);

    let fs = Ext2FileSystem::mount(dev, 0).unwrap();
    assert_eq!(&super_block, fs.superblock());
    assert_eq!(groups, fs.groups());
    assert_consistent(&fs);
}

#[test]
fn contents_survive_remount() {
    let dev = ram(16384);
    let mut fs = Ext2FileSystem::mount(dev.clone(), 0).unwrap();
    let docs = fs.mkdir(ROOT_INO, "docs").unwrap();
    let ino = fs.create_file(docs, "readme", 0o644).unwrap();
    let data: Vec<u8> = (0..5000u32).map(|i| (i % 253) as u8).collect();
    fs.write_file_at(ino, &data).unwrap();
    fs.close().unwrap();

    let fs = Ext2FileSystem::mount(dev, 0).unwrap();
    let docs = fs.read_inode(docs).unwrap();
    let (found, inode) = fs.find_inode(&docs, "readme").unwrap().unwrap();
    assert_eq!(ino, found);

    let mut buf = vec![0; 6000];
    assert_eq!(Ok(5000), fs.read_file(&inode, 0, &mut buf));
    assert_eq!(data, buf[..5000]);
}

#[test]
fn create_and_unlink_restore_counts() {
    let mut fs = Ext2FileSystem::mount(ram(16384), 0).unwrap();
    let before = fs.statfs();

    for i in 0..40 {
        let name = format!("file{i}");
        let ino = fs.create_file(ROOT_INO, &name, 0o644).unwrap();
        fs.write_file_at(ino, &vec![i as u8; i * 100]).unwrap();
    }
    assert!(fs.statfs().free_blocks < before.free_blocks);
    assert_consistent(&fs);

    for i in (0..40).step_by(2) {
        fs.unlink(ROOT_INO, &format!("file{i}")).unwrap();
    }
    assert_consistent(&fs);
    for i in (1..40).step_by(2) {
        fs.unlink(ROOT_INO, &format!("file{i}")).unwrap();
    }

    let after = fs.statfs();
    assert_eq!(before.free_inodes, after.free_inodes);
    // 根目录可能因目录项增多而多占了块
    let root_growth = fs.read_inode(ROOT_INO).unwrap().blocks / 2 - 1;
    assert_eq!(before.free_blocks, after.free_blocks + root_growth);
    assert_consistent(&fs);
}

#[test]
fn group_spill() {
    // 两个块组，每组 16 个 inode
    let dev = ram(2 * 8192 * 2);
    let options = ext2::FormatOptions {
        inodes_per_group: 16,
        ..Default::default()
    };
    Ext2FileSystem::format_with(dev.clone(), 0, 0, &options).unwrap();
    let mut fs = Ext2FileSystem::mount(dev, 0).unwrap();
    assert_eq!(2, fs.group_count());

    let inodes: Vec<_> = (0..22).map(|_| fs.alloc_inode(false).unwrap()).collect();
    assert_eq!(11, inodes[0]);
    assert_eq!(16, inodes[5]);
    assert_eq!(17, inodes[6]);
    assert_eq!(32, inodes[21]);
    assert_eq!(Err(Error::NoFreeInodes), fs.alloc_inode(false));
    assert_eq!(0, fs.groups()[1].free_inodes_count);
    assert_consistent(&fs);
}
