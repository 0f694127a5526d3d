mod block_file;
mod cli;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use block_dev::{BlockDevice, SECTOR_SIZE};
use clap::Parser;
use ext2::{Ext2FileSystem, FormatOptions, Session, mount_root};
use typed_bytesize::ByteSizeIec;

pub use self::{
    block_file::BlockFile,
    cli::{Cli, Command},
};

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let start = cli.start;

    match cli.command {
        Command::Format {
            size,
            log_block_size,
            label,
        } => {
            let disk_size = ByteSizeIec::mib(size).0;
            let fd = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&cli.image)?;
            fd.set_len(start * SECTOR_SIZE as u64 + disk_size)?;

            let device: Arc<dyn BlockDevice> = Arc::new(BlockFile::new(fd)?);
            let options = FormatOptions {
                log_block_size,
                label,
                ..Default::default()
            };
            let sectors = disk_size / SECTOR_SIZE as u64;
            Ext2FileSystem::format_with(device.clone(), start, sectors, &options).map_err(other)?;

            let fs = mount_root(device, start).map_err(other)?;
            let stat = fs.statfs();
            println!(
                "{}: {} blocks of {} bytes in {} groups, {} inodes",
                cli.image.display(),
                stat.blocks,
                stat.block_size,
                stat.groups,
                stat.inodes
            );
            fs.close().map_err(other)?;
        }

        Command::Pack { source, target } => {
            println!("source={source:?}\ntarget={target:?}");
            let mut fs = mount_root(open(&cli.image)?, start).map_err(other)?;
            let session = Session::new();

            let mut apps = Vec::new();
            for app in fs::read_dir(&source)? {
                let fname = app?.file_name();
                match fname.to_str().and_then(|fname| fname.split_once('.')) {
                    Some((app, _)) => apps.push(app.to_owned()),
                    None => log::warn!("skip {fname:?}: not `*.rs`"),
                }
            }

            for app in apps {
                log::info!("app={app:?}");
                let mut host_file = File::open(target.join(&app))?;
                let mut elf_data: Vec<u8> = Vec::new();
                host_file.read_to_end(&mut elf_data)?;

                session
                    .write(&mut fs, &format!("/bin/{app}"), &elf_data)
                    .map_err(other)?;
            }
            fs.close().map_err(other)?;
        }

        Command::Ls { path } => {
            let fs = Ext2FileSystem::mount(open(&cli.image)?, start).map_err(other)?;
            for entry in Session::new().list(&fs, &path).map_err(other)? {
                let stat = fs.stat(entry.inode as u32).map_err(other)?;
                println!(
                    "{:>6} {:>9} {:>3} {:>8} {}",
                    entry.inode,
                    format!("{:?}", entry.ty),
                    stat.links,
                    stat.size,
                    entry.name
                );
            }
        }

        Command::Cat { path } => {
            let fs = Ext2FileSystem::mount(open(&cli.image)?, start).map_err(other)?;
            let data = Session::new().read(&fs, &path).map_err(other)?;
            io::stdout().write_all(&data)?;
        }

        Command::Check => {
            let fs = Ext2FileSystem::mount(open(&cli.image)?, start).map_err(other)?;
            let mismatches = fs.check().map_err(other)?;
            for mismatch in &mismatches {
                println!("{mismatch:?}");
            }
            if !mismatches.is_empty() {
                return Err(io::Error::other(format!("{} mismatches", mismatches.len())));
            }

            let stat = fs.statfs();
            println!(
                "clean: {}/{} blocks free, {}/{} inodes free",
                stat.free_blocks, stat.blocks, stat.free_inodes, stat.inodes
            );
        }
    }

    Ok(())
}

fn open(image: &Path) -> io::Result<Arc<dyn BlockDevice>> {
    let fd = OpenOptions::new().read(true).write(true).open(image)?;
    Ok(Arc::new(BlockFile::new(fd)?))
}

fn other(err: vfs::Error) -> io::Error {
    io::Error::other(err.to_string())
}
