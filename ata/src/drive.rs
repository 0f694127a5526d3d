//! # ATA PIO 驱动
//!
//! 以 28 位 LBA 寻址、逐扇区轮询的方式读写硬盘。每条命令的流程：
//!
//! 等待非忙 → 写驱动器/扇区数/LBA → 发出命令 → 逐扇区 (等待数据就绪 → 传输 256 个字)
//!
//! 任何一次等待超出 [`ATA_TIMEOUT`] 次轮询即以 [`Error::DeviceTimeout`] 结束本次调用，
//! 驱动器本身不会因此被标记为失效。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use block_dev::{BlockDevice, Error, SECTOR_SIZE};
use enumflags2::BitFlags;

use crate::port::PortIo;
use crate::regs::{Channel, Command, Control, Reg, Status};
use crate::{ATA_TIMEOUT, ATAPI_SIGNATURE, LBA28_LIMIT, Lba, MAX_SECTORS_PER_COMMAND};

/// 一个扇区的 16 位字数
const SECTOR_WORDS: usize = SECTOR_SIZE / 2;

/// 通道上探测到的一个硬盘
pub struct AtaDrive<P> {
    ports: Arc<P>,
    channel: Channel,
    slave: bool,
    present: AtomicBool,
    /// 可寻址的扇区总数
    sectors: u64,
    model: String,
}

/// 轮询所等待的条件
#[derive(Debug, Clone, Copy)]
enum Phase {
    NotBusy,
    DataReady { lba: u64 },
}

/// 某个通道的命令块寄存器
struct Regs<'a, P> {
    ports: &'a P,
    channel: Channel,
}

impl<P: PortIo> Regs<'_, P> {
    #[inline]
    fn read(&self, reg: Reg) -> u8 {
        self.ports.inb(reg.port(self.channel))
    }

    #[inline]
    fn write(&self, reg: Reg, value: u8) {
        self.ports.outb(reg.port(self.channel), value);
    }

    #[inline]
    fn status(&self) -> BitFlags<Status> {
        BitFlags::from_bits_truncate(self.read(Reg::Status))
    }

    fn wait(&self, phase: Phase) -> Result<BitFlags<Status>, Error> {
        for _ in 0..ATA_TIMEOUT {
            let status = self.status();
            // BSY 置位时其余各位均无意义
            if status.contains(Status::BSY) {
                continue;
            }

            match phase {
                Phase::NotBusy => return Ok(status),
                Phase::DataReady { lba } => {
                    if status.intersects(Status::ERR | Status::DF) {
                        log::warn!(
                            "ata{}: device fault at lba {lba}, status={status:?}, error={:#04x}",
                            self.channel.index(),
                            self.read(Reg::Error),
                        );
                        return Err(Error::DeviceFault);
                    }
                    if status.contains(Status::DRQ) {
                        return Ok(status);
                    }
                }
            }
        }

        log::warn!("ata{}: timed out waiting for {phase:?}", self.channel.index());
        Err(Error::DeviceTimeout)
    }
}

impl<P: PortIo> AtaDrive<P> {
    /// 以 IDENTIFY 探测 `channel` 上主/从位置的设备。
    ///
    /// 没有设备、设备是 ATAPI、或者 IDENTIFY 出错时返回空。
    pub fn detect(ports: &Arc<P>, channel: Channel, slave: bool) -> Option<Self> {
        let regs = Regs {
            ports: &**ports,
            channel,
        };

        regs.write(Reg::Drive, 0xA0 | (slave as u8) << 4);
        ports.io_wait();

        for reg in [Reg::SectorCount, Reg::LbaLow, Reg::LbaMid, Reg::LbaHigh] {
            regs.write(reg, 0);
        }
        regs.write(Reg::COMMAND, Command::Identify as u8);

        // 状态为 0 表示此位置没有设备
        if regs.read(Reg::Status) == 0 {
            return None;
        }
        regs.wait(Phase::NotBusy).ok()?;

        if (regs.read(Reg::LbaMid), regs.read(Reg::LbaHigh)) == ATAPI_SIGNATURE {
            log::info!("ata{}: ATAPI device ignored", channel.index());
            return None;
        }
        if regs.status().contains(Status::ERR) {
            return None;
        }

        let mut id = [0u16; SECTOR_WORDS];
        for word in id.iter_mut() {
            *word = ports.inw(Reg::Data.port(channel));
        }

        // words 60..62：28 位 LBA 可寻址的扇区数
        let sectors = (u32::from(id[61]) << 16 | u32::from(id[60])) as u64;

        Some(Self {
            ports: Arc::clone(ports),
            channel,
            slave,
            present: AtomicBool::new(true),
            sectors: sectors.min(LBA28_LIMIT),
            model: identify_model(&id),
        })
    }

    #[inline]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    #[inline]
    pub fn is_slave(&self) -> bool {
        self.slave
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.present.load(Ordering::Acquire)
    }

    /// 标记设备已被移除，此后的传输都以 [`Error::DeviceAbsent`] 失败
    pub fn detach(&self) {
        self.present.store(false, Ordering::Release);
    }

    /// 软件复位所在通道
    pub fn reset(&self) -> Result<(), Error> {
        let ctrl = self.channel.ctrl();
        self.ports.outb(ctrl, Control::SRST as u8);
        self.ports.io_wait();
        self.ports.outb(ctrl, 0);

        self.regs().wait(Phase::NotBusy).map(drop)
    }

    #[inline]
    fn regs(&self) -> Regs<'_, P> {
        Regs {
            ports: &self.ports,
            channel: self.channel,
        }
    }

    /// 在访问任何寄存器之前检查传输是否合法
    fn check(&self, lba: u64, len: usize) -> Result<(), Error> {
        if !self.is_present() {
            return Err(Error::DeviceAbsent);
        }
        block_dev::check_range(self.sectors, lba, len).map(drop)
    }

    /// 写入地址与扇区数并发出读写命令
    fn issue(&self, lba: Lba, count: usize, command: Command) -> Result<(), Error> {
        let regs = self.regs();
        regs.wait(Phase::NotBusy)?;

        regs.write(Reg::Drive, 0xE0 | (self.slave as u8) << 4 | lba.top());
        // 256 个扇区编码为 0
        regs.write(Reg::SectorCount, count as u8);
        regs.write(Reg::LbaLow, lba.low());
        regs.write(Reg::LbaMid, lba.mid());
        regs.write(Reg::LbaHigh, lba.high());
        regs.write(Reg::COMMAND, command as u8);
        log::trace!(
            "ata{}: {command:?} lba={} count={count}",
            self.channel.index(),
            u64::from(lba)
        );

        Ok(())
    }
}

impl<P: PortIo + 'static> BlockDevice for AtaDrive<P> {
    fn sector_count(&self) -> u64 {
        self.sectors
    }

    fn read_sectors(&self, lba: u64, buf: &mut [u8]) -> Result<usize, Error> {
        self.check(lba, buf.len())?;
        let regs = self.regs();
        let data = Reg::Data.port(self.channel);

        for (i, chunk) in buf
            .chunks_mut(MAX_SECTORS_PER_COMMAND * SECTOR_SIZE)
            .enumerate()
        {
            let start = Lba::new(lba) + (i * MAX_SECTORS_PER_COMMAND) as u64;
            self.issue(start, chunk.len() / SECTOR_SIZE, Command::ReadPio)?;

            for (n, sector) in chunk.chunks_exact_mut(SECTOR_SIZE).enumerate() {
                regs.wait(Phase::DataReady {
                    lba: u64::from(start) + n as u64,
                })?;
                for word in sector.chunks_exact_mut(2) {
                    word.copy_from_slice(&self.ports.inw(data).to_le_bytes());
                }
            }
        }

        Ok(buf.len())
    }

    fn write_sectors(&self, lba: u64, buf: &[u8]) -> Result<usize, Error> {
        self.check(lba, buf.len())?;
        let regs = self.regs();
        let data = Reg::Data.port(self.channel);

        for (i, chunk) in buf.chunks(MAX_SECTORS_PER_COMMAND * SECTOR_SIZE).enumerate() {
            let start = Lba::new(lba) + (i * MAX_SECTORS_PER_COMMAND) as u64;
            self.issue(start, chunk.len() / SECTOR_SIZE, Command::WritePio)?;

            for (n, sector) in chunk.chunks_exact(SECTOR_SIZE).enumerate() {
                regs.wait(Phase::DataReady {
                    lba: u64::from(start) + n as u64,
                })?;
                for word in sector.chunks_exact(2) {
                    self.ports.outw(data, u16::from_le_bytes([word[0], word[1]]));
                }

                // 每个扇区都刷写缓存
                regs.write(Reg::COMMAND, Command::CacheFlush as u8);
                regs.wait(Phase::NotBusy)?;
            }
        }

        Ok(buf.len())
    }
}

impl<P> fmt::Debug for AtaDrive<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtaDrive")
            .field("channel", &self.channel)
            .field("slave", &self.slave)
            .field("present", &self.present)
            .field("sectors", &self.sectors)
            .field("model", &self.model)
            .finish()
    }
}

/// 依次探测主通道主/从、次通道主/从上的硬盘
pub fn probe<P: PortIo>(ports: &Arc<P>) -> Vec<AtaDrive<P>> {
    let mut drives = Vec::new();

    for channel in [Channel::Primary, Channel::Secondary] {
        for slave in [false, true] {
            let role = if slave { "slave" } else { "master" };
            log::debug!("ata: probing {channel:?} {role}");

            if let Some(drive) = AtaDrive::detect(ports, channel, slave) {
                log::info!(
                    "ata{} {role}: {} ({} sectors)",
                    channel.index(),
                    drive.model,
                    drive.sectors
                );
                drives.push(drive);
            }
        }
    }

    if drives.is_empty() {
        log::warn!("ata: no disks found");
    } else {
        log::info!("ata: found {} disk(s)", drives.len());
    }

    drives
}

/// words 27..47 是型号字符串，每个字高字节在前，尾部以空格填充
fn identify_model(id: &[u16; SECTOR_WORDS]) -> String {
    let bytes: Vec<u8> = id[27..47].iter().flat_map(|w| w.to_be_bytes()).collect();
    let model = String::from_utf8_lossy(&bytes);

    model.trim_end_matches(|c: char| c == ' ' || c == '\0').into()
}
