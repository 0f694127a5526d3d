//! 寄存器级的 ATA 通道模拟器
//!
//! 模拟单个通道上主、从两个位置的设备，并记录所有写入该通道字节寄存器的值，
//! 测试据此断言驱动在线路上的行为。数据口的 16 位读写不记入日志。

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::SECTOR_SIZE;
use spin::Mutex;

use crate::port::PortIo;
use crate::regs::{Channel, Command, Control, Status};

const BSY: u8 = Status::BSY as u8;
const DRDY: u8 = Status::DRDY as u8;
const DRQ: u8 = Status::DRQ as u8;
const ERR: u8 = Status::ERR as u8;
/// Error 寄存器中的 ABRT 位
const ABRT: u8 = 1 << 2;

pub struct SimChannel {
    channel: Channel,
    state: Mutex<State>,
}

/// 挂在模拟通道上的设备
pub enum SimDevice {
    Disk { data: Vec<u8>, model: String },
    Atapi,
}

impl SimDevice {
    pub fn disk(sectors: u64, model: &str) -> Self {
        Self::Disk {
            data: vec![0; sectors as usize * SECTOR_SIZE],
            model: model.into(),
        }
    }

    pub fn atapi() -> Self {
        Self::Atapi
    }
}

#[derive(Default)]
enum Transfer {
    #[default]
    Idle,
    Identify {
        words: Vec<u16>,
        pos: usize,
    },
    Read {
        lba: usize,
        remaining: usize,
        pos: usize,
    },
    Write {
        lba: usize,
        remaining: usize,
        sector: Vec<u8>,
    },
}

#[derive(Default)]
struct State {
    devices: [Option<SimDevice>; 2],
    selected: usize,
    drive: u8,
    count: u8,
    /// low, mid, high
    lba: [u8; 3],
    status: u8,
    error: u8,
    transfer: Transfer,
    writes: Vec<(u16, u8)>,
    flushes: usize,
    resets: usize,
    stuck_busy: bool,
    fault_next: bool,
}

impl SimChannel {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            state: Mutex::default(),
        }
    }

    /// 在主 (`slave == false`) 或从位置挂上设备
    pub fn with(self, slave: bool, device: SimDevice) -> Self {
        self.state.lock().devices[slave as usize] = Some(device);
        self
    }

    /// 写入字节寄存器的 `(端口, 值)` 序列
    pub fn register_writes(&self) -> Vec<(u16, u8)> {
        self.state.lock().writes.clone()
    }

    pub fn clear_log(&self) {
        self.state.lock().writes.clear();
    }

    /// 收到的 CACHE FLUSH 命令数
    pub fn flushes(&self) -> usize {
        self.state.lock().flushes
    }

    /// 收到的软件复位次数
    pub fn resets(&self) -> usize {
        self.state.lock().resets
    }

    /// 令状态寄存器一直读出 BSY
    pub fn set_stuck_busy(&self, stuck: bool) {
        self.state.lock().stuck_busy = stuck;
    }

    /// 令下一条命令以 ERR 结束
    pub fn fail_next_command(&self) {
        self.state.lock().fault_next = true;
    }

    /// 某个位置上磁盘的全部内容
    pub fn disk_image(&self, slave: bool) -> Option<Vec<u8>> {
        match &self.state.lock().devices[slave as usize] {
            Some(SimDevice::Disk { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    fn offset(&self, port: u16) -> Option<u16> {
        port.checked_sub(self.channel.io_base())
            .filter(|&offset| offset < 8)
    }
}

impl PortIo for SimChannel {
    fn inb(&self, port: u16) -> u8 {
        let state = self.state.lock();
        if port == self.channel.ctrl() {
            return state.status();
        }

        match self.offset(port) {
            Some(1) => state.error,
            Some(2) => state.count,
            Some(offset @ 3..=5) => state.lba[offset as usize - 3],
            Some(6) => state.drive,
            Some(7) => state.status(),
            _ => 0,
        }
    }

    fn outb(&self, port: u16, value: u8) {
        let mut state = self.state.lock();

        if port == self.channel.ctrl() {
            state.writes.push((port, value));
            if value & Control::SRST as u8 != 0 {
                state.resets += 1;
                state.transfer = Transfer::Idle;
                state.error = 0;
                state.status = DRDY;
            }
            return;
        }

        let Some(offset) = self.offset(port) else {
            return;
        };
        state.writes.push((port, value));

        match offset {
            2 => state.count = value,
            3..=5 => state.lba[offset as usize - 3] = value,
            6 => {
                state.drive = value;
                state.selected = (value >> 4 & 1) as usize;
            }
            7 => state.command(value),
            _ => {}
        }
    }

    fn inw(&self, port: u16) -> u16 {
        match self.offset(port) {
            Some(0) => self.state.lock().read_word(),
            _ => 0,
        }
    }

    fn outw(&self, port: u16, value: u16) {
        if self.offset(port) == Some(0) {
            self.state.lock().write_word(value);
        }
    }

    fn io_wait(&self) {}
}

impl State {
    fn status(&self) -> u8 {
        if self.stuck_busy {
            BSY
        } else if self.devices[self.selected].is_none() {
            0
        } else {
            self.status
        }
    }

    fn sectors(&self) -> usize {
        match &self.devices[self.selected] {
            Some(SimDevice::Disk { data, .. }) => data.len() / SECTOR_SIZE,
            _ => 0,
        }
    }

    fn abort(&mut self) {
        self.transfer = Transfer::Idle;
        self.error = ABRT;
        self.status = DRDY | ERR;
    }

    fn command(&mut self, command: u8) {
        if self.devices[self.selected].is_none() {
            return;
        }
        if self.fault_next {
            self.fault_next = false;
            self.abort();
            return;
        }
        self.error = 0;

        if command == Command::Identify as u8 {
            let words = match &self.devices[self.selected] {
                Some(SimDevice::Disk { data, model }) => {
                    Some(identify_words((data.len() / SECTOR_SIZE) as u64, model))
                }
                _ => None,
            };
            match words {
                Some(words) => {
                    self.transfer = Transfer::Identify { words, pos: 0 };
                    self.status = DRDY | DRQ;
                }
                // ATAPI 设备拒绝 IDENTIFY 并留下签名
                None => {
                    self.lba[1] = 0x14;
                    self.lba[2] = 0xEB;
                    self.abort();
                }
            }
        } else if command == Command::ReadPio as u8 || command == Command::WritePio as u8 {
            let lba = (self.drive as usize & 0x0F) << 24
                | (self.lba[2] as usize) << 16
                | (self.lba[1] as usize) << 8
                | self.lba[0] as usize;
            let count = if self.count == 0 { 256 } else { self.count as usize };
            if lba + count > self.sectors() {
                self.abort();
                return;
            }

            self.transfer = if command == Command::ReadPio as u8 {
                Transfer::Read {
                    lba,
                    remaining: count,
                    pos: 0,
                }
            } else {
                Transfer::Write {
                    lba,
                    remaining: count,
                    sector: Vec::with_capacity(SECTOR_SIZE),
                }
            };
            self.status = DRDY | DRQ;
        } else if command == Command::CacheFlush as u8 {
            self.flushes += 1;
            // 写命令中途的刷写不打断剩余扇区的传输
            self.status = match self.transfer {
                Transfer::Write { .. } => DRDY | DRQ,
                _ => DRDY,
            };
        } else {
            self.abort();
        }
    }

    fn read_word(&mut self) -> u16 {
        let (word, done) = match &mut self.transfer {
            Transfer::Identify { words, pos } => {
                let word = words.get(*pos).copied().unwrap_or(0);
                *pos += 1;
                (word, *pos >= words.len())
            }
            Transfer::Read {
                lba,
                remaining,
                pos,
            } => {
                let Some(SimDevice::Disk { data, .. }) = &self.devices[self.selected] else {
                    return 0;
                };
                let at = *lba * SECTOR_SIZE + *pos;
                let word = u16::from_le_bytes([data[at], data[at + 1]]);
                *pos += 2;
                if *pos == SECTOR_SIZE {
                    *pos = 0;
                    *lba += 1;
                    *remaining -= 1;
                }
                (word, *remaining == 0)
            }
            _ => return 0,
        };

        if done {
            self.transfer = Transfer::Idle;
            self.status = DRDY;
        }
        word
    }

    fn write_word(&mut self, word: u16) {
        let done = match &mut self.transfer {
            Transfer::Write {
                lba,
                remaining,
                sector,
            } => {
                sector.extend_from_slice(&word.to_le_bytes());
                if sector.len() < SECTOR_SIZE {
                    return;
                }

                if let Some(SimDevice::Disk { data, .. }) = &mut self.devices[self.selected] {
                    let at = *lba * SECTOR_SIZE;
                    data[at..at + SECTOR_SIZE].copy_from_slice(sector);
                }
                sector.clear();
                *lba += 1;
                *remaining -= 1;
                *remaining == 0
            }
            _ => return,
        };

        if done {
            self.transfer = Transfer::Idle;
            self.status = DRDY;
        }
    }
}

/// 构造 IDENTIFY 返回的 256 个字
fn identify_words(sectors: u64, model: &str) -> Vec<u16> {
    let mut id = vec![0u16; SECTOR_SIZE / 2];
    // 通用配置：非可移动硬盘
    id[0] = 0x0040;
    // 支持 LBA
    id[49] = 1 << 9;

    let sectors = sectors.min(crate::LBA28_LIMIT - 1) as u32;
    id[60] = sectors as u16;
    id[61] = (sectors >> 16) as u16;

    let mut name = [b' '; 40];
    let len = model.len().min(name.len());
    name[..len].copy_from_slice(&model.as_bytes()[..len]);
    for (i, pair) in name.chunks_exact(2).enumerate() {
        id[27 + i] = u16::from_be_bytes([pair[0], pair[1]]);
    }

    id
}
