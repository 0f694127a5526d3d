//! # ATA PIO 磁盘驱动
//!
//! 轮询方式驱动 IDE 通道上的硬盘，向上实现 [`block_dev::BlockDevice`]。
//! 端口读写经由 [`PortIo`] 完成，驱动本身不含任何体系结构相关代码。

#![no_std]

extern crate alloc;

mod drive;
mod lba;
mod port;
mod regs;
#[cfg(any(test, feature = "sim"))]
mod sim;

pub use self::{
    drive::{AtaDrive, probe},
    lba::Lba,
    port::PortIo,
    regs::{Channel, Command, Control, Reg, Status},
};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use self::port::X86Ports;

#[cfg(any(test, feature = "sim"))]
pub use self::sim::{SimChannel, SimDevice};

/// 一次等待最多轮询状态寄存器的次数
pub const ATA_TIMEOUT: usize = 100_000;
/// 一条读写命令最多传输的扇区数，扇区计数寄存器写 0 即表示 256
pub const MAX_SECTORS_PER_COMMAND: usize = 256;
/// IDENTIFY 之后 LBA mid/high 寄存器中的 ATAPI 签名
pub const ATAPI_SIGNATURE: (u8, u8) = (0x14, 0xEB);
/// 28 位 LBA 所能寻址的扇区上限
pub const LBA28_LIMIT: u64 = 1 << 28;
