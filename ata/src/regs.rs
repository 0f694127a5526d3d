//! 命令块寄存器、命令码与状态位

use enumflags2::bitflags;

/// IDE 通道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Primary,
    Secondary,
}

impl Channel {
    /// 命令块寄存器的 I/O 基址
    pub const fn io_base(self) -> u16 {
        match self {
            Self::Primary => 0x1F0,
            Self::Secondary => 0x170,
        }
    }

    /// 设备控制寄存器 (读时为备用状态寄存器)
    pub const fn ctrl(self) -> u16 {
        match self {
            Self::Primary => 0x3F6,
            Self::Secondary => 0x376,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }
}

/// 命令块寄存器相对于 I/O 基址的偏移
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Reg {
    Data        = 0,
    /// 读为 Error，写为 Features
    Error       = 1,
    SectorCount = 2,
    LbaLow      = 3,
    LbaMid      = 4,
    LbaHigh     = 5,
    Drive       = 6,
    /// 读为 Status，写为 Command
    Status      = 7,
}

impl Reg {
    pub const FEATURES: Self = Self::Error;
    pub const COMMAND: Self = Self::Status;

    #[inline]
    pub const fn port(self, channel: Channel) -> u16 {
        channel.io_base() + self as u16
    }
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    ReadPio    = 0x20,
    WritePio   = 0x30,
    CacheFlush = 0xE7,
    Identify   = 0xEC,
}

/// Status Register
#[rustfmt::skip]
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 上一条命令出错
    ERR  = 1 << 0,
    IDX  = 1 << 1,
    CORR = 1 << 2,
    /// 可以传输数据
    DRQ  = 1 << 3,
    /// Overlapped mode service request
    SRV  = 1 << 4,
    /// Drive fault
    DF   = 1 << 5,
    /// 驱动器已就绪
    DRDY = 1 << 6,
    /// 忙，其余各位均无效
    BSY  = 1 << 7,
}

/// Device Control Register
#[rustfmt::skip]
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// 屏蔽中断
    NIEN = 1 << 1,
    /// 软件复位
    SRST = 1 << 2,
    HOB  = 1 << 7,
}
