use core::fmt;

/// 块设备传输失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 设备不存在或已被移除
    DeviceAbsent,
    /// 轮询超过了预算仍未就绪
    DeviceTimeout,
    /// 设备报告了错误 (ERR/DF)
    DeviceFault,
    /// 扇区数为零、缓冲区未对齐扇区，或越过了设备末尾
    OutOfRange,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::DeviceAbsent => "device absent",
            Self::DeviceTimeout => "device timed out",
            Self::DeviceFault => "device fault",
            Self::OutOfRange => "sector range out of bounds",
        };
        f.write_str(msg)
    }
}
