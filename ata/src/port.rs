//! 端口 I/O 抽象
//!
//! 驱动只通过 [`PortIo`] 访问寄存器：内核里是真实的 `in`/`out` 指令，
//! 测试里是寄存器级的模拟器。

/// 字节与字宽度的端口读写
pub trait PortIo: Send + Sync {
    fn inb(&self, port: u16) -> u8;
    fn outb(&self, port: u16, value: u8);
    fn inw(&self, port: u16) -> u16;
    fn outw(&self, port: u16, value: u16);

    /// 短暂延时，写未使用的 POST 码端口 0x80
    fn io_wait(&self) {
        self.outb(0x80, 0);
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use self::x86::X86Ports;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86 {
    use core::arch::asm;

    use super::PortIo;

    /// 以 `in`/`out` 指令访问 I/O 端口
    #[derive(Debug)]
    pub struct X86Ports(());

    impl X86Ports {
        /// # Safety
        ///
        /// 调用者必须运行在有权访问 I/O 端口的特权级 (ring 0 或 IOPL 足够)，
        /// 并保证没有其它代码同时驱动相同的端口。
        pub const unsafe fn new() -> Self {
            Self(())
        }
    }

    impl PortIo for X86Ports {
        #[inline]
        fn inb(&self, port: u16) -> u8 {
            let value: u8;
            unsafe {
                asm!("in al, dx", out("al") value, in("dx") port, options(nostack, preserves_flags));
            }
            value
        }

        #[inline]
        fn outb(&self, port: u16, value: u8) {
            unsafe {
                asm!("out dx, al", in("dx") port, in("al") value, options(nostack, preserves_flags));
            }
        }

        #[inline]
        fn inw(&self, port: u16) -> u16 {
            let value: u16;
            unsafe {
                asm!("in ax, dx", out("ax") value, in("dx") port, options(nostack, preserves_flags));
            }
            value
        }

        #[inline]
        fn outw(&self, port: u16, value: u16) {
            unsafe {
                asm!("out dx, ax", in("dx") port, in("ax") value, options(nostack, preserves_flags));
            }
        }
    }
}
