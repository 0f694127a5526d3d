use derive_more::{Add, From, Into};

/// 28 位 LBA 扇区号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Add, From, Into)]
#[repr(transparent)]
pub struct Lba(u64);

impl core::ops::Add<u64> for Lba {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        self + Self(rhs)
    }
}

impl Lba {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// bits 0..8，写入 LBA low
    #[inline]
    pub const fn low(self) -> u8 {
        self.0 as u8
    }

    /// bits 8..16，写入 LBA mid
    #[inline]
    pub const fn mid(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// bits 16..24，写入 LBA high
    #[inline]
    pub const fn high(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// bits 24..28，并入驱动器选择寄存器的低 4 位
    #[inline]
    pub const fn top(self) -> u8 {
        (self.0 >> 24) as u8 & 0x0F
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split() {
        let lba = Lba::new(0x0ABC_DEF1);
        assert_eq!(0xF1, lba.low());
        assert_eq!(0xDE, lba.mid());
        assert_eq!(0xBC, lba.high());
        assert_eq!(0x0A, lba.top());
        assert_eq!(Lba::new(0x0ABC_DEF3), lba + 2u64);
        assert_eq!(0x0ABC_DEF1u64, lba.into());
    }
}
