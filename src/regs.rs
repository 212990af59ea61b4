//! RCC register block of the SMC_40CR.
//!
//! The layout is fixed by the vendor memory map. Only the clock control,
//! PLL configuration and unlock/lock registers are modelled here.

/// Base address of the RCC block (AHB1 peripheral space).
pub const RCC_BASE: usize = 0x4002_3800;

/// Unlock key written to `UNL`.
pub const UNLOCK_KEY_LOW: u16 = 0x56DD;
/// Unlock key written to `UNH` after the low key.
pub const UNLOCK_KEY_HIGH: u16 = 0xA3B2;

/// Registers of the RCC block used by the clock sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Clock control
    Cr,
    /// PLL configuration
    Pllcfgr,
    /// Unlock low half-word, write only
    Unl,
    /// Unlock high half-word, write only
    Unh,
    /// Lock command and status
    Lock,
}

impl Register {
    /// Byte offset from [`RCC_BASE`].
    pub const fn offset(self) -> usize {
        match self {
            Register::Cr => 0x00,
            Register::Pllcfgr => 0x04,
            Register::Unl => 0x08,
            Register::Unh => 0x0A,
            Register::Lock => 0x0C,
        }
    }

    /// The unlock registers are 16 bits wide and must be accessed as such.
    pub const fn is_half_word(self) -> bool {
        matches!(self, Register::Unl | Register::Unh)
    }
}

/// Value of the two bit `CLKSEL` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClockSelect {
    /// Post-reset default clock
    Default = 0b00,
    /// Internal high speed oscillator (HSI)
    Internal = 0b01,
    /// External high speed oscillator (HSE)
    External = 0b10,
    /// Both select bits set. Never a valid source.
    Invalid = 0b11,
}

impl ClockSelect {
    const fn into_bits(self) -> u8 {
        self as u8
    }

    const fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::Default,
            0b01 => Self::Internal,
            0b10 => Self::External,
            _ => Self::Invalid,
        }
    }
}

/// Layout of the clock control register (CR)
#[bitfield_struct::bitfield(u32)]
pub struct ClockControl {
    /// Internal oscillator enable
    pub hsion: bool,
    /// Internal oscillator ready flag
    pub hsirdy: bool,
    /// External oscillator enable
    pub hseon: bool,
    /// External oscillator ready flag
    pub hserdy: bool,
    /// Active clock source, driven by hardware
    #[bits(2)]
    pub clksel: ClockSelect,
    /// PLL enable
    pub pllon: bool,
    /// Bus clock divider, `0b01` = /2, `0b10` = /4
    #[bits(2)]
    pub bus_div: u8,
    /// System clock divider, `0b01` = /2, `0b10` = /4
    #[bits(2)]
    pub sys_div: u8,
    /// PLL lock flag
    pub pll_rdy: bool,
    #[bits(19)]
    __: u32,
    /// Request for the default clock
    pub def_clock: bool,
}

/// Layout of the PLL configuration register (PLLCFGR)
#[bitfield_struct::bitfield(u32)]
pub struct PllConfig {
    /// Division factor, one-hot: `0b001` = /2, `0b010` = /4, `0b100` = /8
    #[bits(3)]
    pub div: u8,
    /// Multiplication factor: `0b001` = x2, `0b010` = x4
    #[bits(3)]
    pub mul: u8,
    #[bits(26)]
    __: u32,
}

/// Layout of the lock register (LOCK)
#[bitfield_struct::bitfield(u32)]
pub struct LockControl {
    /// Writing 1 locks the RCC registers
    pub lock: bool,
    /// Read only, set while the registers are locked
    pub lock_status: bool,
    #[bits(30)]
    __: u32,
}

/// Single-bit masks for OR / AND-NOT access through [`RegisterSet`].
pub mod mask {
    use super::{ClockControl, LockControl};

    pub const CR_HSION: u32 = ClockControl::new().with_hsion(true).into_bits();
    pub const CR_HSEON: u32 = ClockControl::new().with_hseon(true).into_bits();
    pub const CR_PLLON: u32 = ClockControl::new().with_pllon(true).into_bits();
    pub const CR_DEF_CLOCK: u32 = ClockControl::new().with_def_clock(true).into_bits();
    pub const LOCK_LOCK: u32 = LockControl::new().with_lock(true).into_bits();
    pub const LOCK_STATUS: u32 = LockControl::new().with_lock_status(true).into_bits();
}

/// Access to the RCC registers.
///
/// Implementors only provide raw `read` and `write`. Everything else is a
/// read-modify-write built on top of them, so no register value is held
/// beyond a single call.
pub trait RegisterSet {
    fn read(&self, reg: Register) -> u32;
    fn write(&mut self, reg: Register, value: u32);

    /// `reg |= mask`
    fn set_bits(&mut self, reg: Register, mask: u32) {
        let value = self.read(reg);
        self.write(reg, value | mask);
    }

    /// `reg &= !mask`
    fn clear_bits(&mut self, reg: Register, mask: u32) {
        let value = self.read(reg);
        self.write(reg, value & !mask);
    }

    /// True if every bit of `mask` is set.
    fn test_bits(&self, reg: Register, mask: u32) -> bool {
        self.read(reg) & mask == mask
    }

    fn cr(&self) -> ClockControl {
        ClockControl::from_bits(self.read(Register::Cr))
    }

    fn modify_cr<F>(&mut self, f: F)
    where
        F: FnOnce(ClockControl) -> ClockControl,
    {
        let cr = f(self.cr());
        self.write(Register::Cr, cr.into_bits());
    }

    fn pllcfgr(&self) -> PllConfig {
        PllConfig::from_bits(self.read(Register::Pllcfgr))
    }

    fn write_pllcfgr(&mut self, pll: PllConfig) {
        self.write(Register::Pllcfgr, pll.into_bits());
    }

    fn lock_reg(&self) -> LockControl {
        LockControl::from_bits(self.read(Register::Lock))
    }
}

/// The memory mapped RCC block.
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Access the RCC block at `base`.
    ///
    /// ## Safety
    /// `base` must point at an RCC register block, and no other code may
    /// access that block while this value is alive.
    pub const unsafe fn new(base: usize) -> Self {
        Mmio { base }
    }

    /// Access the RCC block at its fixed address.
    ///
    /// ## Safety
    /// See [`Mmio::new`].
    pub const unsafe fn steal() -> Self {
        unsafe { Self::new(RCC_BASE) }
    }

    fn addr(&self, reg: Register) -> usize {
        self.base + reg.offset()
    }
}

impl RegisterSet for Mmio {
    fn read(&self, reg: Register) -> u32 {
        let addr = self.addr(reg);
        // Safety: `new` guarantees the address is a valid register
        unsafe {
            if reg.is_half_word() {
                core::ptr::read_volatile(addr as *const u16) as u32
            } else {
                core::ptr::read_volatile(addr as *const u32)
            }
        }
    }

    fn write(&mut self, reg: Register, value: u32) {
        let addr = self.addr(reg);
        // Safety: `new` guarantees the address is a valid register
        unsafe {
            if reg.is_half_word() {
                core::ptr::write_volatile(addr as *mut u16, value as u16);
            } else {
                core::ptr::write_volatile(addr as *mut u32, value);
            }
        }
    }
}
