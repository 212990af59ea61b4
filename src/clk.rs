use crate::regs::{ClockSelect, RegisterSet};

/// Frequency of both oscillators, and of the default clock after reset.
pub const OSC_HZ: u32 = 40_000_000;

/// Requested system clock frequency.
///
/// Ordered from the `Undefined` sentinel through the fastest to the slowest
/// setting, matching the raw selector values callers pass in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ClockSpeed {
    Undefined = 0,
    Mhz160 = 1,
    Mhz80 = 2,
    Mhz40 = 3,
    Mhz20 = 4,
    Mhz10 = 5,
    Mhz5 = 6,
    Mhz2_5 = 7,
    Mhz1_25 = 8,
}

impl ClockSpeed {
    /// Slowest, and highest valued, selector.
    pub const MAX: ClockSpeed = ClockSpeed::Mhz1_25;

    /// All selectors that name a frequency, fastest first.
    pub const ALL: [ClockSpeed; 8] = [
        ClockSpeed::Mhz160,
        ClockSpeed::Mhz80,
        ClockSpeed::Mhz40,
        ClockSpeed::Mhz20,
        ClockSpeed::Mhz10,
        ClockSpeed::Mhz5,
        ClockSpeed::Mhz2_5,
        ClockSpeed::Mhz1_25,
    ];

    pub fn is_valid(self) -> bool {
        self > ClockSpeed::Undefined && self <= ClockSpeed::MAX
    }

    /// Target frequency in Hz, `None` for the sentinel.
    pub const fn hz(self) -> Option<u32> {
        match self {
            ClockSpeed::Undefined => None,
            ClockSpeed::Mhz160 => Some(160_000_000),
            ClockSpeed::Mhz80 => Some(80_000_000),
            ClockSpeed::Mhz40 => Some(40_000_000),
            ClockSpeed::Mhz20 => Some(20_000_000),
            ClockSpeed::Mhz10 => Some(10_000_000),
            ClockSpeed::Mhz5 => Some(5_000_000),
            ClockSpeed::Mhz2_5 => Some(2_500_000),
            ClockSpeed::Mhz1_25 => Some(1_250_000),
        }
    }
}

/// Raw selector above [`ClockSpeed::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange(pub u32);

impl TryFrom<u32> for ClockSpeed {
    type Error = OutOfRange;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => ClockSpeed::Undefined,
            1 => ClockSpeed::Mhz160,
            2 => ClockSpeed::Mhz80,
            3 => ClockSpeed::Mhz40,
            4 => ClockSpeed::Mhz20,
            5 => ClockSpeed::Mhz10,
            6 => ClockSpeed::Mhz5,
            7 => ClockSpeed::Mhz2_5,
            8 => ClockSpeed::Mhz1_25,
            _ => return Err(OutOfRange(raw)),
        })
    }
}

/// True iff `raw` names a frequency: above the sentinel, at most the maximum.
pub fn validate_system_clock_speed(raw: u32) -> bool {
    ClockSpeed::try_from(raw).is_ok_and(ClockSpeed::is_valid)
}

/// Supported bus clock divide ratios.
///
/// "No division" (0 or 1) is not a divider: a caller that wants the bus at
/// the system clock rate has nothing to configure and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusDivider {
    Div2,
    Div4,
}

impl BusDivider {
    pub const fn ratio(self) -> u32 {
        match self {
            BusDivider::Div2 => 2,
            BusDivider::Div4 => 4,
        }
    }

    /// Pattern of the CR `BUS_DIV` field.
    pub const fn bits(self) -> u8 {
        match self {
            BusDivider::Div2 => 0b01,
            BusDivider::Div4 => 0b10,
        }
    }
}

impl TryFrom<u32> for BusDivider {
    type Error = OutOfRange;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            2 => Ok(BusDivider::Div2),
            4 => Ok(BusDivider::Div4),
            _ => Err(OutOfRange(raw)),
        }
    }
}

/// True iff `raw` is exactly 2 or 4.
pub fn validate_bus_clock_divider(raw: u32) -> bool {
    BusDivider::try_from(raw).is_ok()
}

/// Oscillator the system clock is switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oscillator {
    /// HSI, on-chip
    Internal,
    /// HSE, external crystal
    External,
}

impl Oscillator {
    /// `CLKSEL` pattern reported once this oscillator drives the clock.
    pub const fn select(self) -> ClockSelect {
        match self {
            Oscillator::Internal => ClockSelect::Internal,
            Oscillator::External => ClockSelect::External,
        }
    }
}

impl From<bool> for Oscillator {
    /// `true` selects the internal oscillator.
    fn from(internal: bool) -> Self {
        if internal {
            Oscillator::Internal
        } else {
            Oscillator::External
        }
    }
}

/// Requested operating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    pub speed: ClockSpeed,
    /// Raw bus divider, validated when applied
    pub bus_divider: u32,
    pub oscillator: Oscillator,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig {
            speed: ClockSpeed::Mhz40,
            bus_divider: BusDivider::Div2.ratio(),
            oscillator: Oscillator::Internal,
        }
    }
}

/// Clock state decoded from the live registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clocks {
    /// Source reported by `CLKSEL`
    pub source: ClockSelect,
    /// PLL output, `None` if the PLL fields hold a reserved pattern
    pub pll_clk: Option<u32>,
    /// PLL output after the system divider
    pub sys_clk: Option<u32>,
    /// System clock after the bus divider
    pub bus_clk: Option<u32>,
}

impl Clocks {
    /// Read the current clock state
    pub fn from_regs<R: RegisterSet>(regs: &R) -> Self {
        let cr = regs.cr();
        let pll = regs.pllcfgr();

        let pll_clk = match (pll.mul(), pll.div()) {
            (0, div) => div_ratio(div, &[0b000, 0b001, 0b010, 0b100]).map(|d| OSC_HZ / d),
            (mul, 0) => div_ratio(mul, &[0b000, 0b001, 0b010]).map(|m| OSC_HZ * m),
            // Multiplier and divider together is never programmed
            _ => None,
        };
        let sys_clk = pll_clk.zip(div_ratio(cr.sys_div(), &[0b00, 0b01, 0b10])).map(|(f, d)| f / d);
        let bus_clk = sys_clk.zip(div_ratio(cr.bus_div(), &[0b00, 0b01, 0b10])).map(|(f, d)| f / d);

        Clocks {
            source: cr.clksel(),
            pll_clk,
            sys_clk,
            bus_clk,
        }
    }
}

// Field patterns are listed for ratios 1, 2, 4, 8 in order
fn div_ratio(bits: u8, patterns: &[u8]) -> Option<u32> {
    patterns.iter().position(|&p| p == bits).map(|i| 1 << i)
}
