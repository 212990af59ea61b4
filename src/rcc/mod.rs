//! Clock configuration sequence for the RCC.
//!
//! [`Rcc::configure_clock`] runs the individual steps in a fixed order:
//!
//! 1. validate the speed and bus divider
//! 2. unlock the RCC registers
//! 3. fall back to the default clock if another source is active
//! 4. program the PLL and wait for it to lock
//! 5. apply the system divider, then the bus divider
//! 6. start the oscillator and switch to it
//! 7. lock the RCC registers
//!
//! The first failing step stops the sequence. From the unlock onwards a
//! failure requests the default clock again and re-locks the registers
//! before the error is returned.

use log::{error, info};

use crate::clk::{BusDivider, ClockConfig, ClockSpeed, Clocks, Oscillator, validate_bus_clock_divider};
use crate::regs::{Register, RegisterSet, mask};
use crate::timeout::{Spin, Tick};

mod steps;

/// Result code of the signed entry point on success.
pub const SUCCESS: i32 = 0;

/// Clock configuration failure, naming the step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ClockError {
    InvalidSysClockSpeed = -1,
    InvalidBusClockDivider = -2,
    UnlockFailed = -3,
    DefaultClockSwitchFailed = -4,
    PllConfigurationFailed = -5,
    PllStartupFailed = -6,
    BusClockDividerSelectionFailed = -7,
    ClockSwitchFailed = -8,
}

impl ClockError {
    /// Negative result code for this failure.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let reason = match self {
            ClockError::InvalidSysClockSpeed => "invalid system clock speed",
            ClockError::InvalidBusClockDivider => "invalid bus clock divider",
            ClockError::UnlockFailed => "RCC unlock failed",
            ClockError::DefaultClockSwitchFailed => "switch to default clock failed",
            ClockError::PllConfigurationFailed => "PLL configuration failed",
            ClockError::PllStartupFailed => "PLL did not lock",
            ClockError::BusClockDividerSelectionFailed => "bus clock divider not applied",
            ClockError::ClockSwitchFailed => "oscillator switch failed",
        };
        write!(f, "{reason} ({})", self.code())
    }
}

impl core::error::Error for ClockError {}

// Turn a step's outcome into the error for that step
trait Check {
    fn or_fail(self, err: ClockError) -> Result<(), ClockError>;
}

impl Check for bool {
    fn or_fail(self, err: ClockError) -> Result<(), ClockError> {
        if self { Ok(()) } else { Err(err) }
    }
}

/// The clock sequencer.
///
/// Owns the register set and the hook run on every poll iteration. Not
/// reentrant: one sequencer drives one RCC block.
pub struct Rcc<R, T = Spin> {
    regs: R,
    tick: T,
}

impl<R: RegisterSet> Rcc<R, Spin> {
    pub fn new(regs: R) -> Self {
        Rcc { regs, tick: Spin }
    }
}

impl<R: RegisterSet, T: Tick<R>> Rcc<R, T> {
    /// Create a sequencer that runs `tick` once per poll iteration.
    pub fn with_tick(regs: R, tick: T) -> Self {
        Rcc { regs, tick }
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Give back the register set.
    pub fn release(self) -> R {
        self.regs
    }

    /// Move the clock tree to `speed`, bus divider `bus_divider` and the
    /// internal (`true`) or external oscillator.
    ///
    /// Invalid arguments are rejected before any register access. Any later
    /// failure leaves the default clock requested and the registers locked.
    pub fn configure_clock(
        &mut self,
        speed: ClockSpeed,
        bus_divider: u32,
        internal: bool,
    ) -> Result<(), ClockError> {
        info!("configuring clock: speed {speed:?}, bus divider {bus_divider}, internal {internal}");
        speed.is_valid().or_fail(ClockError::InvalidSysClockSpeed)?;
        validate_bus_clock_divider(bus_divider).or_fail(ClockError::InvalidBusClockDivider)?;

        match self.sequence(speed, bus_divider, internal) {
            Ok(()) => {
                info!("clock configured");
                Ok(())
            }
            Err(err) => {
                error!("clock configuration failed: {err}");
                self.cleanup();
                Err(err)
            }
        }
    }

    fn sequence(&mut self, speed: ClockSpeed, bus_divider: u32, internal: bool) -> Result<(), ClockError> {
        self.unlock().or_fail(ClockError::UnlockFailed)?;

        if !self.is_default_clock() {
            info!("not on the default clock, switching back first");
            self.switch_default_clock()
                .or_fail(ClockError::DefaultClockSwitchFailed)?;
        }

        self.configure_pll(speed)
            .or_fail(ClockError::PllConfigurationFailed)?;
        self.turn_on_pll().or_fail(ClockError::PllStartupFailed)?;

        // Only legal once the PLL has locked
        self.select_system_clock_divider(speed);
        self.select_bus_clock_divider(bus_divider);
        let applied = BusDivider::try_from(bus_divider)
            .is_ok_and(|divider| self.regs.cr().bus_div() == divider.bits());
        applied.or_fail(ClockError::BusClockDividerSelectionFailed)?;

        self.switch_clock(internal)
            .or_fail(ClockError::ClockSwitchFailed)?;

        self.lock();
        Ok(())
    }

    // Request the default clock without waiting, then lock
    fn cleanup(&mut self) {
        self.regs.set_bits(Register::Cr, mask::CR_DEF_CLOCK);
        self.lock();
    }

    /// Signed-code form of [`Rcc::configure_clock`].
    ///
    /// `speed` is the raw selector (1 = 160 MHz through 8 = 1.25 MHz).
    /// Returns [`SUCCESS`] or a negative [`ClockError`] code.
    pub fn set_system_and_bus_clock(&mut self, speed: u32, bus_divider: u32, internal: bool) -> i32 {
        let Ok(speed) = ClockSpeed::try_from(speed) else {
            error!("clock speed selector {speed} out of range");
            return ClockError::InvalidSysClockSpeed.code();
        };
        match self.configure_clock(speed, bus_divider, internal) {
            Ok(()) => SUCCESS,
            Err(err) => err.code(),
        }
    }

    /// Apply `config` and read back the resulting clocks.
    pub fn apply(&mut self, config: &ClockConfig) -> Result<Clocks, ClockError> {
        self.configure_clock(
            config.speed,
            config.bus_divider,
            config.oscillator == Oscillator::Internal,
        )?;
        let clocks = Clocks::from_regs(&self.regs);
        info!("clocks: {clocks:?}");
        Ok(clocks)
    }
}
