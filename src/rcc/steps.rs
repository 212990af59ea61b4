use log::{debug, info, warn};

use super::Rcc;
use crate::clk::{BusDivider, ClockSpeed, Oscillator};
use crate::regs::{ClockSelect, PllConfig, Register, RegisterSet, UNLOCK_KEY_HIGH, UNLOCK_KEY_LOW, mask};
use crate::timeout::{
    CLKSEL_SWITCH_CYCLES, HSE_READY_CYCLES, HSI_READY_CYCLES, PLL_READY_CYCLES, Tick, poll,
};

/// What the PLL stage does for a given speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PllFactor {
    Unity,
    /// MUL field pattern
    Multiply(u8),
    /// DIV field pattern
    Divide(u8),
}

impl ClockSpeed {
    fn pll_factor(self) -> Option<PllFactor> {
        match self {
            ClockSpeed::Mhz160 => Some(PllFactor::Multiply(0b010)), // x4
            ClockSpeed::Mhz80 => Some(PllFactor::Multiply(0b001)),  // x2
            ClockSpeed::Mhz40 => Some(PllFactor::Unity),
            ClockSpeed::Mhz20 => Some(PllFactor::Divide(0b001)), // /2
            ClockSpeed::Mhz10 => Some(PllFactor::Divide(0b010)), // /4
            // The two slowest speeds differ only in the system divider
            ClockSpeed::Mhz5 | ClockSpeed::Mhz2_5 | ClockSpeed::Mhz1_25 => {
                Some(PllFactor::Divide(0b100)) // /8
            }
            ClockSpeed::Undefined => None,
        }
    }

    /// `SYS_DIV` pattern applied once the PLL has locked.
    fn sys_div(self) -> Option<u8> {
        match self {
            ClockSpeed::Mhz2_5 => Some(0b01),
            ClockSpeed::Mhz1_25 => Some(0b10),
            _ => None,
        }
    }
}

impl<R: RegisterSet, T: Tick<R>> Rcc<R, T> {
    /// True while `LOCK_STATUS` reads as unlocked.
    pub fn is_unlocked(&self) -> bool {
        !self.regs.lock_reg().lock_status()
    }

    /// Write the key pair and confirm the registers unlocked.
    ///
    /// A failed unlock is a protocol error and is reported at once, never
    /// retried.
    pub fn unlock(&mut self) -> bool {
        self.regs.write(Register::Unl, UNLOCK_KEY_LOW as u32);
        self.regs.write(Register::Unh, UNLOCK_KEY_HIGH as u32);
        if !self.is_unlocked() {
            warn!("RCC registers not unlocked");
            return false;
        }
        debug!("RCC registers unlocked");
        true
    }

    /// Set the lock command bit. Not read back.
    pub fn lock(&mut self) {
        self.regs.set_bits(Register::Lock, mask::LOCK_LOCK);
        debug!("RCC registers locked");
    }

    pub fn is_default_clock(&self) -> bool {
        self.regs.cr().clksel() == ClockSelect::Default
    }

    /// Request the default clock and wait for `CLKSEL` to report it.
    ///
    /// The request bit stays set whatever the outcome.
    pub fn switch_default_clock(&mut self) -> bool {
        self.regs.set_bits(Register::Cr, mask::CR_DEF_CLOCK);
        match poll(&mut self.regs, &mut self.tick, CLKSEL_SWITCH_CYCLES, |r| {
            r.cr().clksel() == ClockSelect::Default
        }) {
            Some(cycles) => debug!("default clock selected after {cycles} cycles"),
            None => warn!("timeout waiting for the default clock"),
        }
        self.is_default_clock()
    }

    // Known baseline: no dividers, PLL unity
    fn reset_dividers(&mut self) {
        self.regs.modify_cr(|cr| cr.with_bus_div(0).with_sys_div(0));
        self.regs.write_pllcfgr(PllConfig::new());
    }

    /// Program the PLL factor for `speed`.
    ///
    /// Always clears both dividers and the PLL configuration first. Returns
    /// false, leaving that baseline untouched, for the sentinel.
    pub fn configure_pll(&mut self, speed: ClockSpeed) -> bool {
        self.reset_dividers();
        let Some(factor) = speed.pll_factor() else {
            warn!("cannot configure PLL for clock speed {speed:?}");
            return false;
        };
        match factor {
            PllFactor::Unity => {}
            PllFactor::Multiply(mul) => self.regs.write_pllcfgr(self.regs.pllcfgr().with_mul(mul)),
            PllFactor::Divide(div) => self.regs.write_pllcfgr(self.regs.pllcfgr().with_div(div)),
        }
        debug!("PLL configured for {speed:?}: {factor:?}");
        true
    }

    /// Enable the PLL and wait for it to lock.
    pub fn turn_on_pll(&mut self) -> bool {
        self.regs.set_bits(Register::Cr, mask::CR_PLLON);
        match poll(&mut self.regs, &mut self.tick, PLL_READY_CYCLES, |r| r.cr().pll_rdy()) {
            Some(cycles) => {
                debug!("PLL locked after {cycles} cycles");
                true
            }
            None => {
                warn!("timeout waiting for PLL lock");
                false
            }
        }
    }

    /// Apply the system divider for the two slowest speeds.
    ///
    /// Must only run after the PLL reports ready, the divider is latched
    /// wrongly while the PLL is still settling. Other speeds are a no-op.
    pub fn select_system_clock_divider(&mut self, speed: ClockSpeed) {
        if let Some(bits) = speed.sys_div() {
            self.regs.modify_cr(|cr| cr.with_sys_div(cr.sys_div() | bits));
        }
    }

    /// Apply a bus divider of 2 or 4. Any other value is a no-op.
    pub fn select_bus_clock_divider(&mut self, divider: u32) {
        if let Ok(divider) = BusDivider::try_from(divider) {
            self.regs.modify_cr(|cr| cr.with_bus_div(cr.bus_div() | divider.bits()));
        }
    }

    // Enable the oscillator and wait for its ready flag
    fn start_oscillator(&mut self, osc: Oscillator) -> bool {
        let (enable, budget) = match osc {
            Oscillator::Internal => (mask::CR_HSION, HSI_READY_CYCLES),
            Oscillator::External => (mask::CR_HSEON, HSE_READY_CYCLES),
        };
        self.regs.set_bits(Register::Cr, enable);
        let ready = poll(&mut self.regs, &mut self.tick, budget, |r| match osc {
            Oscillator::Internal => r.cr().hsirdy(),
            Oscillator::External => r.cr().hserdy(),
        });
        if let Some(cycles) = ready {
            debug!("{osc:?} oscillator ready after {cycles} cycles");
        }
        ready.is_some()
    }

    // Wait for CLKSEL to equal `expected` exactly. Both select bits set is
    // nonzero but never a valid source.
    fn wait_for_clock_switch(&mut self, expected: ClockSelect) -> bool {
        poll(&mut self.regs, &mut self.tick, CLKSEL_SWITCH_CYCLES, |r| {
            r.cr().clksel() == expected
        })
        .is_some()
    }

    /// Start the chosen oscillator, release the default clock and wait for
    /// `CLKSEL` to report the oscillator. No rollback on failure.
    pub fn switch_clock(&mut self, internal: bool) -> bool {
        let osc = Oscillator::from(internal);
        info!("switching system clock to the {osc:?} oscillator");
        if !self.start_oscillator(osc) {
            warn!("failed to start the {osc:?} oscillator");
            return false;
        }
        self.regs.clear_bits(Register::Cr, mask::CR_DEF_CLOCK);
        if !self.wait_for_clock_switch(osc.select()) {
            warn!(
                "timeout waiting for clock switch, CLKSEL reads {:?}",
                self.regs.cr().clksel()
            );
            return false;
        }
        true
    }
}
