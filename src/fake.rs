//! In-memory RCC model for tests.

use crate::regs::{
    ClockControl, ClockSelect, LockControl, Register, RegisterSet, UNLOCK_KEY_HIGH, UNLOCK_KEY_LOW,
};

/// Register block that follows the lock protocol of the real peripheral.
///
/// Comes out of reset locked. Writing the two unlock keys in order clears
/// `LOCK_STATUS`, the lock command sets it again, and CR/PLLCFGR writes made
/// while locked are dropped. Every write through [`RegisterSet`] is recorded.
#[derive(Debug, Clone)]
pub struct FakeRcc {
    cr: u32,
    pllcfgr: u32,
    lock: u32,
    unl: Option<u16>,
    /// The unlock sequence is ignored, as on a part with a stuck lock
    pub stuck_locked: bool,
    /// Every write issued through `RegisterSet::write`, in order
    pub journal: Vec<(Register, u32)>,
}

impl FakeRcc {
    /// Post-reset state: default clock, PLL off, registers locked.
    pub fn new() -> Self {
        FakeRcc {
            cr: 0,
            pllcfgr: 0,
            lock: LockControl::new().with_lock(true).with_lock_status(true).into_bits(),
            unl: None,
            stuck_locked: false,
            journal: Vec::new(),
        }
    }

    /// Reset state with the registers already unlocked.
    pub fn unlocked() -> Self {
        FakeRcc {
            lock: 0,
            ..Self::new()
        }
    }

    pub fn stuck() -> Self {
        FakeRcc {
            stuck_locked: true,
            ..Self::new()
        }
    }

    pub fn is_locked(&self) -> bool {
        LockControl::from_bits(self.lock).lock_status()
    }

    /// Hardware-side change of CR, bypassing the lock and the journal.
    pub fn poke_cr<F>(&mut self, f: F)
    where
        F: FnOnce(ClockControl) -> ClockControl,
    {
        self.cr = f(ClockControl::from_bits(self.cr)).into_bits();
    }

    /// One step of well-behaved hardware: ready flags follow their enables
    /// and `CLKSEL` follows `DEF_CLOCK` and the ready oscillator.
    pub fn settle(&mut self) {
        self.poke_cr(|cr| {
            let clksel = if cr.def_clock() {
                ClockSelect::Default
            } else if cr.hseon() && cr.hserdy() {
                ClockSelect::External
            } else if cr.hsion() && cr.hsirdy() {
                ClockSelect::Internal
            } else {
                cr.clksel()
            };
            cr.with_pll_rdy(cr.pllon())
                .with_hsirdy(cr.hsion())
                .with_hserdy(cr.hseon())
                .with_clksel(clksel)
        });
    }

    /// Index of the first journalled write matching `pred`.
    pub fn first_write<P>(&self, pred: P) -> Option<usize>
    where
        P: Fn(Register, u32) -> bool,
    {
        self.journal.iter().position(|&(reg, value)| pred(reg, value))
    }
}

impl Default for FakeRcc {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterSet for FakeRcc {
    fn read(&self, reg: Register) -> u32 {
        match reg {
            Register::Cr => self.cr,
            Register::Pllcfgr => self.pllcfgr,
            Register::Lock => self.lock,
            // Write only
            Register::Unl | Register::Unh => 0,
        }
    }

    fn write(&mut self, reg: Register, value: u32) {
        self.journal.push((reg, value));
        match reg {
            Register::Unl => self.unl = Some(value as u16),
            Register::Unh => {
                let keyed = self.unl.take() == Some(UNLOCK_KEY_LOW) && value as u16 == UNLOCK_KEY_HIGH;
                if keyed && !self.stuck_locked {
                    self.lock = 0;
                }
            }
            Register::Lock => {
                if LockControl::from_bits(value).lock() {
                    self.lock = LockControl::new().with_lock(true).with_lock_status(true).into_bits();
                }
            }
            _ if self.is_locked() => {}
            Register::Cr => self.cr = value,
            Register::Pllcfgr => self.pllcfgr = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::mask;

    #[test]
    fn writes_are_dropped_while_locked() {
        let mut rcc = FakeRcc::new();
        rcc.set_bits(Register::Cr, mask::CR_PLLON);
        assert_eq!(rcc.read(Register::Cr), 0);

        rcc.write(Register::Unl, UNLOCK_KEY_LOW as u32);
        rcc.write(Register::Unh, UNLOCK_KEY_HIGH as u32);
        assert!(!rcc.is_locked());
        rcc.set_bits(Register::Cr, mask::CR_PLLON);
        assert!(rcc.cr().pllon());

        rcc.set_bits(Register::Lock, mask::LOCK_LOCK);
        assert!(rcc.is_locked());
    }

    #[test]
    fn keys_out_of_order_do_not_unlock() {
        let mut rcc = FakeRcc::new();
        rcc.write(Register::Unh, UNLOCK_KEY_HIGH as u32);
        rcc.write(Register::Unl, UNLOCK_KEY_LOW as u32);
        assert!(rcc.is_locked());
    }

    #[test]
    fn settle_tracks_enables() {
        let mut rcc = FakeRcc::unlocked();
        rcc.modify_cr(|cr| cr.with_pllon(true).with_hseon(true).with_def_clock(true));
        rcc.settle();
        assert!(rcc.cr().pll_rdy());
        assert_eq!(rcc.cr().clksel(), ClockSelect::Default);

        rcc.modify_cr(|cr| cr.with_def_clock(false));
        rcc.settle();
        assert_eq!(rcc.cr().clksel(), ClockSelect::External);
    }
}
