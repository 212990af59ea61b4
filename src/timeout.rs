//! Bounded busy-wait polling.
//!
//! Budgets are counted in loop iterations, not wall-clock time. The CPU may
//! be running from a clock that is mid-transition, so every budget is a
//! generous upper bound.

/// PLL lock after `PLLON` is set.
pub const PLL_READY_CYCLES: u32 = 350;
/// Internal oscillator ready after `HSION` is set.
pub const HSI_READY_CYCLES: u32 = 1400;
/// External oscillator ready after `HSEON` is set.
pub const HSE_READY_CYCLES: u32 = 4200;
/// `CLKSEL` following a change of `DEF_CLOCK`.
pub const CLKSEL_SWITCH_CYCLES: u32 = 500;

/// Hook run once per unsuccessful poll iteration.
///
/// `cycle` is the zero based iteration index. Production code spins; tests
/// use the hook to change register state at a chosen iteration.
pub trait Tick<R> {
    fn tick(&mut self, regs: &mut R, cycle: u32);
}

/// Production hook, a spin-loop hint per iteration.
#[derive(Debug, Default, Clone, Copy)]
pub struct Spin;

impl<R> Tick<R> for Spin {
    fn tick(&mut self, _regs: &mut R, _cycle: u32) {
        core::hint::spin_loop();
    }
}

impl<R, F> Tick<R> for F
where
    F: FnMut(&mut R, u32),
{
    fn tick(&mut self, regs: &mut R, cycle: u32) {
        self(regs, cycle)
    }
}

/// Poll `ready` until it holds or `budget` iterations have elapsed.
///
/// Returns the number of ticks spent waiting, or `None` if the condition was
/// still false after exactly `budget` ticks.
pub fn poll<R, T, F>(regs: &mut R, tick: &mut T, budget: u32, mut ready: F) -> Option<u32>
where
    T: Tick<R>,
    F: FnMut(&R) -> bool,
{
    let mut cycles: u32 = 0;
    loop {
        if ready(regs) {
            return Some(cycles);
        }
        if cycles >= budget {
            return None;
        }
        tick.tick(regs, cycles);
        cycles += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_immediately_takes_no_ticks() {
        let mut flag = true;
        let mut ticks = 0;
        let waited = poll(&mut flag, &mut |_: &mut bool, _: u32| ticks += 1, 10, |f| *f);
        assert_eq!(waited, Some(0));
        assert_eq!(ticks, 0);
    }

    #[test]
    fn times_out_after_exactly_the_budget() {
        let mut flag = false;
        let mut seen = 0u32;
        let waited = poll(
            &mut flag,
            &mut |_: &mut bool, cycle: u32| {
                assert_eq!(cycle, seen);
                seen += 1;
            },
            CLKSEL_SWITCH_CYCLES,
            |f| *f,
        );
        assert_eq!(waited, None);
        assert_eq!(seen, CLKSEL_SWITCH_CYCLES);
    }

    #[test]
    fn hook_can_complete_the_wait() {
        let mut flag = false;
        let waited = poll(
            &mut flag,
            &mut |f: &mut bool, cycle: u32| {
                if cycle >= 5 {
                    *f = true;
                }
            },
            PLL_READY_CYCLES,
            |f| *f,
        );
        assert_eq!(waited, Some(6));
    }

    #[test]
    fn budgets_exceed_eight_bits() {
        // Each of these would wrap an 8-bit counter before expiring
        for budget in [PLL_READY_CYCLES, HSI_READY_CYCLES, HSE_READY_CYCLES, CLKSEL_SWITCH_CYCLES] {
            assert!(budget > u8::MAX as u32);
        }
    }

    #[test]
    fn spin_hook_leaves_state_alone() {
        let mut value = 7u32;
        Spin.tick(&mut value, 0);
        assert_eq!(value, 7);
    }
}
