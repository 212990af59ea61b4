//! Clock tree bring-up for the SMC_40CR microcontroller.
//!
//! Moves the reset and clock controller (RCC) from its post-reset default
//! clock to a requested system clock, bus divider and oscillator source.
//! Register access is injected through [`regs::RegisterSet`] so the same
//! sequence runs against the real peripheral or an in-memory model.
#![cfg_attr(not(test), no_std)]

pub mod clk;
pub mod logger;
pub mod rcc;
pub mod regs;
pub mod timeout;

#[cfg(test)]
mod fake;

pub use clk::{BusDivider, ClockConfig, ClockSpeed, Clocks, Oscillator};
pub use rcc::{ClockError, Rcc};
