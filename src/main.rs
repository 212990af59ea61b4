#![no_std]
#![no_main]

use ::log::{LevelFilter, error, info};
// pick a panicking behavior
use panic_halt as _;

use cortex_m_rt::entry;

use smc40cr_rcc::logger;
use smc40cr_rcc::regs::Mmio;
use smc40cr_rcc::{ClockConfig, Rcc};

#[entry]
fn main() -> ! {
    // Nothing else can have installed a logger yet
    let _ = logger::init(LevelFilter::Debug);

    // Only user of the RCC block
    let regs = unsafe { Mmio::steal() };
    let mut rcc = Rcc::with_tick(regs, |_: &mut Mmio, _: u32| cortex_m::asm::nop());

    match rcc.apply(&ClockConfig::default()) {
        Ok(clocks) => info!("running at {:?} Hz", clocks.sys_clk),
        Err(err) => error!("clock bring-up failed: {err}"),
    }

    // No serial port is brought up, the log ring is read out with a debugger
    loop {
        cortex_m::asm::wfi();
    }
}
