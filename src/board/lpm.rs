//! LPM3 entry and the sleep-enable view used by interrupt handlers.
//!
//! LPM3 turns off the CPU and every clock except ACLK, which keeps the watchdog tick running. It
//! is only reached if no peripheral requests SMCLK, otherwise the part falls back to LPM0.

use core::arch::asm;

use portable_atomic::{AtomicBool, Ordering};

use crate::hal::{Cpu, SleepControl};

// Status register:
// SCG1 SCG0 OSC_OFF CPU_OFF GIE N Z C
// 7    6    5       4       3   2 1 0
const SCG1: u8 = 1 << 7;
const SCG0: u8 = 1 << 6;
const CPU_OFF: u8 = 1 << 4;
const GIE: u8 = 1 << 3;

// Set while the mainline is parked in LPM3
static SLEEP_ARMED: AtomicBool = AtomicBool::new(false);

/// For each set bit in the bitmask, set the corresponding bit in the status register.
#[inline(always)]
fn set_sr_bits<const MASK: u8>() {
    unsafe { asm!("bis.b #{mask}, SR", mask = const MASK, options(nomem, nostack)) };
}

/// The CPU, sleeping in LPM3
pub struct Lpm3 {
    _private: (),
}

impl Lpm3 {
    pub(super) fn new() -> Self {
        Lpm3 { _private: () }
    }
}

impl Cpu for Lpm3 {
    #[inline(always)]
    fn enable_interrupts(&mut self) {
        unsafe { msp430::interrupt::enable() };
    }

    #[inline(always)]
    fn disable_interrupts(&mut self) {
        msp430::interrupt::disable();
    }

    #[inline(always)]
    fn sleep(&mut self) {
        SLEEP_ARMED.store(true, Ordering::SeqCst);
        // GIE and the sleep bits go in with one instruction, so a pending interrupt wakes us
        // instead of being served before we sleep
        const LPM3_GIE: u8 = SCG1 + SCG0 + CPU_OFF + GIE;
        set_sr_bits::<LPM3_GIE>();
        msp430::asm::nop();
        SLEEP_ARMED.store(false, Ordering::SeqCst);
    }
}

/// Sleep-enable view for interrupt handlers.
///
/// Handlers declared with `wake_cpu` always return to active mode, and every mainline sleep is
/// wrapped in a loop that goes straight back to sleep on a foreign wakeup. Re-entering sleep
/// is therefore left to the mainline.
#[derive(Clone, Copy)]
pub struct SleepFlag {
    _private: (),
}

impl SleepFlag {
    pub(super) fn new() -> Self {
        SleepFlag { _private: () }
    }
}

impl SleepControl for SleepFlag {
    #[inline(always)]
    fn sleep_enabled(&self) -> bool {
        SLEEP_ARMED.load(Ordering::SeqCst)
    }

    #[inline(always)]
    fn reenter_sleep(&mut self) {}
}
