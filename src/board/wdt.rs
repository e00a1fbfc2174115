//! WDT_A as the sleep tick and the reset source.
//!
//! In interval mode the watchdog counts ACLK (REFO, 32768 Hz) and sets WDTIFG every 2^15 clocks,
//! i.e. once a second. With WDTIE set that wakes the CPU through the `WDT` vector. In watchdog mode
//! the same counter resets the device on expiry, which is how the firmware restarts itself.

use msp430fr2355 as pac;
use pac::wdt_a::wdtctl::WDTSSEL_A;

use crate::hal::WatchdogTimer;

const PASSWORD: u8 = 0x5A;

pub use pac::wdt_a::wdtctl::WDTIS_A as WdtClkPeriods;

/// Interval used for one sleep tick: 2^15 ACLK cycles.
pub const TICK_PERIODS: WdtClkPeriods = WdtClkPeriods::_32K;

type WdtWriter = pac::wdt_a::wdtctl::W;

/// Watchdog timer
pub struct Wdt {
    periph: pac::WDT_A,
}

impl Wdt {
    /// Stop the watchdog and select ACLK. Call as early as possible after reset, the watchdog
    /// starts in reset mode with a ~32 ms timeout.
    pub fn constrain(wdt: pac::WDT_A) -> Self {
        wdt.wdtctl.write(|w| {
            unsafe { w.wdtpw().bits(PASSWORD) }
                .wdthold()
                .hold()
                .wdtssel()
                .variant(WDTSSEL_A::ACLK)
        });
        Wdt { periph: wdt }
    }

    #[inline(always)]
    fn prewrite(w: &mut WdtWriter, bits: u16) -> &mut WdtWriter {
        // Every write needs the password in the upper byte
        unsafe { w.bits(bits).wdtpw().bits(PASSWORD) }
    }

    #[inline(always)]
    fn sfr() -> &'static pac::sfr::RegisterBlock {
        unsafe { &*pac::SFR::ptr() }
    }

    #[inline(always)]
    fn clear_ifg() {
        unsafe { Self::sfr().sfrifg1.clear_bits(|w| w.wdtifg().clear_bit()) };
    }
}

impl WatchdogTimer for Wdt {
    const TICK_SECONDS: u32 = 1;

    fn clear_reset_flag(&mut self) {
        // Reading SYSRSTIV clears the highest pending reset cause, drain all of them
        let sys = unsafe { &*pac::SYS::ptr() };
        while sys.sysrstiv.read().bits() != 0 {}
        Self::clear_ifg();
    }

    fn start_interval(&mut self) {
        // Same clock source as before, so the running count is kept
        self.periph.wdtctl.modify(|r, w| {
            Self::prewrite(w, r.bits())
                .wdttmsel()
                .set_bit()
                .wdtssel()
                .variant(WDTSSEL_A::ACLK)
                .wdtis()
                .variant(TICK_PERIODS)
                .wdthold()
                .unhold()
        });
        unsafe { Self::sfr().sfrie1.set_bits(|w| w.wdtie().set_bit()) };
    }

    fn restart(&mut self) {
        self.periph
            .wdtctl
            .modify(|r, w| Self::prewrite(w, r.bits()).wdtcntcl().set_bit());
    }

    fn disable(&mut self) {
        self.periph
            .wdtctl
            .modify(|r, w| Self::prewrite(w, r.bits()).wdthold().hold());
        unsafe { Self::sfr().sfrie1.clear_bits(|w| w.wdtie().clear_bit()) };
        Self::clear_ifg();
    }

    fn force_reset(&mut self) -> ! {
        // Halt before changing the clock source, as the user's guide requires
        self.periph
            .wdtctl
            .write(|w| Self::prewrite(w, 0).wdthold().hold().wdtcntcl().set_bit());
        self.periph.wdtctl.write(|w| {
            Self::prewrite(w, 0)
                .wdttmsel()
                .clear_bit()
                .wdtssel()
                .variant(WDTSSEL_A::SMCLK)
                .wdtis()
                .variant(WdtClkPeriods::_64)
                .wdtcntcl()
                .set_bit()
                .wdthold()
                .unhold()
        });

        #[allow(clippy::empty_loop)]
        loop {}
    }
}
