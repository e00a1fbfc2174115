//! Watchdog-timed deep sleep.
//!
//! The watchdog's longest interval is far shorter than the multi-minute sleeps the firmware
//! needs, so a sleep is built out of many short ticks. The pin-change interrupt also wakes the
//! processor, so every wakeup is attributed before it may count: a wakeup flagged through
//! [`WakeFlag::notify_foreign_wakeup`] is not a tick. The countdown keeps running through such a
//! wakeup and its tick is credited when it actually fires.

use crate::hal::{Cpu, WatchdogTimer};
use crate::shared::WakeFlag;

/// What a call to [`SleepScheduler::sleep_for`] went through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SleepSummary {
    /// Watchdog ticks counted toward the requested duration
    pub ticks: u32,
    /// Wakeups discarded because another interrupt caused them
    pub foreign_wakeups: u32,
}

/// The part of the scheduler the supervisor relies on.
pub trait Sleeper {
    /// Sleep for at least `seconds`, rounded up to whole ticks. Returns with interrupts
    /// disabled.
    fn sleep_for(&mut self, seconds: u32) -> SleepSummary;

    /// Sleep until `done` returns `true`, without arming the countdown.
    fn idle_until<F: FnMut() -> bool>(&mut self, done: F);

    /// Restart the processor through a watchdog reset.
    fn reset_processor(&mut self) -> !;
}

/// Sleep scheduler
pub struct SleepScheduler<'a, W, C> {
    wdt: W,
    cpu: C,
    wake: &'a WakeFlag,
}

impl<'a, W: WatchdogTimer, C: Cpu> SleepScheduler<'a, W, C> {
    /// Create a scheduler. `wake` is the flag the other interrupt handlers raise.
    pub fn new(wdt: W, cpu: C, wake: &'a WakeFlag) -> Self {
        SleepScheduler { wdt, cpu, wake }
    }

    /// Deep-sleep for at least `seconds`.
    ///
    /// Interrupts are disabled on return and the watchdog is fully stopped.
    pub fn sleep_for(&mut self, seconds: u32) -> SleepSummary {
        self.cpu.disable_interrupts();
        self.wdt.clear_reset_flag();
        self.wdt.disable();
        self.wake.clear();

        debug!("sleeping for {=u32} s", seconds);

        let mut summary = SleepSummary::default();
        let mut elapsed: u32 = 0;
        while elapsed < seconds {
            self.wdt.start_interval();
            // After a foreign wakeup the tick in progress is still running; let it finish
            if !self.wake.is_set() {
                self.wdt.restart();
            }
            self.wake.clear();

            self.cpu.sleep();
            self.cpu.disable_interrupts();

            if self.wake.is_set() {
                summary.foreign_wakeups = summary.foreign_wakeups.saturating_add(1);
            } else {
                summary.ticks += 1;
                elapsed = elapsed.saturating_add(W::TICK_SECONDS);
            }
        }

        self.wdt.restart();
        self.wdt.disable();

        debug!(
            "slept {=u32} ticks, {=u32} foreign wakeups",
            summary.ticks,
            summary.foreign_wakeups
        );
        summary
    }

    /// Sleep until `done` returns `true`. The watchdog is not touched.
    ///
    /// `done` runs with interrupts disabled, so an interrupt that makes it true either lands
    /// before the check or wakes the sleep that follows it. Returns with interrupts enabled.
    pub fn idle_until(&mut self, mut done: impl FnMut() -> bool) {
        self.cpu.disable_interrupts();
        while !done() {
            self.cpu.sleep();
            self.cpu.disable_interrupts();
        }
        self.cpu.enable_interrupts();
    }

    /// Reset the processor with the shortest watchdog timeout. Never returns.
    pub fn reset_processor(&mut self) -> ! {
        info!("resetting");
        self.cpu.disable_interrupts();
        self.wdt.clear_reset_flag();
        self.wdt.disable();
        self.wdt.force_reset()
    }

}

impl<W: WatchdogTimer, C: Cpu> Sleeper for SleepScheduler<'_, W, C> {
    fn sleep_for(&mut self, seconds: u32) -> SleepSummary {
        SleepScheduler::sleep_for(self, seconds)
    }

    fn idle_until<F: FnMut() -> bool>(&mut self, done: F) {
        SleepScheduler::idle_until(self, done)
    }

    fn reset_processor(&mut self) -> ! {
        SleepScheduler::reset_processor(self)
    }
}
