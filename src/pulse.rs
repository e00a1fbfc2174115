//! Falling-edge pulse counter, e.g. for a rain gauge reed switch.
//!
//! Works whether the mainline is awake or parked in the sleep scheduler. A counted pulse puts the
//! processor straight back to sleep if it was asleep, and marks the wakeup as foreign so the
//! scheduler does not credit it as a tick.

use embedded_hal::digital::InputPin;

use crate::dispatch::PinChangeHandler;
use crate::hal::{InterruptSource, SleepControl};
use crate::shared::{PulseCount, WakeFlag};

/// Pulse counter
pub struct PulseCounter<'a, PIN, IRQ, S> {
    pin: PIN,
    irq: IRQ,
    sleep: S,
    count: &'a PulseCount,
    wake: &'a WakeFlag,
}

impl<'a, PIN, IRQ, S> PulseCounter<'a, PIN, IRQ, S>
where
    PIN: InputPin,
    IRQ: InterruptSource,
    S: SleepControl,
{
    /// Create a counter on a pull-up input and its pin-change interrupt.
    pub fn new(pin: PIN, irq: IRQ, sleep: S, count: &'a PulseCount, wake: &'a WakeFlag) -> Self {
        PulseCounter {
            pin,
            irq,
            sleep,
            count,
            wake,
        }
    }

    /// Arm the pin-change interrupt.
    pub fn begin(&mut self) {
        self.irq.arm();
    }

    /// Handle a pin-change event. Returns `false` without side effects unless the pin reads low.
    pub fn on_pin_change(&mut self) -> bool {
        if !matches!(self.pin.is_low(), Ok(true)) {
            return false;
        }

        self.count.increment();
        self.wake.notify_foreign_wakeup();
        if self.sleep.sleep_enabled() {
            self.sleep.reenter_sleep();
        }
        true
    }
}

impl<PIN, IRQ, S> PinChangeHandler for PulseCounter<'_, PIN, IRQ, S>
where
    PIN: InputPin,
    IRQ: InterruptSource,
    S: SleepControl,
{
    fn arm(&mut self) {
        self.begin();
    }

    #[inline]
    fn take_pending(&mut self) -> bool {
        self.irq.take_pending()
    }

    #[inline]
    fn on_pin_change(&mut self) -> bool {
        PulseCounter::on_pin_change(self)
    }
}
