//! Shared pin-change interrupt dispatch.
//!
//! The bus data line and the pulse input raise the same interrupt vector. Each handler is only
//! offered the event when its own interrupt request is latched. The bus engine goes first and
//! the pulse counter only if the engine did not claim the event; a pulse request passed over
//! that way stays latched and raises the vector again. Either way the wakeup is attributed as
//! foreign, so a sleep in progress does not count it as a watchdog tick.

use crate::shared::WakeFlag;

/// Something that can claim a pin-change event.
pub trait PinChangeHandler {
    /// Arm the handler's interrupt source.
    fn arm(&mut self);

    /// If the handler's interrupt request is latched, clear it and return `true`.
    fn take_pending(&mut self) -> bool;

    /// Inspect the pins and handle the event. Returns `true` if the event was claimed.
    fn on_pin_change(&mut self) -> bool;
}

/// Which handler claimed an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    /// The bus engine ran a transaction
    Bus,
    /// The pulse counter counted an edge
    Pulse,
}

/// Pin-change dispatcher
pub struct Dispatcher<'a, B, P> {
    bus: B,
    pulse: P,
    wake: &'a WakeFlag,
}

impl<'a, B: PinChangeHandler, P: PinChangeHandler> Dispatcher<'a, B, P> {
    /// Create a dispatcher over the bus engine and the pulse counter.
    pub fn new(bus: B, pulse: P, wake: &'a WakeFlag) -> Self {
        Dispatcher { bus, pulse, wake }
    }

    /// Arm both interrupt sources. Global interrupts are left as they are.
    pub fn arm(&mut self) {
        self.bus.arm();
        self.pulse.arm();
    }

    /// Call from the shared interrupt vector.
    pub fn on_interrupt(&mut self) -> Option<Source> {
        let source = if self.bus.take_pending() && self.bus.on_pin_change() {
            Some(Source::Bus)
        } else if self.pulse.take_pending() && self.pulse.on_pin_change() {
            Some(Source::Pulse)
        } else {
            None
        };
        self.wake.notify_foreign_wakeup();
        source
    }

    /// Bus engine
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Pulse counter
    pub fn pulse(&self) -> &P {
        &self.pulse
    }
}
