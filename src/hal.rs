//! Traits at the seam between the firmware core and the board.
//!
//! Digital pins use the `embedded-hal` traits directly. The bus data line must implement both
//! [`InputPin`](embedded_hal::digital::InputPin) and [`OutputPin`](embedded_hal::digital::OutputPin)
//! with open-drain semantics: `set_low` drives the line low, `set_high` releases it to the pull-up.
//!
//! The traits below cover what `embedded-hal` does not: interrupt enables, the CPU sleep state,
//! and the watchdog used as the only timekeeping source.

/// A maskable interrupt source, such as the pin-change enable of a single pin.
pub trait InterruptSource {
    /// Discard any request latched while disarmed, then enable the source.
    fn arm(&mut self);

    /// Disable the source. Requests may still latch in hardware while disarmed.
    fn disarm(&mut self);

    /// If a request is latched, clear it and return `true`. A request left latched on an armed
    /// source raises the interrupt again.
    fn take_pending(&mut self) -> bool;
}

/// Global interrupt enable and the deepest sleep mode of the processor.
pub trait Cpu {
    /// Set the global interrupt enable.
    fn enable_interrupts(&mut self);

    /// Clear the global interrupt enable.
    fn disable_interrupts(&mut self);

    /// Enable interrupts and enter the deepest sleep mode as one step, so that no interrupt can
    /// slip in between. Returns once an interrupt has woken the processor, with interrupts still
    /// enabled. An interrupt already pending when this is called wakes the processor at once.
    fn sleep(&mut self);
}

/// The sleep-enable control as seen from interrupt context.
pub trait SleepControl {
    /// Returns `true` if the mainline was parked in sleep when the current interrupt fired.
    fn sleep_enabled(&self) -> bool;

    /// Put the processor back to sleep before the current handler returns.
    fn reenter_sleep(&mut self);
}

/// Countdown peripheral that either wakes the processor periodically or forces a reset.
pub trait WatchdogTimer {
    /// Length of one interval-mode tick, in seconds.
    const TICK_SECONDS: u32;

    /// Clear the reset-cause latch left by a previous watchdog reset. Some parts keep the
    /// watchdog forced on while that latch is set.
    fn clear_reset_flag(&mut self);

    /// Configure interval (interrupt) mode with a tick of [`Self::TICK_SECONDS`] and enable the
    /// tick interrupt. Must not clear the running count.
    fn start_interval(&mut self);

    /// Restart the running count from zero.
    fn restart(&mut self);

    /// Stop the countdown and disable its interrupt.
    fn disable(&mut self);

    /// Arm the shortest timeout in reset mode and wait for the hardware reset.
    fn force_reset(&mut self) -> !;
}

/// Board-wide low-power preparation before a long sleep.
pub trait LowPower {
    /// Put every pin and peripheral into its lowest-power state. This de-asserts the load enable.
    fn park(&mut self);
}
