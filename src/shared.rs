//! State shared between interrupt handlers and the mainline.
//!
//! Every value here has exactly one interrupt-context writer. Multi-byte values sit behind a
//! [`critical_section::Mutex`], so mainline reads never observe a torn value. Single flags use
//! plain atomic loads and stores, which every target supports without compare-and-swap.

use core::cell::Cell;

use critical_section::Mutex;
use portable_atomic::{AtomicBool, Ordering};

/// Set by any interrupt other than the watchdog tick, so the sleep scheduler does not count the
/// wakeup as elapsed time.
pub struct WakeFlag(AtomicBool);

impl WakeFlag {
    /// Create a cleared flag.
    pub const fn new() -> Self {
        WakeFlag(AtomicBool::new(false))
    }

    /// Record that the processor was woken by something other than the watchdog tick.
    #[inline]
    pub fn notify_foreign_wakeup(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if a foreign wakeup was recorded since the last [`clear`](Self::clear).
    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Forget any recorded foreign wakeup.
    #[inline]
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for WakeFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Count of falling edges seen on the pulse input.
///
/// Incremented only from the pulse counter's interrupt, read and cleared only by the command
/// layer. Every access takes a critical section.
pub struct PulseCount(Mutex<Cell<u32>>);

impl PulseCount {
    /// Create a zeroed counter.
    pub const fn new() -> Self {
        PulseCount(Mutex::new(Cell::new(0)))
    }

    /// Count one pulse. Saturates instead of wrapping.
    pub fn increment(&self) {
        critical_section::with(|cs| {
            let count = self.0.borrow(cs);
            count.set(count.get().saturating_add(1));
        });
    }

    /// Current count.
    pub fn get(&self) -> u32 {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }

    /// Clear the count to zero.
    pub fn reset(&self) {
        critical_section::with(|cs| self.0.borrow(cs).set(0));
    }

    /// Read and clear in one critical section. A pulse cannot land between the read and the
    /// clear.
    pub fn take(&self) -> u32 {
        critical_section::with(|cs| self.0.borrow(cs).replace(0))
    }

    /// Remove at most `max` pulses and return how many were removed.
    pub fn drain(&self, max: u32) -> u32 {
        critical_section::with(|cs| {
            let count = self.0.borrow(cs);
            let taken = count.get().min(max);
            count.set(count.get() - taken);
            taken
        })
    }
}

impl Default for PulseCount {
    fn default() -> Self {
        Self::new()
    }
}

/// How long the next power-down sleep lasts, in seconds. Volatile: back to the configured default
/// after every reset.
pub struct SleepDuration(Mutex<Cell<u32>>);

impl SleepDuration {
    /// Create a duration holding `seconds`.
    pub const fn new(seconds: u32) -> Self {
        SleepDuration(Mutex::new(Cell::new(seconds)))
    }

    /// Current duration in seconds.
    pub fn get(&self) -> u32 {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }

    /// Replace the duration.
    pub fn set(&self, seconds: u32) {
        critical_section::with(|cs| self.0.borrow(cs).set(seconds));
    }
}

/// Raised by the command layer when the host asks for power-down, consumed by the supervisor.
pub struct PowerDownRequest(AtomicBool);

impl PowerDownRequest {
    /// Create a request flag that is not raised.
    pub const fn new() -> Self {
        PowerDownRequest(AtomicBool::new(false))
    }

    /// Ask the mainline to power down.
    #[inline]
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once power-down has been requested.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for PowerDownRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// All cross-context state of the firmware. The binary keeps one of these in a `static`.
pub struct SharedState {
    /// Pulses counted since the last read or reset.
    pub pulses: PulseCount,
    /// Duration of the next power-down sleep.
    pub sleep_seconds: SleepDuration,
    /// Foreign wakeup marker for the sleep scheduler.
    pub wake: WakeFlag,
    /// Power-down request from the host.
    pub power_down: PowerDownRequest,
}

impl SharedState {
    /// Create the state as it is right after reset.
    pub const fn new(default_sleep_seconds: u32) -> Self {
        SharedState {
            pulses: PulseCount::new(),
            sleep_seconds: SleepDuration::new(default_sleep_seconds),
            wake: WakeFlag::new(),
            power_down: PowerDownRequest::new(),
        }
    }
}
