//! Mainline power cycle.
//!
//! After reset the load is switched on and the processor idles, serving the bus from interrupt
//! context, until the host sends POWER_DOWN. The supervisor then cuts the load, parks the board,
//! sleeps for the configured duration and resets, which starts the next cycle.

use embedded_hal::digital::OutputPin;

use crate::hal::LowPower;
use crate::shared::SharedState;
use crate::sleep::Sleeper;

/// Power cycle supervisor
pub struct Supervisor<'a, L, S, P> {
    load: L,
    sleeper: S,
    board: P,
    shared: &'a SharedState,
}

impl<'a, L, S, P> Supervisor<'a, L, S, P>
where
    L: OutputPin,
    S: Sleeper,
    P: LowPower,
{
    /// Create a supervisor over the load-enable pin, the sleep scheduler and the board.
    pub fn new(load: L, sleeper: S, board: P, shared: &'a SharedState) -> Self {
        Supervisor {
            load,
            sleeper,
            board,
            shared,
        }
    }

    /// Switch the load on.
    pub fn power_on(&mut self) -> Result<(), L::Error> {
        info!("load on");
        self.load.set_high()
    }

    /// Idle until the host requests power-down.
    pub fn wait_for_power_down(&mut self) {
        let shared = self.shared;
        self.sleeper.idle_until(|| shared.power_down.is_requested());
    }

    /// Cut the load, park the board and sleep. Returns the duration slept, in seconds.
    pub fn power_down(&mut self) -> Result<u32, L::Error> {
        self.load.set_low()?;
        self.board.park();

        let seconds = self.shared.sleep_seconds.get();
        info!("load off, sleeping {=u32} s", seconds);
        let summary = self.sleeper.sleep_for(seconds);
        if summary.foreign_wakeups > 0 {
            debug!("{=u32} wakeups not counted", summary.foreign_wakeups);
        }
        Ok(seconds)
    }

    /// Run one power cycle, then reset the processor.
    pub fn run(mut self) -> ! {
        if self.power_on().is_err() {
            warn!("load enable failed");
        }
        self.wait_for_power_down();
        if self.power_down().is_err() {
            warn!("load disable failed");
        }
        self.sleeper.reset_processor()
    }

    /// Sleep scheduler
    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }
}
