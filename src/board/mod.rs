//! MSP430FR2355 board support.
//!
//! All firmware pins sit on port 1:
//!
//! | Pin  | Use                              |
//! |------|----------------------------------|
//! | P1.2 | bus data (SDA), open-drain       |
//! | P1.3 | bus clock (SCL), pull-up input   |
//! | P1.4 | pulse input, pull-up input       |
//! | P1.5 | load enable, push-pull output    |
//!
//! Both interrupting pins trigger on the falling edge and share the `PORT1` vector. The `PORT1`
//! handler runs the [`Dispatcher`](crate::dispatch::Dispatcher), which clears the flag of each
//! pin it services.

use bitflags::bitflags;
use msp430fr2355 as pac;
use pac::cs::csctl4::{SELA_A, SELMS_A};

mod lpm;
mod pins;
mod port;
mod wdt;

pub use lpm::{Lpm3, SleepFlag};
pub use pins::{OpenDrain, Pin, PinInterrupt, PullupInput, PushPull};
pub use wdt::{Wdt, WdtClkPeriods, TICK_PERIODS};

use crate::hal::LowPower;
use port::{IntrPort, Port};

type P1 = pac::p1::RegisterBlock;

/// Bus data line
pub type Sda = Pin<P1, 2, OpenDrain>;
/// Bus clock line
pub type Scl = Pin<P1, 3, PullupInput>;
/// Pulse input
pub type PulseIn = Pin<P1, 4, PullupInput>;
/// Load enable
pub type LoadEnable = Pin<P1, 5, PushPull>;
/// Pin-change interrupt of the bus data line
pub type SdaInterrupt = PinInterrupt<P1, 2>;
/// Pin-change interrupt of the pulse input
pub type PulseInterrupt = PinInterrupt<P1, 4>;

bitflags! {
    /// Firmware pins of port 1
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Port1Pins: u8 {
        /// P1.2
        const SDA = 1 << 2;
        /// P1.3
        const SCL = 1 << 3;
        /// P1.4
        const PULSE = 1 << 4;
        /// P1.5
        const LOAD = 1 << 5;
    }
}

impl Port1Pins {
    /// Pins that must keep working while the board is parked
    pub const WAKE_SOURCES: Self = Self::SDA.union(Self::SCL).union(Self::PULSE);
}

/// Owned board resources
pub struct Board {
    /// Bus data line
    pub sda: Sda,
    /// Bus clock line
    pub scl: Scl,
    /// Pulse input
    pub pulse: PulseIn,
    /// Load enable, starts low
    pub load: LoadEnable,
    /// Bus data line interrupt
    pub sda_irq: SdaInterrupt,
    /// Pulse input interrupt
    pub pulse_irq: PulseInterrupt,
    /// Watchdog, held
    pub wdt: Wdt,
    /// CPU sleep control
    pub cpu: Lpm3,
    /// Sleep-enable view for interrupt handlers
    pub sleep: SleepFlag,
    /// Low-power parking
    pub parking: Parking,
}

impl Board {
    /// Take over the peripherals the firmware uses.
    ///
    /// Stops the watchdog, selects REFO for ACLK, parks every pin, configures the firmware pins
    /// and finally releases the I/O lock (LOCKLPM5) so the configuration takes effect.
    pub fn new(periph: pac::Peripherals) -> Self {
        let wdt = Wdt::constrain(periph.WDT_A);

        periph.CS.csctl4.write(|w| {
            w.sela()
                .variant(SELA_A::REFOCLK)
                .selms()
                .variant(SELMS_A::DCOCLKDIV)
        });

        let mut parking = Parking { _private: () };
        parking.park_all();

        let board = Board {
            sda: Pin::open_drain(),
            scl: Pin::pullup_input(),
            pulse: Pin::pullup_input(),
            load: Pin::push_pull(),
            sda_irq: PinInterrupt::falling_edge(),
            pulse_irq: PinInterrupt::falling_edge(),
            wdt,
            cpu: Lpm3::new(),
            sleep: SleepFlag::new(),
            parking,
        };

        periph.PMM.pm5ctl0.write(|w| w.locklpm5().locklpm5_0());
        board
    }
}

/// Puts unused pins into their lowest-power state.
pub struct Parking {
    _private: (),
}

impl Parking {
    fn park_port<PORT: Port>(keep: u8) {
        let p = unsafe { PORT::regs() };
        // Input with pull-down for everything not kept
        p.pxdir_clear(!keep);
        p.pxout_clear(!keep);
        p.pxren_set(!keep);
    }

    fn park_all(&mut self) {
        Self::park_port::<P1>(0);
        Self::park_port::<pac::p2::RegisterBlock>(0);
        Self::park_port::<pac::p3::RegisterBlock>(0);
        Self::park_port::<pac::p4::RegisterBlock>(0);
        Self::park_port::<pac::p5::RegisterBlock>(0);
        Self::park_port::<pac::p6::RegisterBlock>(0);
    }
}

impl LowPower for Parking {
    /// Pull down every pin except the wake sources. The load enable goes low with the rest.
    fn park(&mut self) {
        Self::park_port::<P1>(Port1Pins::WAKE_SOURCES.bits());
        Self::park_port::<pac::p2::RegisterBlock>(0);
        Self::park_port::<pac::p3::RegisterBlock>(0);
        Self::park_port::<pac::p4::RegisterBlock>(0);
        Self::park_port::<pac::p5::RegisterBlock>(0);
        Self::park_port::<pac::p6::RegisterBlock>(0);
    }
}
