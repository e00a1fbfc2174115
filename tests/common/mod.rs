//! Simulated bus master for driving the engine from host tests.
//!
//! The master's side of the bus is a scripted waveform of `(scl, sda)` samples. Simulated time
//! only moves when someone polls the clock line: every SCL read by the engine advances one
//! sample, and the harness advances one sample at a time between transactions. A falling edge
//! on the data line or the pulse input latches that pin's interrupt flag, and the harness
//! enters the dispatcher for as long as an armed flag is latched. The slave's open-drain output
//! is ANDed into the data line and recorded at every sample, so acknowledgements and read bits
//! can be checked after the run.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::ops::Range;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use loadgate::bus::BusSlave;
use loadgate::command::CommandLayer;
use loadgate::config::Config;
use loadgate::dispatch::{Dispatcher, Source};
use loadgate::hal::{InterruptSource, LowPower, SleepControl};
use loadgate::pulse::PulseCounter;
use loadgate::shared::SharedState;
use loadgate::sleep::{SleepSummary, Sleeper};

/// Samples per clock phase
const PHASE: usize = 3;
/// Samples the engine may consume past the end of the script before the test fails
const OVERRUN_LIMIT: usize = 10_000;
/// Back-to-back dispatcher entries before the test fails
const STORM_LIMIT: usize = 8;

#[derive(Default)]
pub struct Wire {
    samples: Vec<(bool, bool)>,
    drive: Vec<bool>,
    now: usize,
    slave_low: bool,
    overrun: usize,
    /// Sample ranges during which the pulse input is held low
    pulses: Vec<Range<usize>>,
    pulse_forced: bool,
    sda_flag: Rc<Cell<bool>>,
    pulse_flag: Rc<Cell<bool>>,
}

impl Wire {
    fn load(&mut self, samples: Vec<(bool, bool)>, pulses: Vec<Range<usize>>) {
        self.drive = vec![false; samples.len()];
        self.samples = samples;
        self.pulses = pulses;
        self.now = 0;
        self.overrun = 0;
        self.drive[0] = self.slave_low;
    }

    /// Run `change` and latch the flag of every line it pulled low.
    fn latching(&mut self, change: impl FnOnce(&mut Self)) {
        let (sda, pulse) = (self.sda(), self.pulse());
        change(self);
        if sda && !self.sda() {
            self.sda_flag.set(true);
        }
        if pulse && !self.pulse() {
            self.pulse_flag.set(true);
        }
    }

    fn advance(&mut self) {
        self.latching(Self::step);
    }

    fn step(&mut self) {
        self.now += 1;
        if self.now >= self.samples.len() {
            // Past the script the master keeps clocking with the data line released
            let k = self.overrun;
            self.overrun += 1;
            assert!(self.overrun < OVERRUN_LIMIT, "engine hung past the end of the waveform");
            self.samples.push(((k / PHASE) % 2 == 1, true));
            self.drive.push(false);
        }
        self.drive[self.now] = self.slave_low;
    }

    fn scl(&self) -> bool {
        self.samples[self.now].0
    }

    fn sda(&self) -> bool {
        self.samples[self.now].1 && !self.slave_low
    }

    fn pulse(&self) -> bool {
        !(self.pulse_forced || self.pulses.iter().any(|r| r.contains(&self.now)))
    }

    fn set_slave_low(&mut self, low: bool) {
        self.latching(|wire| {
            wire.slave_low = low;
            wire.drive[wire.now] = low;
        });
    }

    fn force_pulse(&mut self, low: bool) {
        self.latching(|wire| wire.pulse_forced = low);
    }

    /// Level of the data line at sample `i`.
    fn line_at(&self, i: usize) -> bool {
        self.samples[i].1 && !self.drive[i]
    }
}

pub struct SdaPin(Rc<RefCell<Wire>>);
pub struct SclPin(Rc<RefCell<Wire>>);

impl ErrorType for SdaPin {
    type Error = Infallible;
}

impl ErrorType for SclPin {
    type Error = Infallible;
}

impl InputPin for SdaPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.borrow().sda())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.borrow().sda())
    }
}

impl OutputPin for SdaPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().set_slave_low(true);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().set_slave_low(false);
        Ok(())
    }
}

impl InputPin for SclPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        let mut wire = self.0.borrow_mut();
        wire.advance();
        Ok(wire.scl())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

pub struct PulsePin(Rc<RefCell<Wire>>);

impl ErrorType for PulsePin {
    type Error = Infallible;
}

impl InputPin for PulsePin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.borrow().pulse())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.borrow().pulse())
    }
}

/// Pin interrupt with its enable and the flag latched by the wire.
#[derive(Clone, Default)]
pub struct Irq {
    pub armed: Rc<Cell<bool>>,
    pub flag: Rc<Cell<bool>>,
}

impl Irq {
    fn raised(&self) -> bool {
        self.armed.get() && self.flag.get()
    }
}

impl InterruptSource for Irq {
    fn arm(&mut self) {
        self.flag.set(false);
        self.armed.set(true);
    }

    fn disarm(&mut self) {
        self.armed.set(false);
    }

    fn take_pending(&mut self) -> bool {
        self.flag.replace(false)
    }
}

pub struct Awake;

impl SleepControl for Awake {
    fn sleep_enabled(&self) -> bool {
        false
    }

    fn reenter_sleep(&mut self) {}
}

/// What the master saw during a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Trace {
    /// One entry per acknowledge slot, `true` if the slave pulled the line low
    pub acks: Vec<bool>,
    /// One entry per read byte
    pub reads: Vec<u8>,
}

/// Scripted master waveform
#[derive(Clone, Default)]
pub struct Waveform {
    samples: Vec<(bool, bool)>,
    acks: Vec<usize>,
    reads: Vec<[usize; 8]>,
    pulses: Vec<Range<usize>>,
}

impl Waveform {
    /// An idle bus.
    pub fn new() -> Self {
        Waveform::default().phase(true, true)
    }

    fn phase(mut self, scl: bool, sda: bool) -> Self {
        self.samples.extend([(scl, sda); PHASE]);
        self
    }

    fn mid(&self) -> usize {
        // Middle sample of the phase just added
        self.samples.len() - PHASE + 1
    }

    /// Start condition from an idle bus.
    pub fn start(self) -> Self {
        self.phase(true, true).phase(true, false)
    }

    /// Repeated start in the middle of a transaction.
    pub fn restart(self) -> Self {
        self.phase(false, true).phase(true, true).phase(true, false)
    }

    /// Stop condition.
    pub fn stop(self) -> Self {
        self.phase(false, false)
            .phase(true, false)
            .phase(true, true)
    }

    /// Clock out bits, MSB first.
    pub fn bits(mut self, bits: &[bool]) -> Self {
        for &bit in bits {
            self = self.phase(false, bit).phase(true, bit);
        }
        self
    }

    /// Clock out one bit with a short pulse on the pulse input while the clock is high.
    pub fn bit_with_pulse(mut self, bit: bool) -> Self {
        self = self.phase(false, bit);
        let falls = self.samples.len() + 1;
        self = self.phase(true, bit);
        self.pulses.push(falls..self.samples.len());
        self
    }

    /// Clock out a full byte.
    pub fn byte(self, byte: u8) -> Self {
        self.bits(&to_bits(byte))
    }

    /// Clock out a byte with the data line bouncing while the clock is low.
    pub fn glitchy_byte(mut self, byte: u8) -> Self {
        for bit in to_bits(byte) {
            self.samples
                .extend([(false, !bit), (false, bit), (false, !bit), (false, bit)]);
            self = self.phase(true, bit);
        }
        self
    }

    /// Release the line for the slave's acknowledge.
    pub fn ack_slot(mut self) -> Self {
        self = self.phase(false, true).phase(true, true);
        let mid = self.mid();
        self.acks.push(mid);
        self
    }

    /// Release the line for eight bits from the slave.
    pub fn read_slots(mut self) -> Self {
        let mut slots = [0; 8];
        for slot in &mut slots {
            self = self.phase(false, true).phase(true, true);
            *slot = self.mid();
        }
        self.reads.push(slots);
        self
    }

    /// The master's own acknowledge bit after a read. `false` sends NACK.
    pub fn master_ack(self, ack: bool) -> Self {
        self.phase(false, !ack).phase(true, !ack)
    }

    /// One write transaction carrying a single data byte.
    pub fn write(self, address: u8, data: u8) -> Self {
        self.start()
            .byte(address << 1)
            .ack_slot()
            .byte(data)
            .ack_slot()
            .stop()
    }

    /// One write transaction per byte.
    pub fn write_all(mut self, address: u8, data: &[u8]) -> Self {
        for &byte in data {
            self = self.write(address, byte);
        }
        self
    }

    /// One read transaction of a single byte, ended with NACK.
    pub fn read(self, address: u8) -> Self {
        self.start()
            .byte(address << 1 | 1)
            .ack_slot()
            .read_slots()
            .master_ack(false)
            .stop()
    }

    /// Idle bus for a few phases.
    pub fn idle(self) -> Self {
        self.phase(true, true).phase(true, true)
    }
}

pub fn to_bits(byte: u8) -> [bool; 8] {
    core::array::from_fn(|i| byte & (0x80 >> i) != 0)
}

pub type Engine<'a> = BusSlave<SdaPin, SclPin, Irq, CommandLayer<'a>>;
pub type Counter<'a> = PulseCounter<'a, PulsePin, Irq, Awake>;

/// The firmware's interrupt side wired to a simulated bus.
pub struct Harness<'a> {
    wire: Rc<RefCell<Wire>>,
    sda_irq: Irq,
    pulse_irq: Irq,
    dispatcher: Dispatcher<'a, Engine<'a>, Counter<'a>>,
    /// Pin-change interrupts claimed by each handler
    pub claims: Vec<Option<Source>>,
}

impl<'a> Harness<'a> {
    pub fn new(config: Config, shared: &'a SharedState) -> Self {
        let wire = Rc::new(RefCell::new(Wire::default()));
        // Idle bus until the first run
        wire.borrow_mut().load(vec![(true, true)], Vec::new());
        let sda_irq = Irq::default();
        let pulse_irq = Irq::default();
        {
            let mut wire = wire.borrow_mut();
            wire.sda_flag = sda_irq.flag.clone();
            wire.pulse_flag = pulse_irq.flag.clone();
        }

        let bus = BusSlave::new(
            SdaPin(wire.clone()),
            SclPin(wire.clone()),
            sda_irq.clone(),
            CommandLayer::new(config, shared),
        );
        let counter = PulseCounter::new(
            PulsePin(wire.clone()),
            pulse_irq.clone(),
            Awake,
            &shared.pulses,
            &shared.wake,
        );
        let mut dispatcher = Dispatcher::new(bus, counter, &shared.wake);
        dispatcher.arm();

        Harness {
            wire,
            sda_irq,
            pulse_irq,
            dispatcher,
            claims: Vec::new(),
        }
    }

    /// Play a waveform and report what the master observed.
    pub fn run(&mut self, waveform: Waveform) -> Trace {
        let end = waveform.samples.len();
        self.wire.borrow_mut().load(waveform.samples, waveform.pulses);

        loop {
            {
                let mut wire = self.wire.borrow_mut();
                if wire.now + 1 >= end {
                    break;
                }
                wire.advance();
            }
            self.service();
        }

        let wire = self.wire.borrow();
        Trace {
            acks: waveform.acks.iter().map(|&i| wire.drive[i]).collect(),
            reads: waveform
                .reads
                .iter()
                .map(|slots| {
                    slots
                        .iter()
                        .fold(0u8, |acc, &i| (acc << 1) | wire.line_at(i) as u8)
                })
                .collect(),
        }
    }

    /// Enter the dispatcher while an armed flag is latched.
    fn service(&mut self) {
        let mut entries = 0;
        while self.sda_irq.raised() || self.pulse_irq.raised() {
            entries += 1;
            assert!(entries <= STORM_LIMIT, "pin-change interrupt never settles");
            let claim = self.dispatcher.on_interrupt();
            self.claims.push(claim);
        }
    }

    /// One falling edge followed by a rising edge on the pulse input.
    pub fn pulse(&mut self) {
        self.wire.borrow_mut().force_pulse(true);
        self.service();
        self.wire.borrow_mut().force_pulse(false);
    }

    /// Returns `true` if an interrupt flag is still latched.
    pub fn flags_latched(&self) -> bool {
        self.sda_irq.flag.get() || self.pulse_irq.flag.get()
    }

    pub fn engine(&self) -> &Engine<'a> {
        self.dispatcher.bus()
    }

    pub fn slave_released(&self) -> bool {
        !self.wire.borrow().slave_low
    }
}

/// Records every call instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    pub durations: Vec<u32>,
}

impl Sleeper for RecordingSleeper {
    fn sleep_for(&mut self, seconds: u32) -> SleepSummary {
        self.durations.push(seconds);
        SleepSummary {
            ticks: seconds,
            foreign_wakeups: 0,
        }
    }

    fn idle_until<F: FnMut() -> bool>(&mut self, mut done: F) {
        assert!(done(), "idled with nothing left to wake it");
    }

    fn reset_processor(&mut self) -> ! {
        panic!("reset");
    }
}

#[derive(Clone, Default)]
pub struct LoadPin(pub Rc<Cell<bool>>);

impl ErrorType for LoadPin {
    type Error = Infallible;
}

impl OutputPin for LoadPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set(true);
        Ok(())
    }
}

#[derive(Default)]
pub struct Parked(pub Rc<Cell<bool>>);

impl LowPower for Parked {
    fn park(&mut self) {
        self.0.set(true);
    }
}
