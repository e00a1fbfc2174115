//! Bit-banged two-wire (I2C-style) bus slave.
//!
//! The engine reconstructs the bus purely from the levels of two general-purpose pins. It is
//! entered from the data line's pin-change interrupt, and once a start condition is seen it runs
//! the whole transaction synchronously inside that interrupt:
//!
//! ```text
//!  AwaitStart --start--> ReceivingAddress --byte--> ResolvingAddress --ack--> ReceivingData
//!      ^                  |  ^     |                    |                |        |
//!      |                  |  +start+                    +--ack, read--> SendingData
//!      +------stop--------+                                              |        |
//!      +------- address rejected / byte done / stop ---------------------+--------+
//! ```
//!
//! Every wait is an unbounded busy-wait on the clock line. The engine assumes a cooperative
//! single master and never stretches the clock, arbitrates or times out. Anything that is not a
//! well-formed transaction simply ends with the engine back in [`BusState::AwaitStart`].
//!
//! The data pin must be open-drain: `set_low` drives the line, `set_high` releases it to the
//! pull-up. Pull-ups themselves are board configuration.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::dispatch::PinChangeHandler;
use crate::hal::{Cpu, InterruptSource};

/// Transaction state. Rests in `AwaitStart` whenever the engine is not inside its interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    /// Idle, waiting for a start condition
    AwaitStart,
    /// Clocking in the address byte
    ReceivingAddress,
    /// Asking the handler whether the address is ours
    ResolvingAddress,
    /// Clocking in one data byte from the master
    ReceivingData,
    /// Clocking out one data byte to the master
    SendingData,
}

/// Direction of a data byte, from the master's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// The master writes, the handler receives the byte
    Write,
    /// The master reads, the handler supplies the byte
    Read,
}

/// Address byte of a transaction: seven address bits followed by the read/write bit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressByte(u8);

impl AddressByte {
    /// Wrap the raw byte as clocked in from the bus.
    #[inline(always)]
    pub const fn from_raw(raw: u8) -> Self {
        AddressByte(raw)
    }

    /// Raw byte as it appeared on the bus.
    #[inline(always)]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// 7-bit device address.
    #[inline(always)]
    pub const fn address(self) -> u8 {
        self.0 >> 1
    }

    /// The master wants to read when bit 0 of the raw byte is set.
    #[inline(always)]
    pub const fn direction(self) -> Direction {
        if self.0 & 1 != 0 {
            Direction::Read
        } else {
            Direction::Write
        }
    }
}

/// Result of clocking in one byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadOutcome {
    /// All eight bits were read
    Byte(u8),
    /// The data line rose while the clock was high
    Stop,
    /// The data line fell while the clock was high
    Start,
}

impl ReadOutcome {
    /// Numeric outcome code: 0 for a full byte, 1 for stop, 2 for start.
    pub const fn code(self) -> u8 {
        match self {
            ReadOutcome::Byte(_) => 0,
            ReadOutcome::Stop => 1,
            ReadOutcome::Start => 2,
        }
    }
}

/// Application side of the bus, chosen once at startup.
///
/// Both methods run inside the pin-change interrupt with the master clocking the bus, so they
/// must return quickly.
pub trait Handler {
    /// Returns `true` if this device answers to the 7-bit `address`. Should have no side effects.
    fn accepts(&self, address: u8) -> bool;

    /// Exchange one data byte. For [`Direction::Write`] `data` holds the received byte. For
    /// [`Direction::Read`] the handler stores the byte to transmit into `data`.
    fn exchange(&mut self, address: u8, direction: Direction, data: &mut u8);
}

/// Bus slave engine
pub struct BusSlave<SDA, SCL, IRQ, H> {
    sda: SDA,
    scl: SCL,
    irq: IRQ,
    handler: H,
    state: BusState,
}

impl<SDA, SCL, IRQ, H> BusSlave<SDA, SCL, IRQ, H>
where
    SDA: InputPin + OutputPin,
    SCL: InputPin<Error = SDA::Error>,
    IRQ: InterruptSource,
    H: Handler,
{
    /// Build the engine around the two bus pins, the data line's pin-change interrupt and the
    /// application handler. Nothing is touched until [`arm`](Self::arm) or
    /// [`begin`](Self::begin).
    pub fn new(sda: SDA, scl: SCL, irq: IRQ, handler: H) -> Self {
        BusSlave {
            sda,
            scl,
            irq,
            handler,
            state: BusState::AwaitStart,
        }
    }

    /// Release the data line and arm the pin-change interrupt, leaving the global interrupt
    /// enable alone.
    pub fn arm(&mut self) -> Result<(), SDA::Error> {
        self.sda.set_high()?;
        self.state = BusState::AwaitStart;
        self.irq.arm();
        Ok(())
    }

    /// Arm the engine and enable global interrupts. Interrupts must stay enabled for the rest of
    /// the program, or the engine stops seeing start conditions.
    pub fn begin<C: Cpu>(&mut self, cpu: &mut C) -> Result<(), SDA::Error> {
        self.arm()?;
        cpu.enable_interrupts();
        Ok(())
    }

    /// Current transaction state.
    #[inline]
    pub fn state(&self) -> BusState {
        self.state
    }

    /// Handle a pin-change event on the data line.
    ///
    /// Returns `false` without side effects unless the lines show a start condition (data low
    /// while clock high). Otherwise runs the transaction to completion and returns `true`.
    pub fn on_pin_change(&mut self) -> bool {
        if !self.is_start_condition() {
            return false;
        }

        // The rest of the transaction is handled synchronously, with our own source masked
        self.irq.disarm();
        // A pin error aborts the transaction the same way a stop does
        let _ = self.transaction();
        self.state = BusState::AwaitStart;
        self.irq.arm();
        true
    }

    fn is_start_condition(&mut self) -> bool {
        matches!(self.sda.is_low(), Ok(true)) && matches!(self.scl.is_high(), Ok(true))
    }

    fn transaction(&mut self) -> Result<(), SDA::Error> {
        self.state = BusState::ReceivingAddress;
        self.wait_scl_low()?;

        let mut address = AddressByte::default();
        while self.state != BusState::AwaitStart {
            self.state = match self.state {
                BusState::ReceivingAddress => match self.read_byte()? {
                    ReadOutcome::Byte(raw) => {
                        address = AddressByte::from_raw(raw);
                        BusState::ResolvingAddress
                    }
                    ReadOutcome::Stop => BusState::AwaitStart,
                    ReadOutcome::Start => self.restart()?,
                },
                BusState::ResolvingAddress => {
                    if self.handler.accepts(address.address()) {
                        self.write_ack()?;
                        match address.direction() {
                            Direction::Read => BusState::SendingData,
                            Direction::Write => BusState::ReceivingData,
                        }
                    } else {
                        // Not ours: leave the bus alone
                        BusState::AwaitStart
                    }
                }
                BusState::ReceivingData => match self.read_byte()? {
                    ReadOutcome::Byte(mut data) => {
                        self.write_ack()?;
                        self.handler
                            .exchange(address.address(), Direction::Write, &mut data);
                        BusState::AwaitStart
                    }
                    ReadOutcome::Stop => BusState::AwaitStart,
                    ReadOutcome::Start => self.restart()?,
                },
                BusState::SendingData => {
                    let mut data = 0;
                    self.handler
                        .exchange(address.address(), Direction::Read, &mut data);
                    self.write_byte(data)?;
                    BusState::AwaitStart
                }
                BusState::AwaitStart => BusState::AwaitStart,
            };
        }
        Ok(())
    }

    // A repeated start ends with the clock still high. Skip the rest of that phase so the first
    // address bit is sampled on its own clock pulse.
    fn restart(&mut self) -> Result<BusState, SDA::Error> {
        self.wait_scl_low()?;
        Ok(BusState::ReceivingAddress)
    }

    /// Clock in one byte, MSB first. A data transition while the clock is high cuts the byte
    /// short as a start or stop condition.
    fn read_byte(&mut self) -> Result<ReadOutcome, SDA::Error> {
        let mut data = 0u8;
        for _ in 0..8 {
            self.wait_scl_high()?;
            let bit = self.sda.is_high()?;
            data = (data << 1) | bit as u8;

            while self.scl.is_high()? {
                if self.sda.is_high()? != bit {
                    return Ok(if bit {
                        ReadOutcome::Start
                    } else {
                        ReadOutcome::Stop
                    });
                }
            }
        }
        Ok(ReadOutcome::Byte(data))
    }

    /// Clock out one byte, MSB first, then release the line for the master's ACK/NACK bit, which
    /// is not interpreted.
    fn write_byte(&mut self, mut data: u8) -> Result<(), SDA::Error> {
        for _ in 0..8 {
            if data & 0x80 != 0 {
                self.sda.set_high()?;
            } else {
                self.sda.set_low()?;
            }
            self.wait_clock_pulse()?;
            data <<= 1;
        }

        self.sda.set_high()?;
        self.wait_clock_pulse()
    }

    /// Hold the data line low for one clock pulse.
    fn write_ack(&mut self) -> Result<(), SDA::Error> {
        self.sda.set_low()?;
        self.wait_clock_pulse()?;
        self.sda.set_high()
    }

    #[inline(always)]
    fn wait_clock_pulse(&mut self) -> Result<(), SDA::Error> {
        self.wait_scl_high()?;
        self.wait_scl_low()
    }

    #[inline(always)]
    fn wait_scl_high(&mut self) -> Result<(), SDA::Error> {
        while self.scl.is_low()? {}
        Ok(())
    }

    #[inline(always)]
    fn wait_scl_low(&mut self) -> Result<(), SDA::Error> {
        while self.scl.is_high()? {}
        Ok(())
    }
}

impl<SDA, SCL, IRQ, H> PinChangeHandler for BusSlave<SDA, SCL, IRQ, H>
where
    SDA: InputPin + OutputPin,
    SCL: InputPin<Error = SDA::Error>,
    IRQ: InterruptSource,
    H: Handler,
{
    fn arm(&mut self) {
        // Infallible on real boards; a failing data pin leaves the engine disarmed
        if BusSlave::arm(self).is_err() {
            self.irq.disarm();
        }
    }

    #[inline]
    fn take_pending(&mut self) -> bool {
        self.irq.take_pending()
    }

    #[inline]
    fn on_pin_change(&mut self) -> bool {
        BusSlave::on_pin_change(self)
    }
}
