//! Single-pin drivers for the bus, pulse and load pins.

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use super::port::{IntrPort, Port};
use crate::hal::InterruptSource;

/// Open-drain typestate: driven low or released to the pull-up. Reads the line level.
pub struct OpenDrain;
/// Input with the internal pull-up enabled
pub struct PullupInput;
/// Push-pull output
pub struct PushPull;

/// Pin `N` of `PORT` in mode `MODE`
pub struct Pin<PORT, const N: u8, MODE> {
    _port: PhantomData<PORT>,
    _mode: PhantomData<MODE>,
}

impl<PORT: Port, const N: u8, MODE> Pin<PORT, N, MODE> {
    const MASK: u8 = 1 << N;

    #[inline(always)]
    fn regs() -> &'static PORT {
        // Each pin only touches its own bit
        unsafe { PORT::regs() }
    }

    #[inline(always)]
    fn new() -> Self {
        let p = Self::regs();
        p.pxsel0_clear(Self::MASK);
        p.pxsel1_clear(Self::MASK);
        Pin {
            _port: PhantomData,
            _mode: PhantomData,
        }
    }

    #[inline(always)]
    fn read(&self) -> bool {
        Self::regs().pxin_rd() & Self::MASK != 0
    }
}

impl<PORT: Port, const N: u8> Pin<PORT, N, OpenDrain> {
    /// Configure as open-drain, initially released.
    pub(super) fn open_drain() -> Self {
        let pin = Self::new();
        pin.release();
        pin
    }

    #[inline(always)]
    fn release(&self) {
        let p = Self::regs();
        p.pxdir_clear(Self::MASK);
        p.pxren_set(Self::MASK);
        p.pxout_set(Self::MASK);
    }

    #[inline(always)]
    fn drive_low(&self) {
        let p = Self::regs();
        p.pxout_clear(Self::MASK);
        p.pxdir_set(Self::MASK);
    }
}

impl<PORT: Port, const N: u8> Pin<PORT, N, PullupInput> {
    /// Configure as input with pull-up.
    pub(super) fn pullup_input() -> Self {
        let pin = Self::new();
        let p = Self::regs();
        p.pxdir_clear(Self::MASK);
        p.pxren_set(Self::MASK);
        p.pxout_set(Self::MASK);
        pin
    }
}

impl<PORT: Port, const N: u8> Pin<PORT, N, PushPull> {
    /// Configure as push-pull output driving low.
    pub(super) fn push_pull() -> Self {
        let pin = Self::new();
        let p = Self::regs();
        p.pxout_clear(Self::MASK);
        p.pxren_clear(Self::MASK);
        p.pxdir_set(Self::MASK);
        pin
    }
}

impl<PORT, const N: u8, MODE> ErrorType for Pin<PORT, N, MODE> {
    type Error = Infallible;
}

impl<PORT: Port, const N: u8> InputPin for Pin<PORT, N, OpenDrain> {
    #[inline(always)]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read())
    }

    #[inline(always)]
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.read())
    }
}

impl<PORT: Port, const N: u8> OutputPin for Pin<PORT, N, OpenDrain> {
    #[inline(always)]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive_low();
        Ok(())
    }

    #[inline(always)]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.release();
        Ok(())
    }
}

impl<PORT: Port, const N: u8> InputPin for Pin<PORT, N, PullupInput> {
    #[inline(always)]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read())
    }

    #[inline(always)]
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.read())
    }
}

impl<PORT: Port, const N: u8> OutputPin for Pin<PORT, N, PushPull> {
    #[inline]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Self::regs().pxout_clear(Self::MASK);
        Ok(())
    }

    #[inline]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        Self::regs().pxout_set(Self::MASK);
        Ok(())
    }
}

/// Falling-edge pin-change interrupt of pin `N` of `PORT`.
pub struct PinInterrupt<PORT, const N: u8> {
    _port: PhantomData<PORT>,
}

impl<PORT: IntrPort, const N: u8> PinInterrupt<PORT, N> {
    const MASK: u8 = 1 << N;

    /// Select the falling edge and leave the interrupt disabled.
    pub(super) fn falling_edge() -> Self {
        // Changing the edge select can set the flag, so clear it after
        let p = unsafe { PORT::regs() };
        p.pxie_clear(Self::MASK);
        p.pxies_set(Self::MASK);
        p.pxifg_clear(Self::MASK);
        PinInterrupt { _port: PhantomData }
    }
}

impl<PORT: IntrPort, const N: u8> InterruptSource for PinInterrupt<PORT, N> {
    #[inline(always)]
    fn arm(&mut self) {
        let p = unsafe { PORT::regs() };
        p.pxifg_clear(Self::MASK);
        p.pxie_set(Self::MASK);
    }

    #[inline(always)]
    fn disarm(&mut self) {
        unsafe { PORT::regs() }.pxie_clear(Self::MASK);
    }

    #[inline]
    fn take_pending(&mut self) -> bool {
        let p = unsafe { PORT::regs() };
        if p.pxifg_rd() & Self::MASK == 0 {
            return false;
        }
        // Cleared before the handler runs, so an edge during it latches again
        p.pxifg_clear(Self::MASK);
        true
    }
}
