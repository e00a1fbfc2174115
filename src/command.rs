//! Application commands carried over the bus.
//!
//! The host writes an opcode, then any payload bytes, one data byte per write transaction. Commands
//! with a response latch it until the host reads it back. Unknown opcodes are ignored.
//!
//! | Opcode | Command          | Payload                       | Response               |
//! |--------|------------------|-------------------------------|------------------------|
//! | `0x01` | `POWER_DOWN`     | none, or 4 bytes of seconds   | none                   |
//! | `0x02` | `SET_SLEEP_TIME` | 4 bytes of seconds, or minutes | none                  |
//! | `0x03` | `READ_COUNTER`   | none                          | 1 or 4 bytes of count  |
//! | `0x04` | `RESET_COUNTER`  | none                          | none                   |
//!
//! Multi-byte values are big-endian. Reading without a pending response returns `0x00`.

use crate::bus::{Direction, Handler};
use crate::config::{Config, CounterRead, PowerDownPayload, SleepTimeFormat};
use crate::shared::SharedState;

/// Largest amount a single drain-mode READ_COUNTER removes from the count.
pub const DRAIN_STEP: u32 = 255;

/// Byte returned for a read with no pending response.
pub const IDLE_READ: u8 = 0x00;

/// Command opcodes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Cut the load, sleep, then reset
    PowerDown = 0x01,
    /// Set the duration of the next sleep
    SetSleepTime = 0x02,
    /// Read back the pulse count
    ReadCounter = 0x03,
    /// Clear the pulse count
    ResetCounter = 0x04,
}

impl Command {
    /// Decode an opcode byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Command::PowerDown),
            0x02 => Some(Command::SetSleepTime),
            0x03 => Some(Command::ReadCounter),
            0x04 => Some(Command::ResetCounter),
            _ => None,
        }
    }

    /// Opcode byte
    #[inline(always)]
    pub const fn opcode(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Latch {
    Idle,
    Payload {
        command: Command,
        bytes: [u8; 4],
        filled: u8,
        len: u8,
    },
    Response {
        bytes: [u8; 4],
        sent: u8,
        len: u8,
    },
    // Response produced lazily at the first read
    CounterPending,
}

/// Command layer. Plugged into the bus engine as its [`Handler`].
pub struct CommandLayer<'a> {
    config: Config,
    shared: &'a SharedState,
    latch: Latch,
}

impl<'a> CommandLayer<'a> {
    /// Create the command layer over the firmware's shared state.
    pub fn new(config: Config, shared: &'a SharedState) -> Self {
        CommandLayer {
            config,
            shared,
            latch: Latch::Idle,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns `true` if an opcode is waiting for more payload bytes.
    pub fn is_collecting(&self) -> bool {
        matches!(self.latch, Latch::Payload { .. })
    }

    fn payload_len(&self, command: Command) -> u8 {
        match command {
            Command::PowerDown => match self.config.power_down_payload {
                PowerDownPayload::None => 0,
                PowerDownPayload::Seconds => 4,
            },
            Command::SetSleepTime => match self.config.sleep_time_format {
                SleepTimeFormat::Seconds => 4,
                SleepTimeFormat::Minutes => 1,
            },
            Command::ReadCounter | Command::ResetCounter => 0,
        }
    }

    fn on_write(&mut self, byte: u8) {
        let latch = self.latch;
        self.latch = match latch {
            Latch::Payload {
                command,
                mut bytes,
                filled,
                len,
            } => {
                bytes[filled as usize] = byte;
                let filled = filled + 1;
                if filled == len {
                    self.execute(command, &bytes[..len as usize])
                } else {
                    Latch::Payload {
                        command,
                        bytes,
                        filled,
                        len,
                    }
                }
            }
            _ => match Command::from_byte(byte) {
                Some(command) => match self.payload_len(command) {
                    0 => self.execute(command, &[]),
                    len => Latch::Payload {
                        command,
                        bytes: [0; 4],
                        filled: 0,
                        len,
                    },
                },
                None => Latch::Idle,
            },
        };
    }

    fn execute(&mut self, command: Command, payload: &[u8]) -> Latch {
        match command {
            Command::PowerDown => {
                if payload.len() == 4 {
                    self.shared.sleep_seconds.set(be_u32(payload));
                }
                self.shared.power_down.request();
                Latch::Idle
            }
            Command::SetSleepTime => {
                let seconds = match payload {
                    [minutes] => u32::from(*minutes) * 60,
                    _ => be_u32(payload),
                };
                self.shared.sleep_seconds.set(seconds);
                Latch::Idle
            }
            Command::ReadCounter => Latch::CounterPending,
            Command::ResetCounter => {
                self.shared.pulses.reset();
                Latch::Idle
            }
        }
    }

    fn on_read(&mut self) -> u8 {
        let latch = match self.latch {
            Latch::CounterPending => match self.config.counter_read {
                CounterRead::Drain => Latch::Response {
                    bytes: [self.shared.pulses.drain(DRAIN_STEP) as u8, 0, 0, 0],
                    sent: 0,
                    len: 1,
                },
                CounterRead::Snapshot => Latch::Response {
                    bytes: self.shared.pulses.take().to_be_bytes(),
                    sent: 0,
                    len: 4,
                },
            },
            latch => latch,
        };

        match latch {
            Latch::Response { bytes, sent, len } => {
                let sent = sent + 1;
                self.latch = if sent < len {
                    Latch::Response { bytes, sent, len }
                } else {
                    Latch::Idle
                };
                bytes[sent as usize - 1]
            }
            _ => {
                self.latch = Latch::Idle;
                IDLE_READ
            }
        }
    }
}

impl Handler for CommandLayer<'_> {
    #[inline]
    fn accepts(&self, address: u8) -> bool {
        address == self.config.address
    }

    fn exchange(&mut self, _address: u8, direction: Direction, data: &mut u8) {
        match direction {
            Direction::Write => self.on_write(*data),
            Direction::Read => *data = self.on_read(),
        }
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u32::from(b))
}
