//! Build-time configuration.
//!
//! ```
//! use loadgate::config::{Config, CounterRead};
//!
//! const CONFIG: Config = match Config::new()
//!     .address(0x50)
//!     .default_sleep_seconds(30 * 60)
//!     .counter_read(CounterRead::Drain)
//!     .validate()
//! {
//!     Ok(config) => config,
//!     Err(_) => panic!("invalid configuration"),
//! };
//! # assert_eq!(CONFIG.address, 0x50);
//! ```

/// Bus address the device answers to unless configured otherwise.
pub const DEFAULT_ADDRESS: u8 = 0x50;

/// Sleep duration used until the host sets another one: 30 minutes.
pub const DEFAULT_SLEEP_SECONDS: u32 = 30 * 60;

/// How READ_COUNTER answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterRead {
    /// One byte per read, `min(count, 255)`, subtracted from the count. The host repeats
    /// READ_COUNTER until it gets a zero byte.
    Drain,
    /// Four big-endian bytes over four consecutive reads. The count is captured and cleared on the
    /// first read. A command written before the fourth read discards the bytes not yet read, and
    /// the pulses they carried are lost.
    Snapshot,
}

/// Payload format of SET_SLEEP_TIME.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepTimeFormat {
    /// Four bytes, big-endian seconds.
    Seconds,
    /// One byte of minutes.
    Minutes,
}

/// Whether POWER_DOWN carries a duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerDownPayload {
    /// POWER_DOWN takes effect as soon as the opcode is written.
    None,
    /// POWER_DOWN waits for four big-endian bytes of seconds, stores them as the sleep duration,
    /// then takes effect.
    Seconds,
}

/// Invalid configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Address does not fit in 7 bits
    AddressOutOfRange(u8),
    /// Address is in one of the reserved blocks `0x00..=0x07` or `0x78..=0x7F`
    ReservedAddress(u8),
}

/// Firmware configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// 7-bit bus address
    pub address: u8,
    /// Sleep duration after reset, in seconds
    pub default_sleep_seconds: u32,
    /// READ_COUNTER policy
    pub counter_read: CounterRead,
    /// SET_SLEEP_TIME payload format
    pub sleep_time_format: SleepTimeFormat,
    /// POWER_DOWN payload
    pub power_down_payload: PowerDownPayload,
}

impl Config {
    /// Default configuration
    pub const fn new() -> Self {
        Config {
            address: DEFAULT_ADDRESS,
            default_sleep_seconds: DEFAULT_SLEEP_SECONDS,
            counter_read: CounterRead::Drain,
            sleep_time_format: SleepTimeFormat::Seconds,
            power_down_payload: PowerDownPayload::None,
        }
    }

    /// Set the 7-bit bus address
    pub const fn address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Set the sleep duration used after reset
    pub const fn default_sleep_seconds(mut self, seconds: u32) -> Self {
        self.default_sleep_seconds = seconds;
        self
    }

    /// Set the READ_COUNTER policy
    pub const fn counter_read(mut self, policy: CounterRead) -> Self {
        self.counter_read = policy;
        self
    }

    /// Set the SET_SLEEP_TIME payload format
    pub const fn sleep_time_format(mut self, format: SleepTimeFormat) -> Self {
        self.sleep_time_format = format;
        self
    }

    /// Set whether POWER_DOWN carries a duration
    pub const fn power_down_payload(mut self, payload: PowerDownPayload) -> Self {
        self.power_down_payload = payload;
        self
    }

    /// Check the configuration. Usable in const context so a bad address fails the build.
    pub const fn validate(self) -> Result<Self, ConfigError> {
        if self.address > 0x7F {
            return Err(ConfigError::AddressOutOfRange(self.address));
        }
        if self.address <= 0x07 || self.address >= 0x78 {
            return Err(ConfigError::ReservedAddress(self.address));
        }
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
