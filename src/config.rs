//! Construction-time settings

use crate::timing::Duration;

/// Fixed 7-bit I2C address of the MLX90381 family
pub const DEFAULT_ADDRESS: u8 = 0x32;
/// Bit-bang clock rate used by the activation sequence, in Hz
pub const DEFAULT_BAUDRATE: u32 = 25_000;
/// Per-step execution overhead subtracted from every half period, in µs
pub const DEFAULT_INSTRUCTION_OVERHEAD_US: u32 = 5;
/// Half period used when the overhead eats the whole computed half period
pub const MIN_HALF_PERIOD_US: u32 = 5;

/// Driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// 7-bit bus address
    pub address: u8,
    /// Activation clock rate in Hz
    pub baudrate: u32,
    /// Execution overhead of one bit-bang step, in µs
    pub instruction_overhead_us: u32,
    /// A failing transaction that took at least this long is reported as a
    /// timeout
    pub bus_timeout: Duration,
    /// Idle time after which the sensor is assumed to have dropped back to
    /// analog output
    pub self_deactivation: Duration,
    /// Reject memory accesses the recorded mode does not allow, before they
    /// reach the bus
    pub enforce_mode_guards: bool,
}

impl Config {
    /// Defaults for the MLX90381AA
    #[must_use]
    pub const fn new() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            baudrate: DEFAULT_BAUDRATE,
            instruction_overhead_us: DEFAULT_INSTRUCTION_OVERHEAD_US,
            bus_timeout: Duration::millis(100),
            self_deactivation: Duration::millis(20),
            enforce_mode_guards: true,
        }
    }

    /// Use another 7-bit bus address
    #[must_use]
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Set the activation clock rate in Hz
    #[must_use]
    pub const fn with_baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = baudrate;
        self
    }

    /// Set the per-step execution overhead in µs
    #[must_use]
    pub const fn with_instruction_overhead_us(mut self, overhead: u32) -> Self {
        self.instruction_overhead_us = overhead;
        self
    }

    /// Set how long a failing transaction must take to count as a timeout
    #[must_use]
    pub const fn with_bus_timeout(mut self, timeout: Duration) -> Self {
        self.bus_timeout = timeout;
        self
    }

    /// Set the idle time after which recorded modes are dropped
    #[must_use]
    pub const fn with_self_deactivation(mut self, window: Duration) -> Self {
        self.self_deactivation = window;
        self
    }

    /// Turn the pre-bus mode checks on or off
    #[must_use]
    pub const fn with_mode_guards(mut self, enforce: bool) -> Self {
        self.enforce_mode_guards = enforce;
        self
    }

    /// Half clock period of the activation sequence in µs
    ///
    /// `1_000_000 / baudrate / 2` minus the instruction overhead, or
    /// [`MIN_HALF_PERIOD_US`] if that would not leave anything to wait.
    #[must_use]
    pub const fn half_period_us(&self) -> u32 {
        if self.baudrate == 0 {
            return MIN_HALF_PERIOD_US;
        }
        let half_period = 1_000_000 / self.baudrate / 2;
        if half_period > self.instruction_overhead_us {
            half_period - self.instruction_overhead_us
        } else {
            MIN_HALF_PERIOD_US
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
