//! Electrical role switching for the two sensor pins
//!
//! The MLX90381 shares its two analog outputs with its I2C interface. To wake
//! the interface the host has to drop its I2C peripheral, drive the lines as
//! plain GPIOs, then hand them back to the peripheral. There is no
//! embedded-hal trait for re-muxing a pin, so the board support code provides
//! it through [`PinRoles`].

use embedded_hal::digital::PinState;

/// One of the two shared sensor lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// Line wired to the I2C clock (SCL) function
    Clock,
    /// Line wired to the I2C data (SDA) function
    Data,
}

/// Input bias of a line configured as digital input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// Floating
    None,
    /// Weak pull-up
    Up,
    /// Weak pull-down
    Down,
}

/// Switches the sensor lines between the I2C peripheral and raw GPIO
///
/// Implementations must leave the peripheral usable again after
/// [`as_bus_peripheral`](Self::as_bus_peripheral), whatever GPIO
/// configuration the lines were in before.
pub trait PinRoles {
    /// Pin configuration or I/O error
    type Error: embedded_hal::digital::Error;

    /// Detach the I2C peripheral from both lines so they can be bit-banged
    fn release_bus(&mut self) -> Result<(), Self::Error>;

    /// Configure `line` as push-pull output driving `level`
    fn as_output(&mut self, line: Line, level: PinState) -> Result<(), Self::Error>;

    /// Configure `line` as digital input with the given bias
    fn as_input(&mut self, line: Line, pull: Pull) -> Result<(), Self::Error>;

    /// Drive a line previously configured with [`as_output`](Self::as_output)
    fn set_level(&mut self, line: Line, level: PinState) -> Result<(), Self::Error>;

    /// Sample a line
    fn is_high(&mut self, line: Line) -> Result<bool, Self::Error>;

    /// Hand both lines back to the I2C peripheral and re-initialise it
    ///
    /// Must be idempotent.
    fn as_bus_peripheral(&mut self) -> Result<(), Self::Error>;

    /// Float both lines so the sensor drives its analog outputs undisturbed
    fn release_to_input(&mut self) -> Result<(), Self::Error> {
        self.as_input(Line::Clock, Pull::None)?;
        self.as_input(Line::Data, Pull::None)
    }
}
