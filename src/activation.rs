//! PTC entry: waking the I2C interface behind the analog outputs
//!
//! Out of reset the MLX90381 drives both pins as analog outputs. Pulling the
//! data line hard low trips the output overcurrent protection, which turns the
//! output drivers off. While they are off the sensor listens for 8 clock
//! pulses; if it sees them it switches its internal pull-up on as an
//! acknowledge and the I2C interface is live until a stop condition follows.
//!
//! The sequence races internal timers in the sensor, so every step and every
//! poll bound below is fixed.

use embedded_hal::{digital::PinState, i2c::I2c};

use crate::{
    driver::{DriverError, Mlx90381},
    error::{ActivationFailure, Error},
    pins::{Line, PinRoles, Pull},
    timing::MonotonicTimer,
};

/// Polls of the clock line waiting for the output drivers to switch off,
/// one half period apart (drivers are off within 250 µs)
pub const DRIVER_SHUTOFF_POLLS: u8 = 25;
/// Clock pulses that switch the sensor into communication mode
pub const WAKE_PULSES: u8 = 8;
/// Polls of the data line waiting for the acknowledge pull-up
pub const ACK_POLLS: u8 = 10;
/// Interval between acknowledge polls (pull-up is on within 50 µs)
pub const ACK_POLL_INTERVAL_US: u32 = 5;
/// Half periods to wait after a missing acknowledge before giving the lines
/// back to the bus
pub const ACK_FAILURE_SETTLE_HALF_PERIODS: u32 = 10;

impl<I2C, PINS, T> Mlx90381<I2C, PINS, T>
where
    I2C: I2c,
    PINS: PinRoles,
    T: MonotonicTimer,
{
    /// Run the PTC entry sequence and hand the lines back to the I2C
    /// peripheral
    ///
    /// Must be repeated whenever the interface has been idle longer than the
    /// self-deactivation window. Does not change the recorded modes.
    ///
    /// # Errors
    ///
    /// - [`Error::ActivationFailed`] if the sensor did not respond
    /// - [`Error::Pin`] if the lines could not be reconfigured
    pub fn activate(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        self.expire_idle_modes();

        #[cfg(feature = "defmt")]
        defmt::debug!("Activating I2C interface");

        self.bus_attached = false;
        self.pins.release_bus().map_err(Error::Pin)?;
        let woken = self.wake();
        let restored = self.pins.as_bus_peripheral().map_err(Error::Pin);
        self.bus_attached = restored.is_ok();

        match woken {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("I2C interface active");
                restored
            }
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("I2C interface activation failed");
                Err(e)
            }
        }
    }

    fn wake(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        let half = self.config.half_period_us();

        // Overcurrent on the data output switches the drivers off.
        self.pins
            .as_output(Line::Data, PinState::Low)
            .map_err(Error::Pin)?;
        self.pins
            .as_input(Line::Clock, Pull::Down)
            .map_err(Error::Pin)?;
        self.timer.delay_us(half * 2);

        // The sensor's pull-downs take the clock line low once the drivers
        // are off.
        let mut drivers_off = false;
        for _ in 0..DRIVER_SHUTOFF_POLLS {
            if !self.pins.is_high(Line::Clock).map_err(Error::Pin)? {
                drivers_off = true;
                break;
            }
            self.timer.delay_us(half);
        }
        if !drivers_off {
            return Err(Error::ActivationFailed(ActivationFailure::DriversStillOn));
        }

        self.pins
            .as_output(Line::Clock, PinState::Low)
            .map_err(Error::Pin)?;
        self.pins
            .as_input(Line::Data, Pull::None)
            .map_err(Error::Pin)?;
        self.timer.delay_us(half);

        for _ in 0..WAKE_PULSES {
            self.pins
                .set_level(Line::Clock, PinState::High)
                .map_err(Error::Pin)?;
            self.timer.delay_us(half);
            // Sampled only to keep the pulse timing symmetric.
            let _ = self.pins.is_high(Line::Data).map_err(Error::Pin)?;
            self.pins
                .set_level(Line::Clock, PinState::Low)
                .map_err(Error::Pin)?;
            self.timer.delay_us(half);
            let _ = self.pins.is_high(Line::Data).map_err(Error::Pin)?;
        }

        // Acknowledge: internal pull-up on the data line.
        self.pins
            .set_level(Line::Clock, PinState::High)
            .map_err(Error::Pin)?;
        self.timer.delay_us(half);

        let mut acknowledged = false;
        for _ in 0..ACK_POLLS {
            if self.pins.is_high(Line::Data).map_err(Error::Pin)? {
                acknowledged = true;
                break;
            }
            self.timer.delay_us(ACK_POLL_INTERVAL_US);
        }
        if !acknowledged {
            self.timer
                .delay_us(half * ACK_FAILURE_SETTLE_HALF_PERIODS);
            return Err(Error::ActivationFailed(ActivationFailure::NoAcknowledge));
        }

        // Stop condition: clock high, then data low-to-high.
        self.pins
            .set_level(Line::Clock, PinState::Low)
            .map_err(Error::Pin)?;
        self.timer.delay_us(half);
        self.pins
            .set_level(Line::Clock, PinState::High)
            .map_err(Error::Pin)?;
        self.timer.delay_us(half);
        self.pins
            .as_output(Line::Data, PinState::High)
            .map_err(Error::Pin)?;
        self.timer.delay_us(half);

        Ok(())
    }
}
