//! Blocking driver for the MLX90381 magnetic position sensor

use embedded_hal::i2c::{Error as _, ErrorKind, ErrorType, I2c};

use crate::{
    config::Config,
    error::Error,
    mode::ModeState,
    pins::PinRoles,
    register::{PERMANENT_WORDS, REGISTER_WORDS},
    timing::{Instant, MonotonicTimer},
};

/// Error returned by a driver built on `I2C` and `PINS`
pub type DriverError<I2C, PINS> =
    Error<<I2C as ErrorType>::Error, <PINS as PinRoles>::Error>;

/// Largest write frame: 16-bit address followed by a full register block
const MAX_WRITE_FRAME: usize = 2 + REGISTER_WORDS * 2;
/// Largest read: all of permanent memory
const MAX_READ_BYTES: usize = PERMANENT_WORDS * 2;

/// MLX90381 driver instance
///
/// Owns the I2C bus, the pin role controller that shares the bus lines with
/// the sensor's analog outputs, and the timer used for every wait.
#[derive(Debug)]
pub struct Mlx90381<I2C, PINS, T> {
    pub(crate) i2c: I2C,
    pub(crate) pins: PINS,
    pub(crate) timer: T,
    pub(crate) config: Config,
    pub(crate) state: ModeState,
    /// Both lines are muxed to the I2C peripheral
    pub(crate) bus_attached: bool,
}

impl<I2C, PINS, T> Mlx90381<I2C, PINS, T>
where
    I2C: I2c,
    PINS: PinRoles,
    T: MonotonicTimer,
{
    /// Create a new driver instance
    ///
    /// The sensor starts out in analog output mode; call
    /// [`activate`](Self::activate) before any memory access.
    pub fn new(i2c: I2C, pins: PINS, timer: T, config: Config) -> Self {
        Self {
            i2c,
            pins,
            timer,
            config,
            state: ModeState::new(),
            bus_attached: false,
        }
    }

    /// Release the bus, pins and timer, consuming the driver
    pub fn release(self) -> (I2C, PINS, T) {
        (self.i2c, self.pins, self.timer)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Float both lines so the sensor can drive its analog outputs
    ///
    /// The next transaction hands the lines back to the I2C peripheral first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pin`] if the lines cannot be reconfigured
    pub fn release_to_idle(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        #[cfg(feature = "defmt")]
        defmt::trace!("Releasing sensor lines to input");

        self.bus_attached = false;
        self.pins.release_to_input().map_err(Error::Pin)
    }

    /// Addressed read with repeated start
    ///
    /// Protocol: `S-Addr[W]-AddrMSB-AddrLSB-Sr-Addr[R]-Data...-P`. Words are
    /// big-endian on the wire.
    pub(crate) fn bus_read(
        &mut self,
        address: u16,
        words: &mut [u16],
    ) -> Result<(), DriverError<I2C, PINS>> {
        let len = words.len() * 2;
        debug_assert!(len <= MAX_READ_BYTES);

        self.expire_idle_modes();
        self.attach_bus()?;

        #[cfg(feature = "defmt")]
        defmt::trace!("Reading {} words from 0x{:04X}", words.len(), address);

        let mut rx = [0u8; MAX_READ_BYTES];
        let started = self.timer.now();
        if let Err(e) = self
            .i2c
            .write_read(self.config.address, &address.to_be_bytes(), &mut rx[..len])
        {
            return Err(self.classify(e, started, address));
        }
        self.state.touch(self.timer.now());

        for (word, bytes) in words.iter_mut().zip(rx[..len].chunks_exact(2)) {
            *word = u16::from_be_bytes([bytes[0], bytes[1]]);
        }

        Ok(())
    }

    /// Addressed write of a batch of words in one transaction
    ///
    /// Protocol: `S-Addr[W]-AddrMSB-AddrLSB-DataMSB-DataLSB-...-P`.
    pub(crate) fn bus_write(
        &mut self,
        address: u16,
        words: &[u16],
    ) -> Result<(), DriverError<I2C, PINS>> {
        debug_assert!(words.len() <= REGISTER_WORDS);

        self.expire_idle_modes();
        self.attach_bus()?;

        #[cfg(feature = "defmt")]
        defmt::trace!("Writing {} words to 0x{:04X}", words.len(), address);

        let mut frame = [0u8; MAX_WRITE_FRAME];
        frame[..2].copy_from_slice(&address.to_be_bytes());
        for (bytes, word) in frame[2..].chunks_exact_mut(2).zip(words) {
            bytes.copy_from_slice(&word.to_be_bytes());
        }
        let len = 2 + words.len().min(REGISTER_WORDS) * 2;

        let started = self.timer.now();
        if let Err(e) = self.i2c.write(self.config.address, &frame[..len]) {
            return Err(self.classify(e, started, address));
        }
        self.state.touch(self.timer.now());

        Ok(())
    }

    /// Hand the lines back to the I2C peripheral unless they already are
    fn attach_bus(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        if !self.bus_attached {
            #[cfg(feature = "defmt")]
            defmt::trace!("Restoring bus role");

            self.pins.as_bus_peripheral().map_err(Error::Pin)?;
            self.bus_attached = true;
        }
        Ok(())
    }

    fn classify(
        &mut self,
        error: I2C::Error,
        started: Instant,
        #[allow(unused_variables)] address: u16,
    ) -> DriverError<I2C, PINS> {
        match error.kind() {
            ErrorKind::NoAcknowledge(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("NACK on transaction at 0x{:04X}", address);
                Error::TransactionNack
            }
            _ if self.timer.elapsed(started) >= self.config.bus_timeout => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Timeout on transaction at 0x{:04X}", address);
                Error::TransactionTimeout
            }
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Bus error on transaction at 0x{:04X}", address);
                Error::Bus(error)
            }
        }
    }

    /// Forget the recorded modes if the sensor has been idle long enough to
    /// fall back to analog output
    pub(crate) fn expire_idle_modes(&mut self) {
        let now = self.timer.now();
        if self.state.expire(now, self.config.self_deactivation) {
            #[cfg(feature = "defmt")]
            defmt::debug!("Interface idle past self-deactivation, modes reset");
        }
    }
}
