//! Register and MTP access
//!
//! Reads are a single addressed transaction for any number of contiguous
//! words. Register writes go out as one batch. MTP words are erased and
//! programmed one at a time, each followed by the cell's program cycle, so an
//! MTP write of `n` words costs `n` transactions plus `n * 11 ms`.

use embedded_hal::i2c::I2c;

use crate::{
    driver::{DriverError, Mlx90381},
    error::Error,
    mode::MemoryMode,
    pins::PinRoles,
    register::{PERMANENT_WRITABLE_END, REGISTER_END, REGISTER_START, REGISTER_WRITE_WORDS, Region},
    timing::MonotonicTimer,
};

/// Minimum MTP erase and program time per word (datasheet: 10 ms)
pub const MTP_WRITE_CYCLE_MS: u32 = 11;

impl<I2C, PINS, T> Mlx90381<I2C, PINS, T>
where
    I2C: I2c,
    PINS: PinRoles,
    T: MonotonicTimer,
{
    /// Read `words.len()` contiguous words starting at `address`
    ///
    /// Works for both MTP and register addresses; the caller picks the mode.
    /// An empty buffer performs no transaction.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRegion`] for odd addresses or spans that leave their
    ///   region
    /// - [`Error::ModeViolation`] with mode guards on and no calibration
    ///   family mode recorded
    /// - [`Error::TransactionNack`], [`Error::TransactionTimeout`] or
    ///   [`Error::Bus`] from the transaction itself
    pub fn read_words(
        &mut self,
        address: u16,
        words: &mut [u16],
    ) -> Result<(), DriverError<I2C, PINS>> {
        if Region::span(address, words.len()).is_none() {
            return Err(Error::InvalidRegion { address });
        }
        if words.is_empty() {
            return Ok(());
        }
        if self.config.enforce_mode_guards && !self.communication_mode().is_calibration_family() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Read of 0x{:04X} outside calibration mode", address);
            return Err(Error::ModeViolation);
        }

        self.bus_read(address, words)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("Read 0x{:04X}: {:04X}", address, words);

        Ok(())
    }

    /// Read customer registers, `address` in `0x20..0x2E`
    ///
    /// # Errors
    ///
    /// As [`read_words`](Self::read_words), plus [`Error::InvalidRegion`] for
    /// MTP addresses
    pub fn read_registers(
        &mut self,
        address: u16,
        words: &mut [u16],
    ) -> Result<(), DriverError<I2C, PINS>> {
        if Region::of(address) != Some(Region::Register) {
            return Err(Error::InvalidRegion { address });
        }
        self.read_words(address, words)
    }

    /// Read MTP, `address` in `0x00..0x1E`
    ///
    /// # Errors
    ///
    /// As [`read_words`](Self::read_words), plus [`Error::InvalidRegion`] for
    /// register addresses
    pub fn read_permanent(
        &mut self,
        address: u16,
        words: &mut [u16],
    ) -> Result<(), DriverError<I2C, PINS>> {
        if Region::of(address) != Some(Region::Permanent) {
            return Err(Error::InvalidRegion { address });
        }
        self.read_words(address, words)
    }

    /// Write customer registers in one transaction
    ///
    /// At most [`REGISTER_WRITE_WORDS`] words are sent; the rest of `words`
    /// is ignored. Returns the number of words written.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRegion`] if `address` is not a customer register or
    ///   the batch would run past `0x2E`
    /// - [`Error::ModeViolation`] with mode guards on and no calibration
    ///   family mode recorded
    /// - transaction errors as for [`read_words`](Self::read_words)
    pub fn write_registers(
        &mut self,
        address: u16,
        words: &[u16],
    ) -> Result<usize, DriverError<I2C, PINS>> {
        if address < REGISTER_START || address >= REGISTER_END {
            return Err(Error::InvalidRegion { address });
        }
        let words = &words[..words.len().min(REGISTER_WRITE_WORDS)];
        if Region::span(address, words.len()) != Some(Region::Register) {
            return Err(Error::InvalidRegion { address });
        }
        if words.is_empty() {
            return Ok(0);
        }
        if self.config.enforce_mode_guards && !self.communication_mode().is_calibration_family() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Register write outside calibration mode");
            return Err(Error::ModeViolation);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Writing registers 0x{:04X}: {:04X}", address, words);

        self.bus_write(address, words)?;
        Ok(words.len())
    }

    /// Program one MTP word
    ///
    /// Always blocks for [`MTP_WRITE_CYCLE_MS`] after the transaction, even
    /// if it failed, so a cell is never touched again mid-cycle.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRegion`] unless `address` is an even address in the
    ///   customer area `0x00..0x0E`
    /// - [`Error::ModeViolation`] with mode guards on and MTP write mode not
    ///   recorded
    /// - transaction errors as for [`read_words`](Self::read_words)
    pub fn write_permanent_word(
        &mut self,
        address: u16,
        word: u16,
    ) -> Result<(), DriverError<I2C, PINS>> {
        if Region::of(address) != Some(Region::Permanent) || address >= PERMANENT_WRITABLE_END {
            return Err(Error::InvalidRegion { address });
        }
        if self.config.enforce_mode_guards && self.memory_mode() != MemoryMode::WriteActive {
            #[cfg(feature = "defmt")]
            defmt::warn!("MTP write to 0x{:04X} outside MTP write mode", address);
            return Err(Error::ModeViolation);
        }

        let written = self.bus_write(address, &[word]);
        self.timer.delay_ms(MTP_WRITE_CYCLE_MS);

        #[cfg(feature = "defmt")]
        if written.is_ok() {
            defmt::debug!("MTP[0x{:02X}] = 0x{:04X}", address, word);
        } else {
            defmt::warn!("MTP write error at 0x{:04X}", address);
        }

        written
    }

    /// Program consecutive MTP words starting at `address`, one word per
    /// transaction
    ///
    /// Stops at the first failing word. Takes at least
    /// `words.len() * MTP_WRITE_CYCLE_MS`, so a full batch outlasts the
    /// self-deactivation window: run [`activate`](Self::activate) again
    /// before closing MTP access, as
    /// [`Programmer::program_permanent`](crate::Programmer::program_permanent)
    /// does.
    ///
    /// # Errors
    ///
    /// As [`write_permanent_word`](Self::write_permanent_word) for the first
    /// word that failed
    pub fn write_permanent(
        &mut self,
        address: u16,
        words: &[u16],
    ) -> Result<(), DriverError<I2C, PINS>> {
        let end = usize::from(address) + words.len() * 2;
        if end > usize::from(PERMANENT_WRITABLE_END) {
            return Err(Error::InvalidRegion { address });
        }
        for (word_address, &word) in (address..).step_by(2).zip(words) {
            self.write_permanent_word(word_address, word)?;
        }
        Ok(())
    }
}
