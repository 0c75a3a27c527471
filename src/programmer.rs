//! Complete programming operations
//!
//! Each operation is a fixed choreography: wake the interface, make sure the
//! sensor is in a calibration mode, access memory, select the mode the sensor
//! should run in afterwards and float the lines again. Register and MTP
//! writes replace whole blocks, so they are refused until the same block has
//! been read back once; otherwise fields the caller never filled in would be
//! overwritten with zeros.

use embedded_hal::i2c::I2c;

use crate::{
    driver::{DriverError, Mlx90381},
    error::Error,
    event::{Event, EventSink, NoEvents, Operation},
    mode::{CommunicationMode, MemoryMode},
    pins::PinRoles,
    register::{
        LOCK_ADDRESS, LOCK_VALUE, PERMANENT_START, PERMANENT_WRITABLE_END,
        PERMANENT_WRITABLE_WORDS, PermanentImage, Region, Register, RegisterImage,
        REGISTER_WRITE_WORDS,
    },
    timing::MonotonicTimer,
};

type Transition<I2C, PINS, T> =
    fn(&mut Mlx90381<I2C, PINS, T>) -> Result<(), DriverError<I2C, PINS>>;

/// Runs the register and MTP programming operations on one sensor
#[derive(Debug)]
pub struct Programmer<I2C, PINS, T, S = NoEvents> {
    sensor: Mlx90381<I2C, PINS, T>,
    events: S,
    registers: Option<RegisterImage>,
    permanent: Option<PermanentImage>,
}

impl<I2C, PINS, T> Programmer<I2C, PINS, T, NoEvents>
where
    I2C: I2c,
    PINS: PinRoles,
    T: MonotonicTimer,
{
    pub fn new(sensor: Mlx90381<I2C, PINS, T>) -> Self {
        Self::with_events(sensor, NoEvents)
    }
}

impl<I2C, PINS, T, S> Programmer<I2C, PINS, T, S>
where
    I2C: I2c,
    PINS: PinRoles,
    T: MonotonicTimer,
    S: EventSink,
{
    /// Create a programmer reporting progress to `events`
    pub fn with_events(sensor: Mlx90381<I2C, PINS, T>, events: S) -> Self {
        Self {
            sensor,
            events,
            registers: None,
            permanent: None,
        }
    }

    /// Direct access to the driver
    pub fn sensor(&mut self) -> &mut Mlx90381<I2C, PINS, T> {
        &mut self.sensor
    }

    /// Release the driver, consuming the programmer
    pub fn release(self) -> Mlx90381<I2C, PINS, T> {
        self.sensor
    }

    /// Register block from the last successful
    /// [`check_registers`](Self::check_registers), updated by later
    /// programming
    #[must_use]
    pub fn register_baseline(&self) -> Option<&RegisterImage> {
        self.registers.as_ref()
    }

    /// MTP contents from the last successful
    /// [`read_permanent`](Self::read_permanent), updated by later programming
    #[must_use]
    pub fn permanent_baseline(&self) -> Option<&PermanentImage> {
        self.permanent.as_ref()
    }

    /// Read the customer register block
    ///
    /// Leaves the sensor in calibration application mode so the register
    /// configuration drives the outputs.
    ///
    /// # Errors
    ///
    /// Returns the first activation, mode or transaction error
    pub fn check_registers(&mut self) -> Result<RegisterImage, DriverError<I2C, PINS>> {
        let image = self.run(Operation::CheckRegisters, |p| {
            p.activate()?;
            p.ensure_calibration()?;

            let mut image = RegisterImage::default();
            p.sensor.read_registers(Register::Customer.into(), &mut image.0)?;

            p.transition(
                Mlx90381::enter_calibration_application,
                Event::CommunicationMode(CommunicationMode::CalibrationApplication),
            )?;
            Ok(image)
        })?;

        self.registers = Some(image);
        Ok(image)
    }

    /// Write the customer register block `0x20..0x2A`
    ///
    /// # Errors
    ///
    /// - [`Error::NoBaseline`] before the first successful
    ///   [`check_registers`](Self::check_registers)
    /// - the first activation, mode or transaction error
    pub fn program_registers(
        &mut self,
        words: &[u16; REGISTER_WRITE_WORDS],
    ) -> Result<(), DriverError<I2C, PINS>> {
        if self.registers.is_none() {
            return self.refuse(Operation::ProgramRegisters, Region::Register);
        }

        self.run(Operation::ProgramRegisters, |p| {
            p.activate()?;
            p.ensure_calibration()?;

            let written = p.sensor.write_registers(Register::Customer.into(), words)?;
            p.emit(Event::RegistersWritten {
                words: u8::try_from(written).unwrap_or(u8::MAX),
            });

            p.transition(
                Mlx90381::enter_calibration_application,
                Event::CommunicationMode(CommunicationMode::CalibrationApplication),
            )
        })?;

        if let Some(image) = &mut self.registers {
            image.0[..REGISTER_WRITE_WORDS].copy_from_slice(words);
        }
        Ok(())
    }

    /// Read all of MTP, the factory area included
    ///
    /// Leaves the sensor in normal application mode.
    ///
    /// # Errors
    ///
    /// Returns the first activation, mode or transaction error
    pub fn read_permanent(&mut self) -> Result<PermanentImage, DriverError<I2C, PINS>> {
        let image = self.run(Operation::ReadPermanent, |p| {
            p.activate()?;
            p.ensure_calibration()?;
            p.transition(
                Mlx90381::enter_mtp_read,
                Event::MemoryMode(MemoryMode::ReadActive),
            )?;

            let mut image = PermanentImage::default();
            let (customer, factory) = image.0.split_at_mut(PERMANENT_WRITABLE_WORDS);
            p.sensor.read_permanent(PERMANENT_START, customer)?;
            p.sensor.read_permanent(PERMANENT_WRITABLE_END, factory)?;

            p.transition(
                Mlx90381::enter_mtp_reset,
                Event::MemoryMode(MemoryMode::ResetActive),
            )?;
            p.transition(
                Mlx90381::enter_normal_application,
                Event::CommunicationMode(CommunicationMode::NormalApplication),
            )?;
            Ok(image)
        })?;

        self.permanent = Some(image);
        Ok(image)
    }

    /// Program the customer MTP words `0x00..0x0E`
    ///
    /// Eight program cycles outlast the interface timeout, so the interface is
    /// woken again before MTP access is closed. Once MTP write mode is
    /// entered, MTP access is closed and normal application mode selected even
    /// if programming fails.
    ///
    /// # Errors
    ///
    /// - [`Error::NoBaseline`] before the first successful
    ///   [`read_permanent`](Self::read_permanent)
    /// - the first activation, mode or transaction error; programming stops
    ///   at the failing word and the words before it stay programmed
    pub fn program_permanent(
        &mut self,
        words: &[u16; PERMANENT_WRITABLE_WORDS],
    ) -> Result<(), DriverError<I2C, PINS>> {
        if self.permanent.is_none() {
            return self.refuse(Operation::ProgramPermanent, Region::Permanent);
        }

        self.run(Operation::ProgramPermanent, |p| {
            p.activate()?;
            p.ensure_calibration()?;
            p.transition(
                Mlx90381::enter_mtp_write,
                Event::MemoryMode(MemoryMode::WriteActive),
            )?;

            let programmed = p.program_words(words);

            p.emit(Event::Reactivating);
            let recalibrated = p.activate().and_then(|()| {
                p.transition(
                    Mlx90381::enter_calibration,
                    Event::CommunicationMode(CommunicationMode::Calibration),
                )
            });
            let closed = p.close_mtp();

            programmed.and(recalibrated).and(closed)
        })?;

        if let Some(image) = &mut self.permanent {
            image.0[..PERMANENT_WRITABLE_WORDS].copy_from_slice(words);
        }
        Ok(())
    }

    /// Program MEMLOCK
    ///
    /// Irreversible: afterwards MTP can never be written again. MTP access is
    /// closed even if the lock write fails.
    ///
    /// # Errors
    ///
    /// Returns the first activation, mode or transaction error
    pub fn lock_permanent(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        self.run(Operation::LockPermanent, |p| {
            p.activate()?;
            p.ensure_calibration()?;
            p.transition(
                Mlx90381::enter_mtp_write,
                Event::MemoryMode(MemoryMode::WriteActive),
            )?;

            let locked = p.sensor.write_permanent_word(LOCK_ADDRESS, LOCK_VALUE);
            if locked.is_ok() {
                p.emit(Event::WordProgrammed {
                    address: LOCK_ADDRESS,
                    value: LOCK_VALUE,
                });
            }
            let closed = p.close_mtp();

            locked.and(closed)
        })?;

        if let Some(image) = &mut self.permanent {
            image.0[usize::from(LOCK_ADDRESS) / 2] = LOCK_VALUE;
        }
        Ok(())
    }

    fn run<R>(
        &mut self,
        operation: Operation,
        steps: impl FnOnce(&mut Self) -> Result<R, DriverError<I2C, PINS>>,
    ) -> Result<R, DriverError<I2C, PINS>> {
        self.emit(Event::Started(operation));

        let outcome = steps(self);
        let released = self.sensor.release_to_idle();

        match outcome.and_then(|value| released.map(|()| value)) {
            Ok(value) => {
                self.emit(Event::Completed(operation));
                Ok(value)
            }
            Err(e) => {
                self.emit(Event::Failed(operation));
                Err(e)
            }
        }
    }

    fn refuse(
        &mut self,
        operation: Operation,
        region: Region,
    ) -> Result<(), DriverError<I2C, PINS>> {
        #[cfg(feature = "defmt")]
        defmt::warn!("{} refused: {} not read yet", operation, region);

        self.emit(Event::Failed(operation));
        Err(Error::NoBaseline(region))
    }

    fn activate(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        match self.sensor.activate() {
            Ok(()) => {
                self.emit(Event::Activated);
                Ok(())
            }
            Err(e) => {
                if let Error::ActivationFailed(failure) = &e {
                    self.emit(Event::ActivationFailed(*failure));
                }
                Err(e)
            }
        }
    }

    fn ensure_calibration(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        if self.sensor.communication_mode().is_calibration_family() {
            return Ok(());
        }
        self.transition(
            Mlx90381::enter_calibration,
            Event::CommunicationMode(CommunicationMode::Calibration),
        )
    }

    /// Program consecutive customer MTP words from `0x00`, stopping at the
    /// first failure
    fn program_words(
        &mut self,
        words: &[u16; PERMANENT_WRITABLE_WORDS],
    ) -> Result<(), DriverError<I2C, PINS>> {
        for (address, &value) in (PERMANENT_START..).step_by(2).zip(words) {
            self.sensor.write_permanent_word(address, value)?;
            self.emit(Event::WordProgrammed { address, value });
        }
        Ok(())
    }

    /// Deactivate MTP access and run from the MTP configuration
    ///
    /// Both commands are sent even if the first one fails.
    fn close_mtp(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        let reset = self.transition(
            Mlx90381::enter_mtp_reset,
            Event::MemoryMode(MemoryMode::ResetActive),
        );
        let normal = self.transition(
            Mlx90381::enter_normal_application,
            Event::CommunicationMode(CommunicationMode::NormalApplication),
        );
        reset.and(normal)
    }

    fn transition(
        &mut self,
        enter: Transition<I2C, PINS, T>,
        event: Event,
    ) -> Result<(), DriverError<I2C, PINS>> {
        enter(&mut self.sensor)?;
        self.emit(event);
        Ok(())
    }

    fn emit(&mut self, event: Event) {
        #[cfg(feature = "defmt")]
        defmt::debug!("{}", event);

        self.events.emit(event);
    }
}
