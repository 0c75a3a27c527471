//! Communication and MTP mode state machine
//!
//! The sensor keeps two independent settings: the communication mode set
//! through the command register and the MTP access mode set through the MTP
//! control register. Each transition is a single word write; the recorded
//! mode only changes once the sensor acknowledged it.

use embedded_hal::i2c::I2c;

use crate::{
    driver::{DriverError, Mlx90381},
    pins::PinRoles,
    register::{
        MODE_CALIBRATION, MODE_CALIBRATION_APPLICATION, MODE_NORMAL_APPLICATION, MTP_READ,
        MTP_RESET, MTP_WRITE, Register,
    },
    timing::{Duration, Instant, MonotonicTimer},
};

/// Communication mode selected through the command register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommunicationMode {
    /// Nothing commanded since start-up or since the interface timed out
    #[default]
    Uninitialized,
    Calibration,
    /// Application mode using the MTP configuration
    NormalApplication,
    /// Application mode using the register configuration
    CalibrationApplication,
}

impl CommunicationMode {
    /// Calibration and calibration application both accept register access
    #[must_use]
    pub const fn is_calibration_family(self) -> bool {
        matches!(self, Self::Calibration | Self::CalibrationApplication)
    }
}

/// MTP access mode selected through the MTP control register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemoryMode {
    #[default]
    Idle,
    WriteActive,
    ReadActive,
    ResetActive,
}

/// Recorded sensor modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeState {
    pub communication: CommunicationMode,
    pub memory: MemoryMode,
    /// End of the last acknowledged transaction
    pub last_transaction: Option<Instant>,
}

impl ModeState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            communication: CommunicationMode::Uninitialized,
            memory: MemoryMode::Idle,
            last_transaction: None,
        }
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_transaction = Some(now);
    }

    /// Reset both modes if nothing was acknowledged for longer than `window`
    ///
    /// Returns `true` if the modes were reset.
    pub(crate) fn expire(&mut self, now: Instant, window: Duration) -> bool {
        let Some(last) = self.last_transaction else {
            return false;
        };
        let idle = now
            .checked_duration_since(last)
            .unwrap_or(Duration::from_ticks(0));
        if idle <= window {
            return false;
        }
        self.communication = CommunicationMode::Uninitialized;
        self.memory = MemoryMode::Idle;
        self.last_transaction = None;
        true
    }
}

impl<I2C, PINS, T> Mlx90381<I2C, PINS, T>
where
    I2C: I2c,
    PINS: PinRoles,
    T: MonotonicTimer,
{
    /// Recorded modes as they are, without checking for an idle timeout
    #[must_use]
    pub fn modes(&self) -> ModeState {
        self.state
    }

    /// Current communication mode
    ///
    /// Reads as [`CommunicationMode::Uninitialized`] once the interface has
    /// been idle longer than the self-deactivation window.
    pub fn communication_mode(&mut self) -> CommunicationMode {
        self.expire_idle_modes();
        self.state.communication
    }

    /// Current MTP mode, subject to the same idle expiry as
    /// [`communication_mode`](Self::communication_mode)
    pub fn memory_mode(&mut self) -> MemoryMode {
        self.expire_idle_modes();
        self.state.memory
    }

    /// Enter calibration mode
    ///
    /// # Errors
    ///
    /// Returns an error if the command write is not acknowledged
    pub fn enter_calibration(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        self.set_communication(CommunicationMode::Calibration, MODE_CALIBRATION)
    }

    /// Enter application mode with the MTP configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the command write is not acknowledged
    pub fn enter_normal_application(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        self.set_communication(CommunicationMode::NormalApplication, MODE_NORMAL_APPLICATION)
    }

    /// Enter application mode keeping the register configuration valid
    ///
    /// # Errors
    ///
    /// Returns an error if the command write is not acknowledged
    pub fn enter_calibration_application(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        self.set_communication(
            CommunicationMode::CalibrationApplication,
            MODE_CALIBRATION_APPLICATION,
        )
    }

    /// Enable MTP programming
    ///
    /// # Errors
    ///
    /// Returns an error if the MTP control write is not acknowledged
    pub fn enter_mtp_write(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        self.set_memory(MemoryMode::WriteActive, MTP_WRITE)
    }

    /// Enable MTP reading
    ///
    /// # Errors
    ///
    /// Returns an error if the MTP control write is not acknowledged
    pub fn enter_mtp_read(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        self.set_memory(MemoryMode::ReadActive, MTP_READ)
    }

    /// Deactivate MTP access and reset the write mode
    ///
    /// # Errors
    ///
    /// Returns an error if the MTP control write is not acknowledged
    pub fn enter_mtp_reset(&mut self) -> Result<(), DriverError<I2C, PINS>> {
        self.set_memory(MemoryMode::ResetActive, MTP_RESET)
    }

    fn set_communication(
        &mut self,
        mode: CommunicationMode,
        command: u16,
    ) -> Result<(), DriverError<I2C, PINS>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("Entering {} (0x{:04X})", mode, command);

        self.bus_write(Register::Command.into(), &[command])?;
        self.state.communication = mode;
        Ok(())
    }

    fn set_memory(&mut self, mode: MemoryMode, command: u16) -> Result<(), DriverError<I2C, PINS>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("MTP mode {} (0x{:04X})", mode, command);

        self.bus_write(Register::MtpControl.into(), &[command])?;
        self.state.memory = mode;
        Ok(())
    }
}
