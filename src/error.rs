use crate::register::Region;

/// Error type for MLX90381 operations
///
/// `E` is the I2C bus error, `P` the pin role controller error.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E, P> {
    /// The sensor did not answer the PTC wake sequence
    ActivationFailed(ActivationFailure),
    /// The sensor did not acknowledge an addressed transaction
    TransactionNack,
    /// The bus gave up after the configured timeout
    TransactionTimeout,
    /// Address outside the region the operation may touch
    InvalidRegion {
        /// Offending start address
        address: u16,
    },
    /// The recorded sensor mode does not allow this access
    ModeViolation,
    /// Write refused because the region has not been read back first
    NoBaseline(Region),
    /// Any other bus error
    Bus(E),
    /// Pin reconfiguration or pin I/O error
    Pin(P),
}

/// Which poll of the wake sequence gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivationFailure {
    /// The clock line never dropped, the output drivers stayed on
    DriversStillOn,
    /// The data line pull-up never came up after the 8 clocks
    NoAcknowledge,
}

impl<E, P> Error<E, P> {
    /// Misuse errors are rejected before touching the bus and are never worth
    /// retrying
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegion { .. } | Self::ModeViolation | Self::NoBaseline(_)
        )
    }
}
