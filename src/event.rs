//! Progress reporting for the high-level operations

use crate::{
    error::ActivationFailure,
    mode::{CommunicationMode, MemoryMode},
};

/// High-level operation run by the [`Programmer`](crate::Programmer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    ProgramRegisters,
    CheckRegisters,
    ProgramPermanent,
    ReadPermanent,
    LockPermanent,
}

/// Something the programmer did or observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Started(Operation),
    /// PTC entry succeeded
    Activated,
    ActivationFailed(ActivationFailure),
    /// Re-running PTC entry because MTP programming outlasted the interface
    /// timeout
    Reactivating,
    CommunicationMode(CommunicationMode),
    MemoryMode(MemoryMode),
    RegistersWritten { words: u8 },
    WordProgrammed { address: u16, value: u16 },
    Completed(Operation),
    Failed(Operation),
}

/// Receiver for [`Event`]s
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

impl<F> EventSink for F
where
    F: FnMut(Event),
{
    fn emit(&mut self, event: Event) {
        self(event);
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl EventSink for NoEvents {
    fn emit(&mut self, _event: Event) {}
}
