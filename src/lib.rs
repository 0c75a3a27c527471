#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

mod activation;
mod config;
mod driver;
mod error;
mod event;
mod memory;
mod mode;
mod pins;
mod programmer;
mod register;
mod timing;

pub use activation::{
    ACK_FAILURE_SETTLE_HALF_PERIODS, ACK_POLL_INTERVAL_US, ACK_POLLS, DRIVER_SHUTOFF_POLLS,
    WAKE_PULSES,
};
pub use config::Config;
pub use driver::{DriverError, Mlx90381};
pub use error::{ActivationFailure, Error};
pub use event::{Event, EventSink, NoEvents, Operation};
pub use memory::MTP_WRITE_CYCLE_MS;
pub use mode::{CommunicationMode, MemoryMode, ModeState};
pub use pins::{Line, PinRoles, Pull};
pub use programmer::Programmer;
pub use register::{
    ChannelWord, ChipIdWord, FilterWord, GainWord, LockWord, PermanentImage, Region,
    Register, RegisterImage, TemperatureCompensationWord, Tc2000Word, Tc350Word,
};
pub use timing::{CycleTimer, Duration, Instant, MonotonicTimer};

/// Address map and command words
pub mod map {
    pub use crate::register::{
        LOCK_ADDRESS, LOCK_VALUE, MODE_CALIBRATION, MODE_CALIBRATION_APPLICATION,
        MODE_NORMAL_APPLICATION, MTP_READ, MTP_RESET, MTP_WRITE, PERMANENT_END,
        PERMANENT_START, PERMANENT_WORDS, PERMANENT_WRITABLE_END, PERMANENT_WRITABLE_WORDS,
        REGISTER_END, REGISTER_START, REGISTER_WORDS, REGISTER_WRITE_WORDS,
    };
}
