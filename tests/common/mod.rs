//! Simulated clock, pin roles and sensor shared by the integration tests.

#![allow(dead_code)]

use std::{cell::Cell, convert::Infallible, rc::Rc};

use embedded_hal::{
    delay::DelayNs,
    digital::PinState,
    i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation},
};
use mlx90381::{Config, Instant, Line, Mlx90381, MonotonicTimer, PinRoles, Pull, map};

pub const ADDRESS: u8 = 0x32;

/// Clock that only moves when somebody waits on it
#[derive(Debug, Clone, Default)]
pub struct SimTimer {
    ns: Rc<Cell<u64>>,
}

impl SimTimer {
    pub fn elapsed_us(&self) -> u64 {
        self.ns.get() / 1_000
    }

    pub fn advance_ms(&self, ms: u64) {
        self.ns.set(self.ns.get() + ms * 1_000_000);
    }
}

impl DelayNs for SimTimer {
    fn delay_ns(&mut self, ns: u32) {
        self.ns.set(self.ns.get() + u64::from(ns));
    }
}

impl MonotonicTimer for SimTimer {
    fn now(&mut self) -> Instant {
        Instant::from_ticks(self.elapsed_us())
    }
}

/// How the simulated sensor reacts to a PTC entry attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Responsive,
    /// Output drivers never switch off, the clock line stays high
    DriversStuckOn,
    /// Drivers switch off but the pull-up acknowledge never comes
    SilentAfterClocks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Bus,
    Output(PinState),
    Input(Pull),
}

/// Pin role controller wired to a simulated MLX90381 output stage
#[derive(Debug)]
pub struct SimPins {
    wakes: Vec<Wake>,
    wake: Wake,
    clock: Role,
    data: Role,
    /// Completed clock pulses (high then low) while the data line floated,
    /// up to the acknowledge
    pub pulses: u32,
    acknowledged: bool,
    pub clock_polls: u32,
    pub ack_polls: u32,
    pub stop_conditions: u32,
    pub bus_releases: u32,
    pub bus_restores: u32,
    pub idle_releases: u32,
    /// Shared with the sensor: lines are muxed to the I2C peripheral
    bus: Rc<Cell<bool>>,
}

impl SimPins {
    pub fn new(wake: Wake) -> Self {
        Self::scripted(&[wake])
    }

    /// Behaviour per activation attempt; the last entry repeats
    pub fn scripted(wakes: &[Wake]) -> Self {
        Self {
            wakes: wakes.to_vec(),
            wake: wakes[0],
            clock: Role::Bus,
            data: Role::Bus,
            pulses: 0,
            acknowledged: false,
            clock_polls: 0,
            ack_polls: 0,
            stop_conditions: 0,
            bus_releases: 0,
            bus_restores: 0,
            idle_releases: 0,
            bus: Rc::new(Cell::new(true)),
        }
    }

    /// Handle the sensor uses to see whether the lines carry I2C
    pub fn bus_line(&self) -> Rc<Cell<bool>> {
        self.bus.clone()
    }

    pub fn roles(&self) -> (Role, Role) {
        (self.clock, self.data)
    }

    fn role(&mut self, line: Line) -> &mut Role {
        match line {
            Line::Clock => &mut self.clock,
            Line::Data => &mut self.data,
        }
    }
}

impl PinRoles for SimPins {
    type Error = Infallible;

    fn release_bus(&mut self) -> Result<(), Self::Error> {
        let attempt = (self.bus_releases as usize).min(self.wakes.len() - 1);
        self.wake = self.wakes[attempt];
        self.bus_releases += 1;
        self.bus.set(false);
        self.pulses = 0;
        self.acknowledged = false;
        self.clock = Role::Input(Pull::None);
        self.data = Role::Input(Pull::None);
        Ok(())
    }

    fn as_output(&mut self, line: Line, level: PinState) -> Result<(), Self::Error> {
        if line == Line::Data
            && level == PinState::High
            && self.clock == Role::Output(PinState::High)
            && self.acknowledged
        {
            self.stop_conditions += 1;
        }
        *self.role(line) = Role::Output(level);
        Ok(())
    }

    fn as_input(&mut self, line: Line, pull: Pull) -> Result<(), Self::Error> {
        *self.role(line) = Role::Input(pull);
        Ok(())
    }

    fn set_level(&mut self, line: Line, level: PinState) -> Result<(), Self::Error> {
        if line == Line::Clock
            && self.clock == Role::Output(PinState::High)
            && level == PinState::Low
            && matches!(self.data, Role::Input(_))
            && !self.acknowledged
        {
            self.pulses += 1;
        }
        *self.role(line) = Role::Output(level);
        Ok(())
    }

    fn is_high(&mut self, line: Line) -> Result<bool, Self::Error> {
        match line {
            Line::Clock => {
                if let Role::Output(level) = self.clock {
                    return Ok(level == PinState::High);
                }
                self.clock_polls += 1;
                let drivers_off = self.data == Role::Output(PinState::Low)
                    && self.wake != Wake::DriversStuckOn;
                Ok(!drivers_off)
            }
            Line::Data => {
                if let Role::Output(level) = self.data {
                    return Ok(level == PinState::High);
                }
                if self.acknowledged {
                    return Ok(true);
                }
                let ack_window = self.clock == Role::Output(PinState::High)
                    && self.pulses == u32::from(mlx90381::WAKE_PULSES);
                if !ack_window {
                    return Ok(false);
                }
                self.ack_polls += 1;
                self.acknowledged = self.wake == Wake::Responsive;
                Ok(self.acknowledged)
            }
        }
    }

    fn as_bus_peripheral(&mut self) -> Result<(), Self::Error> {
        self.bus_restores += 1;
        self.bus.set(true);
        self.clock = Role::Bus;
        self.data = Role::Bus;
        Ok(())
    }

    fn release_to_input(&mut self) -> Result<(), Self::Error> {
        self.idle_releases += 1;
        self.bus.set(false);
        self.clock = Role::Input(Pull::None);
        self.data = Role::Input(Pull::None);
        Ok(())
    }
}

const WORDS: usize = (map::REGISTER_END / 2) as usize;

/// In-memory MLX90381 answering addressed I2C transactions
#[derive(Debug)]
pub struct SimSensor {
    pub memory: [u16; WORDS],
    pub command: u16,
    pub mtp_control: u16,
    pub transactions: u32,
    /// Advance the clock by this many ms and fail every transaction
    pub stall: Option<(SimTimer, u64)>,
    /// Bus role of the lines; transactions fail while they are GPIO
    pub lines: Option<Rc<Cell<bool>>>,
}

impl SimSensor {
    pub fn new() -> Self {
        Self {
            memory: [0; WORDS],
            command: 0,
            mtp_control: 0,
            transactions: 0,
            stall: None,
            lines: None,
        }
    }

    pub fn word(&self, address: u16) -> u16 {
        self.memory[usize::from(address) / 2]
    }

    pub fn set_word(&mut self, address: u16, value: u16) {
        self.memory[usize::from(address) / 2] = value;
    }

    fn calibrating(&self) -> bool {
        self.command == map::MODE_CALIBRATION || self.command == map::MODE_CALIBRATION_APPLICATION
    }

    fn locked(&self) -> bool {
        self.word(map::LOCK_ADDRESS) & 1 != 0
    }

    fn store(&mut self, pointer: u16, data: &[u8]) -> Result<(), ErrorKind> {
        let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data);
        let words: Vec<u16> = data
            .chunks_exact(2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .collect();

        match pointer {
            0x44 => self.command = words[0],
            0x46 => self.mtp_control = words[0],
            p if p < map::PERMANENT_WRITABLE_END => {
                if self.mtp_control != map::MTP_WRITE || self.locked() || words.len() != 1 {
                    return Err(nack);
                }
                self.set_word(p, words[0]);
            }
            p if (map::REGISTER_START..map::REGISTER_END).contains(&p) => {
                if !self.calibrating() {
                    return Err(nack);
                }
                for (i, &w) in words.iter().enumerate() {
                    self.set_word(p + 2 * i as u16, w);
                }
            }
            _ => return Err(nack),
        }
        Ok(())
    }

    fn load(&self, pointer: u16, buf: &mut [u8]) -> Result<(), ErrorKind> {
        let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data);
        let allowed = if pointer < map::PERMANENT_END {
            self.mtp_control == map::MTP_READ
        } else {
            self.calibrating()
        };
        if !allowed {
            return Err(nack);
        }
        for (i, bytes) in buf.chunks_exact_mut(2).enumerate() {
            bytes.copy_from_slice(&self.word(pointer + 2 * i as u16).to_be_bytes());
        }
        Ok(())
    }
}

impl ErrorType for SimSensor {
    type Error = ErrorKind;
}

impl I2c for SimSensor {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.transactions += 1;
        if let Some((timer, ms)) = &self.stall {
            timer.advance_ms(*ms);
            return Err(ErrorKind::Other);
        }
        if self.lines.as_ref().is_some_and(|bus| !bus.get()) {
            return Err(ErrorKind::Bus);
        }
        if address != ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let mut pointer = 0;
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    pointer = u16::from_be_bytes([bytes[0], bytes[1]]);
                    if bytes.len() > 2 {
                        self.store(pointer, &bytes[2..])?;
                    }
                }
                Operation::Read(buf) => self.load(pointer, buf)?,
            }
        }
        Ok(())
    }
}

pub type SimDriver = Mlx90381<SimSensor, SimPins, SimTimer>;

pub fn sim_driver(mut sensor: SimSensor, pins: SimPins, config: Config) -> (SimDriver, SimTimer) {
    sensor.lines = Some(pins.bus_line());
    let timer = SimTimer::default();
    (Mlx90381::new(sensor, pins, timer.clone(), config), timer)
}
