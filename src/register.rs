//! Memory map of the MLX90381 and decoders for its customer words.

/// Control registers of the MLX90381
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
#[repr(u16)]
pub enum Register {
    /// First customer register word
    Customer = 0x0020,
    /// Communication mode command register
    Command = 0x0044,
    /// MTP control register
    MtpControl = 0x0046,
}

impl From<Register> for u16 {
    fn from(reg: Register) -> u16 {
        reg as u16
    }
}

/// First permanent memory address
pub const PERMANENT_START: u16 = 0x0000;
/// End of the customer programmable permanent area (exclusive)
pub const PERMANENT_WRITABLE_END: u16 = 0x0010;
/// End of permanent memory (exclusive)
pub const PERMANENT_END: u16 = 0x0020;
/// First customer register address
pub const REGISTER_START: u16 = 0x0020;
/// End of the customer register block (exclusive)
pub const REGISTER_END: u16 = 0x0030;

/// Words in the customer register block
pub const REGISTER_WORDS: usize = 8;
/// Words in permanent memory, factory area included
pub const PERMANENT_WORDS: usize = 16;
/// Customer programmable permanent words
pub const PERMANENT_WRITABLE_WORDS: usize = 8;
/// Largest register batch the sensor accepts in one write
pub const REGISTER_WRITE_WORDS: usize = 6;

/// Command word: application mode running from the MTP configuration
pub const MODE_NORMAL_APPLICATION: u16 = 0x944C;
/// Command word: calibration mode
pub const MODE_CALIBRATION: u16 = 0x544E;
/// Command word: application mode running from the register configuration
pub const MODE_CALIBRATION_APPLICATION: u16 = 0x744C;

/// MTP control word: enable programming
pub const MTP_WRITE: u16 = 0x0077;
/// MTP control word: enable reading
pub const MTP_READ: u16 = 0x0007;
/// MTP control word: deactivate MTP access
pub const MTP_RESET: u16 = 0x0006;

/// Permanent word holding the memory lock bit
pub const LOCK_ADDRESS: u16 = 0x000C;
/// Value that permanently locks permanent memory
pub const LOCK_VALUE: u16 = 0x0003;

/// Memory class an address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    /// Non-volatile MTP, `0x00..0x20`
    Permanent,
    /// Volatile customer registers, `0x20..0x30`
    Register,
}

impl Region {
    /// Classify a word address
    ///
    /// Returns `None` for odd addresses and for anything past the customer
    /// register block.
    #[must_use]
    pub const fn of(address: u16) -> Option<Self> {
        if address % 2 != 0 {
            None
        } else if address < PERMANENT_END {
            Some(Self::Permanent)
        } else if address < REGISTER_END {
            Some(Self::Register)
        } else {
            None
        }
    }

    /// Exclusive end address of the region
    #[must_use]
    pub const fn end(self) -> u16 {
        match self {
            Self::Permanent => PERMANENT_END,
            Self::Register => REGISTER_END,
        }
    }

    /// Check that `count` words starting at `address` stay inside one region
    #[must_use]
    pub fn span(address: u16, count: usize) -> Option<Self> {
        let region = Self::of(address)?;
        let end = usize::from(address) + count * 2;
        (end <= usize::from(region.end())).then_some(region)
    }
}

/// Snapshot of the customer register block `0x20..0x2E`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterImage(pub [u16; REGISTER_WORDS]);

impl RegisterImage {
    /// Word at a register address, `None` outside `0x20..0x2E` or if odd
    #[must_use]
    pub fn word(&self, address: u16) -> Option<u16> {
        match Region::of(address)? {
            Region::Register => Some(self.0[usize::from(address - REGISTER_START) / 2]),
            Region::Permanent => None,
        }
    }

    /// Words as written by a register block program
    #[must_use]
    pub fn writable(&self) -> [u16; REGISTER_WRITE_WORDS] {
        let mut words = [0; REGISTER_WRITE_WORDS];
        words.copy_from_slice(&self.0[..REGISTER_WRITE_WORDS]);
        words
    }

    /// Gain and offset configuration of the X, Y and Z paths
    #[must_use]
    pub fn gains(&self) -> [GainWord; 3] {
        [GainWord(self.0[0]), GainWord(self.0[1]), GainWord(self.0[2])]
    }

    #[must_use]
    pub fn channels(&self) -> ChannelWord {
        ChannelWord(self.0[3])
    }

    #[must_use]
    pub fn temperature_compensation(&self) -> TemperatureCompensationWord {
        TemperatureCompensationWord(self.0[4])
    }

    #[must_use]
    pub fn filter(&self) -> FilterWord {
        FilterWord(self.0[5])
    }
}

/// Snapshot of permanent memory `0x00..0x1E`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PermanentImage(pub [u16; PERMANENT_WORDS]);

impl PermanentImage {
    /// Word at a permanent address, `None` outside `0x00..0x1E` or if odd
    #[must_use]
    pub fn word(&self, address: u16) -> Option<u16> {
        match Region::of(address)? {
            Region::Permanent => Some(self.0[usize::from(address) / 2]),
            Region::Register => None,
        }
    }

    /// The customer programmable words `0x00..0x0E`
    #[must_use]
    pub fn writable(&self) -> [u16; PERMANENT_WRITABLE_WORDS] {
        let mut words = [0; PERMANENT_WRITABLE_WORDS];
        words.copy_from_slice(&self.0[..PERMANENT_WRITABLE_WORDS]);
        words
    }

    #[must_use]
    pub fn lock(&self) -> LockWord {
        LockWord(self.0[usize::from(LOCK_ADDRESS) / 2])
    }

    /// Whether MEMLOCK is programmed
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock().memlock()
    }

    /// Factory chip identification bytes from `0x1A`, `0x1C` and `0x1E`
    #[must_use]
    pub fn chip_id(&self) -> [u8; 3] {
        [
            ChipIdWord(self.0[13]).chip_id(),
            ChipIdWord(self.0[14]).chip_id(),
            ChipIdWord(self.0[15]).chip_id(),
        ]
    }

    #[must_use]
    pub fn tc350(&self) -> Tc350Word {
        Tc350Word(self.0[7])
    }

    #[must_use]
    pub fn tc2000(&self) -> Tc2000Word {
        Tc2000Word(self.0[10])
    }
}

bitfield::bitfield! {
    /// RG/FG/VOQ
    ///
    /// Words `0x20`, `0x22`, `0x24` (MTP `0x00`, `0x02`, `0x04`) for the X, Y
    /// and Z paths. The Z word has no output offset field.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct GainWord(u16);
    impl Debug;
    u8;
    /// Output quiescent voltage of the channel (OUT1 for X, OUT2 for Y)
    pub voq, set_voq: 11, 8;
    /// Fine gain
    pub fine_gain, set_fine_gain: 7, 3;
    /// Rough gain
    pub rough_gain, set_rough_gain: 2, 0;
}

bitfield::bitfield! {
    /// AXIS/PLATEZ, word `0x26`
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct ChannelWord(u16);
    impl Debug;
    u8;
    /// Plate Z selection
    pub plate_z, set_plate_z: 5, 4;
    /// Magnetic axis routed to output 2
    pub axis_ch2, set_axis_ch2: 3, 2;
    /// Magnetic axis routed to output 1
    pub axis_ch1, set_axis_ch1: 1, 0;
}

bitfield::bitfield! {
    /// TC, word `0x28`
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct TemperatureCompensationWord(u16);
    impl Debug;
    u8;
    pub tc, set_tc: 4, 0;
}

bitfield::bitfield! {
    /// FILT, word `0x2A`
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct FilterWord(u16);
    impl Debug;
    u8;
    pub filt, set_filt: 4, 0;
}

bitfield::bitfield! {
    /// MEMLOCK/DIS_DIAG, MTP word `0x0C`
    ///
    /// Programming MEMLOCK disables every further MTP write for good.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct LockWord(u16);
    impl Debug;
    /// Diagnostics disabled
    pub dis_diag, set_dis_diag: 1;
    /// MTP locked
    pub memlock, set_memlock: 0;
}

bitfield::bitfield! {
    /// TC350 trim, MTP word `0x0E`
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Tc350Word(u16);
    impl Debug;
    u8;
    pub tc350, _: 3, 0;
}

bitfield::bitfield! {
    /// TC2000 trim, factory MTP word `0x14`
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Tc2000Word(u16);
    impl Debug;
    u8;
    pub tc2000, _: 15, 12;
}

bitfield::bitfield! {
    /// CHIP_ID, factory MTP words `0x1A`, `0x1C`, `0x1E`
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct ChipIdWord(u16);
    impl Debug;
    u8;
    pub chip_id, _: 7, 0;
}
