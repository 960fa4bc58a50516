//! Record type codes and the decodable record formats.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sync counter period of a PicoHarp T3 record (16-bit `nsync`).
pub const WRAPAROUND: u64 = 65_536;

/// Sync counter period of a HydraHarp T3 record (10-bit `nsync`).
pub const T3_WRAPAROUND: u64 = 1_024;

/// Every supported record is one little-endian 32-bit word.
pub const BITS_PER_RECORD: i64 = 32;

/// Bytes per record on the wire.
pub const RECORD_SIZE: usize = 4;

/// Measurement timing mode encoded in a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimingMode {
    /// Time-tagged mode, no sync-relative dtime.
    T2,
    /// Sync-relative mode, records carry `nsync` and `dtime`.
    T3,
}

/// Record type codes as written to `TTResultFormat_TTTRRecType`.
///
/// Layout of the code: `SubID | RecFmt | T-Mode | HW`, one byte each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum RecordType {
    /// PicoHarp 300, T3.
    PicoHarpT3 = 0x0001_0303,
    /// PicoHarp 300, T2.
    PicoHarpT2 = 0x0001_0203,
    /// HydraHarp 400 (record format v1), T3.
    HydraHarpT3 = 0x0001_0304,
    /// HydraHarp 400 (record format v1), T2.
    HydraHarpT2 = 0x0001_0204,
    /// HydraHarp 400 (record format v2), T3.
    HydraHarp2T3 = 0x0101_0304,
    /// HydraHarp 400 (record format v2), T2.
    HydraHarp2T2 = 0x0101_0204,
    /// TimeHarp 260 N, T3.
    TimeHarp260NT3 = 0x0001_0305,
    /// TimeHarp 260 N, T2.
    TimeHarp260NT2 = 0x0001_0205,
    /// TimeHarp 260 P, T3.
    TimeHarp260PT3 = 0x0001_0306,
    /// TimeHarp 260 P, T2.
    TimeHarp260PT2 = 0x0001_0206,
    /// MultiHarp 150 N, T3.
    MultiHarpNT3 = 0x0001_0307,
    /// MultiHarp 150 N, T2.
    MultiHarpNT2 = 0x0001_0207,
}

impl RecordType {
    const ALL: [RecordType; 12] = [
        RecordType::PicoHarpT3,
        RecordType::PicoHarpT2,
        RecordType::HydraHarpT3,
        RecordType::HydraHarpT2,
        RecordType::HydraHarp2T3,
        RecordType::HydraHarp2T2,
        RecordType::TimeHarp260NT3,
        RecordType::TimeHarp260NT2,
        RecordType::TimeHarp260PT3,
        RecordType::TimeHarp260PT2,
        RecordType::MultiHarpNT3,
        RecordType::MultiHarpNT2,
    ];

    /// Looks up a record type by its header code.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedRecordType`] for codes outside the table.
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .ok_or(Error::UnsupportedRecordType(code))
    }

    /// Like [`RecordType::from_code`] for the signed 64-bit value stored in
    /// an `Int8` header tag.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedRecordType`] for values that are not a
    /// known code.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_tag_value(value: i64) -> Result<Self> {
        let code =
            u32::try_from(value).map_err(|_| Error::UnsupportedRecordType(value as u32))?;
        Self::from_code(code)
    }

    /// The raw header code.
    #[inline]
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Timing mode of this record type.
    #[must_use]
    pub fn mode(self) -> TimingMode {
        if (self.code() >> 8) & 0xFF == 0x02 {
            TimingMode::T2
        } else {
            TimingMode::T3
        }
    }

    /// Hardware name as PicoQuant spells it.
    #[must_use]
    pub fn hardware(self) -> &'static str {
        match self {
            RecordType::PicoHarpT3 | RecordType::PicoHarpT2 => "PicoHarp",
            RecordType::HydraHarpT3 | RecordType::HydraHarpT2 => "HydraHarp",
            RecordType::HydraHarp2T3 | RecordType::HydraHarp2T2 => "HydraHarp V2",
            RecordType::TimeHarp260NT3 | RecordType::TimeHarp260NT2 => "TimeHarp 260N",
            RecordType::TimeHarp260PT3 | RecordType::TimeHarp260PT2 => "TimeHarp 260P",
            RecordType::MultiHarpNT3 | RecordType::MultiHarpNT2 => "MultiHarp",
        }
    }

    /// True for PicoHarp and HydraHarp record types, in either mode.
    #[must_use]
    pub fn is_supported_hardware(self) -> bool {
        matches!(
            self,
            RecordType::PicoHarpT3
                | RecordType::PicoHarpT2
                | RecordType::HydraHarpT3
                | RecordType::HydraHarpT2
                | RecordType::HydraHarp2T3
                | RecordType::HydraHarp2T2
        )
    }
}

/// Record layouts this crate can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RecordFormat {
    /// PicoHarp T3: 16-bit nsync, 12-bit dtime, 4-bit channel.
    PicoHarpT3,
    /// HydraHarp T3 v1: overflow records always count one wraparound.
    HydraHarpT3V1,
    /// HydraHarp T3 v2: overflow records carry a wraparound count.
    HydraHarpT3V2,
}

impl RecordFormat {
    /// Resolves the decodable layout for a record type.
    ///
    /// Returns `Ok(None)` for PicoHarp/HydraHarp T2 types, which are
    /// recognised but not decoded.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedRecordType`] for hardware other than
    /// PicoHarp and HydraHarp.
    pub fn for_record_type(record_type: RecordType) -> Result<Option<Self>> {
        match record_type {
            RecordType::PicoHarpT3 => Ok(Some(RecordFormat::PicoHarpT3)),
            RecordType::HydraHarpT3 => Ok(Some(RecordFormat::HydraHarpT3V1)),
            RecordType::HydraHarp2T3 => Ok(Some(RecordFormat::HydraHarpT3V2)),
            RecordType::PicoHarpT2 | RecordType::HydraHarpT2 | RecordType::HydraHarp2T2 => Ok(None),
            other => Err(Error::UnsupportedRecordType(other.code())),
        }
    }

    /// The record type written to a header for this layout.
    #[must_use]
    pub fn record_type(self) -> RecordType {
        match self {
            RecordFormat::PicoHarpT3 => RecordType::PicoHarpT3,
            RecordFormat::HydraHarpT3V1 => RecordType::HydraHarpT3,
            RecordFormat::HydraHarpT3V2 => RecordType::HydraHarp2T3,
        }
    }

    /// Period of the record's local sync counter.
    #[must_use]
    pub fn wraparound(self) -> u64 {
        match self {
            RecordFormat::PicoHarpT3 => WRAPAROUND,
            RecordFormat::HydraHarpT3V1 | RecordFormat::HydraHarpT3V2 => T3_WRAPAROUND,
        }
    }

    /// Timing mode; every decodable layout is T3.
    #[must_use]
    pub fn mode(self) -> TimingMode {
        TimingMode::T3
    }
}
