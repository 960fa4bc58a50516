//! Typed PTU header tags.
//!
//! Wire layout of one tag:
//!
//! | bytes | field                                        |
//! |-------|----------------------------------------------|
//! | 32    | name, NUL padded                             |
//! | 4     | index (`i32`, -1 for scalars)                |
//! | 4     | type magic                                   |
//! | 8     | value, or payload length for variable types  |
//! | n     | payload (variable types only)                |

use crate::cursor::{trim_padding, ByteCursor};
use picotttr_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Days between 0001-01-01 and 1970-01-01 in the proleptic calendar.
const UNIX_EPOCH_DAYS: f64 = 719_529.0;
/// Days between 0001-01-01 and 1899-12-30.
const OLE_EPOCH_DAYS: f64 = 693_960.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Converts an OLE Automation date (days since 1899-12-30) to Unix seconds.
#[must_use]
pub fn ole_to_unix_seconds(ole_days: f64) -> f64 {
    (ole_days - UNIX_EPOCH_DAYS + OLE_EPOCH_DAYS) * SECONDS_PER_DAY
}

/// Converts Unix seconds to an OLE Automation date.
#[must_use]
pub fn unix_seconds_to_ole(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY + UNIX_EPOCH_DAYS - OLE_EPOCH_DAYS
}

/// Tag type magic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum TagType {
    Empty8 = 0xFFFF_0008,
    Bool8 = 0x0000_0008,
    Int8 = 0x1000_0008,
    BitSet64 = 0x1100_0008,
    Color8 = 0x1200_0008,
    Float8 = 0x2000_0008,
    DateTime = 0x2100_0008,
    Float8Array = 0x2001_FFFF,
    AnsiString = 0x4001_FFFF,
    WideString = 0x4002_FFFF,
    BinaryBlob = 0xFFFF_FFFF,
}

impl TagType {
    /// Maps a type magic to a tag type.
    ///
    /// # Errors
    /// Returns [`Error::UnrecognizedTagType`] for unknown magics; the payload
    /// length of such a tag cannot be known.
    pub fn from_magic(magic: u32) -> Result<Self> {
        match magic {
            0xFFFF_0008 => Ok(TagType::Empty8),
            0x0000_0008 => Ok(TagType::Bool8),
            0x1000_0008 => Ok(TagType::Int8),
            0x1100_0008 => Ok(TagType::BitSet64),
            0x1200_0008 => Ok(TagType::Color8),
            0x2000_0008 => Ok(TagType::Float8),
            0x2100_0008 => Ok(TagType::DateTime),
            0x2001_FFFF => Ok(TagType::Float8Array),
            0x4001_FFFF => Ok(TagType::AnsiString),
            0x4002_FFFF => Ok(TagType::WideString),
            0xFFFF_FFFF => Ok(TagType::BinaryBlob),
            _ => Err(Error::UnrecognizedTagType(magic)),
        }
    }

    /// The wire magic.
    #[inline]
    #[must_use]
    pub fn magic(self) -> u32 {
        self as u32
    }

    /// True for types whose 8-byte register is a payload length.
    #[must_use]
    pub fn is_variable(self) -> bool {
        matches!(
            self,
            TagType::Float8Array | TagType::AnsiString | TagType::WideString | TagType::BinaryBlob
        )
    }
}

/// Value of a header tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Empty,
    Bool(bool),
    Int(i64),
    BitSet64(i64),
    Color8(i64),
    Float8(f64),
    /// OLE Automation date, days since 1899-12-30.
    DateTime(f64),
    Float8Array(Vec<f64>),
    AnsiString(String),
    WideString(String),
    BinaryBlob(Vec<u8>),
}

impl TagValue {
    /// Wire type of this value.
    #[must_use]
    pub fn tag_type(&self) -> TagType {
        match self {
            TagValue::Empty => TagType::Empty8,
            TagValue::Bool(_) => TagType::Bool8,
            TagValue::Int(_) => TagType::Int8,
            TagValue::BitSet64(_) => TagType::BitSet64,
            TagValue::Color8(_) => TagType::Color8,
            TagValue::Float8(_) => TagType::Float8,
            TagValue::DateTime(_) => TagType::DateTime,
            TagValue::Float8Array(_) => TagType::Float8Array,
            TagValue::AnsiString(_) => TagType::AnsiString,
            TagValue::WideString(_) => TagType::WideString,
            TagValue::BinaryBlob(_) => TagType::BinaryBlob,
        }
    }

    /// Integer view of integer-like values.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TagValue::Bool(b) => Some(i64::from(*b)),
            TagValue::Int(v) | TagValue::BitSet64(v) | TagValue::Color8(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view of float values.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Float8(v) | TagValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of string values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::AnsiString(s) | TagValue::WideString(s) => Some(s),
            _ => None,
        }
    }

    /// Unix timestamp of a `DateTime` value.
    #[must_use]
    pub fn unix_seconds(&self) -> Option<f64> {
        match self {
            TagValue::DateTime(days) => Some(ole_to_unix_seconds(*days)),
            _ => None,
        }
    }

    fn payload(&self) -> Option<Vec<u8>> {
        match self {
            TagValue::Float8Array(values) => {
                Some(values.iter().flat_map(|v| v.to_le_bytes()).collect())
            }
            TagValue::AnsiString(s) => Some(s.as_bytes().to_vec()),
            TagValue::WideString(s) => Some(s.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            TagValue::BinaryBlob(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn register(&self) -> [u8; 8] {
        match self {
            TagValue::Bool(b) => i64::from(*b).to_le_bytes(),
            TagValue::Int(v) | TagValue::BitSet64(v) | TagValue::Color8(v) => v.to_le_bytes(),
            TagValue::Float8(v) | TagValue::DateTime(v) => v.to_le_bytes(),
            _ => [0; 8],
        }
    }
}

/// One header entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag identifier, at most 32 bytes.
    pub name: String,
    /// Array index, -1 for scalar tags.
    pub index: i32,
    /// Typed value.
    pub value: TagValue,
    /// Payload length on the wire when a string tag carried trailing NUL
    /// padding; encoding pads the payload back to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padded_len: Option<u64>,
}

impl Tag {
    /// Width of the name field.
    pub const NAME_LEN: usize = 32;
    /// Size of the fixed part of every tag.
    pub const HEADER_LEN: usize = 48;
    /// Index of a scalar tag.
    pub const NO_INDEX: i32 = -1;

    /// Creates a scalar tag.
    pub fn new(name: impl Into<String>, value: TagValue) -> Self {
        Self {
            name: name.into(),
            index: Self::NO_INDEX,
            value,
            padded_len: None,
        }
    }

    /// Creates an indexed tag.
    pub fn indexed(name: impl Into<String>, index: i32, value: TagValue) -> Self {
        Self {
            name: name.into(),
            index,
            value,
            padded_len: None,
        }
    }

    /// Scalar `Int8` tag.
    pub fn int(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, TagValue::Int(value))
    }

    /// Scalar `Float8` tag.
    pub fn float(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, TagValue::Float8(value))
    }

    /// Scalar `AnsiString` tag.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, TagValue::AnsiString(value.into()))
    }

    /// Scalar `Empty8` tag.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, TagValue::Empty)
    }

    /// Reads one tag at the cursor.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedStream`] on a short buffer,
    /// [`Error::UnrecognizedTagType`] for unknown type magics and
    /// [`Error::InvalidTag`] for malformed payload lengths.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let name = trim_padding(cursor.take(Self::NAME_LEN, "tag name")?);
        let index = cursor.read_i32("tag index")?;
        let tag_type = TagType::from_magic(cursor.read_u32("tag type")?)?;
        let register: [u8; 8] = cursor
            .take(8, "tag value")?
            .try_into()
            .map_err(|_| Error::truncated("tag value", 8, 0))?;

        let mut padded_len = None;
        let value = if tag_type.is_variable() {
            let len = i64::from_le_bytes(register);
            let len = usize::try_from(len)
                .map_err(|_| Error::InvalidTag(format!("{name}: negative length {len}")))?;
            let payload = cursor.take(len, "tag payload")?;
            let value = decode_payload(&name, tag_type, payload)?;
            if value.as_str().is_some() && value.payload().map_or(0, |p| p.len()) < len {
                padded_len = Some(len as u64);
            }
            value
        } else {
            decode_register(tag_type, register)
        };

        Ok(Self {
            name,
            index,
            value,
            padded_len,
        })
    }

    /// Decodes one tag from the start of `data`.
    ///
    /// Returns the tag and the number of bytes it occupied.
    ///
    /// # Errors
    /// See [`Tag::decode`].
    pub fn decode_bytes(data: &[u8]) -> Result<(Self, usize)> {
        let mut cursor = ByteCursor::new(data);
        let tag = Self::decode(&mut cursor)?;
        Ok((tag, cursor.position()))
    }

    /// Appends the wire form of the tag to `out`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTag`] if the name does not fit its field.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        let name = self.name.as_bytes();
        if name.len() > Self::NAME_LEN {
            return Err(Error::InvalidTag(format!(
                "name {:?} is longer than {} bytes",
                self.name,
                Self::NAME_LEN
            )));
        }
        let mut field = [0u8; Self::NAME_LEN];
        field[..name.len()].copy_from_slice(name);
        out.extend_from_slice(&field);
        out.extend_from_slice(&self.index.to_le_bytes());
        out.extend_from_slice(&self.value.tag_type().magic().to_le_bytes());

        match self.value.payload() {
            Some(mut payload) => {
                // a string edited past its original padding is written unpadded
                if let Some(len) = self.padded_len.and_then(|l| usize::try_from(l).ok()) {
                    if len > payload.len() {
                        payload.resize(len, 0);
                    }
                }
                out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
                out.extend_from_slice(&payload);
            }
            None => out.extend_from_slice(&self.value.register()),
        }
        Ok(())
    }

    /// Wire form of the tag.
    ///
    /// # Errors
    /// See [`Tag::encode`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::HEADER_LEN);
        self.encode(&mut out)?;
        Ok(out)
    }
}

fn decode_register(tag_type: TagType, register: [u8; 8]) -> TagValue {
    let int = i64::from_le_bytes(register);
    let float = f64::from_le_bytes(register);
    match tag_type {
        TagType::Bool8 => TagValue::Bool(int != 0),
        TagType::Int8 => TagValue::Int(int),
        TagType::BitSet64 => TagValue::BitSet64(int),
        TagType::Color8 => TagValue::Color8(int),
        TagType::Float8 => TagValue::Float8(float),
        TagType::DateTime => TagValue::DateTime(float),
        // variable types never reach here
        _ => TagValue::Empty,
    }
}

fn decode_payload(name: &str, tag_type: TagType, payload: &[u8]) -> Result<TagValue> {
    match tag_type {
        TagType::Float8Array => {
            if payload.len() % 8 != 0 {
                return Err(Error::InvalidTag(format!(
                    "{name}: float array of {} bytes",
                    payload.len()
                )));
            }
            let values = payload
                .chunks_exact(8)
                .map(|chunk| {
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(chunk);
                    f64::from_le_bytes(bytes)
                })
                .collect();
            Ok(TagValue::Float8Array(values))
        }
        TagType::AnsiString => Ok(TagValue::AnsiString(
            String::from_utf8_lossy(payload)
                .trim_end_matches('\0')
                .to_string(),
        )),
        TagType::WideString => {
            if payload.len() % 2 != 0 {
                return Err(Error::InvalidTag(format!(
                    "{name}: wide string of {} bytes",
                    payload.len()
                )));
            }
            let mut units: Vec<u16> = payload
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            while units.last() == Some(&0) {
                units.pop();
            }
            Ok(TagValue::WideString(String::from_utf16_lossy(&units)))
        }
        _ => Ok(TagValue::BinaryBlob(payload.to_vec())),
    }
}
