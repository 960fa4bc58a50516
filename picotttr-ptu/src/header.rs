//! PTU header directory: magic, version string and the tag sequence.

use crate::cursor::ByteCursor;
use crate::tag::{Tag, TagValue};
use picotttr_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// File magic of every PTU file.
pub const PTU_MAGIC: &str = "PQTTTR";
/// Name of the tag that terminates the header.
pub const HEADER_END: &str = "Header_End";
/// Format version this crate writes.
pub const FORMAT_VERSION: &str = "00.0.1";

const PREAMBLE_FIELD_LEN: usize = 8;

/// Well-known tag names.
pub mod names {
    pub const FILE_GUID: &str = "File_GUID";
    pub const MEASUREMENT_MODE: &str = "Measurement_Mode";
    pub const MEASUREMENT_SUBMODE: &str = "Measurement_SubMode";
    pub const CREATOR_NAME: &str = "CreatorSW_Name";
    pub const CREATOR_VERSION: &str = "CreatorSW_Version";
    pub const IMG_DIMENSIONS: &str = "ImgHdr_Dimensions";
    pub const IMG_IDENT: &str = "ImgHdr_Ident";
    pub const PIX_X: &str = "ImgHdr_PixX";
    pub const PIX_Y: &str = "ImgHdr_PixY";
    pub const PIX_RESOL: &str = "ImgHdr_PixResol";
    pub const LINE_START: &str = "ImgHdr_LineStart";
    pub const LINE_STOP: &str = "ImgHdr_LineStop";
    pub const FRAME: &str = "ImgHdr_Frame";
    pub const BIDIRECT: &str = "ImgHdr_BiDirect";
    pub const SIN_CORRECTION: &str = "ImgHdr_SinCorrection";
    pub const BINNING_FACTOR: &str = "MeasDesc_BinningFactor";
    pub const RESOLUTION: &str = "MeasDesc_Resolution";
    pub const GLOBAL_RESOLUTION: &str = "MeasDesc_GlobalResolution";
    pub const SYNC_RATE: &str = "TTResult_SyncRate";
    pub const NUMBER_OF_RECORDS: &str = "TTResult_NumberOfRecords";
    pub const RECORD_TYPE: &str = "TTResultFormat_TTTRRecType";
    pub const BITS_PER_RECORD: &str = "TTResultFormat_BitsPerRecord";
}

/// Ordered tag table of one PTU file.
///
/// Iteration order is wire order. The `Header_End` sentinel is not stored;
/// [`HeaderTable::encode`] always appends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderTable {
    /// Format version string from the preamble.
    pub version: String,
    tags: Vec<Tag>,
    #[serde(skip)]
    lookup: HashMap<(String, i32), usize>,
}

impl HeaderTable {
    /// Creates an empty table with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            ..Self::default()
        }
    }

    /// Appends a tag.
    ///
    /// A repeated (name, index) pair keeps both entries on the wire; lookups
    /// see the later one.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTag`] for a tag named `Header_End`; the
    /// sentinel is managed by the table.
    pub fn push(&mut self, tag: Tag) -> Result<()> {
        if tag.name == HEADER_END {
            return Err(Error::InvalidTag(format!(
                "{HEADER_END} is appended automatically"
            )));
        }
        self.lookup
            .insert((tag.name.clone(), tag.index), self.tags.len());
        self.tags.push(tag);
        Ok(())
    }

    /// Builder-style [`HeaderTable::push`].
    ///
    /// # Errors
    /// See [`HeaderTable::push`].
    pub fn with(mut self, tag: Tag) -> Result<Self> {
        self.push(tag)?;
        Ok(self)
    }

    /// Scalar tag by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.get_indexed(name, Tag::NO_INDEX)
    }

    /// Tag by name and index.
    #[must_use]
    pub fn get_indexed(&self, name: &str, index: i32) -> Option<&TagValue> {
        self.lookup
            .get(&(name.to_string(), index))
            .map(|&i| &self.tags[i].value)
    }

    /// Integer value of a scalar tag.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(TagValue::as_i64)
    }

    /// Float value of a scalar tag.
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(TagValue::as_f64)
    }

    /// Integer value of a required scalar tag.
    ///
    /// # Errors
    /// Returns [`Error::MissingTag`] if absent and [`Error::InvalidTag`] if
    /// the tag is not integer-typed.
    pub fn require_i64(&self, name: &str) -> Result<i64> {
        let value = self
            .get(name)
            .ok_or_else(|| Error::MissingTag(name.to_string()))?;
        value
            .as_i64()
            .ok_or_else(|| Error::InvalidTag(format!("{name} is not an integer: {value:?}")))
    }

    /// Tags in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Number of tags, excluding the sentinel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns true if the table holds no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Parses a PTU header from the start of `data`.
    ///
    /// Returns the table and the offset of the first record.
    ///
    /// # Errors
    /// Returns [`Error::NotAPtuFile`] on a bad magic, and the tag decoding
    /// errors of [`Tag::decode`]. Running out of bytes before `Header_End`
    /// is [`Error::TruncatedStream`].
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut cursor = ByteCursor::new(data);
        let magic = cursor.take(PREAMBLE_FIELD_LEN, "file magic")?;
        if !is_ptu_magic(magic) {
            return Err(Error::NotAPtuFile(
                String::from_utf8_lossy(magic).into_owned(),
            ));
        }
        let version = cursor.read_padded_str(PREAMBLE_FIELD_LEN, "format version")?;

        let mut table = Self {
            version,
            ..Self::default()
        };
        loop {
            let tag = Tag::decode(&mut cursor)?;
            if tag.name == HEADER_END {
                break;
            }
            log::trace!("header tag {}[{}] = {:?}", tag.name, tag.index, tag.value);
            table.push(tag)?;
        }

        log::debug!(
            "parsed PTU header v{} with {} tags, records start at byte {}",
            table.version,
            table.len(),
            cursor.position()
        );
        Ok((table, cursor.position()))
    }

    /// Wire form: magic, version, tags, then the `Header_End` sentinel.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTag`] if any tag cannot be encoded.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(2 * PREAMBLE_FIELD_LEN + (self.len() + 1) * Tag::HEADER_LEN);
        out.extend_from_slice(&padded(PTU_MAGIC, PREAMBLE_FIELD_LEN)?);
        out.extend_from_slice(&padded(&self.version, PREAMBLE_FIELD_LEN)?);
        for tag in &self.tags {
            tag.encode(&mut out)?;
        }
        Tag::empty(HEADER_END).encode(&mut out)?;
        Ok(out)
    }

    /// Rebuilds the lookup index, e.g. after deserializing.
    pub fn reindex(&mut self) {
        self.lookup = self
            .tags
            .iter()
            .enumerate()
            .map(|(i, tag)| ((tag.name.clone(), tag.index), i))
            .collect();
    }
}

/// True if the 8-byte preamble is `PQTTTR` followed by padding.
#[must_use]
pub fn is_ptu_magic(bytes: &[u8]) -> bool {
    bytes.len() >= PREAMBLE_FIELD_LEN
        && &bytes[..PTU_MAGIC.len()] == PTU_MAGIC.as_bytes()
        && bytes[PTU_MAGIC.len()..PREAMBLE_FIELD_LEN].iter().all(|&b| b == 0)
}

fn padded(value: &str, len: usize) -> Result<Vec<u8>> {
    let bytes = value.as_bytes();
    if bytes.len() > len {
        return Err(Error::InvalidTag(format!(
            "{value:?} does not fit a {len}-byte field"
        )));
    }
    let mut out = vec![0u8; len];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}
