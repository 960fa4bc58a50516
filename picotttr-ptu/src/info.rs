//! Container detection and resolution of a parsed header into the fields
//! the record decoder needs.

use crate::header::{is_ptu_magic, names, HeaderTable};
use crate::pt3::{is_pt3_ident, Pt3Header};
use picotttr_core::{
    Error, MarkerLayout, RecordFormat, RecordType, Result, Warning, BITS_PER_RECORD,
};
use serde::{Deserialize, Serialize};

/// The two container layouts that carry TTTR records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Tagged header (`.ptu`).
    Ptu,
    /// Legacy PicoHarp 300 fixed header (`.pt3`).
    Pt3,
}

impl FileKind {
    /// Detects the container from the leading bytes.
    ///
    /// # Errors
    /// Returns [`Error::NotAPtuFile`] if neither layout matches.
    pub fn detect(data: &[u8]) -> Result<Self> {
        if is_ptu_magic(data) {
            Ok(FileKind::Ptu)
        } else if is_pt3_ident(data) {
            Ok(FileKind::Pt3)
        } else {
            let shown = &data[..data.len().min(8)];
            Err(Error::NotAPtuFile(
                String::from_utf8_lossy(shown).into_owned(),
            ))
        }
    }
}

/// Parsed header of either container kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Header {
    Ptu(HeaderTable),
    Pt3(Box<Pt3Header>),
}

impl Header {
    /// Container kind of this header.
    #[must_use]
    pub fn kind(&self) -> FileKind {
        match self {
            Header::Ptu(_) => FileKind::Ptu,
            Header::Pt3(_) => FileKind::Pt3,
        }
    }
}

/// Everything needed to decode the record stream of an imaging file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionInfo {
    pub record_type: RecordType,
    /// `None` for T2 files, which are recognised but not decoded.
    pub format: Option<RecordFormat>,
    /// Pixels per line; 0 for a T2 file without imaging tags.
    pub width: u32,
    /// Lines per frame; 0 for a T2 file without imaging tags.
    pub height: u32,
    pub markers: MarkerLayout,
    pub declared_records: Option<u64>,
    /// Sync rate in Hz.
    pub sync_rate_hz: Option<f64>,
    /// Sync period in seconds.
    pub global_resolution_s: Option<f64>,
    /// dtime bin width in seconds.
    pub resolution_s: Option<f64>,
}

impl AcquisitionInfo {
    /// Resolves a PTU tag table.
    ///
    /// T2 files only need the record type tag; their dimensions default to 0
    /// and their marker layout to the defaults, without warnings.
    ///
    /// # Errors
    /// - [`Error::MissingTag`] without the record type tag, or without
    ///   `ImgHdr_PixX` / `ImgHdr_PixY` in a T3 file
    /// - [`Error::InvalidHeader`] for a record width other than 32 bits or
    ///   out-of-range dimensions and marker channels
    /// - [`Error::UnsupportedRecordType`] for undecodable hardware
    pub fn from_table(table: &HeaderTable) -> Result<(Self, Vec<Warning>)> {
        let mut warnings = Vec::new();

        let record_type = RecordType::from_tag_value(table.require_i64(names::RECORD_TYPE)?)?;
        if let Some(bits) = table.get_i64(names::BITS_PER_RECORD) {
            if bits != BITS_PER_RECORD {
                return Err(Error::InvalidHeader(format!(
                    "{} is {bits}, only {BITS_PER_RECORD}-bit records are supported",
                    names::BITS_PER_RECORD
                )));
            }
        }
        let format = resolve_format(record_type, &mut warnings)?;

        let (width, height, markers) = if format.is_some() {
            let width = dimension(names::PIX_X, table.require_i64(names::PIX_X)?)?;
            let height = dimension(names::PIX_Y, table.require_i64(names::PIX_Y)?)?;

            let defaults = MarkerLayout::default();
            let markers = MarkerLayout::new(
                marker_channel(table, names::LINE_START, defaults.line_start, &mut warnings)?,
                marker_channel(table, names::LINE_STOP, defaults.line_stop, &mut warnings)?,
                marker_channel(table, names::FRAME, defaults.frame, &mut warnings)?,
            );
            check_markers(markers, &mut warnings);
            (width, height, markers)
        } else {
            // T2 files are not decoded, so imaging tags are optional
            let width = optional_dimension(table, names::PIX_X)?;
            let height = optional_dimension(table, names::PIX_Y)?;
            (width, height, MarkerLayout::default())
        };

        let declared_records = match table.get_i64(names::NUMBER_OF_RECORDS) {
            Some(n) => Some(u64::try_from(n).map_err(|_| {
                Error::InvalidHeader(format!("{} is negative: {n}", names::NUMBER_OF_RECORDS))
            })?),
            None => None,
        };

        let info = Self {
            record_type,
            format,
            width,
            height,
            markers,
            declared_records,
            sync_rate_hz: number(table, names::SYNC_RATE),
            global_resolution_s: number(table, names::GLOBAL_RESOLUTION),
            resolution_s: number(table, names::RESOLUTION),
        };
        log::debug!(
            "{} imaging file {}x{}, markers {:?}",
            record_type.hardware(),
            width,
            height,
            markers
        );
        Ok((info, warnings))
    }

    /// Resolves a legacy PT3 header. Records are always PicoHarp T3.
    ///
    /// # Errors
    /// - [`Error::InvalidHeader`] for a record width other than 32 bits,
    ///   too few imaging words or out-of-range values
    pub fn from_pt3(header: &Pt3Header) -> Result<(Self, Vec<Warning>)> {
        let mut warnings = Vec::new();
        if i64::from(header.binary.bits_per_record) != BITS_PER_RECORD {
            return Err(Error::InvalidHeader(format!(
                "BitsPerRecord is {}, only {BITS_PER_RECORD}-bit records are supported",
                header.binary.bits_per_record
            )));
        }
        let imaging = header.imaging()?;
        let width = dimension("PixX", i64::from(imaging.pix_x))?;
        let height = dimension("PixY", i64::from(imaging.pix_y))?;

        let markers = if let Some((line_start, line_stop, frame)) = imaging.markers {
            MarkerLayout::new(
                channel("LineStart", i64::from(line_start))?,
                channel("LineStop", i64::from(line_stop))?,
                channel("Frame", i64::from(frame))?,
            )
        } else {
            let defaults = MarkerLayout::default();
            for (name, value) in [
                ("LineStart", defaults.line_start),
                ("LineStop", defaults.line_stop),
                ("Frame", defaults.frame),
            ] {
                push_warning(
                    &mut warnings,
                    Warning::DefaultedTag {
                        name: name.to_string(),
                        value: i64::from(value),
                    },
                );
            }
            defaults
        };
        check_markers(markers, &mut warnings);

        let declared_records = u64::try_from(header.tt.records)
            .map_err(|_| Error::InvalidHeader(format!("Records is negative: {}", header.tt.records)))?;
        let sync_rate_hz = (header.tt.cnt_rate0 > 0).then_some(f64::from(header.tt.cnt_rate0));

        let info = Self {
            record_type: RecordType::PicoHarpT3,
            format: Some(RecordFormat::PicoHarpT3),
            width,
            height,
            markers,
            declared_records: Some(declared_records),
            sync_rate_hz,
            global_resolution_s: sync_rate_hz.map(|rate| 1.0 / rate),
            resolution_s: Some(f64::from(header.board.resolution_ns) * 1e-9),
        };
        log::debug!("PT3 imaging file {width}x{height}, markers {markers:?}");
        Ok((info, warnings))
    }
}

/// A header parsed from the front of a file buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHeader {
    pub header: Header,
    pub info: AcquisitionInfo,
    /// Byte offset of the first record.
    pub data_offset: usize,
    pub warnings: Vec<Warning>,
}

/// Detects the container, parses its header and resolves the acquisition
/// info.
///
/// # Errors
/// Any error of [`FileKind::detect`], [`HeaderTable::decode`],
/// [`Pt3Header::decode`] and the [`AcquisitionInfo`] resolvers.
pub fn parse_header(data: &[u8]) -> Result<ParsedHeader> {
    match FileKind::detect(data)? {
        FileKind::Ptu => {
            let (table, data_offset) = HeaderTable::decode(data)?;
            let (info, warnings) = AcquisitionInfo::from_table(&table)?;
            Ok(ParsedHeader {
                header: Header::Ptu(table),
                info,
                data_offset,
                warnings,
            })
        }
        FileKind::Pt3 => {
            let (pt3, data_offset) = Pt3Header::decode(data)?;
            let (info, warnings) = AcquisitionInfo::from_pt3(&pt3)?;
            Ok(ParsedHeader {
                header: Header::Pt3(Box::new(pt3)),
                info,
                data_offset,
                warnings,
            })
        }
    }
}

fn resolve_format(
    record_type: RecordType,
    warnings: &mut Vec<Warning>,
) -> Result<Option<RecordFormat>> {
    let format = RecordFormat::for_record_type(record_type)?;
    if format.is_none() {
        push_warning(warnings, Warning::T2ModeSkipped(record_type));
    }
    Ok(format)
}

fn push_warning(warnings: &mut Vec<Warning>, warning: Warning) {
    log::warn!("{warning}");
    warnings.push(warning);
}

fn dimension(name: &str, value: i64) -> Result<u32> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(Error::InvalidHeader(format!(
            "{name} must be a positive pixel count, got {value}"
        ))),
    }
}

fn optional_dimension(table: &HeaderTable, name: &str) -> Result<u32> {
    match table.get_i64(name) {
        Some(value) => dimension(name, value),
        None => Ok(0),
    }
}

fn check_markers(markers: MarkerLayout, warnings: &mut Vec<Warning>) {
    if !markers.is_valid() {
        push_warning(warnings, Warning::InvalidMarkerLayout(markers));
    }
}

fn channel(name: &str, value: i64) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| Error::InvalidHeader(format!("{name} is not a marker channel: {value}")))
}

fn marker_channel(
    table: &HeaderTable,
    name: &str,
    default: u8,
    warnings: &mut Vec<Warning>,
) -> Result<u8> {
    match table.get_i64(name) {
        Some(value) => channel(name, value),
        None => {
            push_warning(
                warnings,
                Warning::DefaultedTag {
                    name: name.to_string(),
                    value: i64::from(default),
                },
            );
            Ok(default)
        }
    }
}

/// Numeric tag value; rates are stored as integers by some writers.
#[allow(clippy::cast_precision_loss)]
fn number(table: &HeaderTable, name: &str) -> Option<f64> {
    let value = table.get(name)?;
    value.as_f64().or_else(|| value.as_i64().map(|v| v as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pt3::tests::{build_pt3, build_pt3_with_words};
    use crate::tag::Tag;
    use approx::assert_relative_eq;

    fn imaging_table(record_type: RecordType) -> HeaderTable {
        let mut table = HeaderTable::new();
        for tag in [
            Tag::int(names::PIX_X, 4),
            Tag::int(names::PIX_Y, 3),
            Tag::int(names::LINE_START, 1),
            Tag::int(names::LINE_STOP, 2),
            Tag::int(names::FRAME, 3),
            Tag::int(names::SYNC_RATE, 80_000_000),
            Tag::float(names::RESOLUTION, 96e-12),
            Tag::int(names::NUMBER_OF_RECORDS, 12),
            Tag::int(names::RECORD_TYPE, i64::from(record_type.code())),
            Tag::int(names::BITS_PER_RECORD, 32),
        ] {
            table.push(tag).unwrap();
        }
        table
    }

    #[test]
    fn test_from_table() {
        let (info, warnings) =
            AcquisitionInfo::from_table(&imaging_table(RecordType::PicoHarpT3)).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(info.format, Some(RecordFormat::PicoHarpT3));
        assert_eq!((info.width, info.height), (4, 3));
        assert_eq!(info.markers, MarkerLayout::default());
        assert_eq!(info.declared_records, Some(12));
        assert_relative_eq!(info.sync_rate_hz.unwrap(), 80e6);
        assert_relative_eq!(info.resolution_s.unwrap(), 96e-12);
        assert_eq!(info.global_resolution_s, None);
    }

    #[test]
    fn test_missing_markers_default_with_warning() {
        let mut table = HeaderTable::new();
        table.push(Tag::int(names::PIX_X, 1)).unwrap();
        table.push(Tag::int(names::PIX_Y, 1)).unwrap();
        table.push(Tag::int(names::FRAME, 4)).unwrap();
        table
            .push(Tag::int(names::RECORD_TYPE, 0x0001_0304))
            .unwrap();

        let (info, warnings) = AcquisitionInfo::from_table(&table).unwrap();
        assert_eq!(info.markers, MarkerLayout::new(1, 2, 4));
        assert_eq!(info.format, Some(RecordFormat::HydraHarpT3V1));
        assert_eq!(info.declared_records, None);
        assert_eq!(
            warnings,
            vec![
                Warning::DefaultedTag {
                    name: names::LINE_START.to_string(),
                    value: 1
                },
                Warning::DefaultedTag {
                    name: names::LINE_STOP.to_string(),
                    value: 2
                },
            ]
        );
    }

    #[test]
    fn test_missing_required_tags() {
        let table = HeaderTable::new()
            .with(Tag::int(names::PIX_X, 1))
            .and_then(|t| t.with(Tag::int(names::RECORD_TYPE, 0x0001_0303)))
            .unwrap();
        assert!(matches!(
            AcquisitionInfo::from_table(&table),
            Err(Error::MissingTag(name)) if name == names::PIX_Y
        ));
    }

    #[test]
    fn test_t2_is_skipped() {
        let (info, warnings) =
            AcquisitionInfo::from_table(&imaging_table(RecordType::HydraHarp2T2)).unwrap();
        assert_eq!(info.format, None);
        assert_eq!(warnings, vec![Warning::T2ModeSkipped(RecordType::HydraHarp2T2)]);
    }

    #[test]
    fn test_t2_without_imaging_tags() {
        let mut table = HeaderTable::new();
        for tag in [
            Tag::int(names::RECORD_TYPE, 0x0001_0203),
            Tag::int(names::BITS_PER_RECORD, 32),
            Tag::int(names::NUMBER_OF_RECORDS, 0),
        ] {
            table.push(tag).unwrap();
        }

        let (info, warnings) = AcquisitionInfo::from_table(&table).unwrap();
        assert_eq!(warnings, vec![Warning::T2ModeSkipped(RecordType::PicoHarpT2)]);
        assert_eq!(info.format, None);
        assert_eq!((info.width, info.height), (0, 0));
        assert_eq!(info.markers, MarkerLayout::default());
        assert_eq!(info.declared_records, Some(0));

        let data = table.encode().unwrap();
        let parsed = parse_header(&data).unwrap();
        assert_eq!(parsed.warnings, warnings);
        assert_eq!(parsed.data_offset, data.len());
    }

    #[test]
    fn test_invalid_marker_layout_warns() {
        let mut table = imaging_table(RecordType::PicoHarpT3);
        table.push(Tag::int(names::FRAME, 7)).unwrap();
        let (info, warnings) = AcquisitionInfo::from_table(&table).unwrap();
        assert_eq!(info.markers, MarkerLayout::new(1, 2, 7));
        assert_eq!(warnings, vec![Warning::InvalidMarkerLayout(info.markers)]);

        let mut table = imaging_table(RecordType::PicoHarpT3);
        table.push(Tag::int(names::LINE_STOP, 1)).unwrap();
        let (_, warnings) = AcquisitionInfo::from_table(&table).unwrap();
        assert_eq!(
            warnings,
            vec![Warning::InvalidMarkerLayout(MarkerLayout::new(1, 1, 3))]
        );
    }

    #[test]
    fn test_unsupported_hardware() {
        assert!(matches!(
            AcquisitionInfo::from_table(&imaging_table(RecordType::MultiHarpNT3)),
            Err(Error::UnsupportedRecordType(0x0001_0307))
        ));

        let mut table = imaging_table(RecordType::PicoHarpT3);
        table.push(Tag::int(names::RECORD_TYPE, 0x1234)).unwrap();
        assert!(matches!(
            AcquisitionInfo::from_table(&table),
            Err(Error::UnsupportedRecordType(0x1234))
        ));
    }

    #[test]
    fn test_bits_per_record() {
        let mut table = imaging_table(RecordType::PicoHarpT3);
        table.push(Tag::int(names::BITS_PER_RECORD, 64)).unwrap();
        assert!(matches!(
            AcquisitionInfo::from_table(&table),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_from_pt3() {
        let (pt3, _) = Pt3Header::decode(&build_pt3(16, 8, 100, true)).unwrap();
        let (info, warnings) = AcquisitionInfo::from_pt3(&pt3).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(info.record_type, RecordType::PicoHarpT3);
        assert_eq!((info.width, info.height), (16, 8));
        assert_eq!(info.declared_records, Some(100));
        assert_relative_eq!(info.sync_rate_hz.unwrap(), 40e6);
        assert_relative_eq!(info.global_resolution_s.unwrap(), 25e-9);
        assert_relative_eq!(info.resolution_s.unwrap(), 4e-12, max_relative = 1e-6);
    }

    #[test]
    fn test_from_pt3_piezo_scanner_defaults_markers() {
        let x0 = i32::from_le_bytes(0.0_f32.to_le_bytes());
        let words = [2, 1, 100, 1, 0, 0, x0, x0, 64, 32, 0];
        let (pt3, _) = Pt3Header::decode(&build_pt3_with_words(0, &words)).unwrap();
        let (info, warnings) = AcquisitionInfo::from_pt3(&pt3).unwrap();
        assert_eq!((info.width, info.height), (64, 32));
        assert_eq!(info.markers, MarkerLayout::default());
        assert_eq!(warnings.len(), 3);
        assert!(warnings
            .iter()
            .all(|w| matches!(w, Warning::DefaultedTag { .. })));
    }

    #[test]
    fn test_detect() {
        let ptu = HeaderTable::new().encode().unwrap();
        assert_eq!(FileKind::detect(&ptu).unwrap(), FileKind::Ptu);
        assert_eq!(
            FileKind::detect(&build_pt3(1, 1, 0, true)).unwrap(),
            FileKind::Pt3
        );
        assert!(matches!(
            FileKind::detect(b"RIFF\0\0\0\0"),
            Err(Error::NotAPtuFile(_))
        ));
    }

    #[test]
    fn test_parse_header_pt3() {
        let data = build_pt3(2, 2, 0, true);
        let parsed = parse_header(&data).unwrap();
        assert_eq!(parsed.header.kind(), FileKind::Pt3);
        assert_eq!(parsed.data_offset, data.len());
    }
}
