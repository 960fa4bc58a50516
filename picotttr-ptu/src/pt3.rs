//! Legacy PicoHarp 300 `.pt3` header.
//!
//! The header is a fixed chain of little-endian fields; every offset depends
//! on all fields before it, so the read order below must not change. Display
//! and router settings are skipped as opaque blocks.

use crate::cursor::ByteCursor;
use picotttr_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Prefix of the ident field of a PT3 file.
pub const PT3_IDENT_PREFIX: &str = "PicoHarp";

const IDENT_LEN: usize = 16;
/// DispCountsFrom, DispCountsTo, DispCurves[8] x {MapTo, Show},
/// Params[3] x {Start, Step, End}.
const DISPLAY_BLOCK_LEN: usize = 108;
/// RouterModelCode, RouterEnabled, RtChan[4] x 6 fields.
const ROUTER_BLOCK_LEN: usize = 104;
/// `ImgHdr` idents of the piezo scanners (PI E710, KDT180).
const IMAGING_IDENT_PI_E710: i32 = 1;
const IMAGING_IDENT_KDT180: i32 = 2;
/// `ImgHdr` ident of a laser scanning microscope.
const IMAGING_IDENT_LSM: i32 = 3;

/// Text block at the start of a PT3 file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pt3TextHeader {
    pub ident: String,
    pub format_version: String,
    pub creator_name: String,
    pub creator_version: String,
    pub file_time: String,
    pub comment: String,
}

/// Measurement settings block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pt3BinaryHeader {
    pub curves: i32,
    pub bits_per_record: i32,
    pub routing_channels: i32,
    pub number_of_boards: i32,
    pub active_curve: i32,
    pub measurement_mode: i32,
    pub sub_mode: i32,
    pub range_no: i32,
    pub offset: i32,
    /// Acquisition time in ms.
    pub acquisition_time: i32,
    pub stop_at: i32,
    pub stop_on_ovfl: i32,
    pub restart: i32,
    pub disp_lin_log: i32,
    pub disp_time_from: i32,
    pub disp_time_to: i32,
    pub repeat_mode: i32,
    pub repeats_per_curve: i32,
    pub repeat_time: i32,
    pub repeat_wait_time: i32,
    pub script_name: String,
}

/// Board settings block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pt3BoardHeader {
    pub hardware_ident: String,
    pub hardware_version: String,
    pub hardware_serial: i32,
    pub sync_divider: i32,
    pub cfd_zero_cross0: i32,
    pub cfd_level0: i32,
    pub cfd_zero_cross1: i32,
    pub cfd_level1: i32,
    /// dtime bin width in ns.
    pub resolution_ns: f32,
}

/// T3 mode block including the raw imaging words.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pt3TtHeader {
    pub ext_devices: i32,
    pub reserved1: i32,
    pub reserved2: i32,
    /// Sync rate in Hz.
    pub cnt_rate0: i32,
    pub cnt_rate1: i32,
    pub stop_after: i32,
    pub stop_reason: i32,
    /// Number of T3 records following the header.
    pub records: i32,
    pub imaging: Vec<i32>,
}

/// Imaging fields resolved from the raw `ImgHdr` words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pt3Imaging {
    pub dimensions: i32,
    pub ident: i32,
    /// Marker channels, present for the LSM layout only.
    pub markers: Option<(i32, i32, i32)>,
    pub pix_x: i32,
    pub pix_y: i32,
}

/// Complete legacy header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pt3Header {
    pub text: Pt3TextHeader,
    pub binary: Pt3BinaryHeader,
    pub board: Pt3BoardHeader,
    pub tt: Pt3TtHeader,
}

impl Pt3Header {
    /// Parses the header at the start of `data`.
    ///
    /// Returns the header and the offset of the first record.
    ///
    /// # Errors
    /// Returns [`Error::NotAPtuFile`] if the ident is not a PicoHarp ident,
    /// [`Error::NotAnImagingFile`] if the imaging header is empty, and
    /// [`Error::TruncatedStream`] on a short buffer.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut c = ByteCursor::new(data);

        let ident = c.read_padded_str(IDENT_LEN, "pt3 ident")?;
        if !ident.starts_with(PT3_IDENT_PREFIX) {
            return Err(Error::NotAPtuFile(ident));
        }
        let text = Pt3TextHeader {
            ident,
            format_version: c.read_padded_str(6, "pt3 format version")?,
            creator_name: c.read_padded_str(18, "pt3 creator name")?,
            creator_version: c.read_padded_str(12, "pt3 creator version")?,
            file_time: c.read_padded_str(18, "pt3 file time")?,
            comment: {
                c.skip(2, "pt3 crlf")?;
                c.read_padded_str(256, "pt3 comment")?
            },
        };

        let mut binary = Pt3BinaryHeader {
            curves: c.read_i32("pt3 curves")?,
            bits_per_record: c.read_i32("pt3 bits per record")?,
            routing_channels: c.read_i32("pt3 routing channels")?,
            number_of_boards: c.read_i32("pt3 number of boards")?,
            active_curve: c.read_i32("pt3 active curve")?,
            measurement_mode: c.read_i32("pt3 measurement mode")?,
            sub_mode: c.read_i32("pt3 sub mode")?,
            range_no: c.read_i32("pt3 range")?,
            offset: c.read_i32("pt3 offset")?,
            acquisition_time: c.read_i32("pt3 acquisition time")?,
            stop_at: c.read_i32("pt3 stop at")?,
            stop_on_ovfl: c.read_i32("pt3 stop on overflow")?,
            restart: c.read_i32("pt3 restart")?,
            disp_lin_log: c.read_i32("pt3 display lin/log")?,
            disp_time_from: c.read_i32("pt3 display time from")?,
            disp_time_to: c.read_i32("pt3 display time to")?,
            ..Pt3BinaryHeader::default()
        };
        c.skip(DISPLAY_BLOCK_LEN, "pt3 display settings")?;
        binary.repeat_mode = c.read_i32("pt3 repeat mode")?;
        binary.repeats_per_curve = c.read_i32("pt3 repeats per curve")?;
        binary.repeat_time = c.read_i32("pt3 repeat time")?;
        binary.repeat_wait_time = c.read_i32("pt3 repeat wait time")?;
        binary.script_name = c.read_padded_str(20, "pt3 script name")?;

        let board = Pt3BoardHeader {
            hardware_ident: c.read_padded_str(16, "pt3 hardware ident")?,
            hardware_version: c.read_padded_str(8, "pt3 hardware version")?,
            hardware_serial: c.read_i32("pt3 hardware serial")?,
            sync_divider: c.read_i32("pt3 sync divider")?,
            cfd_zero_cross0: c.read_i32("pt3 cfd zero cross 0")?,
            cfd_level0: c.read_i32("pt3 cfd level 0")?,
            cfd_zero_cross1: c.read_i32("pt3 cfd zero cross 1")?,
            cfd_level1: c.read_i32("pt3 cfd level 1")?,
            resolution_ns: c.read_f32("pt3 resolution")?,
        };
        c.skip(ROUTER_BLOCK_LEN, "pt3 router settings")?;

        let mut tt = Pt3TtHeader {
            ext_devices: c.read_i32("pt3 ext devices")?,
            reserved1: c.read_i32("pt3 reserved")?,
            reserved2: c.read_i32("pt3 reserved")?,
            cnt_rate0: c.read_i32("pt3 count rate 0")?,
            cnt_rate1: c.read_i32("pt3 count rate 1")?,
            stop_after: c.read_i32("pt3 stop after")?,
            stop_reason: c.read_i32("pt3 stop reason")?,
            records: c.read_i32("pt3 records")?,
            imaging: Vec::new(),
        };
        let imaging_words = c.read_i32("pt3 imaging header size")?;
        if imaging_words <= 0 {
            return Err(Error::NotAnImagingFile);
        }
        for _ in 0..imaging_words {
            tt.imaging.push(c.read_i32("pt3 imaging header")?);
        }

        log::debug!(
            "parsed PT3 header ({} {}), {} records, {} imaging words",
            board.hardware_ident,
            text.format_version,
            tt.records,
            imaging_words
        );

        Ok((
            Self {
                text,
                binary,
                board,
                tt,
            },
            c.position(),
        ))
    }

    /// Resolves pixel dimensions and marker channels from the imaging words.
    ///
    /// Word layout by ident:
    ///
    /// | ident | scanner        | words                                           |
    /// |-------|----------------|-------------------------------------------------|
    /// | 1, 2  | PI E710/KDT180 | `[6]`/`[7]` X0/Y0 (f32), `[8]` PixX, `[9]` PixY |
    /// | 3     | LSM            | `[2]` Frame, `[3]` LineStart, `[4]` LineStop, `[6]` PixX, `[7]` PixY |
    ///
    /// Piezo scanners carry no marker channels.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHeader`] for an unknown ident or too few
    /// imaging words for the ident's layout.
    pub fn imaging(&self) -> Result<Pt3Imaging> {
        let words = &self.tt.imaging;
        let ident = words.get(1).copied().ok_or_else(|| {
            Error::InvalidHeader(format!("imaging header has {} words", words.len()))
        })?;
        let (pix, needed) = match ident {
            IMAGING_IDENT_PI_E710 | IMAGING_IDENT_KDT180 => (8, 10),
            IMAGING_IDENT_LSM => (6, 8),
            other => {
                return Err(Error::InvalidHeader(format!(
                    "unknown imaging ident {other}"
                )))
            }
        };
        if words.len() < needed {
            return Err(Error::InvalidHeader(format!(
                "imaging header for ident {ident} has {} words, need {needed}",
                words.len()
            )));
        }
        let markers = (ident == IMAGING_IDENT_LSM).then_some((words[3], words[4], words[2]));
        Ok(Pt3Imaging {
            dimensions: words[0],
            ident,
            markers,
            pix_x: words[pix],
            pix_y: words[pix + 1],
        })
    }
}

/// True if `data` starts with a PT3 ident.
#[must_use]
pub fn is_pt3_ident(data: &[u8]) -> bool {
    data.len() >= IDENT_LEN && data.starts_with(PT3_IDENT_PREFIX.as_bytes())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn push_str(out: &mut Vec<u8>, value: &str, len: usize) {
        let mut field = vec![0u8; len];
        field[..value.len()].copy_from_slice(value.as_bytes());
        out.extend_from_slice(&field);
    }

    fn push_i32(out: &mut Vec<u8>, value: i32) {
        out.extend_from_slice(&value.to_le_bytes());
    }

    /// Builds a PT3 header with LSM imaging words.
    pub(crate) fn build_pt3(pix_x: i32, pix_y: i32, records: i32, imaging: bool) -> Vec<u8> {
        // Dimensions, Ident (LSM), Frame, LineStart, LineStop, Pattern, PixX, PixY
        let lsm = [3, 3, 3, 1, 2, 0, pix_x, pix_y];
        let words: &[i32] = if imaging { &lsm } else { &[] };
        build_pt3_with_words(records, words)
    }

    /// Builds a PT3 header followed by the given imaging words.
    pub(crate) fn build_pt3_with_words(records: i32, words: &[i32]) -> Vec<u8> {
        let mut out = Vec::new();
        push_str(&mut out, "PicoHarp 300", 16);
        push_str(&mut out, "2.0", 6);
        push_str(&mut out, "PicoHarp Software", 18);
        push_str(&mut out, "2.3.0.0", 12);
        push_str(&mut out, "18/10/26 10:00:00", 18);
        out.extend_from_slice(b"\r\n");
        push_str(&mut out, "test comment", 256);

        // Curves .. DispTimeTo
        for value in [0, 32, 4, 1, 0, 3, 3, 0, 0, 60_000, 0, 0, 0, 0, 0, 100] {
            push_i32(&mut out, value);
        }
        out.extend_from_slice(&[0xEE; DISPLAY_BLOCK_LEN]);
        for value in [0, 1, 0, 0] {
            push_i32(&mut out, value);
        }
        push_str(&mut out, "", 20);

        push_str(&mut out, "PicoHarp 300", 16);
        push_str(&mut out, "2.0", 8);
        for value in [1_000_123, 8, 10, 100, 10, 100] {
            push_i32(&mut out, value);
        }
        out.extend_from_slice(&0.004_f32.to_le_bytes());
        out.extend_from_slice(&[0xEE; ROUTER_BLOCK_LEN]);

        for value in [0, 0, 0, 40_000_000, 1_000, 0, 0, records] {
            push_i32(&mut out, value);
        }
        push_i32(&mut out, i32::try_from(words.len()).unwrap());
        for &word in words {
            push_i32(&mut out, word);
        }
        out
    }

    #[test]
    fn test_pt3_decode() {
        let data = build_pt3(256, 128, 10, true);
        let (header, offset) = Pt3Header::decode(&data).unwrap();
        assert_eq!(offset, data.len());
        assert_eq!(header.text.ident, "PicoHarp 300");
        assert_eq!(header.text.comment, "test comment");
        assert_eq!(header.binary.bits_per_record, 32);
        assert_eq!(header.binary.acquisition_time, 60_000);
        assert_eq!(header.binary.disp_time_to, 100);
        assert_eq!(header.binary.repeats_per_curve, 1);
        assert_eq!(header.board.hardware_serial, 1_000_123);
        assert!((header.board.resolution_ns - 0.004).abs() < 1e-7);
        assert_eq!(header.tt.cnt_rate0, 40_000_000);
        assert_eq!(header.tt.records, 10);

        let imaging = header.imaging().unwrap();
        assert_eq!((imaging.pix_x, imaging.pix_y), (256, 128));
        assert_eq!(imaging.markers, Some((1, 2, 3)));
    }

    #[test]
    fn test_pt3_header_size() {
        // 328 text + 64 + 108 + 16 + 20 + 52 + 104 + 36 + 8 imaging words
        let data = build_pt3(1, 1, 0, true);
        assert_eq!(data.len(), 328 + 64 + 108 + 16 + 20 + 52 + 104 + 36 + 32);
    }

    #[test]
    fn test_pt3_piezo_scanner_layout() {
        let x0 = i32::from_le_bytes(12.5_f32.to_le_bytes());
        let y0 = i32::from_le_bytes((-3.0_f32).to_le_bytes());
        // Dimensions, Ident (PI E710), TimePerPixel, Acceleration, Pattern,
        // Reserved, X0, Y0, PixX, PixY, PixResol
        let words = [2, 1, 100, 1, 0, 0, x0, y0, 64, 32, 0];
        let (header, _) = Pt3Header::decode(&build_pt3_with_words(0, &words)).unwrap();
        let imaging = header.imaging().unwrap();
        assert_eq!((imaging.pix_x, imaging.pix_y), (64, 32));
        assert_eq!(imaging.markers, None);

        let mut kdt = words;
        kdt[1] = 2;
        let (header, _) = Pt3Header::decode(&build_pt3_with_words(0, &kdt)).unwrap();
        assert_eq!(header.imaging().unwrap().pix_x, 64);
    }

    #[test]
    fn test_pt3_imaging_layout_errors() {
        // piezo layout cut before PixY
        let (header, _) =
            Pt3Header::decode(&build_pt3_with_words(0, &[2, 1, 0, 0, 0, 0, 0, 0, 64])).unwrap();
        assert!(matches!(header.imaging(), Err(Error::InvalidHeader(_))));

        let (header, _) =
            Pt3Header::decode(&build_pt3_with_words(0, &[3, 7, 0, 0, 0, 0, 4, 4])).unwrap();
        assert!(matches!(header.imaging(), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_pt3_not_imaging() {
        let data = build_pt3(1, 1, 0, false);
        assert!(matches!(
            Pt3Header::decode(&data),
            Err(Error::NotAnImagingFile)
        ));
    }

    #[test]
    fn test_pt3_bad_ident() {
        let mut data = build_pt3(1, 1, 0, true);
        data[..8].copy_from_slice(b"TimeHarp");
        assert!(matches!(Pt3Header::decode(&data), Err(Error::NotAPtuFile(_))));
        assert!(!is_pt3_ident(&data));
    }

    #[test]
    fn test_pt3_truncated() {
        let data = build_pt3(1, 1, 0, true);
        assert!(matches!(
            Pt3Header::decode(&data[..700]),
            Err(Error::TruncatedStream { .. })
        ));
    }
}
