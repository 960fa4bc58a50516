//! picotttr-ptu: PTU tagged-header and legacy PT3 header codecs.
//!
//! This crate reads and writes the self-describing tag directory at the
//! front of every `.ptu` file, parses the fixed binary header of legacy
//! `.pt3` files, and resolves either into the fields the record decoder
//! needs.
//!
//! # Key Components
//!
//! - [`Tag`] / [`TagValue`] - One typed header entry and its wire codec
//! - [`HeaderTable`] - Ordered tag directory terminated by `Header_End`
//! - [`Pt3Header`] - PicoHarp 300 legacy header
//! - [`AcquisitionInfo`] - Dimensions, marker layout and record format
//! - [`parse_header`] - Container detection plus header parsing
//!

mod cursor;
pub mod header;
mod info;
pub mod pt3;
pub mod tag;

pub use cursor::ByteCursor;
pub use header::{is_ptu_magic, names, HeaderTable, FORMAT_VERSION, HEADER_END, PTU_MAGIC};
pub use info::{parse_header, AcquisitionInfo, FileKind, Header, ParsedHeader};
pub use pt3::{is_pt3_ident, Pt3Header, Pt3Imaging};
pub use tag::{ole_to_unix_seconds, unix_seconds_to_ole, Tag, TagType, TagValue};
