//! picotttr-core: Core types for PicoQuant TTTR photon-event data.
//!
//! This crate holds what the header codecs, the record decoders and the
//! scan encoder share: the error taxonomy, record type codes, decoded
//! events, the overflow accumulator and the scan geometry.
//!

pub mod error;
pub mod event;
pub mod format;
pub mod geometry;
pub mod overflow;
pub mod warning;

pub use error::{Error, Result};
pub use event::{Event, MarkerKind, MarkerLayout};
pub use format::{
    RecordFormat, RecordType, TimingMode, BITS_PER_RECORD, RECORD_SIZE, T3_WRAPAROUND, WRAPAROUND,
};
pub use geometry::{CountCuboid, PixelCounts, ScanGeometry, MAX_LIFETIME_BINS};
pub use overflow::OverflowState;
pub use warning::Warning;
