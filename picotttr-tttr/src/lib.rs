//! picotttr-tttr: TTTR record decoding and the raster scan encoder.
//!
//! # Key Components
//!
//! - [`RecordDecoder`] - Per-format decode strategy ([`PicoHarpT3`], [`HydraHarpT3`])
//! - [`EventStream`] - Lazy, time-checked event iterator over a record buffer
//! - [`ScanEncoder`] - Writes a count image as a PicoHarp T3 record stream
//! - [`SyncClock`] - 16-bit sync counter with wraparound accounting
//!
//! Decoding and encoding are single sequential folds; the overflow state is
//! owned by the pass.

mod clock;
mod decoder;
mod encoder;
pub mod record;
mod stream;

pub use clock::SyncClock;
pub use decoder::{decode_record, decoder_for, HydraHarpT3, PicoHarpT3, RecordDecoder};
pub use encoder::{EncodeSummary, ScanEncoder, MAX_PHOTON_CHANNEL};
pub use stream::EventStream;
