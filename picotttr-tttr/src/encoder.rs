//! Raster scan encoder: count image to PicoHarp T3 records.
//!
//! Each line gets `sync_count_per_line` ticks and each pixel a slot of
//! `max_count_per_pixel + 2` ticks. Inside a slot all photons share one sync
//! time and carry their lifetime bin as dtime:
//!
//! ```text
//! LineStart | +1 photons... | slot edge | +1 photons... | line end LineStop
//! ```
//!
//! After the last line one more tick is spent and the frame marker written.

use crate::clock::SyncClock;
use crate::record::picoharp;
use picotttr_core::{
    Error, MarkerKind, MarkerLayout, PixelCounts, RecordFormat, Result, ScanGeometry,
};
use std::io::Write;
use std::ops::ControlFlow;

/// Highest photon channel; 15 marks special records.
pub const MAX_PHOTON_CHANNEL: u8 = 14;

/// Record counts of a finished encode pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Scan timing derived from the counts; `None` until a scan is encoded.
    pub geometry: Option<ScanGeometry>,
    /// Photon records written.
    pub photons: u64,
    /// Line-start, line-stop and frame marker records written.
    pub markers: u64,
    /// Overflow records written to advance the sync clock.
    pub overflows: u64,
}

impl EncodeSummary {
    /// Total records written.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.photons + self.markers + self.overflows
    }
}

/// Writes a synthetic scan of a count image.
#[derive(Debug, Clone, Copy)]
pub struct ScanEncoder {
    markers: MarkerLayout,
    photon_channel: u8,
}

impl Default for ScanEncoder {
    fn default() -> Self {
        Self {
            markers: MarkerLayout::default(),
            photon_channel: 1,
        }
    }
}

impl ScanEncoder {
    /// Encoder with the default marker layout and photon channel 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the marker channels.
    #[must_use]
    pub fn with_markers(mut self, markers: MarkerLayout) -> Self {
        self.markers = markers;
        self
    }

    /// Sets the channel photons are written on.
    #[must_use]
    pub fn with_photon_channel(mut self, channel: u8) -> Self {
        self.photon_channel = channel;
        self
    }

    /// Marker layout the header must declare.
    #[must_use]
    pub fn markers(&self) -> MarkerLayout {
        self.markers
    }

    /// Layout of the records written.
    #[must_use]
    pub fn format(&self) -> RecordFormat {
        RecordFormat::PicoHarpT3
    }

    /// Checks channel settings.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for a photon channel above 14 or a
    /// marker layout with duplicate or unaddressable channels.
    pub fn validate(&self) -> Result<()> {
        if self.photon_channel > MAX_PHOTON_CHANNEL {
            return Err(Error::InvalidConfig(format!(
                "photon channel {} is above {MAX_PHOTON_CHANNEL}",
                self.photon_channel
            )));
        }
        if !self.markers.is_valid() {
            return Err(Error::InvalidConfig(format!(
                "marker channels must be distinct and within 1..=4, got {:?}",
                self.markers
            )));
        }
        Ok(())
    }

    /// Encodes `counts` into `sink`.
    ///
    /// # Errors
    /// See [`ScanEncoder::encode_with_progress`].
    pub fn encode<C, W>(&self, counts: &C, sink: &mut W) -> Result<EncodeSummary>
    where
        C: PixelCounts + ?Sized,
        W: Write + ?Sized,
    {
        self.encode_with_progress(counts, sink, |_, _| ControlFlow::Continue(()))
    }

    /// Encodes `counts` into `sink`, calling `progress(rows_done, rows)`
    /// after every line.
    ///
    /// # Errors
    /// - [`Error::InvalidConfig`] / [`Error::InvalidGeometry`] before any
    ///   record is written
    /// - [`Error::Cancelled`] when `progress` breaks
    /// - [`Error::Io`] from the sink
    pub fn encode_with_progress<C, W, F>(
        &self,
        counts: &C,
        sink: &mut W,
        mut progress: F,
    ) -> Result<EncodeSummary>
    where
        C: PixelCounts + ?Sized,
        W: Write + ?Sized,
        F: FnMut(u32, u32) -> ControlFlow<()>,
    {
        self.validate()?;
        let geometry = ScanGeometry::from_counts(counts)?;
        let slot = geometry.pixel_slot_width();
        let line = geometry.sync_count_per_line();
        log::debug!(
            "encoding {}x{} scan: max {} photons/pixel, slot {slot}, line {line} ticks",
            geometry.width,
            geometry.height,
            geometry.max_count_per_pixel
        );

        let mut pass = Pass {
            sink,
            clock: SyncClock::new(),
            summary: EncodeSummary {
                geometry: Some(geometry),
                ..EncodeSummary::default()
            },
        };
        let line_start = self.markers.code_for(MarkerKind::LineStart);
        let line_stop = self.markers.code_for(MarkerKind::LineStop);
        let frame = self.markers.code_for(MarkerKind::Frame);

        for y in 0..geometry.height {
            let row_origin = u64::from(y) * line;
            pass.marker(line_start)?;
            for x in 0..geometry.width {
                pass.advance(1)?;
                for (bin, &count) in counts.pixel(x, y).iter().enumerate() {
                    #[allow(clippy::cast_possible_truncation)]
                    let dtime = bin as u16;
                    for _ in 0..count {
                        pass.photon(self.photon_channel, dtime)?;
                    }
                }
                if x + 1 < geometry.width {
                    pass.advance_to(row_origin + u64::from(x + 1) * slot)?;
                }
            }
            pass.advance_to(row_origin + line)?;
            pass.marker(line_stop)?;

            if progress(y + 1, geometry.height).is_break() {
                log::info!("encoding cancelled after {} of {} lines", y + 1, geometry.height);
                return Err(Error::Cancelled);
            }
        }
        pass.advance(1)?;
        pass.marker(frame)?;

        let summary = pass.summary;
        log::debug!(
            "wrote {} records: {} photons, {} markers, {} overflows",
            summary.records(),
            summary.photons,
            summary.markers,
            summary.overflows
        );
        Ok(summary)
    }
}

/// Mutable state of one encode pass.
struct Pass<'w, W: Write + ?Sized> {
    sink: &'w mut W,
    clock: SyncClock,
    summary: EncodeSummary,
}

impl<W: Write + ?Sized> Pass<'_, W> {
    fn write(&mut self, record: u32) -> Result<()> {
        self.sink.write_all(&record.to_le_bytes())?;
        Ok(())
    }

    fn overflows(&mut self, wraps: u64) -> Result<()> {
        for _ in 0..wraps {
            self.write(picoharp::overflow())?;
        }
        self.summary.overflows += wraps;
        Ok(())
    }

    fn advance(&mut self, ticks: u64) -> Result<()> {
        let wraps = self.clock.advance(ticks);
        self.overflows(wraps)
    }

    fn advance_to(&mut self, target: u64) -> Result<()> {
        let wraps = self.clock.advance_to(target)?;
        self.overflows(wraps)
    }

    fn photon(&mut self, channel: u8, dtime: u16) -> Result<()> {
        self.write(picoharp::photon(self.clock.nsync(), channel, dtime))?;
        self.summary.photons += 1;
        Ok(())
    }

    fn marker(&mut self, code: u8) -> Result<()> {
        self.write(picoharp::marker(self.clock.nsync(), code))?;
        self.summary.markers += 1;
        Ok(())
    }
}
