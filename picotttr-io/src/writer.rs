//! PTU file writer.

use crate::config::EncoderConfig;
use crate::{Error, Result};
use picotttr_core::{PixelCounts, ScanGeometry, BITS_PER_RECORD};
use picotttr_ptu::{names, HeaderTable, Tag};
use picotttr_tttr::EncodeSummary;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::ControlFlow;
use std::path::Path;

const MEASUREMENT_MODE_T3: i64 = 3;
const IMAGING_DIMENSIONS: i64 = 3;
const IMAGING_IDENT_LSM: i64 = 3;

/// Writes count images as imaging PTU files.
#[derive(Debug, Clone, Default)]
pub struct PtuFileWriter {
    config: EncoderConfig,
}

impl PtuFileWriter {
    /// Creates a writer with a validated configuration.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Header tags for an image of `geometry` with `records` records.
    ///
    /// # Errors
    /// Returns an error if an extra tag collides with the header sentinel or
    /// a dimension does not fit a tag.
    pub fn header(&self, geometry: &ScanGeometry, records: u64) -> Result<HeaderTable> {
        let config = &self.config;
        let records = i64::try_from(records)
            .map_err(|_| Error::InvalidFormat(format!("{records} records do not fit a tag")))?;
        let sync_rate = i64::try_from(config.sync_rate_hz)
            .map_err(|_| Error::Config(format!("sync rate {} is too large", config.sync_rate_hz)))?;
        let record_type = i64::from(config.encoder().format().record_type().code());

        let mut table = HeaderTable::new();
        for tag in [
            Tag::string(names::FILE_GUID, config.file_guid.as_str()),
            Tag::int(names::MEASUREMENT_MODE, MEASUREMENT_MODE_T3),
            Tag::int(names::MEASUREMENT_SUBMODE, MEASUREMENT_MODE_T3),
            Tag::string(names::CREATOR_NAME, config.creator_name.as_str()),
            Tag::string(names::CREATOR_VERSION, config.creator_version.as_str()),
            Tag::int(names::IMG_DIMENSIONS, IMAGING_DIMENSIONS),
            Tag::int(names::IMG_IDENT, IMAGING_IDENT_LSM),
            Tag::int(names::PIX_X, i64::from(geometry.width)),
            Tag::int(names::PIX_Y, i64::from(geometry.height)),
            Tag::float(names::PIX_RESOL, config.pixel_resolution_um),
            Tag::int(names::LINE_START, i64::from(config.markers.line_start)),
            Tag::int(names::LINE_STOP, i64::from(config.markers.line_stop)),
            Tag::int(names::FRAME, i64::from(config.markers.frame)),
            Tag::int(names::BIDIRECT, 0),
            Tag::int(names::SIN_CORRECTION, 0),
            Tag::int(names::BINNING_FACTOR, 1),
            Tag::float(names::RESOLUTION, config.resolution_s()),
            Tag::int(names::SYNC_RATE, sync_rate),
            Tag::float(names::GLOBAL_RESOLUTION, config.global_resolution_s()),
            Tag::int(names::NUMBER_OF_RECORDS, records),
            Tag::int(names::RECORD_TYPE, record_type),
            Tag::int(names::BITS_PER_RECORD, BITS_PER_RECORD),
        ] {
            table.push(tag)?;
        }
        for tag in &config.extra_tags {
            table.push(tag.clone())?;
        }
        Ok(table)
    }

    /// Writes a complete PTU image (header then records) to `sink`.
    ///
    /// # Errors
    /// Returns an error for invalid geometry, a cancelled pass or a failing
    /// sink.
    pub fn write_to<C, W, F>(&self, counts: &C, sink: &mut W, progress: F) -> Result<EncodeSummary>
    where
        C: PixelCounts + ?Sized,
        W: Write + ?Sized,
        F: FnMut(u32, u32) -> ControlFlow<()>,
    {
        let encoder = self.config.encoder();
        encoder.validate()?;
        let geometry = ScanGeometry::from_counts(counts)?;
        let declared = geometry.exact_record_count(counts.total_photons());

        let header = self.header(&geometry, declared)?.encode()?;
        sink.write_all(&header)?;
        let summary = encoder.encode_with_progress(counts, sink, progress)?;

        if summary.records() != declared {
            return Err(Error::InvalidFormat(format!(
                "wrote {} records but the header declares {declared}",
                summary.records()
            )));
        }
        Ok(summary)
    }

    /// Writes a PTU file at `path`.
    ///
    /// # Errors
    /// See [`PtuFileWriter::write_file_with_progress`].
    pub fn write_file<P, C>(&self, path: P, counts: &C) -> Result<EncodeSummary>
    where
        P: AsRef<Path>,
        C: PixelCounts + ?Sized,
    {
        self.write_file_with_progress(path, counts, |_, _| ControlFlow::Continue(()))
    }

    /// Writes a PTU file at `path`, reporting progress per line.
    ///
    /// The file is flushed before returning; if any step fails the partial
    /// file is removed.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written, for
    /// invalid geometry, or when `progress` cancels.
    pub fn write_file_with_progress<P, C, F>(
        &self,
        path: P,
        counts: &C,
        progress: F,
    ) -> Result<EncodeSummary>
    where
        P: AsRef<Path>,
        C: PixelCounts + ?Sized,
        F: FnMut(u32, u32) -> ControlFlow<()>,
    {
        let path = path.as_ref();
        let file = File::create(path)?;

        let result = self.write_buffered(file, counts, progress);

        match &result {
            Ok(summary) => log::info!(
                "wrote {} ({} records, {} photons)",
                path.display(),
                summary.records(),
                summary.photons
            ),
            Err(err) => {
                log::warn!("writing {} failed: {err}", path.display());
                if let Err(remove_err) = fs::remove_file(path) {
                    log::warn!("could not remove {}: {remove_err}", path.display());
                }
            }
        }
        result
    }

    fn write_buffered<C, F>(&self, file: File, counts: &C, progress: F) -> Result<EncodeSummary>
    where
        C: PixelCounts + ?Sized,
        F: FnMut(u32, u32) -> ControlFlow<()>,
    {
        let mut writer = BufWriter::new(file);
        let summary = self.write_to(counts, &mut writer, progress)?;
        writer.flush()?;
        Ok(summary)
    }
}
