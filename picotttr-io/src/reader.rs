//! Memory-mapped file readers.
//!

use crate::Result;
use memmap2::Mmap;
use picotttr_core::{Warning, RECORD_SIZE};
use picotttr_ptu::{parse_header, AcquisitionInfo, FileKind, Header, ParsedHeader};
use picotttr_tttr::EventStream;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A memory-mapped file reader.
///
/// Uses memmap2 to efficiently access file contents without
/// loading the entire file into memory.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the mapping was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<[u8]> for MappedFileReader {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// A PTU or PT3 file with its header parsed.
///
/// The record section is decoded lazily by [`PtuFileReader::events`].
pub struct PtuFileReader<B = MappedFileReader> {
    data: B,
    parsed: ParsedHeader,
}

impl PtuFileReader<MappedFileReader> {
    /// Opens and memory-maps a `.ptu` or `.pt3` file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or its header is
    /// invalid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(&path)?;
        log::info!(
            "opened {} ({} bytes)",
            reader.path().display(),
            reader.len()
        );
        Self::from_bytes(reader)
    }
}

impl<B: AsRef<[u8]>> PtuFileReader<B> {
    /// Parses a file image held in memory.
    ///
    /// # Errors
    /// Returns an error if the header is invalid.
    pub fn from_bytes(data: B) -> Result<Self> {
        let mut parsed = parse_header(data.as_ref())?;

        let available = ((data.as_ref().len() - parsed.data_offset) / RECORD_SIZE) as u64;
        if let Some(declared) = parsed.info.declared_records {
            if declared > available {
                let warning = Warning::RecordCountMismatch {
                    declared,
                    available,
                };
                log::warn!("{warning}");
                parsed.warnings.push(warning);
            }
        }

        log::info!(
            "{:?} file, {} records, {}x{} pixels",
            parsed.header.kind(),
            available,
            parsed.info.width,
            parsed.info.height
        );
        Ok(Self { data, parsed })
    }

    /// Container kind.
    #[must_use]
    pub fn kind(&self) -> FileKind {
        self.parsed.header.kind()
    }

    /// Parsed header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.parsed.header
    }

    /// Resolved acquisition settings.
    #[must_use]
    pub fn info(&self) -> &AcquisitionInfo {
        &self.parsed.info
    }

    /// Non-fatal conditions found while opening.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.parsed.warnings
    }

    /// Byte offset of the first record.
    #[must_use]
    pub fn data_offset(&self) -> usize {
        self.parsed.data_offset
    }

    /// Raw record section.
    #[must_use]
    pub fn record_bytes(&self) -> &[u8] {
        &self.data.as_ref()[self.parsed.data_offset..]
    }

    /// Complete records present after the header.
    #[must_use]
    pub fn available_records(&self) -> u64 {
        (self.record_bytes().len() / RECORD_SIZE) as u64
    }

    /// Lazy event stream over the records.
    ///
    /// Empty for T2 files. Stops at the declared record count when the
    /// header has one.
    #[must_use]
    pub fn events(&self) -> EventStream<'_> {
        match self.parsed.info.format {
            Some(format) => EventStream::for_format(
                self.record_bytes(),
                format,
                self.parsed.info.markers,
                self.parsed.info.declared_records,
            ),
            None => EventStream::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_mapped_reader() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4]).unwrap();
        file.flush().unwrap();

        let reader = MappedFileReader::open(file.path()).unwrap();
        assert_eq!(reader.len(), 4);
        assert!(!reader.is_empty());
        assert_eq!(reader.as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(reader.path(), file.path());
    }

    #[test]
    fn test_not_a_ptu_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"GIF89a..........").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            PtuFileReader::open(file.path()),
            Err(crate::Error::CoreError(picotttr_core::Error::NotAPtuFile(_)))
        ));
    }
}
