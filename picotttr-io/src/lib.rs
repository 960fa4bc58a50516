//! picotttr-io: PTU/PT3 file reading and PTU file writing.
//!
//! This crate memory-maps input files via memmap2, detects the container
//! kind and exposes the decoded event stream; on the write side it turns a
//! count image plus an [`EncoderConfig`] into a complete `.ptu` file.
//!

mod config;
mod error;
mod reader;
mod writer;

pub use config::{EncoderConfig, DEFAULT_FILE_GUID};
pub use error::{Error, Result};
pub use reader::{MappedFileReader, PtuFileReader};
pub use writer::PtuFileWriter;
