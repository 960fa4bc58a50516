//! Multi-page TIFF stacks as count images.
//!
//! Page `d` of the stack holds lifetime bin `d` for every pixel.

use crate::{CliError, Result};
use picotttr_core::CountCuboid;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};

/// Reads a TIFF stack file.
pub fn read_stack(path: &Path) -> Result<CountCuboid> {
    let file = File::open(path)?;
    let counts = decode_stack(BufReader::new(file))?;
    log::info!("read {} lifetime bins from {}", counts.bins(), path.display());
    Ok(counts)
}

/// Decodes every page of a TIFF stack into a count cuboid.
pub fn decode_stack<R: Read + Seek>(reader: R) -> Result<CountCuboid> {
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());
    let (width, height) = decoder.dimensions()?;

    let mut pages = Vec::new();
    loop {
        let dims = decoder.dimensions()?;
        if dims != (width, height) {
            return Err(CliError::InvalidStack(format!(
                "page {} is {}x{}, first page is {width}x{height}",
                pages.len(),
                dims.0,
                dims.1
            )));
        }
        let page: Vec<u32> = match decoder.read_image()? {
            DecodingResult::U8(data) => data.into_iter().map(u32::from).collect(),
            DecodingResult::U16(data) => data.into_iter().map(u32::from).collect(),
            DecodingResult::U32(data) => data,
            _ => {
                return Err(CliError::InvalidStack(format!(
                    "page {} is not an unsigned 8/16/32-bit grayscale image",
                    pages.len()
                )))
            }
        };
        pages.push(page);

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    log::debug!("decoded {} pages of {width}x{height}", pages.len());
    Ok(CountCuboid::from_pages(width, height, &pages)?)
}
