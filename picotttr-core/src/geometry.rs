//! Scan geometry and the photon-count cuboid consumed by the encoder.

use crate::format::WRAPAROUND;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of lifetime bins addressable by the 12-bit PicoHarp dtime field.
pub const MAX_LIFETIME_BINS: usize = 4096;

/// Read access to a per-pixel lifetime histogram image.
///
/// `pixel(x, y)[d]` is the number of photons of pixel `(x, y)` in lifetime
/// bin `d`.
pub trait PixelCounts {
    /// Image width in pixels.
    fn width(&self) -> u32;

    /// Image height in pixels.
    fn height(&self) -> u32;

    /// Lifetime histogram of one pixel.
    fn pixel(&self, x: u32, y: u32) -> &[u32];

    /// Photons in one pixel, summed over lifetime bins.
    fn pixel_total(&self, x: u32, y: u32) -> u64 {
        self.pixel(x, y).iter().map(|&c| u64::from(c)).sum()
    }

    /// Largest per-pixel photon total.
    fn max_pixel_total(&self) -> u64 {
        let mut max = 0;
        for y in 0..self.height() {
            for x in 0..self.width() {
                max = max.max(self.pixel_total(x, y));
            }
        }
        max
    }

    /// Photons in the whole image.
    fn total_photons(&self) -> u64 {
        let mut total = 0;
        for y in 0..self.height() {
            for x in 0..self.width() {
                total += self.pixel_total(x, y);
            }
        }
        total
    }

    /// Longest lifetime histogram over all pixels.
    fn lifetime_bins(&self) -> usize {
        let mut bins = 0;
        for y in 0..self.height() {
            for x in 0..self.width() {
                bins = bins.max(self.pixel(x, y).len());
            }
        }
        bins
    }
}

/// Owned count cuboid with bins stored contiguously per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CountCuboid {
    width: u32,
    height: u32,
    bins: usize,
    counts: Vec<u32>,
}

impl CountCuboid {
    /// Creates an all-zero cuboid.
    #[must_use]
    pub fn new(width: u32, height: u32, bins: usize) -> Self {
        Self {
            width,
            height,
            bins,
            counts: vec![0; width as usize * height as usize * bins],
        }
    }

    /// Builds a cuboid from page-ordered data: `pages[d][y * width + x]`.
    ///
    /// This is the layout of a TIFF stack whose pages are lifetime bins.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] if a page has the wrong length.
    pub fn from_pages(width: u32, height: u32, pages: &[Vec<u32>]) -> Result<Self> {
        let plane = width as usize * height as usize;
        let mut cuboid = Self::new(width, height, pages.len());
        for (d, page) in pages.iter().enumerate() {
            if page.len() != plane {
                return Err(Error::InvalidGeometry(format!(
                    "page {d} has {} values, expected {plane}",
                    page.len()
                )));
            }
            for (i, &count) in page.iter().enumerate() {
                cuboid.counts[i * cuboid.bins + d] = count;
            }
        }
        Ok(cuboid)
    }

    /// Number of lifetime bins per pixel.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.bins
    }

    /// Count of one pixel/bin cell.
    ///
    /// # Panics
    /// Panics if the cell is out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32, bin: usize) -> u32 {
        assert!(x < self.width && y < self.height && bin < self.bins);
        self.counts[self.offset(x, y) + bin]
    }

    /// Sets one pixel/bin cell.
    ///
    /// # Panics
    /// Panics if the cell is out of bounds.
    pub fn set(&mut self, x: u32, y: u32, bin: usize, count: u32) {
        assert!(x < self.width && y < self.height && bin < self.bins);
        let offset = self.offset(x, y);
        self.counts[offset + bin] = count;
    }

    /// Adds one photon to a cell.
    ///
    /// # Panics
    /// Panics if the cell is out of bounds.
    pub fn increment(&mut self, x: u32, y: u32, bin: usize) {
        assert!(x < self.width && y < self.height && bin < self.bins);
        let offset = self.offset(x, y);
        self.counts[offset + bin] += 1;
    }
}

impl PixelCounts for CountCuboid {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> &[u32] {
        let offset = self.offset(x, y);
        &self.counts[offset..offset + self.bins]
    }

    fn lifetime_bins(&self) -> usize {
        self.bins
    }
}

/// Sync budget of a synthetic raster scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanGeometry {
    /// Pixels per line.
    pub width: u32,
    /// Lines per frame.
    pub height: u32,
    /// Largest per-pixel photon total.
    pub max_count_per_pixel: u32,
}

impl ScanGeometry {
    /// Creates a geometry.
    #[must_use]
    pub fn new(width: u32, height: u32, max_count_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            max_count_per_pixel,
        }
    }

    /// Derives the geometry of a count image.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] for an empty image, more lifetime
    /// bins than the dtime field holds, or a pixel total beyond `u32`.
    pub fn from_counts<C: PixelCounts + ?Sized>(counts: &C) -> Result<Self> {
        let (width, height) = (counts.width(), counts.height());
        if width == 0 || height == 0 {
            return Err(Error::InvalidGeometry(format!(
                "image must be at least 1x1, got {width}x{height}"
            )));
        }
        let bins = counts.lifetime_bins();
        if bins > MAX_LIFETIME_BINS {
            return Err(Error::InvalidGeometry(format!(
                "{bins} lifetime bins exceed the {MAX_LIFETIME_BINS} addressable by dtime"
            )));
        }
        let max = counts.max_pixel_total();
        let max_count_per_pixel = u32::try_from(max).map_err(|_| {
            Error::InvalidGeometry(format!("pixel total {max} does not fit the sync budget"))
        })?;
        Ok(Self::new(width, height, max_count_per_pixel))
    }

    /// Sync ticks reserved for one pixel.
    #[inline]
    #[must_use]
    pub fn pixel_slot_width(&self) -> u64 {
        u64::from(self.max_count_per_pixel) + 2
    }

    /// Sync ticks reserved for one line.
    #[inline]
    #[must_use]
    pub fn sync_count_per_line(&self) -> u64 {
        self.pixel_slot_width() * u64::from(self.width)
    }

    /// Absolute sync time at the end of the frame, before the frame tick.
    #[must_use]
    pub fn frame_sync(&self) -> u64 {
        self.sync_count_per_line() * u64::from(self.height)
    }

    /// Conservative wraparound estimate made before a pass.
    #[must_use]
    pub fn estimated_wraparounds(&self) -> u64 {
        self.frame_sync() / WRAPAROUND
    }

    /// Record count estimate: photons, two markers per line, wraparounds
    /// and the frame marker.
    #[must_use]
    pub fn estimated_record_count(&self, total_photons: u64) -> u64 {
        total_photons + 2 * u64::from(self.height) + self.estimated_wraparounds() + 1
    }

    /// Exact record count of an encode pass.
    ///
    /// The pass ends one tick after the last line, so the number of
    /// wraparounds is fixed by that final absolute time.
    #[must_use]
    pub fn exact_record_count(&self, total_photons: u64) -> u64 {
        total_photons + 2 * u64::from(self.height) + (self.frame_sync() + 1) / WRAPAROUND + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_one() -> CountCuboid {
        let mut cuboid = CountCuboid::new(2, 1, 3);
        cuboid.set(0, 0, 0, 2);
        cuboid.set(0, 0, 2, 1);
        cuboid.set(1, 0, 1, 1);
        cuboid
    }

    #[test]
    fn test_cuboid_accessors() {
        let cuboid = two_by_one();
        assert_eq!(cuboid.pixel(0, 0), &[2, 0, 1]);
        assert_eq!(cuboid.pixel(1, 0), &[0, 1, 0]);
        assert_eq!(cuboid.total_photons(), 4);
        assert_eq!(cuboid.max_pixel_total(), 3);
        assert_eq!(cuboid.lifetime_bins(), 3);
    }

    #[test]
    fn test_from_pages() {
        let pages = vec![vec![2, 0], vec![0, 1], vec![1, 0]];
        let cuboid = CountCuboid::from_pages(2, 1, &pages).unwrap();
        assert_eq!(cuboid, two_by_one());

        let bad = vec![vec![1, 2, 3]];
        assert!(CountCuboid::from_pages(2, 1, &bad).is_err());
    }

    #[test]
    fn test_geometry_budget() {
        let geometry = ScanGeometry::from_counts(&two_by_one()).unwrap();
        assert_eq!(geometry.max_count_per_pixel, 3);
        assert_eq!(geometry.pixel_slot_width(), 5);
        assert_eq!(geometry.sync_count_per_line(), 10);
        assert_eq!(geometry.estimated_record_count(4), 4 + 2 + 1);
        assert_eq!(geometry.exact_record_count(4), 7);
    }

    #[test]
    fn test_record_count_boundary() {
        let geometry = ScanGeometry::new(65_535, 1, 0);
        assert_eq!(geometry.frame_sync(), 131_070);
        assert_eq!(geometry.estimated_wraparounds(), 1);
        assert_eq!(geometry.exact_record_count(0), 2 + 1 + 1);

        // frame_sync + 1 lands exactly on a wraparound
        let geometry = ScanGeometry::new(1, 1, 65_533);
        assert_eq!(geometry.frame_sync(), 65_535);
        assert_eq!(geometry.estimated_record_count(0), 3);
        assert_eq!(geometry.exact_record_count(0), 4);
    }

    #[test]
    fn test_invalid_geometry() {
        let empty = CountCuboid::new(0, 4, 1);
        assert!(matches!(
            ScanGeometry::from_counts(&empty),
            Err(Error::InvalidGeometry(_))
        ));

        let deep = CountCuboid::new(1, 1, MAX_LIFETIME_BINS + 1);
        assert!(ScanGeometry::from_counts(&deep).is_err());
    }
}
