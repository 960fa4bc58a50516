//! Decoded TTTR events and marker classification.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of a non-photon marker record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MarkerKind {
    /// Start of a scan line.
    LineStart,
    /// End of a scan line.
    LineStop,
    /// Frame boundary.
    Frame,
    /// Any marker not mapped by the layout.
    Other,
}

/// Marker channel assignment from the imaging header.
///
/// Each field is a marker *channel number* (1-based). Channel `n` shows up
/// in a record's marker field as bit `1 << (n - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MarkerLayout {
    /// `ImgHdr_LineStart`.
    pub line_start: u8,
    /// `ImgHdr_LineStop`.
    pub line_stop: u8,
    /// `ImgHdr_Frame`.
    pub frame: u8,
}

impl Default for MarkerLayout {
    fn default() -> Self {
        Self {
            line_start: 1,
            line_stop: 2,
            frame: 3,
        }
    }
}

impl MarkerLayout {
    /// Creates a layout from the three marker channel numbers.
    #[must_use]
    pub fn new(line_start: u8, line_stop: u8, frame: u8) -> Self {
        Self {
            line_start,
            line_stop,
            frame,
        }
    }

    /// Bit mask of a marker channel within the 4-bit marker field.
    ///
    /// Channels outside `1..=4` have no bit and map to 0.
    #[inline]
    #[must_use]
    pub fn mask(channel: u8) -> u8 {
        match channel {
            1..=4 => 1 << (channel - 1),
            _ => 0,
        }
    }

    /// Marker code the encoder writes for a kind.
    ///
    /// `Other` has no code of its own and returns 0.
    #[must_use]
    pub fn code_for(&self, kind: MarkerKind) -> u8 {
        match kind {
            MarkerKind::LineStart => Self::mask(self.line_start),
            MarkerKind::LineStop => Self::mask(self.line_stop),
            MarkerKind::Frame => Self::mask(self.frame),
            MarkerKind::Other => 0,
        }
    }

    /// Classifies a raw marker code.
    ///
    /// Line start wins over line stop, which wins over frame, when a code
    /// carries several bits.
    #[must_use]
    pub fn classify(&self, code: u8) -> MarkerKind {
        if code & Self::mask(self.line_start) != 0 {
            MarkerKind::LineStart
        } else if code & Self::mask(self.line_stop) != 0 {
            MarkerKind::LineStop
        } else if code & Self::mask(self.frame) != 0 {
            MarkerKind::Frame
        } else {
            MarkerKind::Other
        }
    }

    /// True when all three channels are distinct and addressable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let masks = [
            Self::mask(self.line_start),
            Self::mask(self.line_stop),
            Self::mask(self.frame),
        ];
        masks.iter().all(|&m| m != 0)
            && masks[0] != masks[1]
            && masks[0] != masks[2]
            && masks[1] != masks[2]
    }
}

/// A decoded photon or marker.
///
/// `global_sync` is `ofltime + nsync` at the time of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Event {
    /// Photon detection.
    Photon {
        /// Detector channel (1-based).
        channel: u8,
        /// Arrival time bin within the sync period.
        dtime: u16,
        /// Absolute sync count.
        global_sync: u64,
    },
    /// Line/frame marker.
    Marker {
        /// Marker classification under the file's layout.
        kind: MarkerKind,
        /// Raw 4-bit marker code.
        code: u8,
        /// Absolute sync count.
        global_sync: u64,
    },
}

impl Event {
    /// Absolute sync count of the event.
    #[inline]
    #[must_use]
    pub fn global_sync(&self) -> u64 {
        match self {
            Event::Photon { global_sync, .. } | Event::Marker { global_sync, .. } => *global_sync,
        }
    }

    /// Returns true if this is a photon.
    #[must_use]
    pub fn is_photon(&self) -> bool {
        matches!(self, Event::Photon { .. })
    }

    /// Marker kind, if this is a marker.
    #[must_use]
    pub fn marker_kind(&self) -> Option<MarkerKind> {
        match self {
            Event::Marker { kind, .. } => Some(*kind),
            Event::Photon { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_masks() {
        assert_eq!(MarkerLayout::mask(1), 1);
        assert_eq!(MarkerLayout::mask(3), 4);
        assert_eq!(MarkerLayout::mask(4), 8);
        assert_eq!(MarkerLayout::mask(0), 0);
        assert_eq!(MarkerLayout::mask(5), 0);
    }

    #[test]
    fn test_default_layout_codes() {
        let layout = MarkerLayout::default();
        assert_eq!(layout.code_for(MarkerKind::LineStart), 1);
        assert_eq!(layout.code_for(MarkerKind::LineStop), 2);
        // ImgHdr_Frame = 3 is written as marker bit 4
        assert_eq!(layout.code_for(MarkerKind::Frame), 4);
    }

    #[test]
    fn test_classify() {
        let layout = MarkerLayout::default();
        assert_eq!(layout.classify(1), MarkerKind::LineStart);
        assert_eq!(layout.classify(2), MarkerKind::LineStop);
        assert_eq!(layout.classify(4), MarkerKind::Frame);
        assert_eq!(layout.classify(8), MarkerKind::Other);
        assert_eq!(layout.classify(3), MarkerKind::LineStart);
    }

    #[test]
    fn test_layout_validity() {
        assert!(MarkerLayout::default().is_valid());
        assert!(!MarkerLayout::new(1, 1, 3).is_valid());
        assert!(!MarkerLayout::new(1, 2, 7).is_valid());
    }

    #[test]
    fn test_event_accessors() {
        let photon = Event::Photon {
            channel: 1,
            dtime: 7,
            global_sync: 42,
        };
        let marker = Event::Marker {
            kind: MarkerKind::Frame,
            code: 4,
            global_sync: 43,
        };
        assert!(photon.is_photon());
        assert_eq!(photon.global_sync(), 42);
        assert_eq!(marker.marker_kind(), Some(MarkerKind::Frame));
        assert_eq!(photon.marker_kind(), None);
    }
}
