//! Non-fatal conditions reported alongside decode results.

use crate::event::MarkerLayout;
use crate::format::RecordType;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A condition the caller should know about that does not stop decoding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Warning {
    /// The file is a T2-mode recording; it was recognised but no events are
    /// decoded from it.
    T2ModeSkipped(RecordType),
    /// An optional header tag was missing and a default was used.
    DefaultedTag {
        /// Tag name.
        name: String,
        /// Value used instead.
        value: i64,
    },
    /// Marker channels are duplicated or outside `1..=4`, so line and frame
    /// markers cannot all be told apart.
    InvalidMarkerLayout(MarkerLayout),
    /// The header declares more records than the file holds.
    RecordCountMismatch {
        /// `TTResult_NumberOfRecords` (or the PT3 `Records` field).
        declared: u64,
        /// Complete records present after the header.
        available: u64,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::T2ModeSkipped(record_type) => write!(
                f,
                "{} T2 mode is not decoded; no events will be produced",
                record_type.hardware()
            ),
            Warning::DefaultedTag { name, value } => {
                write!(f, "header tag {name} missing, using {value}")
            }
            Warning::InvalidMarkerLayout(markers) => write!(
                f,
                "marker channels {}/{}/{} are not distinct channels within 1..=4; \
                 markers may be classified as Other",
                markers.line_start, markers.line_stop, markers.frame
            ),
            Warning::RecordCountMismatch {
                declared,
                available,
            } => write!(
                f,
                "header declares {declared} records but only {available} are present"
            ),
        }
    }
}
