//! Record decoders for the supported T3 layouts.

use picotttr_core::{
    Event, MarkerLayout, OverflowState, RecordFormat, T3_WRAPAROUND, WRAPAROUND,
};

/// Decodes one raw record of a fixed layout.
///
/// The decoder is picked once per file; the overflow state is owned by the
/// pass and threaded through every call in record order.
pub trait RecordDecoder {
    /// Layout this decoder reads.
    fn format(&self) -> RecordFormat;

    /// Decodes `raw`, updating `state` for overflow records.
    ///
    /// Returns `None` for records that carry no event.
    fn decode(&self, raw: u32, state: &mut OverflowState) -> Option<Event>;
}

/// PicoHarp T3: 16-bit nsync, 12-bit dtime, 4-bit channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct PicoHarpT3 {
    markers: MarkerLayout,
}

impl PicoHarpT3 {
    /// Creates a decoder classifying markers with `markers`.
    #[must_use]
    pub fn new(markers: MarkerLayout) -> Self {
        Self { markers }
    }
}

impl RecordDecoder for PicoHarpT3 {
    fn format(&self) -> RecordFormat {
        RecordFormat::PicoHarpT3
    }

    #[allow(clippy::cast_possible_truncation)]
    fn decode(&self, raw: u32, state: &mut OverflowState) -> Option<Event> {
        let nsync = u64::from(raw & 0xFFFF);
        let dtime = ((raw >> 16) & 0xFFF) as u16;
        let channel = ((raw >> 28) & 0xF) as u8;

        if channel == 15 {
            let marker = ((raw >> 16) & 0xF) as u8;
            if marker == 0 || dtime == 0 {
                state.add_wraparounds(WRAPAROUND, 1);
                return None;
            }
            return Some(Event::Marker {
                kind: self.markers.classify(marker),
                code: marker,
                global_sync: state.global_sync(nsync),
            });
        }

        Some(Event::Photon {
            channel,
            dtime,
            global_sync: state.global_sync(nsync),
        })
    }
}

/// HydraHarp T3: 10-bit nsync, 15-bit dtime, 6-bit channel, special bit.
///
/// v1 overflow records always count one wraparound; v2 records carry the
/// count in the nsync field.
#[derive(Debug, Clone, Copy, Default)]
pub struct HydraHarpT3 {
    markers: MarkerLayout,
    v2: bool,
}

impl HydraHarpT3 {
    /// Record format version 1.
    #[must_use]
    pub fn v1(markers: MarkerLayout) -> Self {
        Self { markers, v2: false }
    }

    /// Record format version 2.
    #[must_use]
    pub fn v2(markers: MarkerLayout) -> Self {
        Self { markers, v2: true }
    }
}

impl RecordDecoder for HydraHarpT3 {
    fn format(&self) -> RecordFormat {
        if self.v2 {
            RecordFormat::HydraHarpT3V2
        } else {
            RecordFormat::HydraHarpT3V1
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn decode(&self, raw: u32, state: &mut OverflowState) -> Option<Event> {
        let nsync = u64::from(raw & 0x3FF);
        let dtime = ((raw >> 10) & 0x7FFF) as u16;
        let channel = ((raw >> 25) & 0x3F) as u8;
        let special = raw >> 31 == 1;

        if !special {
            return Some(Event::Photon {
                channel: channel + 1,
                dtime,
                global_sync: state.global_sync(nsync),
            });
        }

        match channel {
            63 => {
                let count = if self.v2 { nsync.max(1) } else { 1 };
                state.add_wraparounds(T3_WRAPAROUND, count);
                None
            }
            1..=15 => Some(Event::Marker {
                kind: self.markers.classify(channel),
                code: channel,
                global_sync: state.global_sync(nsync),
            }),
            // reserved sync records
            _ => None,
        }
    }
}

/// Boxed decoder for a record format.
#[must_use]
pub fn decoder_for(format: RecordFormat, markers: MarkerLayout) -> Box<dyn RecordDecoder> {
    match format {
        RecordFormat::PicoHarpT3 => Box::new(PicoHarpT3::new(markers)),
        RecordFormat::HydraHarpT3V1 => Box::new(HydraHarpT3::v1(markers)),
        RecordFormat::HydraHarpT3V2 => Box::new(HydraHarpT3::v2(markers)),
    }
}

/// Decodes one record with the default marker layout.
pub fn decode_record(raw: u32, format: RecordFormat, state: &mut OverflowState) -> Option<Event> {
    let markers = MarkerLayout::default();
    match format {
        RecordFormat::PicoHarpT3 => PicoHarpT3::new(markers).decode(raw, state),
        RecordFormat::HydraHarpT3V1 => HydraHarpT3::v1(markers).decode(raw, state),
        RecordFormat::HydraHarpT3V2 => HydraHarpT3::v2(markers).decode(raw, state),
    }
}
