#![allow(clippy::cast_possible_truncation, clippy::unreadable_literal)]
use picotttr_core::{
    CountCuboid, Error, Event, MarkerKind, MarkerLayout, OverflowState, PixelCounts,
    RecordFormat, Result, ScanGeometry,
};
use picotttr_tttr::record::{hydraharp, picoharp};
use picotttr_tttr::{decode_record, EventStream, ScanEncoder};

// Rebuilds a count image from decoded events using the line markers and the
// known pixel slot width.
fn rebuild(events: &[Event], width: u32, height: u32, bins: usize, slot: u64) -> CountCuboid {
    let mut counts = CountCuboid::new(width, height, bins);
    let mut line: Option<(u32, u64)> = None;
    let mut lines = 0;
    for event in events {
        match *event {
            Event::Marker {
                kind: MarkerKind::LineStart,
                global_sync,
                ..
            } => {
                line = Some((lines, global_sync));
                lines += 1;
            }
            Event::Marker {
                kind: MarkerKind::LineStop,
                ..
            } => line = None,
            Event::Photon {
                dtime, global_sync, ..
            } => {
                let (y, origin) = line.expect("photon outside a line");
                let x = ((global_sync - origin - 1) / slot) as u32;
                counts.increment(x, y, usize::from(dtime));
            }
            Event::Marker { .. } => {}
        }
    }
    counts
}

fn encode(counts: &CountCuboid) -> (Vec<u8>, ScanGeometry) {
    let mut out = Vec::new();
    let summary = ScanEncoder::new().encode(counts, &mut out).unwrap();
    (out, summary.geometry.unwrap())
}

fn decode_all(data: &[u8]) -> Vec<Event> {
    EventStream::for_format(data, RecordFormat::PicoHarpT3, MarkerLayout::default(), None)
        .collect::<Result<_>>()
        .unwrap()
}

#[test]
fn test_two_by_one_end_to_end() {
    let mut counts = CountCuboid::new(2, 1, 3);
    counts.set(0, 0, 0, 2);
    counts.set(0, 0, 2, 1);
    counts.set(1, 0, 1, 1);

    let (data, geometry) = encode(&counts);
    assert_eq!(geometry.max_count_per_pixel, 3);
    assert_eq!(geometry.sync_count_per_line(), 10);

    let events = decode_all(&data);
    let mut photons: Vec<(u8, u16)> = events
        .iter()
        .filter_map(|e| match *e {
            Event::Photon { channel, dtime, .. } => Some((channel, dtime)),
            Event::Marker { .. } => None,
        })
        .collect();
    photons.sort_unstable();
    assert_eq!(photons, [(1, 0), (1, 0), (1, 1), (1, 2)]);

    let kinds: Vec<MarkerKind> = events.iter().filter_map(Event::marker_kind).collect();
    assert_eq!(
        kinds,
        [MarkerKind::LineStart, MarkerKind::LineStop, MarkerKind::Frame]
    );
}

#[test]
fn test_round_trip_reproduces_counts() {
    let (width, height, bins) = (7, 5, 16);
    let mut counts = CountCuboid::new(width, height, bins);
    // deterministic, uneven fill with empty pixels and one hot pixel
    for y in 0..height {
        for x in 0..width {
            for bin in 0..bins {
                let value = (x * 31 + y * 17 + bin as u32 * 7) % 5;
                counts.set(x, y, bin, value);
            }
        }
    }
    for bin in 0..bins {
        counts.set(2, 3, bin, 0);
    }
    counts.set(6, 4, 15, 900);

    let (data, geometry) = encode(&counts);
    let events = decode_all(&data);
    assert!(events
        .windows(2)
        .all(|w| w[0].global_sync() <= w[1].global_sync()));

    let rebuilt = rebuild(&events, width, height, bins, geometry.pixel_slot_width());
    assert_eq!(rebuilt, counts);
    assert_eq!(
        (data.len() / 4) as u64,
        geometry.exact_record_count(counts.total_photons())
    );
}

#[test]
fn test_round_trip_across_many_wraparounds() {
    let (width, height) = (64, 40);
    let mut counts = CountCuboid::new(width, height, 2);
    counts.set(0, 0, 0, 3_000);
    counts.set(63, 39, 1, 1);
    counts.set(31, 20, 0, 5);

    let (data, geometry) = encode(&counts);
    assert!(geometry.frame_sync() > 100 * 65_536);

    let events = decode_all(&data);
    let frame = events.last().unwrap();
    assert_eq!(frame.marker_kind(), Some(MarkerKind::Frame));
    assert_eq!(frame.global_sync(), geometry.frame_sync() + 1);

    let rebuilt = rebuild(&events, width, height, 2, geometry.pixel_slot_width());
    assert_eq!(rebuilt, counts);
}

#[test]
fn test_injected_out_of_order_record() {
    let counts = CountCuboid::new(3, 2, 1);
    let (data, _) = encode(&counts);
    let mut records: Vec<u32> = data
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    // a photon at sync 2 right after the second LineStart at sync 6
    records.insert(3, picoharp::photon(2, 1, 0));
    let data: Vec<u8> = records.iter().flat_map(|r| r.to_le_bytes()).collect();

    let results: Vec<Result<Event>> =
        EventStream::for_format(&data, RecordFormat::PicoHarpT3, MarkerLayout::default(), None)
            .collect();
    assert!(matches!(
        results.last(),
        Some(Err(Error::TimeRegression { .. }))
    ));
}

#[test]
fn test_hydraharp_v1_v2_stream() {
    let records = [
        hydraharp::photon(10, 1, 100),
        hydraharp::overflow(5),
        hydraharp::marker(3, 1),
        hydraharp::photon(4, 2, 7),
    ];
    let data: Vec<u8> = records.iter().flat_map(|r| r.to_le_bytes()).collect();

    let syncs = |format: RecordFormat| {
        EventStream::for_format(&data, format, MarkerLayout::default(), None)
            .map(|e| e.unwrap().global_sync())
            .collect::<Vec<u64>>()
    };
    assert_eq!(syncs(RecordFormat::HydraHarpT3V1), [10, 1_027, 1_028]);
    assert_eq!(syncs(RecordFormat::HydraHarpT3V2), [10, 5_123, 5_124]);
}

#[test]
fn test_decode_record_free_function() {
    let mut state = OverflowState::new();
    for _ in 0..3 {
        assert!(decode_record(picoharp::overflow(), RecordFormat::PicoHarpT3, &mut state).is_none());
    }
    let event = decode_record(picoharp::photon(7, 1, 0), RecordFormat::PicoHarpT3, &mut state);
    assert_eq!(event.map(|e| e.global_sync()), Some(3 * 65_536 + 7));
}
