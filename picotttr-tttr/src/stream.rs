//! Lazy event stream over a record buffer.

use crate::decoder::{decoder_for, RecordDecoder};
use picotttr_core::{Error, Event, MarkerLayout, OverflowState, RecordFormat, Result, RECORD_SIZE};
use std::iter::FusedIterator;

/// Forward-only iterator of decoded events.
///
/// Stops at the end of the buffer or after `limit` records, whichever comes
/// first. A trailing partial record yields [`Error::TruncatedStream`] and an
/// event earlier than its predecessor yields [`Error::TimeRegression`]; the
/// stream ends after either.
pub struct EventStream<'a> {
    data: &'a [u8],
    pos: usize,
    decoder: Option<Box<dyn RecordDecoder>>,
    state: OverflowState,
    limit: Option<u64>,
    records_read: u64,
    last_sync: u64,
    done: bool,
}

impl<'a> EventStream<'a> {
    /// Creates a stream with an explicit decoder.
    #[must_use]
    pub fn new(data: &'a [u8], decoder: Box<dyn RecordDecoder>, limit: Option<u64>) -> Self {
        Self {
            data,
            pos: 0,
            decoder: Some(decoder),
            state: OverflowState::new(),
            limit,
            records_read: 0,
            last_sync: 0,
            done: false,
        }
    }

    /// Creates a stream for a record format.
    #[must_use]
    pub fn for_format(
        data: &'a [u8],
        format: RecordFormat,
        markers: MarkerLayout,
        limit: Option<u64>,
    ) -> Self {
        Self::new(data, decoder_for(format, markers), limit)
    }

    /// A stream that yields nothing, used for recognised but undecoded
    /// files.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data: &[],
            pos: 0,
            decoder: None,
            state: OverflowState::new(),
            limit: Some(0),
            records_read: 0,
            last_sync: 0,
            done: true,
        }
    }

    /// Records consumed so far, including overflow records.
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Overflow accumulated so far.
    #[must_use]
    pub fn overflow_state(&self) -> OverflowState {
        self.state
    }

    fn fail(&mut self, err: Error) -> Option<Result<Event>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for EventStream<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if self.limit.is_some_and(|limit| self.records_read >= limit) {
                self.done = true;
                return None;
            }
            let remaining = self.data.len() - self.pos;
            if remaining == 0 {
                self.done = true;
                return None;
            }
            if remaining < RECORD_SIZE {
                return self.fail(Error::truncated("record", RECORD_SIZE, remaining));
            }

            let mut word = [0u8; RECORD_SIZE];
            word.copy_from_slice(&self.data[self.pos..self.pos + RECORD_SIZE]);
            self.pos += RECORD_SIZE;
            self.records_read += 1;

            let decoder = self.decoder.as_ref()?;
            let Some(event) = decoder.decode(u32::from_le_bytes(word), &mut self.state) else {
                continue;
            };
            let sync = event.global_sync();
            if sync < self.last_sync {
                log::debug!(
                    "record {} goes back in time: {sync} < {}",
                    self.records_read - 1,
                    self.last_sync
                );
                return self.fail(Error::TimeRegression {
                    current: self.last_sync,
                    target: sync,
                });
            }
            self.last_sync = sync;
            return Some(Ok(event));
        }
    }
}

impl FusedIterator for EventStream<'_> {}
