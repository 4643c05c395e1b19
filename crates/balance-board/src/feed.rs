//! Publication of the latest sample from the reader thread.
//!
//! The reader replaces a whole [`Snapshot`] at once and consumers copy it
//! out, so a consumer never observes a half-updated set of channels.

use crate::{calibration::Sampler, Result};
use anyhow::anyhow;
use balance_board_sys::{
    event::{BoardEvent, EV_SYN},
    RawSample, Unit,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

/// Immutable view of the board at one point in time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Snapshot {
    pub sample: RawSample,
    pub button: bool,
    /// Increases by one for every published snapshot.
    pub sequence: u64,
}

#[derive(Default)]
struct Shared {
    latest: Mutex<Option<Snapshot>>,
    updated: Condvar,
    closed: AtomicBool,
}

/// Single-producer, many-consumer "latest value" cell.
#[derive(Clone, Default)]
pub struct SampleFeed {
    shared: Arc<Shared>,
}

impl SampleFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Snapshot>> {
        // A snapshot is replaced in one assignment, so a poisoned value is
        // still whole.
        self.shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, sample: RawSample, button: bool) -> Snapshot {
        let mut latest = self.lock();
        let snapshot = Snapshot {
            sample,
            button,
            sequence: (*latest).map_or(0, |s| s.sequence + 1),
        };
        *latest = Some(snapshot);
        self.shared.updated.notify_all();
        snapshot
    }

    /// Latest snapshot, without waiting.
    pub fn latest(&self) -> Option<Snapshot> {
        *self.lock()
    }

    /// Waits up to `timeout` for a snapshot newer than `after`.
    pub fn wait_newer(&self, after: Option<u64>, timeout: Duration) -> Option<Snapshot> {
        let guard = self.lock();
        let (guard, _) = self
            .shared
            .updated
            .wait_timeout_while(guard, timeout, |latest| {
                !self.is_closed() && !is_newer(latest, after)
            })
            .unwrap_or_else(PoisonError::into_inner);
        match *guard {
            Some(snapshot) if is_newer(&Some(snapshot), after) => Some(snapshot),
            _ => None,
        }
    }

    /// Marks the producer as gone and wakes up waiting consumers.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let _guard = self.lock();
        self.shared.updated.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

fn is_newer(latest: &Option<Snapshot>, after: Option<u64>) -> bool {
    match (latest, after) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(s), Some(seq)) => s.sequence > seq,
    }
}

const SAMPLER_WAIT: Duration = Duration::from_millis(500);

/// Calibration reads whatever the board reports at the time of the call,
/// waiting only for the very first snapshot.
///
/// Fails as soon as the feed is closed, even if a sample was published.
impl Sampler for SampleFeed {
    fn sample(&mut self) -> Result<RawSample> {
        loop {
            if self.is_closed() {
                return Err(anyhow!("sample feed closed during calibration").into());
            }
            if let Some(snapshot) = self.latest() {
                return Ok(snapshot.sample);
            }
            self.wait_newer(None, SAMPLER_WAIT);
        }
    }
}

/// Builds complete snapshots from per-channel events.
#[derive(Debug, Default)]
pub struct ChannelAssembler {
    sample: RawSample,
    button: bool,
    pending: bool,
}

impl ChannelAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `event` into the current state without publishing it.
    pub fn fold(&mut self, event: BoardEvent) -> Result<()> {
        match event {
            BoardEvent::Pressure(channel, value) => {
                self.sample = self.sample.with(channel, value)?;
            }
            BoardEvent::Button(pressed) => self.button = pressed,
        }
        self.pending = true;
        Ok(())
    }

    /// Folds `event` into the current state and publishes the result.
    pub fn apply(&mut self, event: BoardEvent, feed: &SampleFeed) -> Result<Snapshot> {
        self.fold(event)?;
        self.pending = false;
        Ok(feed.publish(self.sample, self.button))
    }

    /// Publishes the folded changes, if any.
    pub fn flush(&mut self, feed: &SampleFeed) -> Option<Snapshot> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some(feed.publish(self.sample, self.button))
    }

    /// Handles one raw `(type, code, value)` input event.
    ///
    /// Channel and button events are folded, the end-of-frame marker
    /// publishes them as one snapshot and everything else is ignored.
    pub fn handle_raw(
        &mut self,
        kind: u16,
        code: u16,
        value: i32,
        unit: Unit,
        feed: &SampleFeed,
    ) -> Result<Option<Snapshot>> {
        if kind == EV_SYN {
            return Ok(self.flush(feed));
        }
        if let Some(event) = BoardEvent::decode(kind, code, value, unit) {
            self.fold(event)?;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balance_board_sys::{
        event::{EV_ABS, EV_KEY},
        Channel,
    };
    use std::thread;

    #[test]
    fn publish_increments_sequence() {
        let feed = SampleFeed::new();
        assert_eq!(feed.latest(), None);
        let first = feed.publish(RawSample::zero(), false);
        let second = feed.publish(RawSample::new([1., 2., 3., 4.]).unwrap(), true);
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(feed.latest(), Some(second));
    }

    #[test]
    fn wait_newer_times_out() {
        let feed = SampleFeed::new();
        let s = feed.publish(RawSample::zero(), false);
        assert_eq!(
            feed.wait_newer(Some(s.sequence), Duration::from_millis(10)),
            None
        );
        assert_eq!(feed.wait_newer(None, Duration::from_millis(10)), Some(s));
    }

    #[test]
    fn sampler_waits_for_first_sample() {
        let mut feed = SampleFeed::new();
        let producer = feed.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.publish(RawSample::new([7.; 4]).unwrap(), false);
        });
        assert_eq!(feed.sample().unwrap().as_array(), [7.; 4]);
        handle.join().unwrap();
    }

    #[test]
    fn sampler_fails_on_closed_empty_feed() {
        let mut feed = SampleFeed::new();
        feed.close();
        assert!(feed.sample().is_err());
    }

    #[test]
    fn sampler_fails_once_feed_closed() {
        let mut feed = SampleFeed::new();
        feed.publish(RawSample::new([100.; 4]).unwrap(), false);
        assert!(feed.sample().is_ok());
        feed.close();
        assert!(feed.sample().is_err());
    }

    #[test]
    fn assembler_publishes_whole_samples() {
        let feed = SampleFeed::new();
        let mut assembler = ChannelAssembler::new();
        assembler
            .apply(BoardEvent::Pressure(Channel::TopLeft, 10.), &feed)
            .unwrap();
        let s = assembler
            .apply(BoardEvent::Pressure(Channel::BottomRight, 30.), &feed)
            .unwrap();
        assert_eq!(s.sample.as_array(), [10., 0., 0., 30.]);
        let s = assembler.apply(BoardEvent::Button(true), &feed).unwrap();
        assert!(s.button);
        assert_eq!(s.sequence, 2);
        assert!(assembler
            .apply(BoardEvent::Pressure(Channel::TopRight, f64::NAN), &feed)
            .is_err());
        assert_eq!(feed.latest(), Some(s));
    }

    #[test]
    fn raw_events_publish_once_per_frame() {
        let feed = SampleFeed::new();
        let mut assembler = ChannelAssembler::new();
        let frame = [
            (EV_ABS, 0x12, 1000),
            (EV_ABS, 0x10, 2000),
            (EV_ABS, 0x13, 3000),
            (EV_ABS, 0x11, 4000),
            (EV_KEY, 0x130, 1),
        ];
        for &(kind, code, value) in frame.iter() {
            let published = assembler
                .handle_raw(kind, code, value, Unit::Kilograms, &feed)
                .unwrap();
            assert_eq!(published, None);
        }
        assert_eq!(feed.latest(), None);

        let s = assembler
            .handle_raw(EV_SYN, 0, 0, Unit::Kilograms, &feed)
            .unwrap()
            .unwrap();
        assert_eq!(s.sample.as_array(), [10., 20., 30., 40.]);
        assert!(s.button);
        assert_eq!(s.sequence, 0);

        // A frame with no board event publishes nothing.
        assert_eq!(
            assembler
                .handle_raw(EV_SYN, 0, 0, Unit::Kilograms, &feed)
                .unwrap(),
            None
        );
        assembler
            .handle_raw(EV_KEY, 0x130, 0, Unit::Kilograms, &feed)
            .unwrap();
        assert_eq!(assembler.flush(&feed).map(|s| s.button), Some(false));
        assert_eq!(feed.latest().map(|s| s.sequence), Some(1));
    }
}
