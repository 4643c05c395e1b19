use crate::{
    axis::{AxisMapper, AxisValues},
    calibration::CalibrationModel,
    convert::{WeightConverter, WeightReading},
    display::DisplayFrame,
    feed::{SampleFeed, Snapshot},
    sink::{DisplaySink, JoystickSink},
    Result,
};
use balance_board_sys::Unit;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::sleep,
    time::{Duration, Instant},
};
use tracing::{info, instrument};

pub const DEFAULT_FRAME_RATE: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub reading: WeightReading,
    pub axes: AxisValues,
    pub button: bool,
}

/// Conversion of one snapshot into everything the sinks need.
#[derive(Debug, Clone)]
pub struct Pipeline {
    converter: WeightConverter,
    mapper: AxisMapper,
    unit: Unit,
}

impl Pipeline {
    pub fn new(model: CalibrationModel, mapper: AxisMapper, unit: Unit) -> Self {
        Pipeline {
            converter: WeightConverter::new(model),
            mapper,
            unit,
        }
    }

    pub fn model(&self) -> &CalibrationModel {
        self.converter.model()
    }

    pub fn process(&self, snapshot: &Snapshot) -> Output {
        let reading = self.converter.convert(&snapshot.sample);
        Output {
            axes: self.mapper.map(&reading),
            reading,
            button: snapshot.button,
        }
    }

    /// For feeds delivering untyped values; fails on anything but four
    /// finite values.
    pub fn process_values(&self, values: &[f64], button: bool) -> Result<Output> {
        let reading = self.converter.convert_values(values)?;
        Ok(Output {
            axes: self.mapper.map(&reading),
            reading,
            button,
        })
    }

    pub fn frame(&self, output: &Output) -> DisplayFrame {
        DisplayFrame::new(&output.reading, self.unit)
    }
}

/// Polls the feed at a fixed rate and forwards to the sinks until `stop` is
/// raised or the feed is closed.
///
/// The joystick only receives snapshots it has not seen yet; the display gets
/// a frame on every tick.
pub struct LiveLoop {
    feed: SampleFeed,
    pipeline: Pipeline,
    frame_interval: Duration,
    stop: Arc<AtomicBool>,
}

impl LiveLoop {
    pub fn new(feed: SampleFeed, pipeline: Pipeline, stop: Arc<AtomicBool>) -> Self {
        LiveLoop {
            feed,
            pipeline,
            frame_interval: Duration::from_secs(1) / DEFAULT_FRAME_RATE,
            stop,
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_interval = Duration::from_secs(1) / frame_rate.max(1);
        self
    }

    #[instrument(level = "info", skip_all, err)]
    pub fn run(
        &self,
        joystick: &mut dyn JoystickSink,
        mut display: Option<&mut dyn DisplaySink>,
    ) -> Result<()> {
        let mut last_sequence = None;
        while !self.stop.load(Ordering::SeqCst) {
            let tick = Instant::now();
            if let Some(snapshot) = self.feed.latest() {
                let output = self.pipeline.process(&snapshot);
                if last_sequence != Some(snapshot.sequence) {
                    joystick.emit(output.axes.x, output.axes.y, output.button)?;
                    last_sequence = Some(snapshot.sequence);
                }
                if let Some(display) = display.as_mut() {
                    display.show(&self.pipeline.frame(&output))?;
                }
            }
            if self.feed.is_closed() {
                info!("sample feed closed");
                break;
            }
            sleep(self.frame_interval.saturating_sub(tick.elapsed()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{axis::AxisRange, BoardError};
    use balance_board_sys::RawSample;

    #[derive(Default)]
    struct Recorder {
        emitted: Vec<(i32, i32, bool)>,
        frames: usize,
    }

    impl JoystickSink for Recorder {
        fn emit(&mut self, x: i32, y: i32, button: bool) -> Result<()> {
            self.emitted.push((x, y, button));
            Ok(())
        }
    }

    impl DisplaySink for Recorder {
        fn show(&mut self, _frame: &DisplayFrame) -> Result<()> {
            self.frames += 1;
            Ok(())
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(
            CalibrationModel::identity(),
            AxisMapper::new(AxisRange::U8),
            Unit::Kilograms,
        )
    }

    #[test]
    fn button_passes_through() {
        let feed = SampleFeed::new();
        let snapshot = feed.publish(RawSample::new([0., 0., 0., 100.]).unwrap(), true);
        let out = pipeline().process(&snapshot);
        assert_eq!(out.axes, AxisValues { x: 255, y: 0 });
        assert!(out.button);
        assert_eq!(out.reading.total(), 100.);
    }

    #[test]
    fn malformed_values_fail() {
        match pipeline().process_values(&[1., 2., 3.], false) {
            Err(BoardError::MalformedSample(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn runs_until_feed_closed() {
        let feed = SampleFeed::new();
        feed.publish(RawSample::new([10., 10., 10., 10.]).unwrap(), false);
        feed.close();
        let live = LiveLoop::new(feed, pipeline(), Arc::new(AtomicBool::new(false)))
            .with_frame_rate(1000);
        let mut joystick = Recorder::default();
        let mut display = Recorder::default();
        live.run(&mut joystick, Some(&mut display as &mut dyn DisplaySink))
            .unwrap();
        assert_eq!(joystick.emitted, vec![(128, 128, false)]);
        assert_eq!(display.frames, 1);
    }

    #[test]
    fn stop_flag_ends_loop() {
        let live = LiveLoop::new(
            SampleFeed::new(),
            pipeline(),
            Arc::new(AtomicBool::new(true)),
        );
        let mut joystick = Recorder::default();
        live.run(&mut joystick, None).unwrap();
        assert!(joystick.emitted.is_empty());
    }
}
