mod opts;
mod terminal;

use anyhow::{Context, Result};
use balance_board::{
    balance_board_sys::Channel,
    hidapi::HidApi,
    scan_for_boards,
    sink::{DisplaySink, TracingSink},
    AxisMapper, BoardConfig, BoardReader, CalibrationModel, CalibrationProcedure,
    ChannelCalibration, LiveLoop, Pipeline, SampleFeed,
};
use clap::Parser;
use opts::*;
use std::{
    env,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use terminal::{Console, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_logging();
    let opts = Opts::parse();
    let config = opts.board.config();
    match opts.subcmd {
        SubCommand::List => list(&config),
        SubCommand::Calibrate(ref calibration) => {
            let mut session = Session::start(&config, opts.board.evdev)?;
            let model = session.calibrate(calibration)?;
            print_model(&model);
            session.finish()
        }
        SubCommand::Monitor(ref monitor) => {
            let mut session = Session::start(&config, opts.board.evdev)?;
            let model = session.model(monitor)?;
            let pipeline = Pipeline::new(model, AxisMapper::default(), config.unit);
            session.run(pipeline, monitor.fps, true)
        }
        SubCommand::Joystick(ref joystick) => {
            let mut session = Session::start(&config, opts.board.evdev)?;
            let model = session.model(&joystick.monitor)?;
            let mapper = AxisMapper::new(joystick.range)
                .with_guard_threshold(joystick.guard)
                .with_inverted_y(joystick.invert_y);
            let pipeline = Pipeline::new(model, mapper, config.unit);
            session.run(pipeline, joystick.monitor.fps, joystick.show)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let pretty = env::var("LOG_PRETTY").map_or(false, |v| v == "1");
    let timing = env::var("LOG_TIMING").map_or(false, |v| v == "1");
    match (pretty, timing) {
        (true, true) => builder.pretty().init(),
        (true, false) => builder.pretty().without_time().init(),
        (false, true) => builder.init(),
        (false, false) => builder.without_time().init(),
    }
}

fn list(config: &BoardConfig) -> Result<()> {
    let api = HidApi::new()?;
    let boards = scan_for_boards(&api, config);
    if boards.is_empty() {
        println!("No board found");
    }
    for device_info in boards {
        println!(
            "{:04x}:{:04x} {} {}",
            device_info.vendor_id(),
            device_info.product_id(),
            device_info.product_string().unwrap_or("<unnamed>"),
            device_info.path().to_string_lossy(),
        );
    }
    Ok(())
}

fn print_model(model: &CalibrationModel) {
    for channel in Channel::ALL {
        match model.get(channel) {
            ChannelCalibration::Unset => println!("{}: not calibrated", channel),
            ChannelCalibration::Linear { zero_offset, scale } => println!(
                "{}: zero offset {:.3}, scale {:.6}",
                channel, zero_offset, scale
            ),
            ChannelCalibration::PiecewiseLinear {
                zero,
                low,
                high,
                low_weight,
                high_weight,
            } => println!(
                "{}: zero {:.3}, {:.3} at {}, {:.3} at {}",
                channel, zero, low, low_weight, high, high_weight
            ),
        }
    }
    for channel in model.degenerate_channels() {
        println!("{}: no response to the load, will always read 0", channel);
    }
}

/// A board reader thread and the feed it fills.
struct Session {
    config: BoardConfig,
    feed: SampleFeed,
    reader: BoardReader,
    stop: Arc<AtomicBool>,
}

impl Session {
    fn start(config: &BoardConfig, evdev: bool) -> Result<Self> {
        let feed = SampleFeed::new();
        let stop = Arc::new(AtomicBool::new(false));
        let reader = if evdev {
            BoardReader::spawn_evdev(config.clone(), feed.clone(), stop.clone())?
        } else {
            BoardReader::spawn(config.clone(), feed.clone(), stop.clone())?
        };
        Ok(Session {
            config: config.clone(),
            feed,
            reader,
            stop,
        })
    }

    fn calibrate(&mut self, opts: &CalibrationOpts) -> Result<CalibrationModel> {
        let mut procedure = CalibrationProcedure::new(opts.sampling());
        let mut terminal = Terminal::new(self.config.unit);
        let model = if opts.three_point {
            procedure.run_three_point(&mut self.feed, &mut terminal)?
        } else {
            procedure.run_interactive(&mut self.feed, &mut terminal)?
        };
        Ok(model)
    }

    /// Calibrates if asked to, otherwise takes the board values as they are.
    fn model(&mut self, monitor: &Monitor) -> Result<CalibrationModel> {
        if monitor.calibrate {
            self.calibrate(&monitor.calibration)
        } else {
            Ok(CalibrationModel::identity())
        }
    }

    fn run(self, pipeline: Pipeline, fps: u32, show: bool) -> Result<()> {
        // Installed only now so that Ctrl-C still interrupts the calibration
        // prompts.
        let stop = self.stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("installing the Ctrl-C handler")?;
        info!("press Ctrl-C to stop");

        let live =
            LiveLoop::new(self.feed.clone(), pipeline, self.stop.clone()).with_frame_rate(fps);
        let mut joystick = TracingSink::default();
        let mut console = Console::default();
        let result = if show {
            live.run(&mut joystick, Some(&mut console as &mut dyn DisplaySink))
        } else {
            live.run(&mut joystick, None)
        };
        if show {
            println!();
        }
        self.finish()?;
        Ok(result?)
    }

    fn finish(self) -> Result<()> {
        Ok(self.reader.join()?)
    }
}
