use balance_board::{balance_board_sys::Unit, AxisRange, BoardConfig, SamplingConfig};
use clap::{Args, Parser, Subcommand};
use std::{num::ParseIntError, time::Duration};

/// Turn a balance board into a joystick
///
/// Env variables:
///
/// - `RUST_LOG=<level>`:
///
///   -   `trace`: log every HID report
///
///   -   `debug`: log calibration samples and joystick output
///
/// - `LOG_PRETTY=1`: use a more verbose logging format
///
/// - `LOG_TIMING=1`: show timings
#[derive(Parser)]
pub struct Opts {
    #[clap(subcommand)]
    pub subcmd: SubCommand,
    #[clap(flatten)]
    pub board: BoardOpts,
}

#[derive(Subcommand)]
pub enum SubCommand {
    /// List the connected boards
    List,
    /// Calibrate the board and print the resulting parameters
    ///
    /// Nothing is stored, the parameters only live as long as the process.
    Calibrate(CalibrationOpts),
    /// Show live weights and centre of pressure
    Monitor(Monitor),
    /// Compute joystick axes from the centre of pressure
    ///
    /// No virtual device is created: the axis values and button state are
    /// logged at the `debug` level (`RUST_LOG=debug`).
    Joystick(Joystick),
}

#[derive(Args)]
pub struct BoardOpts {
    /// USB vendor id of the board, in hex
    #[clap(long, global = true, default_value = "1234", parse(try_from_str = parse_hex))]
    pub vendor_id: u16,
    /// USB product id of the board, in hex
    #[clap(long, global = true, default_value = "bead", parse(try_from_str = parse_hex))]
    pub product_id: u16,
    /// Unit of the values reported by the board (`kg` or `lbs`)
    #[clap(long, global = true, default_value = "kg")]
    pub unit: Unit,
    /// Total below which the board is considered empty
    #[clap(long, global = true, default_value = "3.0")]
    pub noise_floor: f64,
    /// Read the kernel event device instead of the raw HID reports (Linux)
    ///
    /// This is the only source reporting the front button.
    #[clap(long, global = true)]
    pub evdev: bool,
    /// Name of the event device to look for with `--evdev`
    #[clap(
        long,
        global = true,
        default_value = "Nintendo Wii Remote Balance Board"
    )]
    pub evdev_name: String,
}

impl BoardOpts {
    pub fn config(&self) -> BoardConfig {
        BoardConfig {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            unit: self.unit,
            noise_floor: self.noise_floor,
            evdev_name: self.evdev_name.clone(),
            ..BoardConfig::default()
        }
    }
}

#[derive(Args)]
pub struct CalibrationOpts {
    /// Number of samples averaged for each load
    #[clap(long, default_value = "30")]
    pub samples: usize,
    /// Delay between two samples, in milliseconds
    #[clap(long, default_value = "100")]
    pub interval_ms: u64,
    /// Calibrate with two known weights instead of one
    #[clap(long)]
    pub three_point: bool,
}

impl CalibrationOpts {
    pub fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            count: self.samples,
            interval: Duration::from_millis(self.interval_ms),
        }
    }
}

#[derive(Args)]
pub struct Monitor {
    /// Calibrate before showing weights, otherwise the board values are
    /// shown as reported
    #[clap(long)]
    pub calibrate: bool,
    #[clap(flatten)]
    pub calibration: CalibrationOpts,
    /// Refresh rate of the display
    #[clap(long, default_value = "30")]
    pub fps: u32,
}

#[derive(Args)]
pub struct Joystick {
    #[clap(flatten)]
    pub monitor: Monitor,
    /// Axis range as `MIN:MAX`, or `MAX` for a range starting at 0
    #[clap(long, default_value = "0:255")]
    pub range: AxisRange,
    /// Total weight under which the axes stay centred
    #[clap(long, default_value = "5.0")]
    pub guard: f64,
    /// Make leaning toward the top of the board lower the Y axis
    #[clap(long)]
    pub invert_y: bool,
    /// Also print the weights
    #[clap(long)]
    pub show: bool,
}

fn parse_hex(input: &str) -> Result<u16, ParseIntError> {
    u16::from_str_radix(input.trim_start_matches("0x"), 16)
}
