use crate::{feed::SampleFeed, BoardError, Result};
use anyhow::{anyhow, Context};
use balance_board_sys::{
    input::READ_BUFFER_LEN, InputReport, RawSample, Unit, BALANCE_BOARD_EVDEV_NAME,
    BALANCE_BOARD_PRODUCT_ID, BALANCE_BOARD_VENDOR_ID,
};
use hidapi::{DeviceInfo, HidApi, HidDevice};
use std::{
    convert::TryInto,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use tracing::{info, instrument, trace, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);
/// Whole-board total under which a report is treated as an empty board.
pub const DEFAULT_NOISE_FLOOR: f64 = 3.;

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Name of the kernel event device, when reading through evdev.
    pub evdev_name: String,
    /// Delay between two device scans while no board is connected.
    pub poll_interval: Duration,
    pub read_timeout: Duration,
    pub unit: Unit,
    pub noise_floor: f64,
}

impl BoardConfig {
    pub fn matches(&self, device_info: &DeviceInfo) -> bool {
        device_info.vendor_id() == self.vendor_id && device_info.product_id() == self.product_id
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            vendor_id: BALANCE_BOARD_VENDOR_ID,
            product_id: BALANCE_BOARD_PRODUCT_ID,
            evdev_name: BALANCE_BOARD_EVDEV_NAME.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
            unit: Unit::default(),
            noise_floor: DEFAULT_NOISE_FLOOR,
        }
    }
}

/// Zeroes `sample` when its total is below `noise_floor`.
pub fn apply_noise_floor(sample: RawSample, noise_floor: f64) -> RawSample {
    if sample.sum() < noise_floor {
        RawSample::zero()
    } else {
        sample
    }
}

pub struct BalanceBoard {
    device: HidDevice,
    unit: Unit,
    noise_floor: f64,
    read_timeout_ms: i32,
}

impl BalanceBoard {
    pub fn new(device: HidDevice, config: &BoardConfig) -> BalanceBoard {
        BalanceBoard {
            device,
            unit: config.unit,
            noise_floor: config.noise_floor,
            read_timeout_ms: config
                .read_timeout
                .as_millis()
                .try_into()
                .unwrap_or(i32::MAX),
        }
    }

    #[instrument(level = "info", skip(api, device_info), err)]
    pub fn open(api: &HidApi, device_info: &DeviceInfo, config: &BoardConfig) -> Result<Self> {
        let device = device_info.open_device(api)?;
        Ok(BalanceBoard::new(device, config))
    }

    /// Next sample, or `None` if the device sent nothing before the read
    /// timeout.
    #[instrument(level = "trace", skip(self))]
    pub fn recv(&mut self) -> Result<Option<RawSample>> {
        let mut buf = [0; READ_BUFFER_LEN];
        let nb_read = self.device.read_timeout(&mut buf, self.read_timeout_ms)?;
        if nb_read == 0 {
            return Ok(None);
        }
        trace!(in_report = %hex::encode(&buf[..nb_read]));
        let report = InputReport::from_bytes(&buf[..nb_read])?;
        Ok(Some(apply_noise_floor(
            report.weights(self.unit),
            self.noise_floor,
        )))
    }
}

/// Every connected device matching `config`.
pub fn scan_for_boards<'a>(api: &'a HidApi, config: &BoardConfig) -> Vec<&'a DeviceInfo> {
    api.device_list().filter(|d| config.matches(d)).collect()
}

/// Rescans every `config.poll_interval` until a board shows up.
///
/// Returns `None` if `stop` is raised first.
pub fn wait_for_board(
    api: &mut HidApi,
    config: &BoardConfig,
    stop: &AtomicBool,
) -> Result<Option<BalanceBoard>> {
    info!("waiting for a balance board");
    while !stop.load(Ordering::SeqCst) {
        api.refresh_devices()?;
        if let Some(device_info) = scan_for_boards(api, config).first() {
            let board = BalanceBoard::open(api, device_info, config)?;
            info!("balance board found");
            return Ok(Some(board));
        }
        thread::sleep(config.poll_interval);
    }
    Ok(None)
}

/// Background thread publishing every board report to a [`SampleFeed`].
///
/// The feed is closed when the thread ends, whatever the reason.
pub struct BoardReader {
    handle: JoinHandle<Result<()>>,
    stop: Arc<AtomicBool>,
}

impl BoardReader {
    /// Reads the raw HID reports.
    pub fn spawn(config: BoardConfig, feed: SampleFeed, stop: Arc<AtomicBool>) -> Result<Self> {
        let mut api = HidApi::new()?;
        Self::spawn_with("board-reader", feed, stop, move |feed, stop| {
            read_loop(&mut api, &config, feed, stop)
        })
    }

    /// Reads the per-channel events of the kernel driver.
    pub fn spawn_evdev(
        config: BoardConfig,
        feed: SampleFeed,
        stop: Arc<AtomicBool>,
    ) -> Result<Self> {
        Self::spawn_with("board-evdev-reader", feed, stop, move |feed, stop| {
            crate::event_device::read_loop(&config, feed, stop)
        })
    }

    fn spawn_with<F>(name: &str, feed: SampleFeed, stop: Arc<AtomicBool>, run: F) -> Result<Self>
    where
        F: FnOnce(&SampleFeed, &AtomicBool) -> Result<()> + Send + 'static,
    {
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let result = run(&feed, &thread_stop);
                if let Err(e) = &result {
                    warn!(%e, "board reader stopped");
                }
                feed.close();
                result
            })
            .context("spawning the board reader")?;
        Ok(BoardReader { handle, stop })
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Stops the thread and returns its error, if any.
    pub fn join(self) -> Result<()> {
        self.stop();
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(anyhow!("board reader panicked").into()),
        }
    }
}

fn read_loop(
    api: &mut HidApi,
    config: &BoardConfig,
    feed: &SampleFeed,
    stop: &AtomicBool,
) -> Result<()> {
    let mut board = match wait_for_board(api, config, stop)? {
        Some(board) => board,
        None => return Ok(()),
    };
    while !stop.load(Ordering::SeqCst) {
        match board.recv() {
            Ok(Some(sample)) => {
                feed.publish(sample, false);
            }
            Ok(None) => {}
            // A bad report does not mean the next one will be.
            Err(BoardError::MalformedSample(e)) => warn!(%e, "parse error"),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
