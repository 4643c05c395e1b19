//! Reading the board through the kernel input driver.
//!
//! Once paired, the Linux wiimote driver exposes the board as an event
//! device sending one absolute axis event per sensor plus the front button,
//! each frame closed by a sync event.

use crate::{feed::SampleFeed, hid::BoardConfig, Result};
use std::sync::atomic::AtomicBool;

#[cfg(target_os = "linux")]
pub use self::linux::*;

#[cfg(not(target_os = "linux"))]
pub fn read_loop(_config: &BoardConfig, _feed: &SampleFeed, _stop: &AtomicBool) -> Result<()> {
    Err(anyhow::anyhow!("event devices are only available on Linux").into())
}

#[cfg(target_os = "linux")]
mod linux {
    use super::*;
    use crate::{feed::ChannelAssembler, BoardError};
    use anyhow::Context;
    use evdev::Device;
    use std::{io, os::unix::io::AsRawFd, sync::atomic::Ordering, thread};
    use tracing::{info, instrument, trace, warn};

    /// Rescans the event devices every `config.poll_interval` until one
    /// named `config.evdev_name` shows up.
    ///
    /// The returned device is non-blocking. Returns `None` if `stop` is
    /// raised first.
    #[instrument(level = "info", skip_all, fields(name = %config.evdev_name), err)]
    pub fn wait_for_event_device(
        config: &BoardConfig,
        stop: &AtomicBool,
    ) -> Result<Option<Device>> {
        info!("waiting for a balance board event device");
        while !stop.load(Ordering::SeqCst) {
            let found = evdev::enumerate()
                .find(|(_, device)| device.name() == Some(config.evdev_name.as_str()));
            if let Some((path, device)) = found {
                set_nonblocking(&device).context("configuring the event device")?;
                info!(path = %path.display(), "balance board event device found");
                return Ok(Some(device));
            }
            thread::sleep(config.poll_interval);
        }
        Ok(None)
    }

    fn set_nonblocking(device: &Device) -> io::Result<()> {
        let fd = device.as_raw_fd();
        // SAFETY: `fd` belongs to `device`, which outlives both calls.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn read_loop(config: &BoardConfig, feed: &SampleFeed, stop: &AtomicBool) -> Result<()> {
        let mut device = match wait_for_event_device(config, stop)? {
            Some(device) => device,
            None => return Ok(()),
        };
        let mut assembler = ChannelAssembler::new();
        while !stop.load(Ordering::SeqCst) {
            match device.fetch_events() {
                Ok(events) => {
                    for event in events {
                        let (kind, code, value) =
                            (event.event_type().0, event.code(), event.value());
                        trace!(kind, code, value, "input event");
                        match assembler.handle_raw(kind, code, value, config.unit, feed) {
                            Ok(_) => {}
                            Err(BoardError::MalformedSample(e)) => warn!(%e, "parse error"),
                            Err(e) => return Err(e),
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(config.read_timeout)
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context("reading the event device")
                        .into())
                }
            }
            // In case the last frame was cut before its sync event.
            assembler.flush(feed);
        }
        Ok(())
    }
}
