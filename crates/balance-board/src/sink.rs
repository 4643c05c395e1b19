use crate::{display::DisplayFrame, Result};
use tracing::debug;

/// Virtual joystick the axis values are sent to.
pub trait JoystickSink {
    fn emit(&mut self, x: i32, y: i32, button: bool) -> Result<()>;
}

/// Consumer of the per-frame weights, typically a visualization.
pub trait DisplaySink {
    fn show(&mut self, frame: &DisplayFrame) -> Result<()>;
}

/// Logs the joystick state instead of emitting it.
#[derive(Debug, Default)]
pub struct TracingSink {
    last: Option<(i32, i32, bool)>,
}

impl TracingSink {
    pub fn last(&self) -> Option<(i32, i32, bool)> {
        self.last
    }
}

impl JoystickSink for TracingSink {
    fn emit(&mut self, x: i32, y: i32, button: bool) -> Result<()> {
        debug!(x, y, button, "joystick");
        self.last = Some((x, y, button));
        Ok(())
    }
}
