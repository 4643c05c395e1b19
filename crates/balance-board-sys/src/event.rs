//! Per-channel events as reported by the kernel input driver.
//!
//! On Linux the board shows up as an event device which sends one absolute
//! axis event per sensor instead of a full report.

use crate::{Channel, Unit};
use num::FromPrimitive;

/// End of one device frame.
pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;

#[derive(Debug, Copy, Clone, Eq, PartialEq, FromPrimitive)]
pub enum EventCode {
    AbsHat0X = 0x10,
    AbsHat0Y = 0x11,
    AbsHat1X = 0x12,
    AbsHat1Y = 0x13,
    BtnA = 0x130,
}

impl EventCode {
    pub fn channel(self) -> Option<Channel> {
        match self {
            EventCode::AbsHat1X => Some(Channel::TopLeft),
            EventCode::AbsHat0X => Some(Channel::TopRight),
            EventCode::AbsHat1Y => Some(Channel::BottomLeft),
            EventCode::AbsHat0Y => Some(Channel::BottomRight),
            EventCode::BtnA => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BoardEvent {
    /// New load on one sensor, already converted to the requested unit.
    Pressure(Channel, f64),
    Button(bool),
}

impl BoardEvent {
    /// Decode a raw `(type, code, value)` input event.
    ///
    /// Events unrelated to the board (sync, unknown codes) give `None`.
    pub fn decode(kind: u16, code: u16, value: i32, unit: Unit) -> Option<BoardEvent> {
        let code = EventCode::from_u16(code)?;
        match (kind, code.channel()) {
            (EV_ABS, Some(channel)) => {
                let kg = f64::from(value) / crate::input::COUNTS_PER_KILOGRAM;
                Some(BoardEvent::Pressure(channel, unit.from_kilograms(kg)))
            }
            (EV_KEY, None) => Some(BoardEvent::Button(value != 0)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[test]
fn decode_events() {
    assert_eq!(
        BoardEvent::decode(EV_ABS, 0x12, 2550, Unit::Kilograms),
        Some(BoardEvent::Pressure(Channel::TopLeft, 25.5))
    );
    assert_eq!(
        BoardEvent::decode(EV_ABS, 0x11, 100, Unit::Kilograms),
        Some(BoardEvent::Pressure(Channel::BottomRight, 1.))
    );
    assert_eq!(
        BoardEvent::decode(EV_KEY, 0x130, 1, Unit::Kilograms),
        Some(BoardEvent::Button(true))
    );
    assert_eq!(BoardEvent::decode(EV_KEY, 0x12, 1, Unit::Kilograms), None);
    assert_eq!(BoardEvent::decode(0, 0, 0, Unit::Kilograms), None);
}
