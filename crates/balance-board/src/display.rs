use crate::convert::{BalancePoint, WeightReading};
use balance_board_sys::{Channel, Unit};
use enum_map::EnumMap;
use std::fmt;

/// Distance kept between the centroid marker and the board edge.
const CENTROID_MARGIN: i32 = 20;

/// What a visualization needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    pub weights: EnumMap<Channel, f64>,
    pub total: f64,
    /// `None` on an empty board.
    pub balance: Option<BalancePoint>,
    pub unit: Unit,
}

impl DisplayFrame {
    pub fn new(reading: &WeightReading, unit: Unit) -> Self {
        DisplayFrame {
            weights: reading.weights().clone(),
            total: reading.total(),
            balance: if reading.total() > 0. {
                Some(reading.balance_point(0.))
            } else {
                None
            },
            unit,
        }
    }

    /// Shade of a channel relative to the most loaded one, in 0..=255.
    pub fn intensity(&self, channel: Channel) -> u8 {
        let max = self.weights.values().cloned().fold(1., f64::max);
        (255. * self.weights[channel] / max).max(0.).min(255.) as u8
    }

    /// Screen position of the centroid marker inside `rect`.
    ///
    /// Screen Y grows downwards, so a top-heavy balance point ends up above
    /// the centre.
    pub fn centroid_in(&self, rect: BoardRect) -> Option<(i32, i32)> {
        let balance = self.balance?;
        let (cx, cy) = rect.center();
        let half_w = f64::from(rect.width / 2 - CENTROID_MARGIN);
        let half_h = f64::from(rect.height / 2 - CENTROID_MARGIN);
        Some((
            cx + (half_w * balance.x) as i32,
            cy - (half_h * balance.y) as i32,
        ))
    }
}

impl fmt::Display for DisplayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (channel, weight) in self.weights.iter() {
            write!(f, "{} {:6.1} {} | ", channel, weight, self.unit)?;
        }
        write!(f, "total {:6.1} {}", self.total, self.unit)?;
        if let Some(b) = self.balance {
            write!(f, " | balance ({:+.2}, {:+.2})", b.x, b.y)?;
        }
        Ok(())
    }
}

/// Board outline in screen coordinates.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BoardRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl BoardRect {
    /// Board drawn in the middle half of a `width` x `height` window.
    pub fn centered_in(width: i32, height: i32) -> Self {
        BoardRect {
            left: width / 4,
            top: height / 4,
            width: width / 2,
            height: height / 2,
        }
    }

    pub fn center(&self) -> (i32, i32) {
        (self.left + self.width / 2, self.top + self.height / 2)
    }
}
