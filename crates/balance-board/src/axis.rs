use crate::convert::{BalancePoint, WeightReading};
use std::{fmt, str::FromStr};

/// Total weight at or below which the axes stay centred.
pub const DEFAULT_GUARD_THRESHOLD: f64 = 5.;

/// Inclusive integer range of a virtual joystick axis.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AxisRange {
    min: i32,
    max: i32,
}

impl AxisRange {
    pub const U8: AxisRange = AxisRange { min: 0, max: 255 };
    pub const I16_POSITIVE: AxisRange = AxisRange { min: 0, max: 32767 };

    pub fn new(min: i32, max: i32) -> Option<AxisRange> {
        if min < max {
            Some(AxisRange { min, max })
        } else {
            None
        }
    }

    pub fn min(self) -> i32 {
        self.min
    }

    pub fn max(self) -> i32 {
        self.max
    }

    pub fn center(self) -> i32 {
        self.scale(0.)
    }

    /// Maps `norm` from [-1, 1] onto the range, 0 landing on the centre.
    pub fn scale(self, norm: f64) -> i32 {
        let norm = norm.max(-1.).min(1.);
        let span = f64::from(self.max) - f64::from(self.min);
        ((norm + 1.) * span / 2. + f64::from(self.min)).round() as i32
    }
}

impl Default for AxisRange {
    fn default() -> Self {
        AxisRange::U8
    }
}

impl fmt::Display for AxisRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.min, self.max)
    }
}

impl FromStr for AxisRange {
    type Err = String;

    /// Accepts `MIN:MAX` or a bare `MAX` (minimum 0).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<i32>()
                .map_err(|e| format!("invalid axis bound `{}`: {}", v, e))
        };
        let (min, max) = match s.split_once(':') {
            Some((min, max)) => (parse(min)?, parse(max)?),
            None => (0, parse(s)?),
        };
        AxisRange::new(min, max).ok_or_else(|| format!("empty axis range {}:{}", min, max))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AxisValues {
    pub x: i32,
    pub y: i32,
}

/// Turns weight readings into virtual joystick axis values.
///
/// The Y axis follows [`BalancePoint`]: leaning to the top of the board
/// raises it, unless `invert_y` is set.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AxisMapper {
    range: AxisRange,
    guard_threshold: f64,
    invert_y: bool,
}

impl AxisMapper {
    pub fn new(range: AxisRange) -> Self {
        AxisMapper {
            range,
            guard_threshold: DEFAULT_GUARD_THRESHOLD,
            invert_y: false,
        }
    }

    pub fn with_guard_threshold(mut self, guard_threshold: f64) -> Self {
        self.guard_threshold = guard_threshold;
        self
    }

    pub fn with_inverted_y(mut self, invert_y: bool) -> Self {
        self.invert_y = invert_y;
        self
    }

    pub fn range(&self) -> AxisRange {
        self.range
    }

    pub fn guard_threshold(&self) -> f64 {
        self.guard_threshold
    }

    /// Balance point in [-1, 1] as sent on the axes.
    pub fn normalized(&self, reading: &WeightReading) -> BalancePoint {
        let mut point = reading.balance_point(self.guard_threshold);
        if self.invert_y {
            point.y = -point.y;
        }
        point
    }

    pub fn map(&self, reading: &WeightReading) -> AxisValues {
        let point = self.normalized(reading);
        AxisValues {
            x: self.range.scale(point.x),
            y: self.range.scale(point.y),
        }
    }
}

impl Default for AxisMapper {
    fn default() -> Self {
        AxisMapper::new(AxisRange::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balance_board_sys::Channel;
    use enum_map::EnumMap;

    fn reading(w: [f64; 4]) -> WeightReading {
        WeightReading::new(EnumMap::from_array(w))
    }

    #[test]
    fn range_scaling() {
        let range = AxisRange::U8;
        assert_eq!(range.scale(-1.), 0);
        assert_eq!(range.scale(1.), 255);
        assert_eq!(range.center(), 128);
        assert_eq!(range.scale(7.), 255);
        let range = AxisRange::new(-100, 100).unwrap();
        assert_eq!(range.center(), 0);
        assert_eq!(range.scale(0.5), 50);
        assert_eq!(AxisRange::I16_POSITIVE.scale(1.), 32767);
        assert!(AxisRange::new(5, 5).is_none());
    }

    #[test]
    fn range_from_str() {
        assert_eq!("0:32767".parse::<AxisRange>(), Ok(AxisRange::I16_POSITIVE));
        assert_eq!("255".parse::<AxisRange>(), Ok(AxisRange::U8));
        assert_eq!("-10:10".parse::<AxisRange>(), Ok(AxisRange::new(-10, 10).unwrap()));
        assert!("10:0".parse::<AxisRange>().is_err());
        assert!("x".parse::<AxisRange>().is_err());
    }

    #[test]
    fn empty_board_is_centred() {
        let mapper = AxisMapper::default();
        let center = AxisValues { x: 128, y: 128 };
        assert_eq!(mapper.map(&reading([0.; 4])), center);
        // Below the guard the per-channel split does not matter.
        assert_eq!(mapper.map(&reading([0., 0., 0., 4.])), center);
        assert_eq!(mapper.map(&reading([5., 0., 0., 0.])), center);
    }

    #[test]
    fn bottom_right_extreme() {
        let r = reading([0., 0., 0., 100.]);
        assert_eq!(r.weight(Channel::BottomRight), 100.);
        let mapper = AxisMapper::default();
        assert_eq!(mapper.map(&r), AxisValues { x: 255, y: 0 });
        let inverted = mapper.with_inverted_y(true);
        assert_eq!(inverted.map(&r), AxisValues { x: 255, y: 255 });
        let wide = AxisMapper::new(AxisRange::I16_POSITIVE);
        assert_eq!(wide.map(&r), AxisValues { x: 32767, y: 0 });
    }

    #[test]
    fn partial_lean() {
        // 75% right, 50/50 top/bottom.
        let r = reading([5., 15., 5., 15.]);
        let mapper = AxisMapper::new(AxisRange::new(-100, 100).unwrap());
        assert_eq!(mapper.map(&r), AxisValues { x: 50, y: 0 });
    }
}
