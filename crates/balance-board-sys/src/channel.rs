use enum_map::Enum;
use std::{
    convert::{TryFrom, TryInto},
    fmt,
};
use thiserror::Error;

pub const CHANNEL_COUNT: usize = 4;

/// Position of a pressure sensor on the board.
///
/// The declaration order is the order used by every 4-element sequence in
/// the crate: top-left, top-right, bottom-left, bottom-right.
#[derive(Enum, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Channel {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::TopLeft,
        Channel::TopRight,
        Channel::BottomLeft,
        Channel::BottomRight,
    ];

    pub fn index(self) -> usize {
        self.into_usize()
    }

    pub fn is_top(self) -> bool {
        matches!(self, Channel::TopLeft | Channel::TopRight)
    }

    pub fn is_left(self) -> bool {
        matches!(self, Channel::TopLeft | Channel::BottomLeft)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::TopLeft => "TL",
            Channel::TopRight => "TR",
            Channel::BottomLeft => "BL",
            Channel::BottomRight => "BR",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("expected {expected} channel values, got {got}")]
    WrongArity { expected: usize, got: usize },
    #[error("channel {channel} is not a finite number")]
    NonFinite { channel: Channel },
    #[error("report too short: {got} < {expected} bytes")]
    ShortReport { expected: usize, got: usize },
}

/// One reading of the four sensors.
///
/// Values are raw counts or pre-scaled engineering units depending on the
/// transport. A sample is never modified after construction, so it can be
/// handed across threads by value.
#[derive(Copy, Clone, PartialEq)]
pub struct RawSample {
    values: [f64; CHANNEL_COUNT],
}

impl RawSample {
    pub fn new(values: [f64; CHANNEL_COUNT]) -> Result<Self, SampleError> {
        for channel in Channel::ALL {
            if !values[channel.index()].is_finite() {
                return Err(SampleError::NonFinite { channel });
            }
        }
        Ok(RawSample { values })
    }

    pub fn zero() -> Self {
        RawSample {
            values: [0.; CHANNEL_COUNT],
        }
    }

    pub fn get(&self, channel: Channel) -> f64 {
        self.values[channel.index()]
    }

    pub fn as_array(&self) -> [f64; CHANNEL_COUNT] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        Channel::ALL.iter().map(move |&c| (c, self.get(c)))
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Copy of `self` with one channel replaced.
    pub fn with(mut self, channel: Channel, value: f64) -> Result<Self, SampleError> {
        if !value.is_finite() {
            return Err(SampleError::NonFinite { channel });
        }
        self.values[channel.index()] = value;
        Ok(self)
    }
}

impl Default for RawSample {
    fn default() -> Self {
        RawSample::zero()
    }
}

impl TryFrom<&[f64]> for RawSample {
    type Error = SampleError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let values: [f64; CHANNEL_COUNT] =
            values.try_into().map_err(|_| SampleError::WrongArity {
                expected: CHANNEL_COUNT,
                got: values.len(),
            })?;
        RawSample::new(values)
    }
}

impl TryFrom<&[i64]> for RawSample {
    type Error = SampleError;

    fn try_from(values: &[i64]) -> Result<Self, Self::Error> {
        let values: Vec<f64> = values.iter().map(|&v| v as f64).collect();
        RawSample::try_from(values.as_slice())
    }
}

impl fmt::Debug for RawSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (channel, value) in self.iter() {
            map.entry(&format_args!("{}", channel), &value);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_order_is_fixed() {
        let indexes: Vec<usize> = Channel::ALL.iter().map(|c| c.index()).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
        assert!(Channel::TopRight.is_top());
        assert!(!Channel::TopRight.is_left());
        assert!(Channel::BottomLeft.is_left());
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let three: &[f64] = &[1., 2., 3.];
        assert_eq!(
            RawSample::try_from(three),
            Err(SampleError::WrongArity {
                expected: 4,
                got: 3
            })
        );
        let five: &[i64] = &[1, 2, 3, 4, 5];
        assert!(RawSample::try_from(five).is_err());
    }

    #[test]
    fn non_finite_is_rejected() {
        assert_eq!(
            RawSample::new([0., f64::NAN, 0., 0.]),
            Err(SampleError::NonFinite {
                channel: Channel::TopRight
            })
        );
        assert!(RawSample::zero()
            .with(Channel::BottomRight, f64::INFINITY)
            .is_err());
    }

    #[test]
    fn accessors_follow_channel_order() {
        let values: &[i64] = &[1, 2, 3, 4];
        let sample = RawSample::try_from(values).unwrap();
        assert_eq!(sample.get(Channel::BottomLeft), 3.);
        assert_eq!(sample.sum(), 10.);
        let updated = sample.with(Channel::TopLeft, 9.).unwrap();
        assert_eq!(updated.as_array(), [9., 2., 3., 4.]);
        assert_eq!(sample.get(Channel::TopLeft), 1.);
    }
}
