use balance_board_sys::{Channel, RawSample};
use enum_map::EnumMap;

/// Conversion parameters of a single sensor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ChannelCalibration {
    /// Never calibrated, always reads 0.
    Unset,
    /// `weight = (raw - zero_offset) * scale`.
    Linear { zero_offset: f64, scale: f64 },
    /// Interpolation through `(zero, 0)`, `(low, low_weight)` and
    /// `(high, high_weight)`, pivoting on `low`.
    PiecewiseLinear {
        zero: f64,
        low: f64,
        high: f64,
        low_weight: f64,
        high_weight: f64,
    },
}

impl Default for ChannelCalibration {
    fn default() -> Self {
        ChannelCalibration::Unset
    }
}

impl ChannelCalibration {
    /// Two-point calibration from the averaged raw values without load and
    /// with `known_weight` applied.
    ///
    /// A zero denominator gives a scale of 0.
    pub fn linear(zero_raw: f64, known_raw: f64, known_weight: f64) -> Self {
        let denom = known_raw - zero_raw;
        let scale = if denom != 0. {
            known_weight / denom
        } else {
            0.
        };
        ChannelCalibration::Linear {
            zero_offset: zero_raw,
            scale,
        }
    }

    pub fn three_point(zero: f64, low: f64, high: f64, low_weight: f64, high_weight: f64) -> Self {
        ChannelCalibration::PiecewiseLinear {
            zero,
            low,
            high,
            low_weight,
            high_weight,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, ChannelCalibration::Unset)
    }

    /// Whether the parameters make the channel read 0 whatever the load.
    pub fn is_degenerate(&self) -> bool {
        match *self {
            ChannelCalibration::Unset => false,
            ChannelCalibration::Linear { scale, .. } => scale == 0.,
            ChannelCalibration::PiecewiseLinear {
                zero, low, high, ..
            } => zero == low || low == high || zero == high,
        }
    }

    /// Weight for a raw value, never negative.
    pub fn convert(&self, raw: f64) -> f64 {
        let weight = match *self {
            ChannelCalibration::Unset => 0.,
            ChannelCalibration::Linear { zero_offset, scale } => (raw - zero_offset) * scale,
            ChannelCalibration::PiecewiseLinear { .. } if self.is_degenerate() => 0.,
            ChannelCalibration::PiecewiseLinear {
                zero,
                low,
                high,
                low_weight,
                high_weight,
            } => {
                if raw < low {
                    (raw - zero) * low_weight / (low - zero)
                } else {
                    low_weight + (raw - low) * (high_weight - low_weight) / (high - low)
                }
            }
        };
        // Also maps NaN to 0.
        weight.max(0.)
    }
}

/// Per-channel calibration of the whole board.
///
/// The default model has every channel unset and converts everything to 0.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalibrationModel {
    channels: EnumMap<Channel, ChannelCalibration>,
}

impl CalibrationModel {
    pub fn new(channels: EnumMap<Channel, ChannelCalibration>) -> Self {
        CalibrationModel { channels }
    }

    /// Passes values through, for feeds that are already in weight units.
    pub fn identity() -> Self {
        CalibrationModel {
            channels: EnumMap::from_fn(|_| ChannelCalibration::Linear {
                zero_offset: 0.,
                scale: 1.,
            }),
        }
    }

    /// Two-point model from averaged raw values.
    pub fn linear(zero: &RawSample, known: &RawSample, known_weight: f64) -> Self {
        CalibrationModel {
            channels: EnumMap::from_fn(|c| {
                ChannelCalibration::linear(zero.get(c), known.get(c), known_weight)
            }),
        }
    }

    /// Three-point model from averaged raw values.
    pub fn three_point(
        zero: &RawSample,
        low: &RawSample,
        high: &RawSample,
        low_weight: f64,
        high_weight: f64,
    ) -> Self {
        CalibrationModel {
            channels: EnumMap::from_fn(|c| {
                ChannelCalibration::three_point(
                    zero.get(c),
                    low.get(c),
                    high.get(c),
                    low_weight,
                    high_weight,
                )
            }),
        }
    }

    pub fn get(&self, channel: Channel) -> ChannelCalibration {
        self.channels[channel]
    }

    pub fn set(&mut self, channel: Channel, calibration: ChannelCalibration) {
        self.channels[channel] = calibration;
    }

    /// True once every channel has parameters.
    pub fn is_complete(&self) -> bool {
        self.channels.values().all(ChannelCalibration::is_set)
    }

    pub fn degenerate_channels(&self) -> Vec<Channel> {
        self.channels
            .iter()
            .filter(|(_, cal)| cal.is_degenerate())
            .map(|(c, _)| c)
            .collect()
    }

    pub fn convert(&self, channel: Channel, raw: f64) -> f64 {
        self.channels[channel].convert(raw)
    }
}
