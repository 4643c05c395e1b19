use crate::{calibration::CalibrationModel, Result};
use balance_board_sys::{Channel, RawSample};
use cgmath::{vec2, Vector2, Zero};
use enum_map::EnumMap;
use std::convert::TryFrom;

/// Normalized centre of pressure.
///
/// `x` goes from -1 (all on the left sensors) to +1 (all on the right ones),
/// `y` from -1 (all on the bottom sensors) to +1 (all on the top ones).
pub type BalancePoint = Vector2<f64>;

/// Calibrated weights of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightReading {
    weights: EnumMap<Channel, f64>,
    total: f64,
}

impl WeightReading {
    pub fn new(weights: EnumMap<Channel, f64>) -> Self {
        let total = weights.values().sum();
        WeightReading { weights, total }
    }

    pub fn weight(&self, channel: Channel) -> f64 {
        self.weights[channel]
    }

    pub fn weights(&self) -> &EnumMap<Channel, f64> {
        &self.weights
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn top(&self) -> f64 {
        self.sum_where(Channel::is_top)
    }

    pub fn bottom(&self) -> f64 {
        self.sum_where(|c| !c.is_top())
    }

    pub fn left(&self) -> f64 {
        self.sum_where(Channel::is_left)
    }

    pub fn right(&self) -> f64 {
        self.sum_where(|c| !c.is_left())
    }

    fn sum_where(&self, f: impl Fn(Channel) -> bool) -> f64 {
        self.weights
            .iter()
            .filter(|(c, _)| f(*c))
            .map(|(_, w)| *w)
            .sum()
    }

    /// Centre of pressure, or the origin when the total is at or below
    /// `guard`.
    pub fn balance_point(&self, guard: f64) -> BalancePoint {
        if self.total <= guard || self.total <= 0. {
            return BalancePoint::zero();
        }
        vec2(
            ((self.right() - self.left()) / self.total).max(-1.).min(1.),
            ((self.top() - self.bottom()) / self.total).max(-1.).min(1.),
        )
    }
}

/// Applies a [`CalibrationModel`] to samples.
#[derive(Debug, Clone, Default)]
pub struct WeightConverter {
    model: CalibrationModel,
}

impl WeightConverter {
    pub fn new(model: CalibrationModel) -> Self {
        WeightConverter { model }
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn convert(&self, sample: &RawSample) -> WeightReading {
        WeightReading::new(EnumMap::from_fn(|c| self.model.convert(c, sample.get(c))))
    }

    /// Same as [`convert`](Self::convert) for an untyped sample, which must
    /// hold exactly one finite value per channel.
    pub fn convert_values(&self, values: &[f64]) -> Result<WeightReading> {
        let sample = RawSample::try_from(values)?;
        Ok(self.convert(&sample))
    }
}

/// Converts `values` with `model`.
pub fn convert(values: &[f64], model: &CalibrationModel) -> Result<WeightReading> {
    let sample = RawSample::try_from(values)?;
    Ok(WeightReading::new(EnumMap::from_fn(|c| {
        model.convert(c, sample.get(c))
    })))
}
