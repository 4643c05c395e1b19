//! Calibration and conversion of balance board readings.
//!
//! Raw samples come from a [`SampleFeed`] filled by a [`BoardReader`], go
//! through a [`CalibrationModel`] to become a [`WeightReading`], and the
//! [`AxisMapper`] turns the centre of pressure into joystick axis values.

pub mod axis;
pub mod calibration;
pub mod convert;
pub mod display;
mod error;
mod event_device;
pub mod feed;
mod hid;
pub mod live;
pub mod sink;

pub use axis::{AxisMapper, AxisRange, AxisValues};
pub use calibration::{
    CalibrationModel, CalibrationProcedure, ChannelCalibration, KnownWeight, Operator, Sampler,
    SamplingConfig,
};
pub use convert::{convert, BalancePoint, WeightConverter, WeightReading};
pub use error::*;
pub use feed::{ChannelAssembler, SampleFeed, Snapshot};
pub use hid::*;
pub use live::{LiveLoop, Pipeline};

pub use balance_board_sys;
pub use hidapi;
