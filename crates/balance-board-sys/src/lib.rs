//! Helper crate for decoding the data sent by a balance board over HID.
//!
//! The main types are [RawSample](channel/struct.RawSample.html), the
//! immutable four-channel reading everything else consumes, and
//! [InputReport](input/struct.InputReport.html), the HID report it is decoded
//! from.

#[macro_use]
extern crate num_derive;

pub mod channel;
pub mod common;
pub mod event;
pub mod input;

pub use channel::*;
pub use common::*;
pub use input::InputReport;
