//! Decoding of the HID input report.
//!
//! The board reports the load of each sensor as a little-endian `u32` in
//! hundredths of a kilogram, at fixed offsets after a 9 byte header.

use crate::{Channel, RawSample, SampleError, Unit, CHANNEL_COUNT};
use std::fmt;

/// Minimum size of a report carrying the four sensor values.
pub const REPORT_LEN: usize = 25;
/// Buffer size to use when reading from the device.
pub const READ_BUFFER_LEN: usize = 64;

pub const COUNTS_PER_KILOGRAM: f64 = 100.;

const SENSOR_OFFSETS: [usize; CHANNEL_COUNT] = [9, 13, 17, 21];

#[derive(Copy, Clone)]
pub struct InputReport {
    data: [u8; REPORT_LEN],
}

impl InputReport {
    pub fn from_bytes(buf: &[u8]) -> Result<InputReport, SampleError> {
        if buf.len() < REPORT_LEN {
            return Err(SampleError::ShortReport {
                expected: REPORT_LEN,
                got: buf.len(),
            });
        }
        let mut data = [0; REPORT_LEN];
        data.copy_from_slice(&buf[..REPORT_LEN]);
        Ok(InputReport { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn counts(&self, channel: Channel) -> u32 {
        let start = SENSOR_OFFSETS[channel.index()];
        let mut raw = [0; 4];
        raw.copy_from_slice(&self.data[start..start + 4]);
        u32::from_le_bytes(raw)
    }

    /// Sensor values converted to `unit`.
    pub fn weights(&self, unit: Unit) -> RawSample {
        let mut values = [0.; CHANNEL_COUNT];
        for channel in Channel::ALL {
            let kg = f64::from(self.counts(channel)) / COUNTS_PER_KILOGRAM;
            values[channel.index()] = unit.from_kilograms(kg);
        }
        // u32 / 100 is always finite.
        RawSample::new(values).unwrap_or_default()
    }
}

impl fmt::Debug for InputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputReport")
            .field("tl", &self.counts(Channel::TopLeft))
            .field("tr", &self.counts(Channel::TopRight))
            .field("bl", &self.counts(Channel::BottomLeft))
            .field("br", &self.counts(Channel::BottomRight))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_bytes(counts: [u32; 4]) -> Vec<u8> {
        let mut buf = vec![0xa1; 9];
        for c in counts.iter() {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        buf.extend_from_slice(&[0; 7]);
        buf
    }

    #[test]
    fn decode_counts() {
        let report = InputReport::from_bytes(&report_bytes([100, 2500, 0, 70000])).unwrap();
        assert_eq!(report.counts(Channel::TopLeft), 100);
        assert_eq!(report.counts(Channel::TopRight), 2500);
        assert_eq!(report.counts(Channel::BottomLeft), 0);
        assert_eq!(report.counts(Channel::BottomRight), 70000);

        let kg = report.weights(Unit::Kilograms);
        assert_eq!(kg.as_array(), [1., 25., 0., 700.]);
        let lbs = report.weights(Unit::Pounds);
        assert!((lbs.get(Channel::TopLeft) - 2.2046).abs() < 1e-9);
    }

    #[test]
    fn short_report() {
        let buf = report_bytes([1, 2, 3, 4]);
        assert_eq!(
            InputReport::from_bytes(&buf[..24]).unwrap_err(),
            SampleError::ShortReport {
                expected: 25,
                got: 24
            }
        );
    }
}
