use std::{fmt, str::FromStr};

pub const BALANCE_BOARD_VENDOR_ID: u16 = 0x1234;
pub const BALANCE_BOARD_PRODUCT_ID: u16 = 0xbead;

/// Name the kernel driver gives to the board's event device.
pub const BALANCE_BOARD_EVDEV_NAME: &str = "Nintendo Wii Remote Balance Board";

pub const POUNDS_PER_KILOGRAM: f64 = 2.2046;

/// Weight unit of the values published by a transport.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Unit {
    Kilograms,
    Pounds,
}

impl Unit {
    pub fn from_kilograms(self, kg: f64) -> f64 {
        match self {
            Unit::Kilograms => kg,
            Unit::Pounds => kg * POUNDS_PER_KILOGRAM,
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::Kilograms
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Kilograms => write!(f, "kg"),
            Unit::Pounds => write!(f, "lbs"),
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kg" | "kilograms" => Ok(Unit::Kilograms),
            "lb" | "lbs" | "pounds" => Ok(Unit::Pounds),
            _ => Err(format!("unknown unit `{}`, expected `kg` or `lbs`", s)),
        }
    }
}

#[cfg(test)]
#[test]
fn unit_conversion() {
    assert_eq!(Unit::Kilograms.from_kilograms(10.), 10.);
    assert!((Unit::Pounds.from_kilograms(10.) - 22.046).abs() < 1e-9);
    assert_eq!("LBS".parse::<Unit>(), Ok(Unit::Pounds));
    assert!("stone".parse::<Unit>().is_err());
}
