use anyhow::Error;
use balance_board_sys::SampleError;
use hidapi::HidError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("malformed sample: {0}")]
    MalformedSample(#[from] SampleError),
    #[error("invalid calibration input: {0}")]
    InvalidCalibrationInput(String),
    #[error("communication error")]
    Hidapi(#[from] HidError),
    #[error("other error")]
    Anyhow(#[from] Error),
}
