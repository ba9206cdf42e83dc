use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// User PIN for logging in to a token
///
/// The bytes are wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Pin(Vec<u8>);

impl Pin {
    pub const MAX_LENGTH: usize = 255;

    pub fn new(pin: Vec<u8>) -> Result<Self, PinError> {
        if pin.is_empty() {
            return Err(PinError::Empty);
        }
        if pin.len() > Self::MAX_LENGTH {
            return Err(PinError::TooLong);
        }
        Ok(Self(pin))
    }

    pub fn from_str(pin: &str) -> Result<Self, PinError> {
        Self::new(pin.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin([REDACTED])")
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    #[error("PIN must not be empty")]
    Empty,

    #[error("PIN must be at most {max} characters", max = Pin::MAX_LENGTH)]
    TooLong,
}
