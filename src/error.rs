use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AcqError {
    InvalidArgument(String),
    NumericalError(String),
}

impl AcqError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        AcqError::InvalidArgument(msg.into())
    }

    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        AcqError::NumericalError(msg.into())
    }
}

impl fmt::Display for AcqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcqError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            AcqError::NumericalError(msg) => write!(f, "numerical error: {}", msg),
        }
    }
}

impl Error for AcqError {}
