use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// Configuration rejected at setup
    InvalidConfig(String),
    /// A delay or deadline that is negative, non-finite or in the past
    InvalidTime(String),
    /// Internal consistency fault; indicates a logic defect
    InvariantViolation(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            SimError::InvalidTime(msg) => write!(f, "invalid simulation time: {}", msg),
            SimError::InvariantViolation(msg) => write!(f, "invariant violated: {}", msg),
        }
    }
}

impl std::error::Error for SimError {}
