use chrono::NaiveDate;

/// Why a booking was turned down. A normal business outcome; state is untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Check-in equals check-out.
    ZeroNights,
    /// Check-in after check-out.
    InvertedRange,
    /// The first night in the range with no remaining units.
    SoldOut(NaiveDate),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::ZeroNights => write!(f, "stay covers no nights"),
            Rejection::InvertedRange => write!(f, "check-out precedes check-in"),
            Rejection::SoldOut(date) => write!(f, "no units left on {date}"),
        }
    }
}

impl std::error::Error for Rejection {}

#[derive(Debug)]
pub enum EngineError {
    InvalidArgument(&'static str),
    LimitExceeded(&'static str),
    Rejected(Rejection),
    WalError(String),
}

impl EngineError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Rejected(_))
    }
}

impl From<Rejection> for EngineError {
    fn from(r: Rejection) -> Self {
        EngineError::Rejected(r)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Rejected(r) => write!(f, "booking rejected: {r}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
