//! Error types for the ChronoLog MCP service.

use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Backend return code. `0` is success, anything else is backend-specific.
pub type ReturnCode = i32;

#[derive(Error, Debug)]
pub enum ChronologError {
    #[error("Failed to connect to ChronoLog: {0}")]
    ConnectFailed(ReturnCode),

    #[error("Failed to create chronicle '{name}': {code}")]
    ChronicleCreateFailed { name: String, code: ReturnCode },

    #[error("Failed to acquire story '{story}' in chronicle '{chronicle}': {code}")]
    StoryAcquireFailed {
        chronicle: String,
        story: String,
        code: ReturnCode,
    },

    #[error("No active ChronoLog session")]
    NoActiveSession,

    #[error("Failed to record interaction: {0}")]
    WriteFailed(ReturnCode),

    #[error("Failed to release story '{story}': {code}")]
    ReleaseFailed { story: String, code: ReturnCode },

    #[error("Failed to disconnect from ChronoLog: {0}")]
    DisconnectFailed(ReturnCode),

    #[error("Invalid time expression '{0}': expected nanoseconds, yesterday/today/tomorrow, or YYYY-MM-DD")]
    InvalidTimeExpression(String),

    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidTimeRange { start: u64, end: u64 },

    #[error("Error running record reader: {0}")]
    ReaderInvocationFailed(String),

    #[error("Record reader timed out after {0}s")]
    ReaderTimedOut(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChronologError>;

/// A primary failure plus any errors hit while cleaning up after it.
///
/// Only the primary error is shown to callers; the suppressed ones are kept
/// for logging and inspection.
#[derive(Debug)]
pub struct FailureReport {
    pub primary: ChronologError,
    pub suppressed: Vec<ChronologError>,
}

impl FailureReport {
    pub fn new(primary: ChronologError) -> Self {
        Self {
            primary,
            suppressed: Vec::new(),
        }
    }

    /// Record a cleanup error without replacing the primary one.
    pub fn suppress(&mut self, error: ChronologError) {
        warn!(primary = %self.primary, suppressed = %error, "Cleanup step failed");
        self.suppressed.push(error);
    }

    pub fn into_primary(self) -> ChronologError {
        self.primary
    }
}

impl From<ChronologError> for FailureReport {
    fn from(primary: ChronologError) -> Self {
        Self::new(primary)
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary)
    }
}

impl std::error::Error for FailureReport {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.primary)
    }
}
