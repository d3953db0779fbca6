//! Time-range retrieval over ChronoLog's external record reader.
//!
//! A retrieval runs in three steps:
//!
//! ```text
//! start/end tokens
//!        │
//!        ▼
//! ┌──────────────┐   nanosecond bounds   ┌──────────────┐
//! │ time resolver│ ────────────────────► │ reader tool  │  (subprocess)
//! └──────────────┘                       └──────┬───────┘
//!                                               │ stdout
//!                                               ▼
//!                                  record="..." scan → artifact file
//! ```

pub mod artifact;
pub mod command;
pub mod extractor;
pub mod testing;
pub mod time;

pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use extractor::{
    extract_records, ReaderConfig, RecordExtractor, RetrievalOutcome, RetrievedRecordSet,
};
pub use time::{resolve, TimeRange};
