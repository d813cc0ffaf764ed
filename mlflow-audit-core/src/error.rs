//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// A serialized metric history could not be parsed.
    #[error("Invalid metric history entry: {0:?}")]
    InvalidHistory(String),

    /// A run reports an end time earlier than its start time.
    #[error("Run {run_id} ends before it starts (start={start_time}, end={end_time})")]
    EndBeforeStart {
        /// Run ID.
        run_id: String,
        /// Start time in milliseconds.
        start_time: i64,
        /// End time in milliseconds.
        end_time: i64,
    },

    /// A timestamp cannot be represented as a date.
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    /// A required setting is not available.
    #[error("{0} is not set")]
    MissingConfig(String),

    /// A metric name template without the slot placeholder.
    #[error("Metric template {0:?} does not contain {{slot}}")]
    InvalidMetricTemplate(String),

    /// An unknown failure policy name.
    #[error("Unknown failure policy: {0:?}")]
    UnknownFailurePolicy(String),
}
