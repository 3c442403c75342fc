use thiserror::Error;

/// Malformed record data surfaced to the caller instead of propagating as NaN
/// or an invalid date.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    #[error("unparsable date '{0}', expected an ISO-8601 date or timestamp")]
    Date(String),
    #[error("unparsable time '{0}', expected HH:mm")]
    Time(String),
    #[error("unknown priority '{0}', expected Low, Medium or High")]
    Priority(String),
    #[error("no grade category named '{0}'")]
    UnknownCategory(String),
    #[error("unknown day of week '{0}'")]
    Weekday(String),
    #[error("{field} must be a finite number, got {value}")]
    NonFiniteNumber { field: &'static str, value: f64 },
    #[error("credits must be positive, got {0}")]
    Credits(f64),
    #[error("grade category weights must total 100%, got {0}%")]
    WeightTotal(f64),
}
