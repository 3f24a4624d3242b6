//! Structured diagnostic events.
//!
//! Normalization, feed fetching and chart extraction report what they did
//! through a [`DiagnosticSink`] instead of logging inline. The server uses
//! [`LogSink`]; tests collect events with `Collector`.

use shared::models::FeedType;

use crate::extract::Strategy;

#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// A logical field was found under `key`.
    FieldResolved {
        feed: FeedType,
        index: usize,
        field: &'static str,
        key: &'static str,
    },
    /// None of the candidate keys for a logical field held a usable value.
    FieldMissing {
        feed: FeedType,
        index: usize,
        field: &'static str,
    },
    RecordKept {
        feed: FeedType,
        index: usize,
        id: String,
    },
    RecordExcluded {
        feed: FeedType,
        index: usize,
        reason: ExclusionReason,
    },
    /// The payload was neither an array nor an object with a known array property.
    ShapeUnrecognized { feed: FeedType },
    FeedFetched {
        feed: FeedType,
        raw_count: usize,
        kept: usize,
    },
    FeedFailed { feed: FeedType, cause: String },
    StrategyAttempted {
        strategy: Strategy,
        points: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExclusionReason {
    NotAnObject,
    MissingLatitude,
    MissingLongitude,
    MissingCoordinates,
}

impl ExclusionReason {
    pub fn describe(&self) -> &'static str {
        match self {
            ExclusionReason::NotAnObject => "record is not an object",
            ExclusionReason::MissingLatitude => "no finite latitude",
            ExclusionReason::MissingLongitude => "no finite longitude",
            ExclusionReason::MissingCoordinates => "no finite latitude or longitude",
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: Diagnostic);
}

/// Forwards events to the `log` facade.
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, event: Diagnostic) {
        match event {
            Diagnostic::FieldResolved {
                feed,
                index,
                field,
                key,
            } => log::trace!("{} #{}: {} found in '{}'", feed, index, field, key),
            Diagnostic::FieldMissing { feed, index, field } => {
                log::trace!("{} #{}: no value for {}", feed, index, field)
            }
            Diagnostic::RecordKept { feed, index, id } => {
                log::debug!("{} #{}: kept as {}", feed, index, id)
            }
            Diagnostic::RecordExcluded {
                feed,
                index,
                reason,
            } => log::debug!("{} #{}: excluded, {}", feed, index, reason.describe()),
            Diagnostic::ShapeUnrecognized { feed } => {
                log::warn!("{} payload has no recognizable array shape", feed)
            }
            Diagnostic::FeedFetched {
                feed,
                raw_count,
                kept,
            } => log::info!("{}: {}/{} records normalized", feed, kept, raw_count),
            Diagnostic::FeedFailed { feed, cause } => {
                log::warn!("{} fetch failed: {}", feed, cause)
            }
            Diagnostic::StrategyAttempted { strategy, points } => {
                log::debug!("{} extraction: {} points", strategy.label(), points)
            }
        }
    }
}

/// Keeps every event in memory.
#[cfg(test)]
#[derive(Default)]
pub struct Collector {
    events: std::sync::Mutex<Vec<Diagnostic>>,
}

#[cfg(test)]
impl Collector {
    pub fn events(&self) -> Vec<Diagnostic> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
impl DiagnosticSink for Collector {
    fn emit(&self, event: Diagnostic) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_keeps_emit_order() {
        let sink = Collector::default();
        sink.emit(Diagnostic::ShapeUnrecognized { feed: FeedType::Argo });
        sink.emit(Diagnostic::FeedFailed {
            feed: FeedType::Omni,
            cause: "no endpoint".to_string(),
        });
        assert_eq!(
            sink.events(),
            vec![
                Diagnostic::ShapeUnrecognized { feed: FeedType::Argo },
                Diagnostic::FeedFailed {
                    feed: FeedType::Omni,
                    cause: "no endpoint".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_log_sink_accepts_every_event() {
        LogSink.emit(Diagnostic::RecordExcluded {
            feed: FeedType::Rama,
            index: 3,
            reason: ExclusionReason::MissingCoordinates,
        });
        LogSink.emit(Diagnostic::StrategyAttempted {
            strategy: Strategy::JsonScript,
            points: 0,
        });
    }
}
