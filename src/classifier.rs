use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

use crate::error::{MomoError, Result};
use crate::extract::{build_record, extract_fields};
use crate::fmt::log_timestamp_text;
use crate::models::{TransactionKind, TransactionRecord};
use crate::normalize::{parse_timestamp_in, DEFAULT_TIMEZONE};
use crate::patterns::Registry;
use crate::sink::UnprocessedSink;

/// What happened to one incoming message.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Record(TransactionRecord),
    /// Matched a template that is deliberately not a money movement (OTP).
    Dropped(TransactionKind),
    /// Matched nothing; written to the dead-letter sink.
    Unrecognized,
    /// The date could not be read; written to the dead-letter sink.
    MalformedTimestamp,
}

impl Classification {
    pub fn into_record(self) -> Option<TransactionRecord> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }
}

pub struct Classifier<'r> {
    registry: &'r Registry,
    tz: Tz,
}

impl Default for Classifier<'static> {
    fn default() -> Self {
        Self::new(Registry::builtin(), DEFAULT_TIMEZONE)
    }
}

impl<'r> Classifier<'r> {
    pub fn new(registry: &'r Registry, tz: Tz) -> Self {
        Self { registry, tz }
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Classify a message whose timestamp is already known.
    pub fn classify(
        &self,
        body: &str,
        timestamp: DateTime<FixedOffset>,
        sink: &mut dyn UnprocessedSink,
    ) -> Result<Classification> {
        let Some((kind, caps)) = self.registry.first_match(body) else {
            tracing::debug!("no template matched, sending to dead-letter log");
            sink.append(&log_timestamp_text(&timestamp), body)?;
            return Ok(Classification::Unrecognized);
        };
        let Some(fields) = extract_fields(kind, &caps) else {
            tracing::trace!(kind = kind.key(), "dropping non-financial message");
            return Ok(Classification::Dropped(kind));
        };
        tracing::debug!(kind = kind.key(), amount = fields.amount, "classified message");
        Ok(Classification::Record(build_record(kind, fields, timestamp, body)))
    }

    /// `Some(record)` for money movements, `None` for dropped or unrecognised messages.
    #[allow(dead_code)]
    pub fn parse_message(
        &self,
        body: &str,
        timestamp: DateTime<FixedOffset>,
        sink: &mut dyn UnprocessedSink,
    ) -> Result<Option<TransactionRecord>> {
        Ok(self.classify(body, timestamp, sink)?.into_record())
    }

    /// Classify a message carrying its date as epoch-millisecond text. An
    /// unreadable date sends the message to the sink under the raw date text.
    pub fn classify_raw(
        &self,
        body: &str,
        epoch_millis: &str,
        sink: &mut dyn UnprocessedSink,
    ) -> Result<Classification> {
        match parse_timestamp_in(epoch_millis, &self.tz) {
            Ok(timestamp) => self.classify(body, timestamp, sink),
            Err(MomoError::MalformedTimestamp(raw)) => {
                tracing::warn!(date = %raw, "unreadable message date, sending to dead-letter log");
                sink.append(&raw, body)?;
                Ok(Classification::MalformedTimestamp)
            }
            Err(e) => Err(e),
        }
    }
}
