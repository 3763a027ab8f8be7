//! Log record representation consumed by the hook.
//!
//! This module defines the `FemtoLogRecord` struct that captures a log event
//! along with its contextual metadata: timestamp, source location, an optional
//! long-form message and a map of structured fields.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use crate::level::FemtoLevel;

/// Additional context associated with a log record.
#[derive(Clone, Debug)]
pub struct RecordMetadata {
    /// Source file name for the log call.
    pub filename: String,
    /// Line number in the source file.
    pub line_number: u32,
    /// Time the record was created.
    pub timestamp: SystemTime,
    /// Long form of the message, such as a backtrace or a multi-line dump.
    pub full_message: Option<String>,
}

impl Default for RecordMetadata {
    fn default() -> Self {
        Self {
            filename: String::new(),
            line_number: 0,
            timestamp: SystemTime::now(),
            full_message: None,
        }
    }
}

/// A single log event.
///
/// Field values may be of any type `V`; they are serialized when the hook
/// encodes the record, so a value whose `Serialize` implementation fails
/// surfaces as an encoding error from [`FemtoGelfHook::fire`].
///
/// [`FemtoGelfHook::fire`]: crate::FemtoGelfHook::fire
#[derive(Clone, Debug)]
pub struct FemtoLogRecord<V = serde_json::Value> {
    /// Severity of the event.
    pub level: FemtoLevel,
    /// The log message content.
    pub message: String,
    /// Contextual metadata for the record.
    pub metadata: RecordMetadata,
    /// Structured per-event fields.
    pub fields: BTreeMap<String, V>,
}

impl<V> FemtoLogRecord<V> {
    /// Construct a new record stamped with the current time.
    pub fn new(level: FemtoLevel, message: impl Into<String>) -> Self {
        Self::with_metadata(level, message, RecordMetadata::default())
    }

    /// Construct a record with explicit metadata.
    pub fn with_metadata(
        level: FemtoLevel,
        message: impl Into<String>,
        metadata: RecordMetadata,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            metadata,
            fields: BTreeMap::new(),
        }
    }

    /// Attach a structured field, replacing any previous value for `key`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<V>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Attach a long-form message.
    pub fn with_full_message(mut self, full: impl Into<String>) -> Self {
        self.metadata.full_message = Some(full.into());
        self
    }

    /// Record the source location of the log call.
    pub fn with_location(mut self, filename: impl Into<String>, line_number: u32) -> Self {
        self.metadata.filename = filename.into();
        self.metadata.line_number = line_number;
        self
    }

    /// Override the creation timestamp.
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.metadata.timestamp = timestamp;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }
}

impl<V> fmt::Display for FemtoLogRecord<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.level, self.message)
    }
}
