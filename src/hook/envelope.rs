//! Envelope encoding.
//!
//! [`GelfEnvelope`] borrows from the record and the hook identity so encoding
//! allocates only the timestamp string and the output buffer. Every field is
//! omitted when empty or zero, including a level of `0`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::log_record::FemtoLogRecord;

use super::config::{ENVELOPE_VERSION, HookIdentity};

fn is_zero_i32(value: &i32) -> bool {
    *value == 0
}

fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

fn is_empty_map<V>(map: &&BTreeMap<String, V>) -> bool {
    map.is_empty()
}

/// Wire representation of one log event.
#[derive(Serialize)]
pub struct GelfEnvelope<'a, V: Serialize> {
    #[serde(skip_serializing_if = "str::is_empty")]
    pub version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub host: &'a str,
    #[serde(rename = "short_message", skip_serializing_if = "str::is_empty")]
    pub short: &'a str,
    #[serde(rename = "full_message", skip_serializing_if = "Option::is_none")]
    pub full: Option<&'a str>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub level: i32,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub facility: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub file: &'a str,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub line: u32,
    #[serde(skip_serializing_if = "is_empty_map")]
    pub extra: &'a BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "is_empty_map")]
    pub log_fields: &'a BTreeMap<String, V>,
}

impl<'a, V: Serialize> GelfEnvelope<'a, V> {
    /// Combine a record with the hook-wide identity.
    pub fn new(record: &'a FemtoLogRecord<V>, identity: &'a HookIdentity) -> Self {
        let metadata = record.metadata();
        let timestamp: DateTime<Utc> = metadata.timestamp.into();
        Self {
            version: ENVELOPE_VERSION,
            host: &identity.host,
            short: record.message(),
            full: metadata.full_message.as_deref().filter(|s| !s.is_empty()),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            level: record.level.as_i32(),
            facility: &identity.facility,
            file: &metadata.filename,
            line: metadata.line_number,
            extra: &identity.extra,
            log_fields: &record.fields,
        }
    }
}

/// Serialize `record` into the bytes queued for delivery.
///
/// # Errors
///
/// Returns the serializer error when a field value fails to serialize.
pub fn encode_envelope<V: Serialize>(
    record: &FemtoLogRecord<V>,
    identity: &HookIdentity,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&GelfEnvelope::new(record, identity))
}
