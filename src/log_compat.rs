//! Compatibility bridge for the Rust `log` crate.
//!
//! [`FemtoGelfLogger`] implements `log::Log` by converting each record into a
//! [`FemtoLogRecord`] and firing it through a shared [`FemtoGelfHook`].
//! Key/value pairs attached with the `kv` syntax become the envelope's
//! `log_fields`.
//!
//! Records whose target belongs to this crate are ignored, as is anything
//! logged on a delivery worker thread. The worker's HTTP client and any
//! failure callback log through the same global logger, and feeding those
//! records back into the queue would leave the worker blocked on itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::kv::{self, Key, Value, VisitSource};
use log::{Metadata, Record};

use crate::hook::{FemtoGelfHook, on_worker_thread};
use crate::level::FemtoLevel;
use crate::log_record::{FemtoLogRecord, RecordMetadata};

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// Adapter implementing the Rust `log::Log` trait on top of a hook.
#[derive(Debug, Clone)]
pub struct FemtoGelfLogger {
    hook: Arc<FemtoGelfHook>,
}

impl FemtoGelfLogger {
    pub fn new(hook: Arc<FemtoGelfHook>) -> Self {
        Self { hook }
    }

    pub fn hook(&self) -> &Arc<FemtoGelfHook> {
        &self.hook
    }

    fn convert(record: &Record<'_>) -> FemtoLogRecord {
        let metadata = RecordMetadata {
            filename: record.file().unwrap_or_default().to_string(),
            line_number: record.line().unwrap_or(0),
            ..Default::default()
        };
        let mut converted = FemtoLogRecord::with_metadata(
            FemtoLevel::from(record.level()),
            record.args().to_string(),
            metadata,
        );
        let mut collector = FieldCollector::default();
        // Pairs visited before a source error are kept.
        let _ = record.key_values().visit(&mut collector);
        converted.fields = collector.fields;
        converted
    }
}

impl log::Log for FemtoGelfLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        !on_worker_thread()
            && !is_own_target(metadata.target())
            && self.hook.is_enabled(metadata.level().into())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // A closed hook already reports dropped records through its warner.
        let _ = self.hook.fire(&Self::convert(record));
    }

    fn flush(&self) {
        self.hook.flush();
    }
}

#[derive(Default)]
struct FieldCollector {
    fields: BTreeMap<String, serde_json::Value>,
}

impl<'kvs> VisitSource<'kvs> for FieldCollector {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), kv::Error> {
        self.fields
            .insert(key.as_str().to_owned(), json_value(&value));
        Ok(())
    }
}

fn json_value(value: &Value<'_>) -> serde_json::Value {
    if let Some(flag) = value.to_bool() {
        return flag.into();
    }
    if let Some(number) = value.to_i64() {
        return number.into();
    }
    if let Some(number) = value.to_u64() {
        return number.into();
    }
    if let Some(number) = value.to_f64()
        && let Some(number) = serde_json::Number::from_f64(number)
    {
        return serde_json::Value::Number(number);
    }
    if let Some(text) = value.to_borrowed_str() {
        return text.into();
    }
    value.to_string().into()
}

/// Install a [`FemtoGelfLogger`] as the global `log` logger.
///
/// The `log` max level is set from the hook's minimum level, so records the
/// hook would not report are filtered before formatting.
///
/// # Errors
///
/// Fails if another global logger is already installed.
pub fn install_global_logger(hook: Arc<FemtoGelfHook>) -> Result<(), log::SetLoggerError> {
    let max_level = log::LevelFilter::from(hook.min_level());
    log::set_boxed_logger(Box::new(FemtoGelfLogger::new(hook)))?;
    log::set_max_level(max_level);
    Ok(())
}
