//! INI configuration for the hook.
//!
//! A `[gelf]` section carries the builder settings and an optional
//! `[gelf.extra]` section lists fields stamped onto every envelope:
//!
//! ```ini
//! [gelf]
//! url = https://collector.example/gelf
//! max_retries = 5
//! retry_interval_ms = 2000
//! level = info
//!
//! [gelf.extra]
//! env = production
//! ```
//!
//! Values from `[gelf.extra]` are attached as JSON strings.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

use crate::hook::GelfHookBuilder;
use crate::level::FemtoLevel;

/// Section holding the hook settings.
pub const GELF_SECTION: &str = "gelf";
/// Section holding the extra envelope fields.
pub const EXTRA_SECTION: &str = "gelf.extra";

/// Errors raised while loading an INI configuration.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin} is invalid: {message}")]
    Parse { origin: String, message: String },
    #[error("missing [{0}] section")]
    MissingSection(&'static str),
    #[error("missing required key `{0}`")]
    MissingKey(&'static str),
    #[error("invalid value {value:?} for `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Load a builder from the INI file at `path`.
///
/// # Errors
///
/// Fails when the file cannot be read, is not valid INI, lacks the `[gelf]`
/// section or `url`, or holds a value that does not parse.
pub fn load_builder(path: impl AsRef<Path>) -> Result<GelfHookBuilder, ConfigFileError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_builder(&path.display().to_string(), &text)
}

/// Load a builder from INI text.
pub fn load_builder_from_str(text: &str) -> Result<GelfHookBuilder, ConfigFileError> {
    parse_builder("configuration", text)
}

fn parse_builder(origin: &str, text: &str) -> Result<GelfHookBuilder, ConfigFileError> {
    let ini = Ini::load_from_str(text).map_err(|err| ConfigFileError::Parse {
        origin: origin.to_owned(),
        message: err.to_string(),
    })?;
    let section = ini
        .section(Some(GELF_SECTION))
        .ok_or(ConfigFileError::MissingSection(GELF_SECTION))?;
    let url = section
        .get("url")
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(ConfigFileError::MissingKey("url"))?;

    let mut builder = apply_settings(GelfHookBuilder::new(url), section)?;
    if let Some(extra) = ini.section(Some(EXTRA_SECTION)) {
        for (key, value) in extra.iter() {
            builder = builder.with_extra(key, value);
        }
    }
    Ok(builder)
}

fn apply_settings(
    mut builder: GelfHookBuilder,
    section: &Properties,
) -> Result<GelfHookBuilder, ConfigFileError> {
    if let Some(capacity) = parsed::<usize>(section, "capacity")? {
        builder = builder.with_capacity(capacity);
    }
    if let Some(retries) = parsed::<u32>(section, "max_retries")? {
        builder = builder.with_max_retries(retries);
    }
    if let Some(interval) = millis(section, "retry_interval_ms")? {
        builder = builder.with_retry_interval(interval);
    }
    if let Some(timeout) = millis(section, "request_timeout_ms")? {
        builder = builder.with_request_timeout(timeout);
    }
    if let Some(timeout) = millis(section, "connect_timeout_ms")? {
        builder = builder.with_connect_timeout(timeout);
    }
    if let Some(level) = parsed::<FemtoLevel>(section, "level")? {
        builder = builder.with_min_level(level);
    }
    if let Some(raw) = section.get("insecure_skip_verify") {
        builder = builder.with_insecure_skip_verify(parse_bool("insecure_skip_verify", raw)?);
    }
    if let Some(host) = section.get("host") {
        builder = builder.with_host(host.trim());
    }
    if let Some(facility) = section.get("facility") {
        builder = builder.with_facility(facility.trim());
    }
    Ok(builder)
}

fn parsed<T>(section: &Properties, key: &'static str) -> Result<Option<T>, ConfigFileError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    section
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|err| ConfigFileError::InvalidValue {
                    key,
                    value: raw.to_owned(),
                    reason: err.to_string(),
                })
        })
        .transpose()
}

fn millis(section: &Properties, key: &'static str) -> Result<Option<Duration>, ConfigFileError> {
    Ok(parsed::<u64>(section, key)?.map(Duration::from_millis))
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigFileError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigFileError::InvalidValue {
            key,
            value: raw.to_owned(),
            reason: "expected a boolean".into(),
        }),
    }
}
