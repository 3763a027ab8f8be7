//! End-to-end tests for the global `log` bridge.
//!
//! The global logger can be installed once per process, so every test shares
//! one hook and runs serially.
#![cfg(feature = "log-compat")]

use std::sync::{Arc, OnceLock};

use femtogelf::test_support::RecordingTransport;
use femtogelf::{FemtoGelfHook, FemtoLevel, install_global_logger};
use rstest::rstest;
use serial_test::serial;

struct Bridge {
    hook: Arc<FemtoGelfHook>,
    transport: Arc<RecordingTransport>,
}

fn bridge() -> &'static Bridge {
    static BRIDGE: OnceLock<Bridge> = OnceLock::new();
    BRIDGE.get_or_init(|| {
        let transport = Arc::new(RecordingTransport::default());
        let hook = Arc::new(
            FemtoGelfHook::builder("http://collector/gelf")
                .with_transport(transport.clone())
                .with_host("bridge-host")
                .with_facility("bridge")
                .with_min_level(FemtoLevel::Info)
                .build()
                .expect("build hook"),
        );
        install_global_logger(Arc::clone(&hook)).expect("install global logger");
        Bridge { hook, transport }
    })
}

/// Envelopes delivered after the first `skip`.
fn delivered_since(bridge: &Bridge, skip: usize) -> Vec<serde_json::Value> {
    bridge.hook.flush();
    bridge.transport.envelopes().into_iter().skip(skip).collect()
}

#[rstest]
#[serial]
fn sets_max_level_from_hook() {
    bridge();
    assert_eq!(log::max_level(), log::LevelFilter::Info);
}

#[rstest]
#[serial]
fn forwards_log_macros_with_fields() {
    let bridge = bridge();
    let before = bridge.transport.bodies().len();

    log::warn!(target: "billing", user = "alice", attempt = 2; "card declined");
    log::logger().flush();

    let envelopes = delivered_since(bridge, before);
    assert_eq!(envelopes.len(), 1);
    let envelope = &envelopes[0];
    assert_eq!(envelope["short_message"], "card declined");
    assert_eq!(envelope["level"], FemtoLevel::Warn.as_i32());
    assert_eq!(envelope["host"], "bridge-host");
    assert_eq!(envelope["log_fields"]["user"], "alice");
    assert_eq!(envelope["log_fields"]["attempt"], 2);
    assert!(
        envelope["file"]
            .as_str()
            .is_some_and(|file| file.ends_with("log_bridge.rs"))
    );
    assert!(envelope["line"].as_u64().is_some_and(|line| line > 0));
}

#[rstest]
#[serial]
fn drops_records_below_minimum() {
    let bridge = bridge();
    let before = bridge.transport.bodies().len();
    log::debug!("too chatty");
    log::info!("kept");
    let envelopes = delivered_since(bridge, before);
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0]["short_message"], "kept");
}

#[rstest]
#[serial]
fn ignores_records_from_this_crate() {
    let bridge = bridge();
    let before = bridge.transport.bodies().len();
    log::warn!(target: "femtogelf::hook::worker", "internal diagnostic");
    assert!(delivered_since(bridge, before).is_empty());
}
