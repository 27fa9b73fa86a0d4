//! Integration test: log filter selection and subscriber installation.
//!
//! Run with: cargo test -p glvk-common --test logging

use glvk_common::logging::{env_filter, LOG_ENV};

#[test]
fn test_filter_follows_environment() {
    std::env::set_var(LOG_ENV, "glvk_replay=trace");
    assert_eq!(env_filter("info").to_string(), "glvk_replay=trace");

    std::env::remove_var(LOG_ENV);
    assert_eq!(env_filter("warn").to_string(), "warn");
}

#[test]
fn test_init_logging_twice_is_harmless() {
    glvk_common::init_logging();
    glvk_common::init_logging();
    tracing::info!("logging initialised");
}
