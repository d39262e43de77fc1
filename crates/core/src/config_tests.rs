// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn empty_file_gives_defaults() {
    let config = TandemConfig::from_toml("").unwrap().finish(no_env).unwrap();
    assert_eq!(config.store.url, DEFAULT_STORE_URL);
    assert_eq!(config.fanout.max_workers, DEFAULT_MAX_WORKERS);
    assert_eq!(config.lock_nodes(), vec![DEFAULT_STORE_URL.to_string()]);
    assert_eq!(config.lock.options, MutexOptions::default());
}

#[test]
fn full_file_parses() {
    let text = r#"
        [store]
        url = "redis://counter:6379/"

        [lock]
        nodes = ["redis://a/", "redis://b/", "redis://c/"]
        expiry = "20s"
        wait = "5s"

        [fanout]
        max_workers = 4

        [[series]]
        name = "order-sheet"
        key = "seq:incr:order-sheet"
        prefix = "OSST"
        width = 4
    "#;
    let config = TandemConfig::from_toml(text).unwrap().finish(no_env).unwrap();

    assert_eq!(config.lock_nodes().len(), 3);
    assert_eq!(config.lock.options.effective_expiry(), Duration::from_secs(20));
    assert_eq!(config.lock.options.attempt_budget(), 100);
    assert_eq!(config.fanout.max_workers, 4);
    assert_eq!(
        config.catalog().get("order-sheet").unwrap().format(1),
        "OSST0001"
    );
}

#[test]
fn env_overrides_store_url() {
    let config = TandemConfig::default()
        .finish(|name| (name == STORE_URL_ENV).then(|| "redis://env/".to_string()))
        .unwrap();
    assert_eq!(config.store.url, "redis://env/");
}

#[test]
fn zero_workers_is_rejected() {
    let err = TandemConfig::from_toml("[fanout]\nmax_workers = 0")
        .unwrap()
        .finish(no_env)
        .unwrap_err();
    assert!(err.to_string().contains("max_workers"));
}

#[test]
fn duplicate_series_is_rejected() {
    let text = r#"
        [[series]]
        name = "x"
        key = "k1"

        [[series]]
        name = "x"
        key = "k2"
    "#;
    let err = TandemConfig::from_toml(text)
        .unwrap()
        .finish(no_env)
        .unwrap_err();
    assert!(err.to_string().contains("duplicate series name: x"));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = TandemConfig::from_toml("[store\nurl = ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = TandemConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.fanout.max_workers, DEFAULT_MAX_WORKERS);
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tandem.toml");
    std::fs::write(&path, "[fanout]\nmax_workers = 2\n").unwrap();
    let config = TandemConfig::load(&path).unwrap();
    assert_eq!(config.fanout.max_workers, 2);
}
