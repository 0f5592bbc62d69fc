// パス: tests/config.rs
// 役割: ブリッジ設定の読み込みテスト
// 意図: 既定値、上書き、未知キーの拒否、可変長メソッドの固定挙動を保証する
// 関連ファイル: src/config.rs
use std::time::Duration;

use rugo::{BridgeConfig, ConfigError};

#[test]
fn defaults_match_documented_values() {
    let cfg = BridgeConfig::default();
    assert_eq!(cfg.resolver_timeout(), Duration::from_secs(30));
    assert!(!cfg.verbose_skips);
    assert_eq!(cfg.resolver_command, vec!["rugo-typeinfo"]);
    assert!(cfg.skip_variadic_methods);
    assert_eq!(BridgeConfig::from_json_str("{}").expect("empty object"), cfg);
}

#[test]
fn json_overrides_selected_fields() {
    let cfg = BridgeConfig::from_json_str(
        r#"{"resolver_timeout_ms": 1500, "verbose_skips": true, "resolver_command": ["go", "run", "./typeinfo"]}"#,
    )
    .expect("config");
    assert_eq!(cfg.resolver_timeout(), Duration::from_millis(1500));
    assert!(cfg.verbose_skips);
    let resolver = cfg.command_resolver().expect("resolver");
    assert_eq!(resolver.timeout(), Duration::from_millis(1500));
}

#[test]
fn variadic_method_skipping_cannot_be_disabled() {
    let cfg = BridgeConfig::from_json_str(r#"{"skip_variadic_methods": false}"#).expect("config");
    assert!(cfg.skip_variadic_methods);
}

#[test]
fn unknown_keys_and_empty_command_are_rejected() {
    let err = BridgeConfig::from_json_str(r#"{"timeout": 5}"#).expect_err("unknown key");
    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(err.to_string().starts_with("[CONFIG002]"));

    let err = BridgeConfig::from_json_str(r#"{"resolver_command": []}"#).expect_err("empty");
    assert!(matches!(err, ConfigError::EmptyCommand));
}

#[test]
fn file_loading_reports_path_on_failure() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("bridge.json");
    std::fs::write(&path, r#"{"verbose_skips": true}"#).expect("write");
    assert!(BridgeConfig::from_file(&path).expect("load").verbose_skips);

    let missing = tmp.path().join("absent.json");
    match BridgeConfig::from_file(&missing) {
        Err(ConfigError::Io { path, .. }) => assert_eq!(path, missing),
        other => panic!("unexpected {other:?}"),
    }
}
