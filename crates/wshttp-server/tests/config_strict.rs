#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use wshttp_server::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "127.0.0.1:8080"
  hearbeat: true # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config_uses_defaults() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    assert_eq!(cfg.server.path, "/websocket/http");
    assert!(!cfg.server.heartbeat);
    assert_eq!(cfg.server.idle_timeout_ms, 60000);
    assert_eq!(cfg.server.request_timeout_ms, 60000);
}

#[test]
fn wrong_version_is_rejected() {
    let err = config::load_from_str("version: 3\n").expect_err("must fail");
    assert_eq!(err.code(), "UNSUPPORTED_VERSION");
}

#[test]
fn range_checks() {
    let cases = [
        "version: 1\nserver:\n  path: \"websocket\"\n",
        "version: 1\nserver:\n  idle_timeout_ms: 500\n",
        "version: 1\nserver:\n  request_timeout_ms: 700000\n",
        "version: 1\nserver:\n  outbound_queue: 0\n",
    ];
    for c in cases {
        let err = config::load_from_str(c).expect_err(c);
        assert_eq!(err.code(), "BAD_REQUEST", "{c}");
    }
}

#[test]
fn shipped_sample_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../wshttp-server.yaml");
    let cfg = config::load_from_file(path).expect("sample config must load");
    assert!(cfg.server.heartbeat);
    assert_eq!(cfg.server.path, "/websocket/http");
}
