use std::collections::HashMap;

use super::*;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let var = lookup(&[]);
    let val: u32 = env_parse(&var, "DB_MAX_CONNECTIONS", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    let var = lookup(&[("N", " 99 ")]);
    let val: u64 = env_parse(&var, "N", 0);
    assert_eq!(val, 99);
}

#[test]
fn env_parse_present_invalid_returns_default() {
    let var = lookup(&[("N", "notanumber")]);
    let val: u64 = env_parse(&var, "N", 7);
    assert_eq!(val, 7);
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn defaults_when_nothing_set() {
    let config = Config::from_lookup(lookup(&[])).unwrap();
    assert!(config.database_url.is_none());
    assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert!(config.campaign_id.is_none());
    assert!(config.roster_url.is_none());
    assert!(config.upload_url.is_none());
    assert_eq!(config.persist_debounce, Duration::from_millis(1000));
    assert_eq!(config.http_timeout, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
    assert_eq!(config.persistence(), PersistenceConfig::default());
}

#[test]
fn unset_session_id_is_random() {
    let a = Config::from_lookup(lookup(&[])).unwrap();
    let b = Config::from_lookup(lookup(&[])).unwrap();
    assert_ne!(a.session_id, b.session_id);
}

#[test]
fn all_values_parsed() {
    let config = Config::from_lookup(lookup(&[
        ("DATABASE_URL", "postgres://localhost/tabletop"),
        ("DB_MAX_CONNECTIONS", "12"),
        ("SESSION_ID", "6f1c7a9e-3b2d-4c1a-9e8f-0a1b2c3d4e5f"),
        ("CAMPAIGN_ID", "camp-7"),
        ("ROSTER_URL", "https://roster.example"),
        ("UPLOAD_URL", "https://files.example"),
        ("PERSIST_DEBOUNCE_MS", "250"),
        ("HTTP_TIMEOUT_SECS", "3"),
    ]))
    .unwrap();

    assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/tabletop"));
    assert_eq!(config.db_max_connections, 12);
    assert_eq!(config.session_id.to_string(), "6f1c7a9e-3b2d-4c1a-9e8f-0a1b2c3d4e5f");
    assert_eq!(config.campaign_id.as_deref(), Some("camp-7"));
    assert_eq!(config.persistence().debounce, Duration::from_millis(250));
    assert_eq!(config.http_timeout, Duration::from_secs(3));
}

#[test]
fn blank_values_count_as_unset() {
    let config = Config::from_lookup(lookup(&[("DATABASE_URL", "  "), ("UPLOAD_URL", "")])).unwrap();
    assert!(config.database_url.is_none());
    assert!(config.upload_url.is_none());
}

#[test]
fn invalid_session_id_is_an_error() {
    let err = Config::from_lookup(lookup(&[("SESSION_ID", "table-3")])).unwrap_err();
    assert!(err.to_string().starts_with("invalid SESSION_ID"));
}

#[test]
fn debounce_below_minimum_is_clamped() {
    for raw in ["0", "99"] {
        let config = Config::from_lookup(lookup(&[("PERSIST_DEBOUNCE_MS", raw)])).unwrap();
        assert_eq!(config.persist_debounce, Duration::from_millis(MIN_DEBOUNCE_MS));
    }
    let config = Config::from_lookup(lookup(&[("PERSIST_DEBOUNCE_MS", "100")])).unwrap();
    assert_eq!(config.persist_debounce, Duration::from_millis(100));
}
