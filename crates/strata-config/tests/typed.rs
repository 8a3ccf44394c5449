//! Decoding declared record, union, enum, and interface types through the
//! facade.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strata_config::{
    ConfigError, ConfigSource, MapSource, Strata, config_enum, config_interface, config_record,
    config_union,
};

config_record! {
    #[derive(Debug, PartialEq)]
    pub struct Database {
        host: String,
        port: u16 = 5432,
        replicas: Vec<String>,
        options: HashMap<String, String>,
        timeout: Duration = Duration::from_secs(30),
    }
}

config_enum! {
    #[derive(Debug, PartialEq)]
    pub enum Tier { Free, Pro, Enterprise }
}

config_record! {
    #[derive(Debug, PartialEq)]
    pub struct TokenAuth {
        token: String,
    }
}

config_record! {
    #[derive(Debug, PartialEq)]
    pub struct BasicAuth {
        username: String,
        password: String,
    }
}

config_union! {
    #[derive(Debug, PartialEq)]
    pub enum Auth {
        Token(TokenAuth),
        Basic(BasicAuth),
    }
}

config_interface! {
    pub trait HttpSettings => HttpSettingsHandle {
        fn get_bind(&self) -> String;
        fn get_port(&self) -> u16 = 8080;
        fn is_compression(&self) -> bool = true;
    }
}

fn strata(source: MapSource) -> Strata {
    let config = Strata::new(vec![Arc::new(source) as Arc<dyn ConfigSource>]).unwrap();
    config.load().unwrap();
    config
}

/// A whole subtree decodes into a record, collections included.
#[test]
fn records_decode_from_subtrees() {
    let config = strata(MapSource::new(
        "a",
        [
            ("db.host", "db.internal"),
            ("db.replicas[0]", "replica-a"),
            ("db.replicas[1]", "replica-b"),
            ("db.options.sslmode", "require"),
            ("db.options.application_name", "billing"),
            ("db.timeout", "250ms"),
        ],
    ));

    let db = config.get::<Database>("db").unwrap();
    assert_eq!(db.host, "db.internal");
    assert_eq!(db.port, 5432, "declared default fills the absent field");
    assert_eq!(db.replicas, vec!["replica-a", "replica-b"]);
    assert_eq!(db.options.get("sslmode").map(String::as_str), Some("require"));
    assert_eq!(db.timeout, Duration::from_millis(250));
}

/// A record missing a required field fails a required lookup with the
/// full error list.
#[test]
fn records_report_missing_required_fields() {
    let config = strata(MapSource::new("a", [("db.port", "5432")]));
    match config.get::<Database>("db") {
        Err(ConfigError::ResultsFailed { errors, .. }) => {
            assert!(errors.iter().any(|e| e.path == "db.host"));
        }
        other => panic!("expected ResultsFailed, got {other:?}"),
    }
}

/// Enum leaves match case-insensitively.
#[test]
fn enums_decode_from_variant_names() {
    let config = strata(MapSource::new(
        "a",
        [("plan.tier", "pro"), ("plan.bad", "platinum")],
    ));
    assert_eq!(config.get::<Tier>("plan.tier").unwrap(), Tier::Pro);
    assert!(config.get::<Tier>("plan.bad").is_err());
}

/// Union variants are chosen by structural fit, no discriminator needed.
#[test]
fn unions_decode_by_shape() {
    let config = strata(MapSource::new(
        "a",
        [
            ("auth.primary.token", "abc123"),
            ("auth.fallback.username", "ada"),
            ("auth.fallback.password", "pw"),
        ],
    ));
    assert_eq!(
        config.get::<Auth>("auth.primary").unwrap(),
        Auth::Token(TokenAuth {
            token: "abc123".to_string()
        })
    );
    assert_eq!(
        config.get::<Auth>("auth.fallback").unwrap(),
        Auth::Basic(BasicAuth {
            username: "ada".to_string(),
            password: "pw".to_string(),
        })
    );
}

/// Interfaces decode into proxy-backed handles; defaults cover absent keys
/// and decoded values win over defaults.
#[test]
fn interfaces_decode_into_handles() {
    let config = strata(MapSource::new(
        "a",
        [("http.bind", "0.0.0.0"), ("http.port", "9443")],
    ));
    let http = config.get::<HttpSettingsHandle>("http").unwrap();
    assert_eq!(http.get_bind(), "0.0.0.0");
    assert_eq!(http.get_port(), 9443);
    assert!(http.is_compression(), "declared default applies");
}

/// Scalars, lists from comma leaves, sets, maps, and optionals all decode
/// through the same registry.
#[test]
fn built_in_container_decoding() {
    let config = strata(MapSource::new(
        "a",
        [
            ("flags", "a, b, c"),
            ("limits.cpu", "4"),
            ("limits.mem", "512"),
        ],
    ));
    assert_eq!(
        config.get::<Vec<String>>("flags").unwrap(),
        vec!["a", "b", "c"]
    );
    let limits = config.get::<HashMap<String, u64>>("limits").unwrap();
    assert_eq!(limits.get("mem"), Some(&512));
    assert_eq!(
        config.get_optional::<Vec<String>>("missing").unwrap(),
        None
    );
}
