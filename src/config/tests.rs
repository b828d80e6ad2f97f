use std::io::Write;

use super::*;

fn memory_raw() -> RawSettings {
    let mut raw = RawSettings::default();
    raw.database.backend = Some("memory".to_string());
    raw
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = memory_raw();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cache_defaults_match_documented_ttls() {
    let settings = Settings::from_raw(memory_raw()).expect("valid settings");
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.capacity.get(), DEFAULT_CACHE_CAPACITY);
    assert_eq!(settings.cache.detail_ttl, Duration::from_secs(900));
    assert_eq!(settings.cache.comments_ttl, Duration::from_secs(300));
    assert_eq!(settings.cache.session_ttl, Duration::from_secs(2_592_000));
    assert_eq!(settings.auth.reset_token_ttl, Duration::from_secs(3600));
}

#[test]
fn postgres_backend_requires_url() {
    let raw = RawSettings::default();
    let err = Settings::from_raw(raw).expect_err("missing url must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "database.url",
            ..
        }
    ));
}

#[test]
fn postgres_backend_with_url_is_accepted() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("  postgres://localhost/agora  ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.backend, StoreBackend::Postgres);
    assert_eq!(
        settings.database.url.as_deref(),
        Some("postgres://localhost/agora")
    );
}

#[test]
fn unknown_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.database.backend = Some("sqlite".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown backend");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "database.backend",
            ..
        }
    ));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = memory_raw();
    raw.cache.comments_ttl_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero ttl");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.comments_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn zero_cache_capacity_is_rejected() {
    let mut raw = memory_raw();
    raw.cache.capacity = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = memory_raw();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn uploads_limit_defaults_to_10_mib() {
    let settings = Settings::from_raw(memory_raw()).expect("valid settings");
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
}

#[test]
fn maintenance_commands_force_postgres() {
    let mut raw = memory_raw();
    raw.apply_database_override(&DatabaseOverride {
        database_url: Some("postgres://db/agora".to_string()),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.backend, StoreBackend::Postgres);
}

#[test]
fn cache_settings_convert_into_cache_config() {
    let mut raw = memory_raw();
    raw.cache.detail_ttl_seconds = Some(60);
    let settings = Settings::from_raw(raw).expect("valid settings");
    let config = crate::cache::CacheConfig::from(&settings.cache);
    assert_eq!(config.detail_ttl(), Duration::from_secs(60));
    assert_eq!(config.capacity, DEFAULT_CACHE_CAPACITY);
}

#[test]
fn cli_parses_promote_command() {
    let args = CliArgs::try_parse_from(["agora", "promote", "admin@example.com"])
        .expect("valid arguments");
    match args.command {
        Some(Command::Promote(promote)) => assert_eq!(promote.email, "admin@example.com"),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
#[serial_test::serial]
fn environment_overrides_config_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    writeln!(file, "[server]\nport = 5000\n\n[database]\nbackend = \"memory\"")
        .expect("write config");

    // SAFETY: environment mutations in this module are serialised.
    unsafe { std::env::set_var("AGORA__SERVER__PORT", "6000") };
    let cli = CliArgs {
        config_file: Some(file.path().to_path_buf()),
        command: None,
    };
    let loaded = load(&cli);
    unsafe { std::env::remove_var("AGORA__SERVER__PORT") };

    let settings = loaded.expect("valid settings");
    assert_eq!(settings.server.addr.port(), 6000);
    assert_eq!(settings.database.backend, StoreBackend::Memory);
}
