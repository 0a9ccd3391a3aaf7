use super::{apply_env, apply_file, load_settings, normalize_database_url, Backend, Settings};
use client_core::ImageResolver;
use shared::domain::ImageRef;

use std::collections::HashMap;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn normalizes_windows_plain_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn converts_sqlite_double_slash_windows_path() {
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/alice/test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn empty_database_url_falls_back_to_default() {
    assert_eq!(
        normalize_database_url("  "),
        Settings::default().database_url
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn file_values_apply_but_tokens_are_refused() {
    let mut settings = Settings::default();
    let mut notes = Vec::new();
    apply_file(
        &mut settings,
        r#"
backend = "local"
project_id = "proj1"
dataset = "production"
request_timeout_secs = 30
api_token = "should-not-be-here"
mystery = 1
"#,
        &mut notes,
    );

    assert_eq!(settings.backend, Backend::Local);
    assert_eq!(settings.project_id.as_deref(), Some("proj1"));
    assert_eq!(settings.request_timeout_secs, 30);
    assert_eq!(settings.api_token, None);
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().any(|n| n.contains("api_token")));
}

#[test]
fn unreadable_file_is_noted_and_ignored() {
    let mut settings = Settings::default();
    let mut notes = Vec::new();
    apply_file(&mut settings, "backend = [unterminated", &mut notes);
    assert_eq!(settings.backend, Backend::Content);
    assert_eq!(notes.len(), 1);
}

#[test]
fn app_prefixed_env_wins_over_backend_names() {
    let mut settings = Settings::default();
    let mut notes = Vec::new();
    apply_env(
        &mut settings,
        env_of(&[
            ("SANITY_PROJECT_ID", "from-sanity"),
            ("APP__PROJECT_ID", "from-app"),
            ("SANITY_DATASET", "production"),
            ("SANITY_API_TOKEN", "tok"),
            ("APP__REQUEST_TIMEOUT_SECS", "soon"),
        ]),
        &mut notes,
    );

    assert_eq!(settings.project_id.as_deref(), Some("from-app"));
    assert_eq!(settings.dataset.as_deref(), Some("production"));
    assert_eq!(settings.api_token.as_deref(), Some("tok"));
    assert_eq!(settings.request_timeout_secs, 15);
    assert_eq!(notes.len(), 1);
}

#[test]
fn content_config_requires_project_and_dataset() {
    let mut settings = Settings::default();
    let err = settings.content_config().expect_err("missing project");
    assert!(err.to_string().contains("APP__PROJECT_ID"));

    settings.project_id = Some("proj1".into());
    let err = settings.content_config().expect_err("missing dataset");
    assert!(err.to_string().contains("APP__DATASET"));

    settings.dataset = Some("production".into());
    settings.api_token = Some("tok".into());
    let config = settings.content_config().expect("config");
    assert_eq!(config.project_id, "proj1");
    assert_eq!(config.api_token.as_deref(), Some("tok"));
    assert_eq!(config.api_version, "2025-02-03");
}

#[test]
fn image_urls_follow_the_configured_cdn_base() {
    let mut settings = Settings::default();
    settings.project_id = Some("proj1".into());
    settings.dataset = Some("production".into());
    let image = ImageRef("image-abc123-40x40-png".into());

    let config = settings.content_config().expect("config");
    assert_eq!(
        settings.image_resolver(&config).resolve(&image).as_deref(),
        Some("https://cdn.sanity.io/images/proj1/production/abc123-40x40.png")
    );

    let mut notes = Vec::new();
    apply_env(
        &mut settings,
        env_of(&[("APP__CDN_BASE", "http://127.0.0.1:9000/")]),
        &mut notes,
    );
    assert!(notes.is_empty());
    assert_eq!(
        settings.image_resolver(&config).resolve(&image).as_deref(),
        Some("http://127.0.0.1:9000/images/proj1/production/abc123-40x40.png")
    );
}

#[test]
fn loads_settings_from_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("admin.toml");
    std::fs::write(&path, "backend = \"local\"\ndatabase_url = \"./orders.db\"\n").expect("write");

    let (settings, _notes) = load_settings(&path);
    if std::env::var("APP__BACKEND").is_err() {
        assert_eq!(settings.backend, Backend::Local);
    }
    if std::env::var("DATABASE_URL").is_err() && std::env::var("APP__DATABASE_URL").is_err() {
        assert_eq!(settings.local_database_url(), "sqlite://./orders.db");
    }
}
