use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use client_core::{content_store::DEFAULT_API_VERSION, CdnImageResolver, ContentStoreConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Hosted content backend over HTTP.
    Content,
    /// Local SQLite order store.
    Local,
}

impl Backend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "content" | "remote" => Some(Backend::Content),
            "local" | "sqlite" => Some(Backend::Local),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: Backend,
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub api_version: String,
    pub api_token: Option<String>,
    pub api_host: Option<String>,
    /// Image host override, for stand-in backends that serve their own assets.
    pub cdn_base: Option<String>,
    pub database_url: String,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::Content,
            project_id: None,
            dataset: None,
            api_version: DEFAULT_API_VERSION.into(),
            api_token: None,
            api_host: None,
            cdn_base: None,
            database_url: "sqlite://./data/orders.db".into(),
            request_timeout_secs: 15,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn content_config(&self) -> Result<ContentStoreConfig> {
        let project_id = self
            .project_id
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("missing project id: set APP__PROJECT_ID or SANITY_PROJECT_ID"))?;
        let dataset = self
            .dataset
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("missing dataset: set APP__DATASET or SANITY_DATASET"))?;

        let mut config = ContentStoreConfig::new(project_id, dataset);
        config.api_version = self.api_version.clone();
        config.api_token = self.api_token.clone();
        config.api_host = self.api_host.clone();
        config.request_timeout = Duration::from_secs(self.request_timeout_secs.max(1));
        Ok(config)
    }

    pub fn image_resolver(&self, config: &ContentStoreConfig) -> CdnImageResolver {
        let resolver = CdnImageResolver::new(config.project_id.clone(), config.dataset.clone());
        match self.cdn_base.as_deref().filter(|v| !v.trim().is_empty()) {
            Some(base) => resolver.with_cdn_base(base),
            None => resolver,
        }
    }

    pub fn local_database_url(&self) -> String {
        normalize_database_url(&self.database_url)
    }
}

/// Defaults, overlaid by the config file, overlaid by the environment.
/// Returns the settings plus notes worth logging once tracing is up.
pub fn load_settings(config_path: &Path) -> (Settings, Vec<String>) {
    let mut settings = Settings::default();
    let mut notes = Vec::new();

    if let Ok(raw) = fs::read_to_string(config_path) {
        apply_file(&mut settings, &raw, &mut notes);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok(), &mut notes);

    (settings, notes)
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str, notes: &mut Vec<String>) {
    let table = match raw.parse::<toml::Table>() {
        Ok(table) => table,
        Err(err) => {
            notes.push(format!("ignoring unreadable config file: {err}"));
            return;
        }
    };

    for (key, value) in table {
        let value = match value {
            toml::Value::String(s) => s,
            other => other.to_string(),
        };
        match key.as_str() {
            "backend" => match Backend::parse(&value) {
                Some(backend) => settings.backend = backend,
                None => notes.push(format!("ignoring unknown backend '{value}'")),
            },
            "project_id" => settings.project_id = Some(value),
            "dataset" => settings.dataset = Some(value),
            "api_version" => settings.api_version = value,
            "api_host" => settings.api_host = Some(value),
            "cdn_base" => settings.cdn_base = Some(value),
            "database_url" => settings.database_url = value,
            "request_timeout_secs" => match value.parse() {
                Ok(secs) => settings.request_timeout_secs = secs,
                Err(_) => notes.push(format!("ignoring invalid request_timeout_secs '{value}'")),
            },
            "log_filter" => settings.log_filter = value,
            "api_token" => notes.push(
                "ignoring api_token in config file; provide it via APP__API_TOKEN".to_string(),
            ),
            other => notes.push(format!("ignoring unknown config key '{other}'")),
        }
    }
}

pub(crate) fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
    notes: &mut Vec<String>,
) {
    // Later names win.
    let var = |names: &[&str]| names.iter().rev().find_map(|name| lookup(name));

    if let Some(v) = var(&["APP__BACKEND"]) {
        match Backend::parse(&v) {
            Some(backend) => settings.backend = backend,
            None => notes.push(format!("ignoring unknown APP__BACKEND '{v}'")),
        }
    }
    if let Some(v) = var(&["SANITY_PROJECT_ID", "APP__PROJECT_ID"]) {
        settings.project_id = Some(v);
    }
    if let Some(v) = var(&["SANITY_DATASET", "APP__DATASET"]) {
        settings.dataset = Some(v);
    }
    if let Some(v) = var(&["SANITY_API_VERSION", "APP__API_VERSION"]) {
        settings.api_version = v;
    }
    if let Some(v) = var(&["SANITY_API_TOKEN", "APP__API_TOKEN"]) {
        settings.api_token = Some(v);
    }
    if let Some(v) = var(&["APP__API_HOST"]) {
        settings.api_host = Some(v);
    }
    if let Some(v) = var(&["APP__CDN_BASE"]) {
        settings.cdn_base = Some(v);
    }
    if let Some(v) = var(&["DATABASE_URL", "APP__DATABASE_URL"]) {
        settings.database_url = v;
    }
    if let Some(v) = var(&["APP__REQUEST_TIMEOUT_SECS"]) {
        match v.parse() {
            Ok(secs) => settings.request_timeout_secs = secs,
            Err(_) => notes.push(format!("ignoring invalid APP__REQUEST_TIMEOUT_SECS '{v}'")),
        }
    }
    if let Some(v) = var(&["RUST_LOG", "APP__LOG_FILTER"]) {
        settings.log_filter = v;
    }
}

pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if is_windows_absolute(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_database_url)
        .replace('\\', "/");
    if is_windows_absolute(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn is_windows_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
