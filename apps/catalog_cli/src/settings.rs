//! CLI settings: defaults, then `catalog.toml`, then `APP__*` environment.

use std::{fs, num::NonZeroU32, path::Path, time::Duration};

use anyhow::Context;
use client_core::DEFAULT_DEBOUNCE_DELAY;
use serde::Deserialize;
use shared::protocol::DEFAULT_PAGE_LIMIT;

pub const DEFAULT_SETTINGS_FILE: &str = "catalog.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub listing_path: String,
    pub page_size: u32,
    pub debounce: Duration,
    pub keep_data_on_error: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8787".into(),
            listing_path: "movies".into(),
            page_size: DEFAULT_PAGE_LIMIT,
            debounce: DEFAULT_DEBOUNCE_DELAY,
            keep_data_on_error: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    listing_path: Option<String>,
    page_size: Option<NonZeroU32>,
    debounce_ms: Option<u64>,
    keep_data_on_error: Option<bool>,
}

/// A missing file is fine when it is the default one; an explicitly named
/// file must exist.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_SETTINGS_FILE), false),
    };
    if required || path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        apply_file_settings(&mut settings, file_cfg);
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.listing_path {
        settings.listing_path = v;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v.get();
    }
    if let Some(v) = file_cfg.debounce_ms {
        settings.debounce = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.keep_data_on_error {
        settings.keep_data_on_error = v;
    }
}

fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__LISTING_PATH") {
        settings.listing_path = v;
    }
    if let Some(v) = lookup("APP__PAGE_SIZE") {
        settings.page_size = v
            .parse::<NonZeroU32>()
            .with_context(|| format!("APP__PAGE_SIZE must be a positive integer, got '{v}'"))?
            .get();
    }
    if let Some(v) = lookup("APP__DEBOUNCE_MS") {
        let millis: u64 = v
            .parse()
            .with_context(|| format!("APP__DEBOUNCE_MS must be an integer, got '{v}'"))?;
        settings.debounce = Duration::from_millis(millis);
    }
    if let Some(v) = lookup("APP__KEEP_DATA_ON_ERROR") {
        settings.keep_data_on_error = matches!(v.trim(), "1" | "true" | "yes");
    }
    Ok(())
}
