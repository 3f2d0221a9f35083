use std::{collections::HashMap, fs, path::PathBuf};

const SETTINGS_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub controls_path: PathBuf,
    pub state_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            controls_path: "controls.json".into(),
            state_path: "state.json".into(),
        }
    }
}

/// Defaults, then `dashboard.toml`, then environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("controls_path") {
        settings.controls_path = v.into();
    }
    if let Some(v) = file_cfg.get("state_path") {
        settings.state_path = v.into();
    }
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(port) = var("PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
        settings.server_bind = format!("0.0.0.0:{port}");
    }
    if let Some(v) = var("DASHBOARD_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("DASHBOARD_CONTROLS_PATH") {
        settings.controls_path = v.into();
    }
    if let Some(v) = var("APP__CONTROLS_PATH") {
        settings.controls_path = v.into();
    }

    if let Some(v) = var("DASHBOARD_STATE_PATH") {
        settings.state_path = v.into();
    }
    if let Some(v) = var("APP__STATE_PATH") {
        settings.state_path = v.into();
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
