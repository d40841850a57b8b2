use std::fs;

use anyhow::ensure;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub alarm_threshold: f64,
    pub min_reading: f64,
    pub max_reading: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            alarm_threshold: 30.0,
            min_reading: -50.0,
            max_reading: 100.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    alarm_threshold: Option<f64>,
    min_reading: Option<f64>,
    max_reading: Option<f64>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("thermowatch.toml") {
        apply_file(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Ok(v) = std::env::var("APP__ALARM_THRESHOLD") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.alarm_threshold = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__MIN_READING") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.min_reading = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__MAX_READING") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.max_reading = parsed;
        }
    }

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<FileSettings>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.alarm_threshold {
        settings.alarm_threshold = v;
    }
    if let Some(v) = file_cfg.min_reading {
        settings.min_reading = v;
    }
    if let Some(v) = file_cfg.max_reading {
        settings.max_reading = v;
    }
}

pub fn validate_settings(settings: &Settings) -> anyhow::Result<()> {
    ensure!(
        settings.alarm_threshold.is_finite(),
        "alarm_threshold must be a finite number"
    );
    ensure!(
        settings.min_reading.is_finite() && settings.max_reading.is_finite(),
        "reading limits must be finite numbers"
    );
    ensure!(
        settings.min_reading < settings.max_reading,
        "min_reading ({}) must be below max_reading ({})",
        settings.min_reading,
        settings.max_reading
    );
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
