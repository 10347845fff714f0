// backend/src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::engine::{EngineSettings, TimelineWindow};

#[derive(Debug, Clone, PartialEq)]
pub struct RotaConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub overtime_threshold_hours: f64,
    pub coverage_bucket_minutes: u32,
    pub window_start_hour: u32,
    pub window_end_hour: u32,
    pub min_render_minutes: u32,
    pub sync_interval: Duration,
    pub sync_feed_url: Option<String>,
}

impl Default for RotaConfig {
    fn default() -> Self {
        let settings = EngineSettings::default();
        Self {
            port: 8080,
            database_url: None,
            overtime_threshold_hours: settings.overtime_threshold_hours,
            coverage_bucket_minutes: settings.coverage_bucket_minutes,
            window_start_hour: 6,
            window_end_hour: 22,
            min_render_minutes: 15,
            sync_interval: Duration::from_secs(10),
            sync_feed_url: None,
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid {key}='{raw}'")),
        _ => Ok(default),
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl RotaConfig {
    /// Reads the environment (after `.env` has been loaded), falling back to
    /// defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();
        let cfg = Self {
            port: parse_var("PORT", d.port)?,
            database_url: optional_var("DATABASE_URL"),
            overtime_threshold_hours: parse_var("OVERTIME_THRESHOLD_HOURS", d.overtime_threshold_hours)?,
            coverage_bucket_minutes: parse_var("COVERAGE_BUCKET_MINUTES", d.coverage_bucket_minutes)?,
            window_start_hour: parse_var("TIMELINE_WINDOW_START_HOUR", d.window_start_hour)?,
            window_end_hour: parse_var("TIMELINE_WINDOW_END_HOUR", d.window_end_hour)?,
            min_render_minutes: parse_var("TIMELINE_MIN_RENDER_MINUTES", d.min_render_minutes)?,
            sync_interval: Duration::from_secs(parse_var("SYNC_INTERVAL_SECS", d.sync_interval.as_secs())?),
            sync_feed_url: optional_var("SYNC_FEED_URL"),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.engine_settings().validate().map_err(anyhow::Error::msg)?;
        self.timeline_window()?;
        if self.sync_interval.is_zero() {
            bail!("SYNC_INTERVAL_SECS must be positive");
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            overtime_threshold_hours: self.overtime_threshold_hours,
            coverage_bucket_minutes: self.coverage_bucket_minutes,
            ..EngineSettings::default()
        }
    }

    pub fn timeline_window(&self) -> anyhow::Result<TimelineWindow> {
        TimelineWindow::new(self.window_start_hour, self.window_end_hour, self.min_render_minutes)
            .context("invalid timeline window")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RotaConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.overtime_threshold_hours, 37.5);
        assert_eq!(cfg.sync_interval, Duration::from_secs(10));
    }

    #[test]
    fn rejects_bad_values() {
        let cfg = RotaConfig { coverage_bucket_minutes: 0, ..RotaConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = RotaConfig { window_start_hour: 24, ..RotaConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = RotaConfig { sync_interval: Duration::ZERO, ..RotaConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
