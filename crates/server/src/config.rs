use std::{
    env, fmt, fs,
    net::SocketAddr,
    path::Path,
    str::FromStr,
    time::Duration,
};

use anyhow::{bail, Context};
use control::{SupervisorConfig, Tuning};
use serde::Deserialize;
use shared::domain::{EngineVariant, Target, TargetKind};

pub const DEFAULT_CONFIG_FILE: &str = "mixkeys.toml";

/// Raw settings as read from the config file, environment and flags.
/// [`Settings::resolve`] turns them into typed runtime values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bind_addr: String,
    /// Which engine to drive. Must be set; there is no default.
    pub engine_backend: String,
    pub target_kind: String,
    pub target_index: u32,
    pub gain_step: f64,
    pub engine_variant: String,
    pub key_source: String,
    pub pre_read_settle_ms: u64,
    pub verify_settle_ms: u64,
    pub tick_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".into(),
            engine_backend: String::new(),
            target_kind: "strip".into(),
            target_index: 5,
            gain_step: 1.0,
            engine_variant: "potato".into(),
            key_source: "stdin".into(),
            pre_read_settle_ms: 40,
            verify_settle_ms: 50,
            tick_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySourceKind {
    /// One key per line on standard input.
    Stdin,
    /// No key capture; only the HTTP surface is active.
    None,
}

impl fmt::Display for KeySourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdin => "stdin",
            Self::None => "none",
        })
    }
}

impl FromStr for KeySourceKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stdin" => Ok(Self::Stdin),
            "none" | "off" => Ok(Self::None),
            other => bail!("unknown key source '{other}': expected stdin or none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineBackendKind {
    /// In-process engine; no real mixer is controlled.
    Simulated,
}

impl fmt::Display for EngineBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simulated => "simulated",
        })
    }
}

impl FromStr for EngineBackendKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" => bail!(
                "engine_backend is not set; choose one explicitly (available in this build: simulated)"
            ),
            "simulated" => Ok(Self::Simulated),
            "voicemeeter" => bail!(
                "engine backend 'voicemeeter' is not available in this build (available: simulated)"
            ),
            other => bail!("unknown engine backend '{other}': expected simulated"),
        }
    }
}

/// Validated settings, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: SocketAddr,
    pub engine_backend: EngineBackendKind,
    pub initial_target: Target,
    pub gain_step: f64,
    pub engine_variant: EngineVariant,
    pub key_source: KeySourceKind,
    pub tuning: Tuning,
    pub supervisor: SupervisorConfig,
}

impl Settings {
    pub fn resolve(&self) -> anyhow::Result<RuntimeConfig> {
        let bind_addr: SocketAddr = self
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind_addr '{}'", self.bind_addr))?;
        let engine_backend: EngineBackendKind = self.engine_backend.parse()?;
        let kind: TargetKind = self.target_kind.parse()?;
        let engine_variant: EngineVariant =
            self.engine_variant.parse().map_err(anyhow::Error::msg)?;
        let key_source: KeySourceKind = self.key_source.parse()?;

        if !self.gain_step.is_finite() || self.gain_step <= 0.0 {
            bail!("gain_step must be a positive number of dB, got {}", self.gain_step);
        }
        if self.tick_ms == 0 {
            bail!("tick_ms must be greater than zero");
        }

        Ok(RuntimeConfig {
            bind_addr,
            engine_backend,
            initial_target: Target {
                kind,
                index: self.target_index,
            },
            gain_step: self.gain_step,
            engine_variant,
            key_source,
            tuning: Tuning {
                pre_read_settle: Duration::from_millis(self.pre_read_settle_ms),
                verify_settle: Duration::from_millis(self.verify_settle_ms),
                ..Tuning::default()
            },
            supervisor: SupervisorConfig {
                tick: Duration::from_millis(self.tick_ms),
                ..SupervisorConfig::default()
            },
        })
    }
}

/// Defaults, then the config file, then `APP__*` environment overrides.
/// An explicitly named file must exist; the default one is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_from(config_path, |key| env::var(key).ok())
}

pub fn load_settings_from(
    config_path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = match config_path {
        Some(path) => read_settings_file(path)?,
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                read_settings_file(path)?
            } else {
                Settings::default()
            }
        }
    };
    apply_env(&mut settings, lookup)?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config file '{}'", path.display()))
}

fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = lookup("APP__ENGINE_BACKEND") {
        settings.engine_backend = v;
    }
    if let Some(v) = lookup("APP__TARGET_KIND") {
        settings.target_kind = v;
    }
    if let Some(v) = lookup("APP__TARGET_INDEX") {
        settings.target_index = parse_env("APP__TARGET_INDEX", &v)?;
    }
    if let Some(v) = lookup("APP__GAIN_STEP") {
        settings.gain_step = parse_env("APP__GAIN_STEP", &v)?;
    }
    if let Some(v) = lookup("APP__ENGINE_VARIANT") {
        settings.engine_variant = v;
    }
    if let Some(v) = lookup("APP__KEY_SOURCE") {
        settings.key_source = v;
    }
    if let Some(v) = lookup("APP__PRE_READ_SETTLE_MS") {
        settings.pre_read_settle_ms = parse_env("APP__PRE_READ_SETTLE_MS", &v)?;
    }
    if let Some(v) = lookup("APP__VERIFY_SETTLE_MS") {
        settings.verify_settle_ms = parse_env("APP__VERIFY_SETTLE_MS", &v)?;
    }
    if let Some(v) = lookup("APP__TICK_MS") {
        settings.tick_ms = parse_env("APP__TICK_MS", &v)?;
    }
    Ok(())
}

fn parse_env<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid value '{raw}' for {key}"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
