use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GAIN_MIN_DB: f64 = -60.0;
pub const GAIN_MAX_DB: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Input channel.
    Strip,
    /// Output channel.
    Bus,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strip => "strip",
            Self::Bus => "bus",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid kind '{0}': must be 'strip' or 'bus'")]
pub struct InvalidKind(pub String);

impl FromStr for TargetKind {
    type Err = InvalidKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("strip") {
            Ok(Self::Strip)
        } else if raw.eq_ignore_ascii_case("bus") {
            Ok(Self::Bus)
        } else {
            Err(InvalidKind(raw.to_string()))
        }
    }
}

/// One addressable channel on the mixing engine. Validity is only meaningful
/// relative to a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    pub index: u32,
}

impl Target {
    pub fn strip(index: u32) -> Self {
        Self {
            kind: TargetKind::Strip,
            index,
        }
    }

    pub fn bus(index: u32) -> Self {
        Self {
            kind: TargetKind::Bus,
            index,
        }
    }

    pub fn param(self, field: ParamField) -> ParamPath {
        ParamPath {
            target: self,
            field,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamField {
    Gain,
    Mute,
}

impl ParamField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gain => "gain",
            Self::Mute => "mute",
        }
    }
}

/// Engine parameter address, rendered the way the engine names it:
/// `strip[5].gain`, `bus[0].mute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamPath {
    pub target: Target,
    pub field: ParamField,
}

impl fmt::Display for ParamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.field.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineVariant {
    Basic,
    Banana,
    #[default]
    Potato,
}

impl EngineVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Banana => "banana",
            Self::Potato => "potato",
        }
    }

    /// Channel counts `(strips, buses)` of the stock layout.
    pub fn layout(self) -> (u32, u32) {
        match self {
            Self::Basic => (3, 2),
            Self::Banana => (5, 5),
            Self::Potato => (8, 8),
        }
    }
}

impl fmt::Display for EngineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineVariant {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "banana" => Ok(Self::Banana),
            "potato" => Ok(Self::Potato),
            other => Err(format!(
                "unknown engine variant '{other}': expected basic, banana or potato"
            )),
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
