use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A temperature reading in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Celsius(pub f64);

impl Celsius {
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°C", self.0)
    }
}

impl From<f64> for Celsius {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObserverKind {
    Display,
    Logger,
    Alarm,
}

impl ObserverKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObserverKind::Display => "display",
            ObserverKind::Logger => "logger",
            ObserverKind::Alarm => "alarm",
        }
    }
}

impl fmt::Display for ObserverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObserverKind {
    type Err = UnknownObserverKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "display" => Ok(ObserverKind::Display),
            "logger" => Ok(ObserverKind::Logger),
            "alarm" => Ok(ObserverKind::Alarm),
            other => Err(UnknownObserverKind(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown observer kind `{0}`")]
pub struct UnknownObserverKind(pub String);
