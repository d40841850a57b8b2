use chrono::{SubsecRound, Utc};

use shared::{
    domain::Celsius,
    protocol::{LogEntry, Reaction},
};

use crate::{ObserverError, TemperatureObserver};

pub const DEFAULT_ALARM_THRESHOLD: Celsius = Celsius(30.0);

/// Renders every reading as a human-readable line.
#[derive(Debug, Default)]
pub struct ScreenDisplay;

impl TemperatureObserver for ScreenDisplay {
    fn label(&self) -> &'static str {
        "display"
    }

    fn on_update(&mut self, value: Celsius) -> Result<Option<Reaction>, ObserverError> {
        Ok(Some(Reaction::Display {
            rendered: format!("displaying {value}"),
        }))
    }
}

/// Append-only history of every reading this observer saw, with wall-clock
/// timestamps truncated to whole seconds. Grows without bound for the life of
/// the session.
#[derive(Debug, Default)]
pub struct TemperatureLog {
    entries: Vec<LogEntry>,
}

impl TemperatureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The full history in insertion order, ready for charting.
    pub fn export(&self) -> Vec<LogEntry> {
        self.entries.clone()
    }
}

impl TemperatureObserver for TemperatureLog {
    fn label(&self) -> &'static str {
        "logger"
    }

    fn on_update(&mut self, value: Celsius) -> Result<Option<Reaction>, ObserverError> {
        let recorded_at = Utc::now().trunc_subsecs(0);
        self.entries.push(LogEntry { recorded_at, value });
        Ok(Some(Reaction::Logged { recorded_at, value }))
    }
}

/// Signals whenever a reading is strictly above the threshold. A reading at
/// exactly the threshold stays silent.
#[derive(Debug)]
pub struct ThresholdAlarm {
    threshold: Celsius,
}

impl Default for ThresholdAlarm {
    fn default() -> Self {
        Self::new(DEFAULT_ALARM_THRESHOLD)
    }
}

impl ThresholdAlarm {
    pub fn new(threshold: Celsius) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Celsius {
        self.threshold
    }
}

impl TemperatureObserver for ThresholdAlarm {
    fn label(&self) -> &'static str {
        "alarm"
    }

    fn on_update(&mut self, value: Celsius) -> Result<Option<Reaction>, ObserverError> {
        if value > self.threshold {
            Ok(Some(Reaction::AlarmRaised {
                value,
                threshold: self.threshold,
            }))
        } else {
            Ok(None)
        }
    }
}
