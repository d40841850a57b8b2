use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use shared::{
    domain::Celsius,
    protocol::{ObserverFailure, ReadingReport},
};

pub mod observers;

pub use observers::{ScreenDisplay, TemperatureLog, ThresholdAlarm, DEFAULT_ALARM_THRESHOLD};

/// Anything that wants to hear about temperature changes.
///
/// Implementations react to one update at a time and may report what they did
/// as a [`shared::protocol::Reaction`], or fail without affecting the other
/// observers of the same sensor.
pub trait TemperatureObserver: Send {
    fn label(&self) -> &'static str;

    fn on_update(
        &mut self,
        value: Celsius,
    ) -> Result<Option<shared::protocol::Reaction>, ObserverError>;
}

/// Shared, non-owning handle to an observer. The sensor never controls an
/// observer's lifetime; callers keep their own clone to detach it later or to
/// read its accumulated state (e.g. the logger's history).
pub type ObserverHandle = Arc<Mutex<dyn TemperatureObserver>>;

pub fn observer_handle<O>(observer: O) -> ObserverHandle
where
    O: TemperatureObserver + 'static,
{
    Arc::new(Mutex::new(observer))
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ObserverError(pub String);

#[derive(Debug, Error, PartialEq)]
pub enum SensorError {
    #[error("observer is not attached to this sensor")]
    ObserverNotFound,
    #[error("temperature reading must be a finite number")]
    InvalidValue,
}

/// The subject: stores the current temperature and broadcasts every change to
/// its observers in attachment order.
pub struct TemperatureSensor {
    current: Celsius,
    observers: Vec<ObserverHandle>,
}

impl Default for TemperatureSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureSensor {
    pub fn new() -> Self {
        Self {
            current: Celsius(0.0),
            observers: Vec::new(),
        }
    }

    /// Appends an observer at the end of the notification order. Attaching
    /// the same handle twice is allowed; it will then be notified twice per
    /// cycle.
    pub fn attach(&mut self, observer: ObserverHandle) {
        self.observers.push(observer);
        debug!(count = self.observers.len(), "observer attached");
    }

    /// Removes the first attached handle that is the same allocation as
    /// `observer`. Detaching a handle that was never attached is an error so
    /// that bookkeeping bugs surface instead of being masked.
    pub fn detach(&mut self, observer: &ObserverHandle) -> Result<(), SensorError> {
        let position = self
            .observers
            .iter()
            .position(|attached| Arc::ptr_eq(attached, observer))
            .ok_or(SensorError::ObserverNotFound)?;
        self.observers.remove(position);
        debug!(count = self.observers.len(), "observer detached");
        Ok(())
    }

    /// Stores `value` as the current temperature, then notifies every
    /// attached observer with it. Non-finite readings are rejected before any
    /// state changes; the threshold comparison in the alarm would otherwise
    /// be meaningless.
    pub fn set_value(&mut self, value: Celsius) -> Result<ReadingReport, SensorError> {
        if !value.is_finite() {
            return Err(SensorError::InvalidValue);
        }
        self.current = value;
        debug!(value = value.0, "temperature updated");
        Ok(self.notify())
    }

    /// Delivers the current value to each observer exactly once, in
    /// attachment order. A failing observer is recorded in the report and
    /// never prevents the observers after it from being notified.
    pub fn notify(&mut self) -> ReadingReport {
        let mut report = ReadingReport::new(self.current);
        for handle in &self.observers {
            let mut observer = match handle.lock() {
                Ok(observer) => observer,
                Err(poisoned) => {
                    warn!("observer lock poisoned by an earlier panic; recovering");
                    poisoned.into_inner()
                }
            };
            match observer.on_update(self.current) {
                Ok(Some(reaction)) => report.reactions.push(reaction),
                Ok(None) => {}
                Err(error) => {
                    warn!(observer = observer.label(), %error, "observer reaction failed");
                    report.failures.push(ObserverFailure {
                        observer: observer.label().to_string(),
                        message: error.to_string(),
                    });
                }
            }
        }
        report
    }

    pub fn current_value(&self) -> Celsius {
        self.current
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Labels of the attached observers, in notification order.
    pub fn observer_labels(&self) -> Vec<String> {
        self.observers
            .iter()
            .map(|handle| {
                let observer = match handle.lock() {
                    Ok(observer) => observer,
                    Err(poisoned) => poisoned.into_inner(),
                };
                observer.label().to_string()
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
