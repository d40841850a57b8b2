use std::{collections::HashMap, sync::Arc, sync::Mutex as StdMutex};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use sensor_core::{
    observer_handle, ObserverHandle, ScreenDisplay, SensorError, TemperatureLog,
    TemperatureSensor, ThresholdAlarm,
};
use shared::{
    domain::{Celsius, ObserverKind, SessionId},
    error::{ApiError, ErrorCode},
    protocol::{LogEntry, ReadingReport, SessionSummary},
};

/// Accepted range for readings coming in over the shell. The core sensor
/// accepts any finite value; this bound mirrors the input widget of the demo
/// UI and is configuration, not core behavior.
#[derive(Debug, Clone, Copy)]
pub struct ReadingLimits {
    pub min: Celsius,
    pub max: Celsius,
}

impl Default for ReadingLimits {
    fn default() -> Self {
        Self {
            min: Celsius(-50.0),
            max: Celsius(100.0),
        }
    }
}

impl ReadingLimits {
    pub fn contains(&self, value: Celsius) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One interactive session: a sensor with the three built-in observers
/// attached at creation, in the demo's canonical order. The session keeps its
/// own handles so observers can be detached and re-attached by kind, and so
/// the logger's history stays reachable after a detach.
pub struct SensorSession {
    sensor: TemperatureSensor,
    created_at: DateTime<Utc>,
    display: ObserverHandle,
    logger: Arc<StdMutex<TemperatureLog>>,
    logger_handle: ObserverHandle,
    alarm: ObserverHandle,
}

impl SensorSession {
    fn new(alarm_threshold: Celsius) -> Self {
        let display = observer_handle(ScreenDisplay);
        let logger = Arc::new(StdMutex::new(TemperatureLog::new()));
        let logger_handle: ObserverHandle = logger.clone();
        let alarm = observer_handle(ThresholdAlarm::new(alarm_threshold));

        let mut sensor = TemperatureSensor::new();
        sensor.attach(display.clone());
        sensor.attach(logger_handle.clone());
        sensor.attach(alarm.clone());

        Self {
            sensor,
            created_at: Utc::now(),
            display,
            logger,
            logger_handle,
            alarm,
        }
    }

    fn handle_for(&self, kind: ObserverKind) -> &ObserverHandle {
        match kind {
            ObserverKind::Display => &self.display,
            ObserverKind::Logger => &self.logger_handle,
            ObserverKind::Alarm => &self.alarm,
        }
    }

    fn summary(&self, session_id: SessionId) -> SessionSummary {
        SessionSummary {
            session_id,
            created_at: self.created_at,
            current_value: self.sensor.current_value(),
            observers: self.sensor.observer_labels(),
        }
    }
}

/// Shared handle to all per-session state. Sessions never share a sensor or a
/// history; the registry is the only cross-session structure.
#[derive(Clone)]
pub struct ApiContext {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Mutex<SensorSession>>>>>,
    pub limits: ReadingLimits,
    pub alarm_threshold: Celsius,
}

impl ApiContext {
    pub fn new(limits: ReadingLimits, alarm_threshold: Celsius) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            limits,
            alarm_threshold,
        }
    }
}

pub async fn create_session(ctx: &ApiContext) -> SessionSummary {
    let session_id = SessionId::generate();
    let session = SensorSession::new(ctx.alarm_threshold);
    let summary = session.summary(session_id);
    ctx.sessions
        .write()
        .await
        .insert(session_id, Arc::new(Mutex::new(session)));
    info!(%session_id, "session created");
    summary
}

pub async fn list_sessions(ctx: &ApiContext) -> Vec<SessionSummary> {
    let sessions = ctx.sessions.read().await;
    let mut summaries = Vec::with_capacity(sessions.len());
    for (session_id, session) in sessions.iter() {
        summaries.push(session.lock().await.summary(*session_id));
    }
    summaries
}

pub async fn session_summary(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<SessionSummary, ApiError> {
    let session = session(ctx, session_id).await?;
    let session = session.lock().await;
    Ok(session.summary(session_id))
}

/// Validates the reading against the configured range, stores it and returns
/// the full notify report.
pub async fn record_reading(
    ctx: &ApiContext,
    session_id: SessionId,
    value: f64,
) -> Result<ReadingReport, ApiError> {
    let value = Celsius(value);
    if !value.is_finite() {
        return Err(ApiError::validation("reading must be a finite number"));
    }
    if !ctx.limits.contains(value) {
        return Err(ApiError::validation(format!(
            "reading {value} is outside the accepted range {}..={}",
            ctx.limits.min, ctx.limits.max
        )));
    }

    let session = session(ctx, session_id).await?;
    let mut session = session.lock().await;
    let report = session.sensor.set_value(value).map_err(sensor_error)?;
    info!(
        %session_id,
        value = value.0,
        reactions = report.reactions.len(),
        alarm = report.alarm_raised(),
        "reading recorded"
    );
    Ok(report)
}

/// The session's full temperature history, oldest first.
pub async fn session_history(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<Vec<LogEntry>, ApiError> {
    let session = session(ctx, session_id).await?;
    let session = session.lock().await;
    let logger = session
        .logger
        .lock()
        .map_err(|_| ApiError::new(ErrorCode::Internal, "logger state is poisoned"))?;
    Ok(logger.export())
}

/// Re-attaches the session's observer of the given kind at the end of the
/// notification order. Attaching a kind that is already attached is allowed
/// and duplicates it, matching the core's contract.
pub async fn attach_observer(
    ctx: &ApiContext,
    session_id: SessionId,
    kind: ObserverKind,
) -> Result<SessionSummary, ApiError> {
    let session = session(ctx, session_id).await?;
    let mut session = session.lock().await;
    let handle = session.handle_for(kind).clone();
    session.sensor.attach(handle);
    info!(%session_id, %kind, "observer attached");
    Ok(session.summary(session_id))
}

pub async fn detach_observer(
    ctx: &ApiContext,
    session_id: SessionId,
    kind: ObserverKind,
) -> Result<SessionSummary, ApiError> {
    let session = session(ctx, session_id).await?;
    let mut session = session.lock().await;
    let handle = session.handle_for(kind).clone();
    session
        .sensor
        .detach(&handle)
        .map_err(|_| ApiError::not_found(format!("{kind} observer is not attached")))?;
    info!(%session_id, %kind, "observer detached");
    Ok(session.summary(session_id))
}

pub async fn drop_session(ctx: &ApiContext, session_id: SessionId) -> Result<(), ApiError> {
    ctx.sessions
        .write()
        .await
        .remove(&session_id)
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("session not found"))?;
    info!(%session_id, "session closed");
    Ok(())
}

async fn session(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<Arc<Mutex<SensorSession>>, ApiError> {
    ctx.sessions
        .read()
        .await
        .get(&session_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("session not found"))
}

fn sensor_error(error: SensorError) -> ApiError {
    match error {
        SensorError::InvalidValue => ApiError::validation(error.to_string()),
        SensorError::ObserverNotFound => ApiError::new(ErrorCode::Internal, error.to_string()),
    }
}
