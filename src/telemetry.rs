//! Best-effort telemetry for check-ins and incident reports.
//!
//! Events are queued on a bounded channel and delivered by one background
//! worker. Dispatch never blocks and never reports failure to the caller:
//! a full queue drops the event, and sink errors are logged and swallowed.

use crate::core::state::IncidentReport;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, warn};

/// Capacity of the outbound queue.
const QUEUE_CAPACITY: usize = 256;

/// Telemetry error types.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry config error: {0}")]
    Config(String),

    #[error("telemetry network error: {0}")]
    Network(String),

    #[error("telemetry server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("telemetry serialization error: {0}")]
    Serialization(String),
}

/// An outbound telemetry event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    StressSample {
        level: u8,
        timestamp: DateTime<Utc>,
    },
    Incident(IncidentReport),
}

/// Receiver of telemetry events.
pub trait TelemetrySink: Send {
    fn record_stress_sample(
        &self,
        level: u8,
        timestamp: DateTime<Utc>,
    ) -> Result<(), TelemetryError>;

    fn record_incident(&self, report: &IncidentReport) -> Result<(), TelemetryError>;
}

fn deliver(sink: &dyn TelemetrySink, event: &TelemetryEvent) -> Result<(), TelemetryError> {
    match event {
        TelemetryEvent::StressSample { level, timestamp } => {
            sink.record_stress_sample(*level, *timestamp)
        }
        TelemetryEvent::Incident(report) => sink.record_incident(report),
    }
}

/// Queues events for a sink running on its own thread.
pub struct TelemetryDispatcher {
    sender: Option<Sender<TelemetryEvent>>,
    worker: Option<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl TelemetryDispatcher {
    /// Start a worker thread delivering to `sink`.
    pub fn spawn<S: TelemetrySink + 'static>(sink: S) -> Self {
        let (sender, receiver) = bounded(QUEUE_CAPACITY);
        let worker = thread::Builder::new()
            .name("aura-telemetry".to_string())
            .spawn(move || run_worker(Box::new(sink), receiver));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Could not start telemetry worker, telemetry disabled: {e}");
                None
            }
        };

        Self {
            sender: worker.as_ref().map(|_| sender),
            worker,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue an event without waiting.
    pub fn dispatch(&self, event: TelemetryEvent) {
        let Some(ref sender) = self.sender else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Telemetry queue full, dropping event");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Telemetry worker gone, dropping event");
            }
        }
    }

    /// Number of events that never reached the worker.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Close the queue and wait for queued events to be delivered.
    pub fn shutdown(mut self) {
        self.sender.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TelemetryDispatcher {
    fn drop(&mut self) {
        // Closing the queue lets the worker drain and exit on its own.
        self.sender.take();
    }
}

impl std::fmt::Debug for TelemetryDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryDispatcher")
            .field("running", &self.worker.is_some())
            .field("dropped", &self.dropped())
            .finish()
    }
}

fn run_worker(sink: Box<dyn TelemetrySink>, receiver: Receiver<TelemetryEvent>) {
    for event in receiver {
        match deliver(sink.as_ref(), &event) {
            Ok(()) => debug!("Telemetry delivered: {event:?}"),
            Err(e) => debug!("Telemetry failed (ignored): {e}"),
        }
    }
}

/// Sink that only writes events to the debug log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn record_stress_sample(
        &self,
        level: u8,
        timestamp: DateTime<Utc>,
    ) -> Result<(), TelemetryError> {
        debug!(
            stress_level = level,
            ts = timestamp.timestamp_millis(),
            "telemetry stress sample"
        );
        Ok(())
    }

    fn record_incident(&self, report: &IncidentReport) -> Result<(), TelemetryError> {
        debug!(id = %report.id, injury_type = %report.injury_type, "telemetry incident");
        Ok(())
    }
}

/// Sink that keeps events in memory, optionally failing every delivery.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records each attempt and then reports a network error.
    pub fn failing() -> Self {
        Self {
            events: Arc::default(),
            fail: true,
        }
    }

    /// Events delivered (or attempted, for a failing sink) so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
        if self.fail {
            return Err(TelemetryError::Network("unreachable".to_string()));
        }
        Ok(())
    }
}

impl TelemetrySink for MemorySink {
    fn record_stress_sample(
        &self,
        level: u8,
        timestamp: DateTime<Utc>,
    ) -> Result<(), TelemetryError> {
        self.push(TelemetryEvent::StressSample { level, timestamp })
    }

    fn record_incident(&self, report: &IncidentReport) -> Result<(), TelemetryError> {
        self.push(TelemetryEvent::Incident(report.clone()))
    }
}

/// Stress sample payload sent to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct StressPayload {
    pub device_id: String,
    pub level: u8,
    /// Milliseconds since the Unix epoch
    pub ts: i64,
}

/// Incident payload sent to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentPayload {
    pub device_id: String,
    pub id: String,
    pub date: String,
    pub description: String,
    #[serde(rename = "injuryType")]
    pub injury_type: String,
}

/// Gateway endpoint configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway host (default: 127.0.0.1)
    pub host: String,
    pub port: u16,
    /// Bearer authentication token
    pub token: String,
}

impl GatewayConfig {
    pub fn new(host: impl Into<String>, port: u16, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            token: token.into(),
        }
    }

    /// Get the full gateway URL.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn stress_url(&self) -> String {
        format!("{}/v1/stress-samples", self.url())
    }

    pub fn incident_url(&self) -> String {
        format!("{}/v1/incidents", self.url())
    }
}

/// HTTP sink posting events to a gateway.
#[cfg(feature = "gateway")]
pub struct GatewaySink {
    config: GatewayConfig,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    device_id: String,
}

#[cfg(feature = "gateway")]
impl GatewaySink {
    pub fn new(config: GatewayConfig) -> Result<Self, TelemetryError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TelemetryError::Config(format!("Failed to create runtime: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| TelemetryError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Generate device ID from hostname + instance
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let device_id = format!(
            "aura-{}-{}",
            hostname,
            &uuid::Uuid::new_v4().to_string()[..8]
        );

        Ok(Self {
            config,
            client,
            runtime,
            device_id,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    fn post<T: Serialize>(&self, url: String, body: &T) -> Result<(), TelemetryError> {
        self.runtime.block_on(async {
            let response = self
                .client
                .post(url)
                .header("Authorization", format!("Bearer {}", self.config.token))
                .json(body)
                .send()
                .await
                .map_err(|e| TelemetryError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(TelemetryError::Server {
                    status: status.as_u16(),
                    message,
                });
            }
            Ok(())
        })
    }
}

#[cfg(feature = "gateway")]
impl TelemetrySink for GatewaySink {
    fn record_stress_sample(
        &self,
        level: u8,
        timestamp: DateTime<Utc>,
    ) -> Result<(), TelemetryError> {
        let payload = StressPayload {
            device_id: self.device_id.clone(),
            level,
            ts: timestamp.timestamp_millis(),
        };
        self.post(self.config.stress_url(), &payload)
    }

    fn record_incident(&self, report: &IncidentReport) -> Result<(), TelemetryError> {
        let payload = IncidentPayload {
            device_id: self.device_id.clone(),
            id: report.id.to_string(),
            date: report.date.clone(),
            description: report.description.clone(),
            injury_type: report.injury_type.clone(),
        };
        self.post(self.config.incident_url(), &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_reaches_sink() {
        let sink = MemorySink::new();
        let dispatcher = TelemetryDispatcher::spawn(sink.clone());
        let now = Utc::now();
        dispatcher.dispatch(TelemetryEvent::StressSample {
            level: 3,
            timestamp: now,
        });
        dispatcher.shutdown();

        assert_eq!(
            sink.events(),
            vec![TelemetryEvent::StressSample {
                level: 3,
                timestamp: now
            }]
        );
    }

    #[test]
    fn test_failing_sink_is_swallowed() {
        let sink = MemorySink::failing();
        let dispatcher = TelemetryDispatcher::spawn(sink.clone());
        dispatcher.dispatch(TelemetryEvent::StressSample {
            level: 5,
            timestamp: Utc::now(),
        });
        dispatcher.dispatch(TelemetryEvent::StressSample {
            level: 1,
            timestamp: Utc::now(),
        });
        assert_eq!(dispatcher.dropped(), 0);
        dispatcher.shutdown();
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_gateway_config_url() {
        let config = GatewayConfig::new("127.0.0.1", 8080, "test-token");
        assert_eq!(config.url(), "http://127.0.0.1:8080");
        assert_eq!(
            config.stress_url(),
            "http://127.0.0.1:8080/v1/stress-samples"
        );
        assert_eq!(config.incident_url(), "http://127.0.0.1:8080/v1/incidents");
    }
}
