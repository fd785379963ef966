//! # Connection-Role Router
//!
//! The relay tracks at most one Producer (the audio-emitting sensor) and one
//! Consumer (the controlling dashboard) at a time, forwards control signals
//! between them, and feeds audio payloads into the recording session. A new
//! connection of a role supersedes the previous one; the old socket is not
//! closed, its slot is simply reassigned.
//!
//! All frame handling runs under one lock, so session state sees a strictly
//! ordered sequence of events. The only long-running step, sink delivery, is
//! dispatched onto a spawned task after the session has already returned to
//! `Idle`, so a slow sink never gates the next recording.

use crate::inference::{decode_pcm_i16, normalize_samples, window_samples, AudioClassifier, Classification};
use crate::relay::control::{self, ControlSignal};
use crate::relay::frame::{classify, Classified, InboundFrame};
use crate::relay::session::{FinalizedRecording, RecordingSession, SessionState};
use crate::relay::wav::WAV_HEADER_LEN;
use crate::sink::{LatestRecordingStore, RecordingSink};
use crate::state::AppState;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Which side of the relay a connected peer is, decided once at
/// connection-establishment time and never renegotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// The binary-audio-emitting sensor endpoint.
    Producer,
    /// The viewing/controlling dashboard endpoint.
    Consumer,
}

impl ConnectionRole {
    /// Derive the role from the upgrade request's path and query. The
    /// sensor firmware connects with an `ESP32` marker; everything else is
    /// treated as a dashboard.
    pub fn from_uri(uri: &str) -> Self {
        if uri.contains("ESP32") {
            ConnectionRole::Producer
        } else {
            ConnectionRole::Consumer
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionRole::Producer => "producer",
            ConnectionRole::Consumer => "consumer",
        }
    }
}

/// Outbound side of a connected peer. Implemented by the WebSocket actor
/// address in production and by test doubles in unit tests.
pub trait PeerLink: Send + Sync {
    /// Queue a text frame toward the peer. Best-effort; the transport may
    /// already be gone.
    fn send_text(&self, text: &str);

    /// Whether the underlying transport is still open.
    fn is_open(&self) -> bool;
}

/// A registered peer: its connection identity plus its outbound link.
struct PeerSlot {
    conn_id: Uuid,
    link: Arc<dyn PeerLink>,
}

/// Point-in-time view of the relay for the health endpoint.
#[derive(Debug, Clone)]
pub struct RelayStatus {
    pub producer_connected: bool,
    pub consumer_connected: bool,
    pub session_state: SessionState,
    pub buffered_chunks: usize,
    pub buffered_bytes: usize,
}

/// The relay: two role slots, one recording session, one sink.
pub struct Relay {
    producer: Option<PeerSlot>,
    consumer: Option<PeerSlot>,
    session: RecordingSession,
    sink: Arc<dyn RecordingSink>,
    latest: LatestRecordingStore,
    classifier: Option<Arc<dyn AudioClassifier>>,
    state: AppState,
}

impl Relay {
    pub fn new(
        state: AppState,
        sink: Arc<dyn RecordingSink>,
        latest: LatestRecordingStore,
    ) -> Self {
        let config = state.get_config();
        Self {
            producer: None,
            consumer: None,
            session: RecordingSession::new(config.audio, config.recording),
            sink,
            latest,
            classifier: None,
            state,
        }
    }

    /// Attach an optional downstream classifier run on finalized recordings.
    pub fn with_classifier(mut self, classifier: Arc<dyn AudioClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Register a freshly connected peer under its role, superseding any
    /// previous connection of that role.
    pub fn register(&mut self, role: ConnectionRole, conn_id: Uuid, link: Arc<dyn PeerLink>) {
        let slot = match role {
            ConnectionRole::Producer => &mut self.producer,
            ConnectionRole::Consumer => &mut self.consumer,
        };
        if slot.is_some() {
            info!(role = role.as_str(), "superseding previous connection");
        } else {
            info!(role = role.as_str(), "peer connected");
        }
        *slot = Some(PeerSlot { conn_id, link });
    }

    /// Clear a peer's slot on disconnect. Only clears if the slot still
    /// points at this connection; a superseded peer disconnecting later must
    /// not evict its replacement. Session state is untouched either way.
    pub fn unregister(&mut self, role: ConnectionRole, conn_id: Uuid) {
        let slot = match role {
            ConnectionRole::Producer => &mut self.producer,
            ConnectionRole::Consumer => &mut self.consumer,
        };
        if slot.as_ref().is_some_and(|s| s.conn_id == conn_id) {
            *slot = None;
            info!(role = role.as_str(), "peer disconnected");
        }
    }

    /// Classify and route one inbound frame from a peer.
    pub fn handle_frame(&mut self, role: ConnectionRole, frame: InboundFrame) {
        let threshold = self
            .state
            .config
            .read()
            .unwrap()
            .recording
            .control_frame_threshold;

        match classify(role, frame, threshold) {
            Classified::ControlText(token) => {
                self.state.record_control_message();
                self.handle_control(role, &token);
            }
            Classified::AudioPayload(payload) => {
                self.state.record_audio_frame(payload.len());
                if let Some(recording) = self.session.on_audio_frame(payload) {
                    self.dispatch_delivery(recording);
                }
            }
        }
    }

    fn handle_control(&mut self, role: ConnectionRole, token: &str) {
        match ControlSignal::parse(token) {
            ControlSignal::StartRequest => self.handle_start_request(role),
            // The stop token normally comes from the Producer, but the
            // dashboard may also end a recording manually.
            ControlSignal::Stop => {
                info!(from = role.as_str(), "stop signal received");
                self.finalize_session();
            }
            ControlSignal::Identify => {
                info!("sensor identified itself");
            }
            ControlSignal::Unknown(other) => {
                debug!(from = role.as_str(), token = %other, "ignoring unknown control token");
            }
        }
    }

    fn handle_start_request(&mut self, role: ConnectionRole) {
        if role != ConnectionRole::Consumer {
            debug!(from = role.as_str(), "ignoring start request from non-consumer");
            return;
        }

        // Reset first: the session is cleared for a new cycle even if the
        // sensor turns out to be unreachable.
        self.session.on_start();

        match &self.producer {
            Some(slot) if slot.link.is_open() => {
                slot.link.send_text(control::START);
                info!("start forwarded to sensor, awaiting chunks");
            }
            _ => {
                warn!("start requested but no sensor is connected");
                if let Some(consumer) = &self.consumer {
                    consumer.link.send_text(control::ERR_NO_PRODUCER);
                }
            }
        }
    }

    /// Trigger finalization of the current session (explicit stop path).
    pub fn finalize_session(&mut self) {
        if let Some(recording) = self.session.finalize() {
            self.dispatch_delivery(recording);
        }
    }

    /// Hand a finalized recording to the sink without blocking frame
    /// handling, then notify the Consumer.
    fn dispatch_delivery(&self, recording: FinalizedRecording) {
        self.state.record_recording_finalized();
        let sink = self.sink.clone();
        let latest = self.latest.clone();
        let consumer = self.consumer.as_ref().map(|slot| slot.link.clone());
        let classifier = self.classifier.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            deliver_recording(sink, latest, consumer, classifier, recording, state).await;
        });
    }

    /// Snapshot for the health endpoint.
    pub fn status(&self) -> RelayStatus {
        RelayStatus {
            producer_connected: self
                .producer
                .as_ref()
                .is_some_and(|slot| slot.link.is_open()),
            consumer_connected: self
                .consumer
                .as_ref()
                .is_some_and(|slot| slot.link.is_open()),
            session_state: self.session.state(),
            buffered_chunks: self.session.buffered_chunks(),
            buffered_bytes: self.session.buffered_bytes(),
        }
    }
}

/// One best-effort delivery: retain the artifact, hand it to the sink, run
/// the optional classifier, notify the Consumer. Sink failure is logged and
/// counted, never retried; session state was already reset before this runs.
pub(crate) async fn deliver_recording(
    sink: Arc<dyn RecordingSink>,
    latest: LatestRecordingStore,
    consumer: Option<Arc<dyn PeerLink>>,
    classifier: Option<Arc<dyn AudioClassifier>>,
    recording: FinalizedRecording,
    state: AppState,
) {
    latest.put(recording.container.clone(), recording.recorded_at);

    match sink.deliver(&recording.container, recording.recorded_at) {
        Ok(handle) => {
            info!(
                recording_id = %recording.recording_id,
                sink = sink.name(),
                handle = %handle.0,
                "recording delivered"
            );
        }
        Err(err) => {
            state.record_sink_failure();
            error!(
                recording_id = %recording.recording_id,
                sink = sink.name(),
                error = %err,
                "sink delivery failed"
            );
        }
    }

    if let Some(classifier) = classifier {
        classify_recording(&recording, classifier.as_ref());
    }

    match consumer {
        Some(link) if link.is_open() => link.send_text(control::UPLOAD_COMPLETE),
        _ => debug!("no consumer connected, skipping completion notice"),
    }
}

/// Run the classifier over the recording's PCM payload and log the
/// highest-confidence window.
fn classify_recording(recording: &FinalizedRecording, classifier: &dyn AudioClassifier) {
    let pcm = &recording.container[WAV_HEADER_LEN..];
    let samples = match decode_pcm_i16(pcm) {
        Ok(samples) => samples,
        Err(err) => {
            warn!(error = %err, "skipping classification of malformed PCM");
            return;
        }
    };

    let normalized = normalize_samples(&samples);
    let mut best: Option<Classification> = None;
    for window in window_samples(&normalized, classifier.frame_len()) {
        match classifier.classify(&window) {
            Ok(result) => {
                if best.as_ref().map_or(true, |b| result.confidence > b.confidence) {
                    best = Some(result);
                }
            }
            Err(err) => warn!(error = %err, "classifier window failed"),
        }
    }

    if let Some(result) = best {
        info!(
            recording_id = %recording.recording_id,
            label = %result.label,
            confidence = result.confidence,
            "recording classified"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::relay::wav::WAV_HEADER_LEN;
    use crate::sink::MemorySink;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Test double that records everything sent toward a peer.
    struct FakePeer {
        sent: Mutex<Vec<String>>,
        open: bool,
    }

    impl FakePeer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                open: true,
            })
        }

        fn closed() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                open: false,
            })
        }

        fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl PeerLink for FakePeer {
        fn send_text(&self, text: &str) {
            self.sent.lock().unwrap().push(text.to_string());
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    fn relay_with_memory_sink() -> (Relay, LatestRecordingStore) {
        let state = AppState::new(AppConfig::default());
        let latest = LatestRecordingStore::new();
        let sink = Arc::new(MemorySink::new(latest.clone()));
        (Relay::new(state, sink, latest.clone()), latest)
    }

    #[test]
    fn test_role_from_uri_marker() {
        assert_eq!(ConnectionRole::from_uri("/ws?client=ESP32"), ConnectionRole::Producer);
        assert_eq!(ConnectionRole::from_uri("/ws/ESP32"), ConnectionRole::Producer);
        assert_eq!(ConnectionRole::from_uri("/ws"), ConnectionRole::Consumer);
    }

    #[test]
    fn test_start_request_forwards_start_to_producer() {
        let (mut relay, _latest) = relay_with_memory_sink();
        let producer = FakePeer::new();
        let consumer = FakePeer::new();
        relay.register(ConnectionRole::Producer, Uuid::new_v4(), producer.clone());
        relay.register(ConnectionRole::Consumer, Uuid::new_v4(), consumer.clone());

        relay.handle_frame(
            ConnectionRole::Consumer,
            InboundFrame::Text("START_RECORDING_REQUEST".to_string()),
        );

        assert_eq!(producer.messages(), vec!["START".to_string()]);
        assert!(consumer.messages().is_empty());
        assert_eq!(relay.status().session_state, SessionState::Recording);
    }

    #[test]
    fn test_start_request_without_producer_reports_error() {
        let (mut relay, _latest) = relay_with_memory_sink();
        let consumer = FakePeer::new();
        relay.register(ConnectionRole::Consumer, Uuid::new_v4(), consumer.clone());

        relay.handle_frame(
            ConnectionRole::Consumer,
            InboundFrame::Text("START_RECORDING_REQUEST".to_string()),
        );

        assert_eq!(consumer.messages(), vec!["ERROR: ESP32 not connected.".to_string()]);
        // The session still resets for a new cycle.
        assert_eq!(relay.status().session_state, SessionState::Recording);
    }

    #[test]
    fn test_closed_producer_counts_as_absent() {
        let (mut relay, _latest) = relay_with_memory_sink();
        let producer = FakePeer::closed();
        let consumer = FakePeer::new();
        relay.register(ConnectionRole::Producer, Uuid::new_v4(), producer.clone());
        relay.register(ConnectionRole::Consumer, Uuid::new_v4(), consumer.clone());

        relay.handle_frame(
            ConnectionRole::Consumer,
            InboundFrame::Text("START".to_string()),
        );

        assert!(producer.messages().is_empty());
        assert_eq!(consumer.messages(), vec!["ERROR: ESP32 not connected.".to_string()]);
    }

    #[test]
    fn test_reconnection_supersedes_previous_producer() {
        let (mut relay, _latest) = relay_with_memory_sink();
        let consumer = FakePeer::new();
        relay.register(ConnectionRole::Consumer, Uuid::new_v4(), consumer);

        let old = FakePeer::new();
        let old_id = Uuid::new_v4();
        relay.register(ConnectionRole::Producer, old_id, old.clone());

        let new = FakePeer::new();
        relay.register(ConnectionRole::Producer, Uuid::new_v4(), new.clone());

        relay.handle_frame(
            ConnectionRole::Consumer,
            InboundFrame::Text("START".to_string()),
        );
        assert!(old.messages().is_empty());
        assert_eq!(new.messages(), vec!["START".to_string()]);

        // The superseded connection going away must not evict its replacement.
        relay.unregister(ConnectionRole::Producer, old_id);
        assert!(relay.status().producer_connected);
    }

    #[test]
    fn test_unregister_clears_matching_connection() {
        let (mut relay, _latest) = relay_with_memory_sink();
        let conn_id = Uuid::new_v4();
        relay.register(ConnectionRole::Consumer, conn_id, FakePeer::new());
        assert!(relay.status().consumer_connected);

        relay.unregister(ConnectionRole::Consumer, conn_id);
        assert!(!relay.status().consumer_connected);
    }

    #[tokio::test]
    async fn test_end_to_end_recording_cycle() {
        let (mut relay, latest) = relay_with_memory_sink();
        let producer = FakePeer::new();
        let consumer = FakePeer::new();
        relay.register(ConnectionRole::Producer, Uuid::new_v4(), producer.clone());
        relay.register(ConnectionRole::Consumer, Uuid::new_v4(), consumer.clone());

        relay.handle_frame(
            ConnectionRole::Consumer,
            InboundFrame::Text("START_RECORDING_REQUEST".to_string()),
        );
        assert_eq!(producer.messages(), vec!["START".to_string()]);

        for _ in 0..5 {
            relay.handle_frame(
                ConnectionRole::Producer,
                InboundFrame::Binary(vec![0x42u8; 1024]),
            );
        }
        relay.handle_frame(
            ConnectionRole::Producer,
            InboundFrame::Binary(b"END_RECORDING".to_vec()),
        );

        // Delivery runs on a spawned task.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stored = latest.latest().expect("recording retained");
        assert_eq!(stored.container.len(), WAV_HEADER_LEN + 5 * 1024);
        assert_eq!(consumer.messages(), vec!["UPLOAD_COMPLETE".to_string()]);

        let status = relay.status();
        assert_eq!(status.session_state, SessionState::Idle);
        assert_eq!(status.buffered_bytes, 0);
    }

    /// Classifier double: reports louder windows with higher confidence.
    struct PeakClassifier;

    impl AudioClassifier for PeakClassifier {
        fn classify(&self, window: &[f32]) -> Result<Classification, crate::error::RelayError> {
            let peak = window.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
            Ok(Classification {
                label: if peak > 0.5 { "loud" } else { "quiet" }.to_string(),
                confidence: peak,
            })
        }

        fn frame_len(&self) -> usize {
            64
        }
    }

    #[tokio::test]
    async fn test_classifier_runs_on_finalized_recording() {
        let state = AppState::new(AppConfig::default());
        let latest = LatestRecordingStore::new();
        let sink = Arc::new(MemorySink::new(latest.clone()));
        let mut relay =
            Relay::new(state, sink, latest.clone()).with_classifier(Arc::new(PeakClassifier));

        relay.handle_frame(
            ConnectionRole::Consumer,
            InboundFrame::Text("START".to_string()),
        );
        relay.handle_frame(
            ConnectionRole::Producer,
            InboundFrame::Binary(vec![0x00u8; 512]),
        );
        relay.handle_frame(
            ConnectionRole::Producer,
            InboundFrame::Text("STOP".to_string()),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Delivery completed with the classifier attached.
        assert!(latest.latest().is_some());
    }

    #[tokio::test]
    async fn test_stop_without_audio_delivers_nothing() {
        let (mut relay, latest) = relay_with_memory_sink();
        let consumer = FakePeer::new();
        relay.register(ConnectionRole::Consumer, Uuid::new_v4(), consumer.clone());

        relay.handle_frame(
            ConnectionRole::Producer,
            InboundFrame::Text("END_RECORDING".to_string()),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(latest.latest().is_none());
        assert!(consumer.messages().is_empty());
    }

    #[tokio::test]
    async fn test_double_stop_delivers_once() {
        let (mut relay, _latest) = relay_with_memory_sink();
        relay.handle_frame(
            ConnectionRole::Consumer,
            InboundFrame::Text("START".to_string()),
        );
        relay.handle_frame(
            ConnectionRole::Producer,
            InboundFrame::Binary(vec![1u8; 256]),
        );

        relay.handle_frame(
            ConnectionRole::Producer,
            InboundFrame::Text("STOP".to_string()),
        );
        relay.handle_frame(
            ConnectionRole::Producer,
            InboundFrame::Text("STOP".to_string()),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snapshot = relay.state.get_metrics_snapshot();
        assert_eq!(snapshot.recordings_finalized, 1);
    }
}
