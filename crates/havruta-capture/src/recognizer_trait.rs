use async_trait::async_trait;
use havruta_core::CaptureError;
use tokio::sync::mpsc;

/// One event from the host speech-recognition engine.
///
/// Mirrors the browser API surface: interim results while the utterance is
/// still being decoded, at most one final result, typed errors, and an
/// end-of-session marker.
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    Interim(String),
    Final(String),
    Error(CaptureError),
    End,
}

/// A host speech-recognition engine behind a capability interface.
///
/// Implementations are registered via [`RecognizerRegistry`](crate::RecognizerRegistry)
/// and deliver events through the sender installed with
/// [`set_event_sender`](Self::set_event_sender).
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Returns the recognizer's registry name (e.g. `"typed"`, `"scripted"`).
    fn name(&self) -> &str;
    /// One-time initialisation with recognizer-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), CaptureError>;
    /// Begin listening for one utterance.
    async fn start(&self) -> Result<(), CaptureError>;
    /// Stop listening. Idempotent.
    async fn stop(&self) -> Result<(), CaptureError>;
    fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<RecognizerEvent>);
}
