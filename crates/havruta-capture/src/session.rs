use crate::permission::MicrophonePermission;
use crate::recognizer_trait::{RecognizerEvent, SpeechRecognizer};
use havruta_core::{CaptureError, CaptureState, PermissionError, SpeechConfig, Transcript};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// How one capture run ended. Exactly one outcome is produced per
/// successful `start()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The recognizer finalized one utterance.
    Transcript(Transcript),
    /// The session ended without a result (explicit stop, or the engine
    /// gave up silently).
    Stopped,
    Failed(CaptureError),
}

/// One speech-to-text run: owns the recognizer, tracks the session state,
/// and guarantees a single terminal event per `start()`.
pub struct CaptureSession {
    recognizer: Box<dyn SpeechRecognizer>,
    events: mpsc::UnboundedReceiver<RecognizerEvent>,
    state_tx: watch::Sender<CaptureState>,
    permission: MicrophonePermission,
    language: String,
    continuous: bool,
    utterance_timeout: Duration,
    last_error: Option<CaptureError>,
}

impl CaptureSession {
    pub async fn new(
        mut recognizer: Box<dyn SpeechRecognizer>,
        permission: MicrophonePermission,
        config: &SpeechConfig,
    ) -> Result<Self, CaptureError> {
        let (event_tx, events) = mpsc::unbounded_channel();
        recognizer.set_event_sender(event_tx);

        let recognizer_config = toml::Value::try_from(config)
            .map_err(|e| CaptureError::Unknown(format!("invalid recognizer config: {e}")))?;
        recognizer.initialize(recognizer_config).await?;

        let (state_tx, _) = watch::channel(CaptureState::Idle);
        Ok(Self {
            recognizer,
            events,
            state_tx,
            permission,
            language: config.language.clone(),
            continuous: config.continuous,
            utterance_timeout: Duration::from_secs(config.utterance_timeout_secs),
            last_error: None,
        })
    }

    pub fn state(&self) -> CaptureState {
        *self.state_tx.borrow()
    }

    /// Subscribe to state changes (Idle → Listening → ... → Idle/Errored).
    pub fn state_receiver(&self) -> watch::Receiver<CaptureState> {
        self.state_tx.subscribe()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    /// Begin listening. Fails without touching the recognizer when the
    /// microphone is unavailable or speech recognition is unsupported.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        match self.state() {
            CaptureState::Listening | CaptureState::Finalizing => {
                tracing::warn!("start() while a capture is active, ignoring");
                return Ok(());
            }
            CaptureState::Idle | CaptureState::Errored => {}
        }

        if !self.permission.is_granted() {
            let mapped = match self.permission.error() {
                Some(PermissionError::Unsupported) => CaptureError::Unsupported,
                _ => CaptureError::PermissionDenied,
            };
            return Err(self.settle_error(mapped));
        }

        // Drop events left over from a previous run so this run observes
        // only its own terminal event.
        while self.events.try_recv().is_ok() {}
        self.last_error = None;

        match self.recognizer.start().await {
            Ok(()) => {
                self.set_state(CaptureState::Listening);
                Ok(())
            }
            Err(error) => Err(self.settle_error(error)),
        }
    }

    /// Consume recognizer events until the run's single terminal event:
    /// one final result, one error, or an end without a result.
    pub async fn wait(&mut self) -> CaptureOutcome {
        if self.state() != CaptureState::Listening {
            return CaptureOutcome::Stopped;
        }

        let deadline = (!self.utterance_timeout.is_zero())
            .then(|| tokio::time::Instant::now() + self.utterance_timeout);

        loop {
            let event = match deadline {
                Some(at) => match tokio::time::timeout_at(at, self.events.recv()).await {
                    Ok(event) => event,
                    Err(_) => {
                        let _ = self.recognizer.stop().await;
                        return CaptureOutcome::Failed(self.settle_error(CaptureError::NoSpeech));
                    }
                },
                None => self.events.recv().await,
            };

            let Some(event) = event else {
                // Recognizer dropped its sender without a terminal event.
                self.set_state(CaptureState::Idle);
                return CaptureOutcome::Stopped;
            };

            match event {
                RecognizerEvent::Interim(text) => {
                    tracing::trace!(language = %self.language, "interim result: {text}");
                }
                RecognizerEvent::Final(text) => {
                    self.set_state(CaptureState::Finalizing);
                    if !self.continuous {
                        let _ = self.recognizer.stop().await;
                    }
                    self.set_state(CaptureState::Idle);
                    return CaptureOutcome::Transcript(Transcript::new(text));
                }
                RecognizerEvent::Error(error) => {
                    return CaptureOutcome::Failed(self.settle_error(error));
                }
                RecognizerEvent::End => {
                    self.set_state(CaptureState::Idle);
                    return CaptureOutcome::Stopped;
                }
            }
        }
    }

    /// Convenience: `start()` followed by `wait()`.
    pub async fn capture(&mut self) -> CaptureOutcome {
        if let Err(error) = self.start().await {
            return CaptureOutcome::Failed(error);
        }
        self.wait().await
    }

    /// Stop listening. Idempotent: a no-op on an Idle or Errored session.
    pub async fn stop(&self) -> Result<(), CaptureError> {
        match self.state() {
            CaptureState::Idle | CaptureState::Errored => Ok(()),
            CaptureState::Listening | CaptureState::Finalizing => self.recognizer.stop().await,
        }
    }

    fn set_state(&self, state: CaptureState) {
        self.state_tx.send_replace(state);
    }

    fn settle_error(&mut self, error: CaptureError) -> CaptureError {
        tracing::warn!("capture failed: {error}");
        self.last_error = Some(error.clone());
        self.set_state(CaptureState::Errored);
        error
    }
}
