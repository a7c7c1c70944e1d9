use crate::recognizer_trait::{RecognizerEvent, SpeechRecognizer};
use async_trait::async_trait;
use havruta_core::CaptureError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// What one `start()` call should play back.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Optional interim fragments followed by one final result.
    Utterance { interim: Vec<String>, text: String },
    /// A typed engine error.
    Failure(CaptureError),
    /// The engine ends without producing a result (user stopped, or the
    /// engine gave up silently).
    Silence,
    /// The engine never reports back; exercises the session-side timeout.
    Hang,
}

/// Recognizer that plays back a scripted outcome per `start()` call.
///
/// Clones share the script queue, so tests and demos can keep a handle
/// after handing the boxed recognizer to a session.
#[derive(Clone)]
pub struct ScriptedRecognizer {
    inner: Arc<Inner>,
}

struct Inner {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    event_sender: Mutex<Option<mpsc::UnboundedSender<RecognizerEvent>>>,
    start_count: AtomicUsize,
    stop_count: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(VecDeque::new()),
                event_sender: Mutex::new(None),
                start_count: AtomicUsize::new(0),
                stop_count: AtomicUsize::new(0),
            }),
        }
    }

    pub fn push(&self, outcome: ScriptedOutcome) {
        self.inner.script.lock().unwrap().push_back(outcome);
    }

    pub fn push_utterance(&self, text: &str) {
        self.push(ScriptedOutcome::Utterance {
            interim: Vec::new(),
            text: text.to_string(),
        });
    }

    pub fn push_failure(&self, error: CaptureError) {
        self.push(ScriptedOutcome::Failure(error));
    }

    pub fn push_silence(&self) {
        self.push(ScriptedOutcome::Silence);
    }

    pub fn push_hang(&self) {
        self.push(ScriptedOutcome::Hang);
    }

    pub fn start_count(&self) -> usize {
        self.inner.start_count.load(Ordering::Relaxed)
    }

    pub fn stop_count(&self) -> usize {
        self.inner.stop_count.load(Ordering::Relaxed)
    }
}

impl Default for ScriptedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), CaptureError> {
        if let Some(utterances) = config.get("utterances").and_then(|v| v.as_array()) {
            for utterance in utterances {
                if let Some(text) = utterance.as_str() {
                    self.push_utterance(text);
                }
            }
        }
        if let Some(code) = config.get("fail_with").and_then(|v| v.as_str()) {
            self.push_failure(CaptureError::from_code(code));
        }
        Ok(())
    }

    async fn start(&self) -> Result<(), CaptureError> {
        let count = self.inner.start_count.fetch_add(1, Ordering::Relaxed) + 1;
        let outcome = self
            .inner
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedOutcome::Silence);
        tracing::trace!("scripted start #{count}: {outcome:?}");

        let sender = self.inner.event_sender.lock().unwrap().clone();
        let Some(tx) = sender else { return Ok(()) };
        match outcome {
            ScriptedOutcome::Utterance { interim, text } => {
                for fragment in interim {
                    let _ = tx.send(RecognizerEvent::Interim(fragment));
                }
                let _ = tx.send(RecognizerEvent::Final(text));
                let _ = tx.send(RecognizerEvent::End);
            }
            ScriptedOutcome::Failure(error) => {
                let _ = tx.send(RecognizerEvent::Error(error));
                let _ = tx.send(RecognizerEvent::End);
            }
            ScriptedOutcome::Silence => {
                let _ = tx.send(RecognizerEvent::End);
            }
            ScriptedOutcome::Hang => {}
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), CaptureError> {
        self.inner.stop_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<RecognizerEvent>) {
        *self.inner.event_sender.lock().unwrap() = Some(sender);
    }
}
