use crate::recognizer_trait::{RecognizerEvent, SpeechRecognizer};
use async_trait::async_trait;
use havruta_core::CaptureError;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Notify};

/// Recognizer backed by typed input: each `start()` reads one line from
/// stdin and reports it as the final result. The fallback input path for
/// hosts without a speech engine.
pub struct TypedRecognizer {
    event_sender: Mutex<Option<mpsc::UnboundedSender<RecognizerEvent>>>,
    // Fresh per start() so a redundant stop() cannot leave a stale permit
    // behind for the next capture.
    active_stop: Mutex<Option<Arc<Notify>>>,
}

impl TypedRecognizer {
    pub fn new() -> Self {
        Self {
            event_sender: Mutex::new(None),
            active_stop: Mutex::new(None),
        }
    }
}

impl Default for TypedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechRecognizer for TypedRecognizer {
    fn name(&self) -> &str {
        "typed"
    }

    async fn initialize(&mut self, _config: toml::Value) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn start(&self) -> Result<(), CaptureError> {
        let sender = self.event_sender.lock().unwrap().clone();
        let Some(tx) = sender else {
            return Err(CaptureError::Unknown(
                "typed recognizer started without an event sender".to_string(),
            ));
        };

        let notify = Arc::new(Notify::new());
        *self.active_stop.lock().unwrap() = Some(Arc::clone(&notify));

        tokio::spawn(async move {
            let mut line = String::new();
            let mut reader = BufReader::new(tokio::io::stdin());
            tokio::select! {
                result = reader.read_line(&mut line) => match result {
                    Ok(0) => {
                        // stdin closed; no further capture can succeed
                        let _ = tx.send(RecognizerEvent::Error(CaptureError::Aborted));
                        let _ = tx.send(RecognizerEvent::End);
                    }
                    Ok(_) => {
                        let text = line.trim().to_string();
                        if !text.is_empty() {
                            let _ = tx.send(RecognizerEvent::Final(text));
                        }
                        let _ = tx.send(RecognizerEvent::End);
                    }
                    Err(e) => {
                        let _ = tx.send(RecognizerEvent::Error(CaptureError::Unknown(
                            e.to_string(),
                        )));
                        let _ = tx.send(RecognizerEvent::End);
                    }
                },
                _ = notify.notified() => {
                    let _ = tx.send(RecognizerEvent::End);
                }
            }
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), CaptureError> {
        if let Some(notify) = self.active_stop.lock().unwrap().take() {
            notify.notify_one();
        }
        Ok(())
    }

    fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<RecognizerEvent>) {
        *self.event_sender.lock().unwrap() = Some(sender);
    }
}
