pub mod permission;
pub mod recognizer_trait;
pub mod registry;
pub mod scripted;
pub mod session;
pub mod typed;

pub use permission::{request_microphone, MicrophonePermission, PermissionProbe, StaticProbe};
pub use recognizer_trait::{RecognizerEvent, SpeechRecognizer};
pub use registry::RecognizerRegistry;
pub use scripted::{ScriptedOutcome, ScriptedRecognizer};
pub use session::{CaptureOutcome, CaptureSession};
pub use typed::TypedRecognizer;
