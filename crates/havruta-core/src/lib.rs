pub mod cancel;
pub mod config;
pub mod error;
pub mod types;

pub use cancel::CancelToken;
pub use config::{AppConfig, GeneralConfig, LlmConfig, SpeechConfig, TutorConfig};
pub use error::{
    CaptureError, ConfigError, GenerationError, LlmError, PermissionError, VerificationError,
};
pub use types::{
    CaptureState, CategoryInfo, ChatMessage, ChatRole, MathCategory, MathProblem, PipelineState,
    ProblemId, Transcript, VerificationRequest, VerificationVerdict,
};
