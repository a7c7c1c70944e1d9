use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("microphone permission denied")]
    Denied,

    #[error("no microphone device found")]
    NotFound,

    #[error("microphone device is not readable")]
    NotReadable,

    #[error("microphone access is not supported on this host")]
    Unsupported,
}

impl PermissionError {
    /// User-facing status text for the permission screen.
    pub fn user_message(&self) -> &'static str {
        match self {
            PermissionError::Denied => {
                "마이크 사용 권한이 거부되었습니다. 브라우저 설정에서 권한을 허용해주세요."
            }
            PermissionError::NotFound => {
                "마이크를 찾을 수 없습니다. 마이크가 연결되어 있는지 확인해주세요."
            }
            PermissionError::NotReadable => {
                "마이크에 접근할 수 없습니다. 다른 앱이 사용 중인지 확인해주세요."
            }
            PermissionError::Unsupported => "이 브라우저는 마이크 사용을 지원하지 않습니다.",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no speech detected before the recognizer timed out")]
    NoSpeech,

    #[error("capture was aborted")]
    Aborted,

    #[error("recognition service network failure")]
    Network,

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("speech recognition is not supported on this host")]
    Unsupported,

    #[error("recognition failed: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Map a recognition engine error code onto the taxonomy.
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => CaptureError::NoSpeech,
            "aborted" => CaptureError::Aborted,
            "network" => CaptureError::Network,
            "not-allowed" | "permission-denied" | "service-not-allowed" => {
                CaptureError::PermissionDenied
            }
            other => CaptureError::Unknown(other.to_string()),
        }
    }

    /// User-facing status text for the capture affordance.
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::NoSpeech => "음성이 감지되지 않았습니다. 다시 말해주세요.",
            CaptureError::Aborted => "음성 인식이 중단되었습니다.",
            CaptureError::Network => "네트워크 오류로 음성 인식에 실패했습니다.",
            CaptureError::PermissionDenied => "마이크 사용 권한이 없습니다",
            CaptureError::Unsupported => "이 브라우저는 음성 인식을 지원하지 않습니다.",
            CaptureError::Unknown(_) => "음성 인식 중 오류가 발생했습니다.",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    #[error("LLM response was malformed: {0}")]
    InvalidResponse(String),

    #[error("LLM request was cancelled")]
    Cancelled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("verification call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("verdict did not match the CORRECT:/INCORRECT: protocol: {0}")]
    UnparseableVerdict(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("problem generation call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("generated problem was malformed: {0}")]
    MalformedProblem(String),
}
