use serde::{Deserialize, Serialize};
use std::fmt;

/// Problem category offered by the tutor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathCategory {
    AdditionSubtraction,
    MultiplicationDivision,
}

/// Display metadata for one category.
#[derive(Debug, Clone, Copy)]
pub struct CategoryInfo {
    pub title: &'static str,
    pub description: &'static str,
    pub grade_level: &'static str,
    pub operations: &'static str,
}

impl MathCategory {
    pub const ALL: [MathCategory; 2] = [
        MathCategory::AdditionSubtraction,
        MathCategory::MultiplicationDivision,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            MathCategory::AdditionSubtraction => "addition_subtraction",
            MathCategory::MultiplicationDivision => "multiplication_division",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "addition_subtraction" => Some(MathCategory::AdditionSubtraction),
            "multiplication_division" => Some(MathCategory::MultiplicationDivision),
            _ => None,
        }
    }

    pub fn info(&self) -> CategoryInfo {
        match self {
            MathCategory::AdditionSubtraction => CategoryInfo {
                title: "기초 연산",
                description: "덧셈과 뺄셈 문제",
                grade_level: "유치원 ~ 초등학교 1학년",
                operations: "덧셈, 뺄셈",
            },
            MathCategory::MultiplicationDivision => CategoryInfo {
                title: "응용 연산",
                description: "곱셈과 나눗셈 문제",
                grade_level: "초등학교 2~3학년",
                operations: "곱셈, 나눗셈",
            },
        }
    }
}

/// Identity of one generated problem. Monotonically increasing within a
/// pipeline; the staleness key for in-flight verification results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProblemId(pub u64);

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathProblem {
    pub id: ProblemId,
    pub text: String,
    pub answer: String,
    pub category: MathCategory,
}

/// The finalized text of one capture session. Immutable; ownership moves
/// once from the capture session to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript(String);

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_text(self) -> String {
        self.0
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of one speech capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Listening,
    Finalizing,
    Errored,
}

/// State of the answer pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    AwaitingAnswer,
    Checking,
    AwaitingReasoning,
    Feedback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of the LLM conversation wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Built fresh for every answer check; no state shared across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub problem_text: String,
    pub raw_answer_text: String,
    pub category: MathCategory,
}

/// Outcome of one answer check, with the explanatory message suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationVerdict {
    Correct(String),
    Incorrect(String),
}

impl VerificationVerdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, VerificationVerdict::Correct(_))
    }

    pub fn message(&self) -> &str {
        match self {
            VerificationVerdict::Correct(msg) | VerificationVerdict::Incorrect(msg) => msg,
        }
    }
}
