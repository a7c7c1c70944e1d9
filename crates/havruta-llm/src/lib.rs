pub mod client_trait;
pub mod generator;
pub mod openai_client;
pub mod scripted_client;
pub mod tutor;
pub mod verifier;

pub use client_trait::ChatClient;
pub use generator::{GeneratedProblem, ProblemGenerator};
pub use openai_client::OpenAiClient;
pub use scripted_client::ScriptedClient;
pub use tutor::FeedbackTutor;
pub use verifier::{parse_verdict, AnswerVerifier};
