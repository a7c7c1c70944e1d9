use crate::client_trait::ChatClient;
use havruta_core::{
    CancelToken, ChatMessage, VerificationError, VerificationRequest, VerificationVerdict,
};
use std::sync::Arc;

/// Spoken answers arrive as free text, so the model is told to extract the
/// intended number before judging, and to answer on a fixed prefix
/// protocol instead of exact-string matching.
const VERDICT_PROMPT: &str = "당신은 초등학생의 수학 답안을 채점하는 선생님입니다. \
학생의 답은 음성 인식으로 받아 적은 자연어 문장일 수 있습니다. \
먼저 학생의 말에서 의도한 숫자를 추출한 다음 (예: \"십오입니다\"는 15), \
문제의 정답과 비교해 채점해주세요. \
반드시 'CORRECT: <짧은 칭찬>' 또는 'INCORRECT: <짧은 설명>' 형식으로만 답변해주세요.";

/// Judges one transcript against one problem through the LLM.
pub struct AnswerVerifier {
    client: Arc<dyn ChatClient>,
}

impl AnswerVerifier {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    pub async fn verify(
        &self,
        request: &VerificationRequest,
        cancel: &CancelToken,
    ) -> Result<VerificationVerdict, VerificationError> {
        let info = request.category.info();
        let user = format!(
            "문제 유형: {}\n문제: {}\n학생의 답: {}",
            info.title, request.problem_text, request.raw_answer_text,
        );
        let messages = [ChatMessage::system(VERDICT_PROMPT), ChatMessage::user(user)];

        let response = self.client.complete(&messages, cancel).await?;
        let verdict = parse_verdict(&response)?;
        tracing::debug!(correct = verdict.is_correct(), "verdict: {}", verdict.message());
        Ok(verdict)
    }
}

/// Parse the fixed prefix protocol. Anything that matches neither prefix
/// leaves the answer unresolved.
pub fn parse_verdict(text: &str) -> Result<VerificationVerdict, VerificationError> {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("CORRECT:") {
        Ok(VerificationVerdict::Correct(rest.trim().to_string()))
    } else if let Some(rest) = trimmed.strip_prefix("INCORRECT:") {
        Ok(VerificationVerdict::Incorrect(rest.trim().to_string()))
    } else {
        Err(VerificationError::UnparseableVerdict(
            trimmed.chars().take(80).collect(),
        ))
    }
}
