use crate::client_trait::ChatClient;
use havruta_core::{CancelToken, ChatMessage, GenerationError, MathCategory};
use serde::Deserialize;
use std::sync::Arc;

/// One freshly generated problem, before the pipeline assigns it an
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedProblem {
    pub problem: String,
    pub answer: String,
}

/// Generates elementary-math problems through the LLM.
pub struct ProblemGenerator {
    client: Arc<dyn ChatClient>,
}

impl ProblemGenerator {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    pub async fn generate(
        &self,
        category: MathCategory,
        cancel: &CancelToken,
    ) -> Result<GeneratedProblem, GenerationError> {
        let info = category.info();
        let prompt = format!(
            "초등학교 수준의 수학 문제를 생성해주세요. 범위: {} ({}). \
             문제와 정답을 JSON 형식으로 반환해주세요. \
             예: {{\"problem\": \"문제\", \"answer\": \"정답\"}}",
            info.operations, info.grade_level,
        );
        let messages = [ChatMessage::system(prompt)];

        let response = self.client.complete(&messages, cancel).await?;
        let generated = parse_problem_payload(&response)?;
        tracing::debug!(category = category.id(), "generated problem: {}", generated.problem);
        Ok(generated)
    }
}

/// The model has no guaranteed schema; accept raw JSON or JSON wrapped in
/// a markdown code fence, and reject anything else.
fn parse_problem_payload(text: &str) -> Result<GeneratedProblem, GenerationError> {
    let body = strip_code_fence(text);
    let generated: GeneratedProblem = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedProblem(format!("invalid problem JSON: {e}")))?;
    if generated.problem.trim().is_empty() || generated.answer.trim().is_empty() {
        return Err(GenerationError::MalformedProblem(
            "empty problem or answer".to_string(),
        ));
    }
    Ok(generated)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted_client::ScriptedClient;

    #[test]
    fn test_parse_plain_json() {
        let generated =
            parse_problem_payload(r#"{"problem": "7+8은 얼마인가요?", "answer": "15"}"#).unwrap();
        assert_eq!(generated.problem, "7+8은 얼마인가요?");
        assert_eq!(generated.answer, "15");
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"problem\": \"3×4는?\", \"answer\": \"12\"}\n```";
        let generated = parse_problem_payload(text).unwrap();
        assert_eq!(generated.problem, "3×4는?");
        assert_eq!(generated.answer, "12");
    }

    #[test]
    fn test_parse_fence_without_language_tag() {
        let text = "```\n{\"problem\": \"9-5는?\", \"answer\": \"4\"}\n```";
        let generated = parse_problem_payload(text).unwrap();
        assert_eq!(generated.answer, "4");
    }

    #[test]
    fn test_parse_rejects_prose() {
        match parse_problem_payload("오늘의 문제는 7+8입니다") {
            Err(GenerationError::MalformedProblem(_)) => {}
            other => panic!("expected MalformedProblem, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_empty_fields() {
        match parse_problem_payload(r#"{"problem": "", "answer": "15"}"#) {
            Err(GenerationError::MalformedProblem(msg)) => assert!(msg.contains("empty")),
            other => panic!("expected MalformedProblem, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_includes_category_operations_in_prompt() {
        let client = Arc::new(ScriptedClient::new());
        client.push_response(r#"{"problem": "7+8", "answer": "15"}"#);

        let generator = ProblemGenerator::new(client.clone());
        let cancel = CancelToken::new();
        generator
            .generate(MathCategory::AdditionSubtraction, &cancel)
            .await
            .unwrap();

        let requests = client.requests();
        assert!(requests[0][0].content.contains("덧셈, 뺄셈"));
        assert!(requests[0][0].content.contains("JSON"));
    }

    #[tokio::test]
    async fn test_generate_propagates_llm_error() {
        let client = Arc::new(ScriptedClient::new());
        client.push_error(havruta_core::LlmError::RequestFailed("boom".to_string()));

        let generator = ProblemGenerator::new(client);
        let cancel = CancelToken::new();
        match generator
            .generate(MathCategory::MultiplicationDivision, &cancel)
            .await
        {
            Err(GenerationError::Llm(_)) => {}
            other => panic!("expected Llm error, got {other:?}"),
        }
    }
}
