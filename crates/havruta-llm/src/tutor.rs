use crate::client_trait::ChatClient;
use havruta_core::{CancelToken, ChatMessage, LlmError};
use std::sync::Arc;
use tokio::sync::mpsc;

const TUTOR_SYSTEM_PROMPT: &str = "당신은 친절한 수학 선생님입니다. \
학생이 문제 풀이 과정을 스스로 이해할 수 있도록 소크라테스식 문답법으로 대화를 이끌어주세요.\n\
1. 직접적인 답을 알려주지 말고, 학생이 스스로 생각할 수 있는 질문을 해주세요.\n\
2. 학생의 답변이 틀렸더라도 부정하지 말고, 왜 그렇게 생각했는지 물어보세요.\n\
3. 학생이 올바른 방향으로 생각할 수 있도록 힌트가 될 만한 질문을 해주세요.\n\
4. 학생이 문제를 완전히 이해했다고 판단되면, 칭찬과 함께 대화를 마무리해주세요.";

/// Socratic follow-up conversation for an incorrect answer.
///
/// The message log is append-only: each successful turn adds exactly one
/// user and one assistant message. A failed turn is rolled back so a
/// user-initiated retry replays cleanly.
pub struct FeedbackTutor {
    client: Arc<dyn ChatClient>,
    messages: Vec<ChatMessage>,
}

impl FeedbackTutor {
    pub fn new(client: Arc<dyn ChatClient>, problem_text: &str, student_answer: &str) -> Self {
        let opening = format!(
            "안녕하세요! 방금 푼 문제를 같이 살펴볼까요?\n문제: {problem_text}\n학생의 답: {student_answer}\n\n어떤 방법으로 이 답을 구했는지 설명해주시겠어요?"
        );
        Self {
            client,
            messages: vec![
                ChatMessage::system(TUTOR_SYSTEM_PROMPT),
                ChatMessage::assistant(opening),
            ],
        }
    }

    /// The assistant's seeded opening turn.
    pub fn opening_message(&self) -> &str {
        &self.messages[1].content
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub async fn respond(
        &mut self,
        student_text: &str,
        cancel: &CancelToken,
    ) -> Result<String, LlmError> {
        self.messages.push(ChatMessage::user(student_text));
        match self.client.complete(&self.messages, cancel).await {
            Ok(reply) => {
                self.messages.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(error) => {
                self.messages.pop();
                Err(error)
            }
        }
    }

    /// Streaming variant; chunks stop once `cancel` trips, and a failed
    /// turn is rolled back like [`respond`](Self::respond).
    pub async fn respond_streaming(
        &mut self,
        student_text: &str,
        chunks: mpsc::UnboundedSender<String>,
        cancel: &CancelToken,
    ) -> Result<String, LlmError> {
        self.messages.push(ChatMessage::user(student_text));
        match self
            .client
            .complete_streaming(&self.messages, chunks, cancel)
            .await
        {
            Ok(reply) => {
                self.messages.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(error) => {
                self.messages.pop();
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted_client::ScriptedClient;
    use havruta_core::ChatRole;

    fn tutor_with(client: Arc<ScriptedClient>) -> FeedbackTutor {
        FeedbackTutor::new(client, "7+8은 얼마인가요?", "14")
    }

    #[test]
    fn test_opening_message_embeds_problem_and_answer() {
        let tutor = tutor_with(Arc::new(ScriptedClient::new()));
        assert!(tutor.opening_message().contains("7+8은 얼마인가요?"));
        assert!(tutor.opening_message().contains("14"));
        assert_eq!(tutor.messages()[0].role, ChatRole::System);
        assert!(tutor.messages()[0].content.contains("소크라테스식"));
    }

    #[tokio::test]
    async fn test_respond_appends_one_turn_pair() {
        let client = Arc::new(ScriptedClient::new());
        client.push_response("왜 14라고 생각했나요?");

        let mut tutor = tutor_with(client.clone());
        let cancel = CancelToken::new();
        let reply = tutor.respond("손가락으로 세었어요", &cancel).await.unwrap();
        assert_eq!(reply, "왜 14라고 생각했나요?");

        // system + opening + user + assistant
        assert_eq!(tutor.messages().len(), 4);
        assert_eq!(tutor.messages()[2].role, ChatRole::User);
        assert_eq!(tutor.messages()[3].role, ChatRole::Assistant);

        // The request carried the whole conversation so far.
        let requests = client.requests();
        assert_eq!(requests[0].len(), 3);
    }

    #[tokio::test]
    async fn test_failed_turn_rolls_back_user_message() {
        let client = Arc::new(ScriptedClient::new());
        client.push_error(LlmError::RequestFailed("down".to_string()));
        client.push_response("다시 설명해볼까요?");

        let mut tutor = tutor_with(client);
        let cancel = CancelToken::new();

        assert!(tutor.respond("설명", &cancel).await.is_err());
        assert_eq!(tutor.messages().len(), 2);

        // Retry replays the same turn cleanly.
        let reply = tutor.respond("설명", &cancel).await.unwrap();
        assert_eq!(reply, "다시 설명해볼까요?");
        assert_eq!(tutor.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_streaming_turn_accumulates_chunks() {
        let client = Arc::new(ScriptedClient::new());
        client.push_response("힌트: 10을 먼저 만들어보세요");

        let mut tutor = tutor_with(client);
        let cancel = CancelToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let reply = tutor
            .respond_streaming("모르겠어요", tx, &cancel)
            .await
            .unwrap();

        let mut rebuilt = String::new();
        while let Ok(piece) = rx.try_recv() {
            rebuilt.push_str(&piece);
        }
        assert_eq!(rebuilt, reply);
        assert_eq!(tutor.messages().len(), 4);
    }
}
