use havruta_capture::{CaptureOutcome, CaptureSession, MicrophonePermission, ScriptedRecognizer};
use havruta_core::{
    CancelToken, CaptureError, CaptureState, MathCategory, PermissionError, PipelineState,
    SpeechConfig, Transcript,
};
use havruta_llm::ScriptedClient;
use havruta_pipeline::{AnswerPipelineController, Applied, ReasoningReply};
use std::sync::Arc;

fn scripted_config() -> SpeechConfig {
    SpeechConfig {
        recognizer: "scripted".to_string(),
        ..SpeechConfig::default()
    }
}

#[tokio::test]
async fn test_spoken_correct_answer_loads_next_problem_within_one_cycle() {
    let client = Arc::new(ScriptedClient::new());
    // verdict for the spoken answer, then the next generated problem
    client.push_response("CORRECT: 십오, 맞았어요!");
    client.push_response(r#"{"problem": "9-3은 얼마인가요?", "answer": "6"}"#);

    let recognizer = ScriptedRecognizer::new();
    let mut session = CaptureSession::new(
        Box::new(recognizer.clone()),
        MicrophonePermission::granted(),
        &scripted_config(),
    )
    .await
    .unwrap();

    let mut controller = AnswerPipelineController::new(client.clone());
    controller.load_problem("7+8은 얼마인가요?", "15", MathCategory::AdditionSubtraction);
    let first_id = controller.current_problem().unwrap().id;

    // Capture the spoken answer and feed it through the pipeline.
    recognizer.push_utterance("십오입니다");
    let transcript = match session.capture().await {
        CaptureOutcome::Transcript(t) => t,
        other => panic!("expected Transcript, got {other:?}"),
    };

    match controller.run_check(transcript).await {
        Applied::Correct { message } => assert!(message.contains("정답입니다")),
        other => panic!("expected Correct, got {other:?}"),
    }
    assert_eq!(controller.state(), PipelineState::AwaitingAnswer);

    // Correct answer rolls straight into the next problem.
    let cancel = CancelToken::new();
    let problem = controller
        .new_problem(MathCategory::AdditionSubtraction, &cancel)
        .await
        .unwrap();
    assert_eq!(problem.text, "9-3은 얼마인가요?");
    assert!(problem.id.0 > first_id.0);

    // The verifier saw the numeric-intent instruction and the raw
    // transcript, not a pre-parsed number.
    let requests = client.requests();
    assert!(requests[0][0].content.contains("숫자를 추출"));
    assert!(requests[0][1].content.contains("십오입니다"));
}

#[tokio::test]
async fn test_incorrect_answer_walks_reasoning_then_feedback() {
    let client = Arc::new(ScriptedClient::new());
    client.push_response("INCORRECT: 7+8은 15입니다.");
    client.push_response("어디서부터 세기 시작했는지 말해줄래요?");

    let mut controller = AnswerPipelineController::new(client);
    controller.load_problem("7+8은 얼마인가요?", "15", MathCategory::AdditionSubtraction);

    match controller.run_check(Transcript::new("14")).await {
        Applied::Incorrect { message, opening } => {
            assert!(message.contains("7+8은 15입니다."));
            assert!(opening.contains("학생의 답: 14"));
        }
        other => panic!("expected Incorrect, got {other:?}"),
    }
    assert_eq!(controller.state(), PipelineState::AwaitingReasoning);

    match controller.run_reasoning("7 다음부터 세었어요").await {
        ReasoningReply::Feedback { reply } => {
            assert_eq!(reply, "어디서부터 세기 시작했는지 말해줄래요?")
        }
        other => panic!("expected Feedback, got {other:?}"),
    }
    assert_eq!(controller.state(), PipelineState::Feedback);

    controller.finish_feedback();
    assert_eq!(controller.state(), PipelineState::AwaitingAnswer);
}

#[tokio::test]
async fn test_single_flight_spares_the_network() {
    let client = Arc::new(ScriptedClient::new());
    client.push_response("CORRECT: 맞아요");

    let mut controller = AnswerPipelineController::new(client.clone());
    controller.load_problem("7+8", "15", MathCategory::AdditionSubtraction);

    let ticket = controller.begin_check(Transcript::new("15")).unwrap();
    // A second transcript while the first check is outstanding is dropped
    // before any call is made.
    assert!(controller.begin_check(Transcript::new("십오")).is_none());
    assert_eq!(client.call_count(), 0);

    let outcome = havruta_llm::AnswerVerifier::new(client.clone())
        .verify(&ticket.request, &ticket.cancel)
        .await;
    controller.apply_verdict(&ticket, outcome);
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_new_problem_mid_check_discards_late_verdict() {
    let client = Arc::new(ScriptedClient::new());
    client.push_response("CORRECT: 이전 문제 기준으로는 맞아요");

    let mut controller = AnswerPipelineController::new(client.clone());
    controller.load_problem("7+8", "15", MathCategory::AdditionSubtraction);

    let ticket = controller.begin_check(Transcript::new("15")).unwrap();

    // The user switches category before the verdict lands.
    controller.load_problem("3×4는?", "12", MathCategory::MultiplicationDivision);
    assert_eq!(controller.state(), PipelineState::AwaitingAnswer);

    let outcome = havruta_llm::AnswerVerifier::new(client)
        .verify(&ticket.request, &ticket.cancel)
        .await;
    let applied = controller.apply_verdict(&ticket, outcome);
    assert_eq!(applied, Applied::Stale);

    // The late verdict neither advanced the state machine nor left status
    // text behind.
    assert_eq!(controller.state(), PipelineState::AwaitingAnswer);
    assert!(controller.status().is_none());
    assert_eq!(controller.current_problem().unwrap().text, "3×4는?");
}

#[tokio::test]
async fn test_generation_failure_keeps_previous_problem() {
    let client = Arc::new(ScriptedClient::new());
    client.push_response("이건 JSON이 아닙니다");

    let mut controller = AnswerPipelineController::new(client);
    controller.load_problem("7+8", "15", MathCategory::AdditionSubtraction);

    let cancel = CancelToken::new();
    assert!(controller
        .new_problem(MathCategory::AdditionSubtraction, &cancel)
        .await
        .is_err());
    assert_eq!(controller.status(), Some("문제 생성 중 오류가 발생했습니다."));
    assert_eq!(controller.current_problem().unwrap().text, "7+8");
}

#[tokio::test]
async fn test_capture_permission_failure_leaves_pipeline_untouched() {
    let client = Arc::new(ScriptedClient::new());
    let mut controller = AnswerPipelineController::new(client);
    controller.load_problem("7+8", "15", MathCategory::AdditionSubtraction);

    let recognizer = ScriptedRecognizer::new();
    let mut session = CaptureSession::new(
        Box::new(recognizer),
        MicrophonePermission::denied(PermissionError::Denied),
        &scripted_config(),
    )
    .await
    .unwrap();

    match session.capture().await {
        CaptureOutcome::Failed(error) => {
            assert_eq!(error, CaptureError::PermissionDenied);
            assert_eq!(error.user_message(), "마이크 사용 권한이 없습니다");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(session.state(), CaptureState::Errored);

    // No transcript was produced, so the pipeline never left its state.
    assert_eq!(controller.state(), PipelineState::AwaitingAnswer);
    assert!(controller.status().is_none());
}

#[tokio::test]
async fn test_verification_error_surfaces_retry_affordance() {
    let client = Arc::new(ScriptedClient::new());
    client.push_response("판단하기 어렵네요");
    client.push_response("CORRECT: 맞아요!");

    let mut controller = AnswerPipelineController::new(client);
    controller.load_problem("7+8", "15", MathCategory::AdditionSubtraction);

    match controller.run_check(Transcript::new("15")).await {
        Applied::Unresolved { status, .. } => assert!(status.contains("다시 시도해주세요")),
        other => panic!("expected Unresolved, got {other:?}"),
    }

    // Fresh user-initiated retry resolves.
    match controller.run_check(Transcript::new("15")).await {
        Applied::Correct { .. } => {}
        other => panic!("expected Correct, got {other:?}"),
    }
}
