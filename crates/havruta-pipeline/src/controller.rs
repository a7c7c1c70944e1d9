use havruta_core::{
    CancelToken, ChatMessage, GenerationError, LlmError, MathCategory, MathProblem, PipelineState,
    ProblemId, Transcript, VerificationError, VerificationRequest, VerificationVerdict,
};
use havruta_llm::{AnswerVerifier, ChatClient, FeedbackTutor, ProblemGenerator};
use std::sync::Arc;

/// Handle for one in-flight answer check. Stamped with the problem it was
/// issued against; a verdict arriving after the problem changed is
/// discarded on that stamp.
#[derive(Debug, Clone)]
pub struct CheckTicket {
    problem_id: ProblemId,
    pub request: VerificationRequest,
    pub cancel: CancelToken,
}

impl CheckTicket {
    pub fn problem_id(&self) -> ProblemId {
        self.problem_id
    }
}

/// Handle for one in-flight reasoning/feedback request.
#[derive(Debug, Clone)]
pub struct ReasoningTicket {
    problem_id: ProblemId,
    pub student_text: String,
    pub cancel: CancelToken,
}

impl ReasoningTicket {
    pub fn problem_id(&self) -> ProblemId {
        self.problem_id
    }
}

/// What applying a verdict did to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Correct { message: String },
    Incorrect { message: String, opening: String },
    /// The check failed; the answer stays unresolved and the user may retry.
    Unresolved {
        error: VerificationError,
        status: String,
    },
    /// The verdict belonged to a superseded problem and was discarded.
    Stale,
    /// A check was already in flight; the input was dropped.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReasoningReply {
    Feedback { reply: String },
    Failed { error: LlmError, status: String },
    Stale,
    Ignored,
}

/// Orchestrates capture → verify → state transition over one problem at a
/// time. Single-threaded and event-driven: every method takes `&mut self`,
/// so discipline comes from the state guards, not from locks.
pub struct AnswerPipelineController {
    client: Arc<dyn ChatClient>,
    verifier: AnswerVerifier,
    generator: ProblemGenerator,
    state: PipelineState,
    current: Option<MathProblem>,
    next_problem_id: u64,
    inflight_check: Option<(ProblemId, CancelToken)>,
    reasoning_inflight: Option<CancelToken>,
    tutor: Option<FeedbackTutor>,
    status: Option<String>,
}

impl AnswerPipelineController {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            verifier: AnswerVerifier::new(Arc::clone(&client)),
            generator: ProblemGenerator::new(Arc::clone(&client)),
            client,
            state: PipelineState::AwaitingAnswer,
            current: None,
            next_problem_id: 1,
            inflight_check: None,
            reasoning_inflight: None,
            tutor: None,
            status: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn current_problem(&self) -> Option<&MathProblem> {
        self.current.as_ref()
    }

    /// Latest user-facing status text, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn feedback_messages(&self) -> Option<&[ChatMessage]> {
        self.tutor.as_ref().map(FeedbackTutor::messages)
    }

    /// Install a known problem. Supersedes any in-flight work: results
    /// keyed by the previous problem are discarded when they arrive.
    pub fn load_problem(
        &mut self,
        text: impl Into<String>,
        answer: impl Into<String>,
        category: MathCategory,
    ) -> &MathProblem {
        let id = ProblemId(self.next_problem_id);
        self.next_problem_id += 1;
        self.inflight_check = None;
        self.reasoning_inflight = None;
        self.tutor = None;
        self.state = PipelineState::AwaitingAnswer;
        self.status = None;
        tracing::info!(problem_id = %id, "problem loaded");
        self.current.insert(MathProblem {
            id,
            text: text.into(),
            answer: answer.into(),
            category,
        })
    }

    /// Generate and install a fresh problem. On failure the previous
    /// problem and state stay intact and the error status is surfaced.
    pub async fn new_problem(
        &mut self,
        category: MathCategory,
        cancel: &CancelToken,
    ) -> Result<&MathProblem, GenerationError> {
        match self.generator.generate(category, cancel).await {
            Ok(generated) => Ok(self.load_problem(generated.problem, generated.answer, category)),
            Err(error) => {
                tracing::warn!("problem generation failed: {error}");
                self.status = Some("문제 생성 중 오류가 발생했습니다.".to_string());
                Err(error)
            }
        }
    }

    /// Move into Checking for the current problem. Returns `None` while a
    /// check is already in flight (single-flight) or when there is nothing
    /// to check against.
    pub fn begin_check(&mut self, transcript: Transcript) -> Option<CheckTicket> {
        if self.state == PipelineState::Checking {
            tracing::debug!("check already in flight, ignoring transcript");
            return None;
        }
        if self.state != PipelineState::AwaitingAnswer {
            tracing::debug!(state = ?self.state, "not awaiting an answer, ignoring transcript");
            return None;
        }
        let problem = self.current.as_ref()?;

        let cancel = CancelToken::new();
        self.state = PipelineState::Checking;
        self.inflight_check = Some((problem.id, cancel.clone()));
        Some(CheckTicket {
            problem_id: problem.id,
            request: VerificationRequest {
                problem_text: problem.text.clone(),
                raw_answer_text: transcript.into_text(),
                category: problem.category,
            },
            cancel,
        })
    }

    /// Apply the outcome of one check. A verdict for a problem that is no
    /// longer current is discarded without touching the pipeline state.
    pub fn apply_verdict(
        &mut self,
        ticket: &CheckTicket,
        outcome: Result<VerificationVerdict, VerificationError>,
    ) -> Applied {
        let current_id = self.current.as_ref().map(|p| p.id);
        if current_id != Some(ticket.problem_id) || self.state != PipelineState::Checking {
            tracing::debug!(problem_id = %ticket.problem_id, "discarding stale verdict");
            let matches_ticket = self
                .inflight_check
                .as_ref()
                .map_or(false, |(id, _)| *id == ticket.problem_id);
            if matches_ticket {
                self.inflight_check = None;
            }
            return Applied::Stale;
        }
        self.inflight_check = None;

        match outcome {
            Ok(VerificationVerdict::Correct(suffix)) => {
                self.state = PipelineState::AwaitingAnswer;
                self.tutor = None;
                let message = if suffix.is_empty() {
                    "정답입니다! 🎉".to_string()
                } else {
                    format!("정답입니다! 🎉 {suffix}")
                };
                self.status = Some(message.clone());
                tracing::info!(problem_id = %ticket.problem_id, "answer correct");
                Applied::Correct { message }
            }
            Ok(VerificationVerdict::Incorrect(suffix)) => {
                self.state = PipelineState::AwaitingReasoning;
                let tutor = FeedbackTutor::new(
                    Arc::clone(&self.client),
                    &ticket.request.problem_text,
                    &ticket.request.raw_answer_text,
                );
                let opening = tutor.opening_message().to_string();
                self.tutor = Some(tutor);
                let message = if suffix.is_empty() {
                    "틀렸습니다. 다시 시도해보세요.".to_string()
                } else {
                    format!("틀렸습니다. {suffix}")
                };
                self.status = Some(message.clone());
                tracing::info!(problem_id = %ticket.problem_id, "answer incorrect");
                Applied::Incorrect { message, opening }
            }
            Err(error) => {
                self.state = PipelineState::AwaitingAnswer;
                let status = "답을 확인하는 중 오류가 발생했습니다. 다시 시도해주세요.".to_string();
                self.status = Some(status.clone());
                tracing::warn!(problem_id = %ticket.problem_id, "verification failed: {error}");
                Applied::Unresolved { error, status }
            }
        }
    }

    /// Convenience driver: begin a check, run the verifier, apply the
    /// verdict.
    pub async fn run_check(&mut self, transcript: Transcript) -> Applied {
        let Some(ticket) = self.begin_check(transcript) else {
            return Applied::Ignored;
        };
        let outcome = self.verifier.verify(&ticket.request, &ticket.cancel).await;
        self.apply_verdict(&ticket, outcome)
    }

    /// Move one reasoning submission toward the tutor. Single-flight:
    /// `None` while a feedback request is already outstanding.
    pub fn begin_reasoning(&mut self, student_text: &str) -> Option<ReasoningTicket> {
        if self.state != PipelineState::AwaitingReasoning {
            tracing::debug!(state = ?self.state, "not awaiting reasoning, ignoring input");
            return None;
        }
        if self.reasoning_inflight.is_some() {
            tracing::debug!("feedback request already in flight, ignoring input");
            return None;
        }
        let problem = self.current.as_ref()?;

        let cancel = CancelToken::new();
        self.reasoning_inflight = Some(cancel.clone());
        Some(ReasoningTicket {
            problem_id: problem.id,
            student_text: student_text.to_string(),
            cancel,
        })
    }

    pub fn apply_reasoning(
        &mut self,
        ticket: &ReasoningTicket,
        outcome: Result<String, LlmError>,
    ) -> ReasoningReply {
        self.reasoning_inflight = None;

        let current_id = self.current.as_ref().map(|p| p.id);
        if current_id != Some(ticket.problem_id) || self.state != PipelineState::AwaitingReasoning {
            tracing::debug!(problem_id = %ticket.problem_id, "discarding stale feedback reply");
            return ReasoningReply::Stale;
        }

        match outcome {
            Ok(reply) => {
                self.state = PipelineState::Feedback;
                ReasoningReply::Feedback { reply }
            }
            Err(error) => {
                let status =
                    "죄송합니다. 응답을 받는 중에 오류가 발생했습니다. 다시 시도해주세요."
                        .to_string();
                self.status = Some(status.clone());
                tracing::warn!(problem_id = %ticket.problem_id, "feedback request failed: {error}");
                ReasoningReply::Failed { error, status }
            }
        }
    }

    /// Convenience driver for one reasoning turn.
    pub async fn run_reasoning(&mut self, student_text: &str) -> ReasoningReply {
        let Some(ticket) = self.begin_reasoning(student_text) else {
            return ReasoningReply::Ignored;
        };
        let outcome = match self.tutor.as_mut() {
            Some(tutor) => tutor.respond(&ticket.student_text, &ticket.cancel).await,
            None => Err(LlmError::RequestFailed(
                "no feedback conversation active".to_string(),
            )),
        };
        self.apply_reasoning(&ticket, outcome)
    }

    /// Leave the Feedback state for the next answer round without loading
    /// a new problem yet.
    pub fn finish_feedback(&mut self) {
        if self.state == PipelineState::Feedback {
            self.state = PipelineState::AwaitingAnswer;
            self.tutor = None;
        }
    }

    /// Cancel outstanding requests (navigation away / shutdown). In-flight
    /// responses stop accumulating; the pipeline returns to a stable state.
    pub fn abort(&mut self) {
        if let Some((id, cancel)) = self.inflight_check.take() {
            tracing::debug!(problem_id = %id, "aborting in-flight verification");
            cancel.cancel();
            self.state = PipelineState::AwaitingAnswer;
        }
        if let Some(cancel) = self.reasoning_inflight.take() {
            cancel.cancel();
        }
    }
}
