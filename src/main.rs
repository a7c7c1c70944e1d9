use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use havruta_capture::{
    request_microphone, CaptureOutcome, CaptureSession, RecognizerRegistry, StaticProbe,
};
use havruta_core::{AppConfig, CancelToken, CaptureError, MathCategory, PipelineState, Transcript};
use havruta_llm::OpenAiClient;
use havruta_pipeline::{AnswerPipelineController, Applied, ReasoningReply};

#[derive(Parser)]
#[command(name = "havruta", about = "Voice-driven elementary math tutor")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Problem category (addition_subtraction | multiplication_division)
    #[arg(long)]
    category: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter =
        EnvFilter::try_new(&config.general.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("havruta starting");

    let category = match cli.category.as_deref() {
        Some(id) => {
            MathCategory::from_id(id).with_context(|| format!("unknown category: {id}"))?
        }
        None => config.tutor.category,
    };

    let cancel = CancelToken::new();
    tokio::select! {
        result = run(&config, category, &cancel) => result,
        _ = tokio::signal::ctrl_c() => {
            // Stop any in-flight completion from appending further output.
            cancel.cancel();
            tracing::info!("interrupted, shutting down");
            Ok(())
        }
    }
}

async fn run(config: &AppConfig, category: MathCategory, cancel: &CancelToken) -> Result<()> {
    let client = Arc::new(
        OpenAiClient::from_config(&config.llm).context("failed to build LLM client")?,
    );
    let mut controller = AnswerPipelineController::new(client);

    let registry = RecognizerRegistry::new();
    let recognizer = registry
        .create(&config.speech.recognizer)
        .with_context(|| format!("failed to create recognizer '{}'", config.speech.recognizer))?;

    // The typed recognizer needs no microphone; a speech-capable host
    // would probe the device stack here instead.
    let permission = request_microphone(&StaticProbe::granted()).await;
    let mut session = CaptureSession::new(recognizer, permission, &config.speech)
        .await
        .context("failed to set up capture session")?;

    let info = category.info();
    println!("하브루타 수학 — {} ({})", info.title, info.grade_level);

    loop {
        if controller.new_problem(category, cancel).await.is_err() {
            if let Some(status) = controller.status() {
                println!("{status}");
            }
            println!("Enter를 누르면 다시 시도합니다.");
            let _ = capture_text(&mut session).await?;
            continue;
        }
        if let Some(problem) = controller.current_problem() {
            println!("\n문제: {}", problem.text);
        }

        // Answer round: capture transcripts until this problem is resolved
        // (correct answer, or incorrect answer entering the reasoning flow).
        while controller.state() == PipelineState::AwaitingAnswer {
            println!("답을 입력하거나 말해보세요:");
            let Some(transcript) = capture_text(&mut session).await? else {
                continue;
            };
            match controller.run_check(transcript).await {
                Applied::Correct { message } => {
                    println!("{message}");
                    // On to the next problem.
                    break;
                }
                Applied::Incorrect { message, opening } => {
                    println!("{message}");
                    println!("\n선생님: {opening}");
                }
                Applied::Unresolved { status, .. } => println!("{status}"),
                Applied::Stale | Applied::Ignored => {}
            }
        }

        // Reasoning round after an incorrect answer.
        while controller.state() == PipelineState::AwaitingReasoning {
            println!("풀이 과정을 설명해주세요:");
            let Some(reasoning) = capture_text(&mut session).await? else {
                continue;
            };
            match controller.run_reasoning(reasoning.as_str()).await {
                ReasoningReply::Feedback { reply } => println!("선생님: {reply}"),
                ReasoningReply::Failed { status, .. } => println!("{status}"),
                ReasoningReply::Stale | ReasoningReply::Ignored => {}
            }
        }

        if controller.state() == PipelineState::Feedback {
            println!("\nEnter를 누르면 다음 문제로 넘어갑니다.");
            let _ = capture_text(&mut session).await?;
            controller.finish_feedback();
        }
    }
}

/// One capture cycle. `Ok(None)` means the run ended without usable text;
/// capture errors are surfaced as status text rather than failures, except
/// for a closed input stream, which ends the program.
async fn capture_text(session: &mut CaptureSession) -> Result<Option<Transcript>> {
    match session.capture().await {
        CaptureOutcome::Transcript(transcript) => Ok(Some(transcript)),
        CaptureOutcome::Stopped => Ok(None),
        CaptureOutcome::Failed(CaptureError::Aborted) => {
            anyhow::bail!("input stream closed")
        }
        CaptureOutcome::Failed(error) => {
            println!("{}", error.user_message());
            Ok(None)
        }
    }
}
