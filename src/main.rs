//! Weather agent CLI
//!
//! Spawns the weather function server, loads its functions and answers one
//! question, printing the final answer to stdout.

use argh::FromArgs;
use std::io::Read;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weather_agent::config::{load_dotenv, Config, LogFormat};
use weather_agent::functions::FunctionRegistry;
use weather_agent::llm::{LlmService, LoggingService, OpenAiCompatService};
use weather_agent::mcp::McpClient;
use weather_agent::runtime::{AgentError, AgentRuntime, FanOutExecutor, LlmDecisionStep};
use weather_agent::state_machine::AgentContext;

#[derive(FromArgs)]
/// Ask a weather question; reads stdin when no question is given
struct Args {
    /// the question to answer
    #[argh(positional)]
    question: Vec<String>,

    /// decision steps allowed before giving up
    #[argh(option)]
    max_iterations: Option<u32>,

    /// print the full conversation as JSON to stderr
    #[argh(switch)]
    show_conversation: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();
    let dotenv = load_dotenv()?;
    let config = Config::from_env()?;
    init_logging(&config);
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let question = read_question(&args.question)?;
    if question.is_empty() {
        return Err("No question given".into());
    }

    // Function server
    let command = config.mcp_command.to_string_lossy().into_owned();
    let client = McpClient::spawn(&command, &[]).await?;
    let registry = Arc::new(FunctionRegistry::connect(client).await?);

    // Decision step
    if config.llm.api_key.is_none() {
        tracing::warn!("MODEL_API_KEY is not set; requests will be unauthenticated");
    }
    let service: Arc<dyn LlmService> = Arc::new(OpenAiCompatService::new(&config.llm)?);
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(service));
    let decider = LlmDecisionStep::new(llm, chrono::Local::now().date_naive())
        .with_sampling(config.llm.max_tokens, config.llm.temperature);

    let context = AgentContext::with_max_iterations(
        args.max_iterations.unwrap_or(config.agent.max_iterations).max(1),
    );
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, cancelling");
                cancel.cancel();
            }
        }
    });

    let runtime = AgentRuntime::new(
        decider,
        registry,
        FanOutExecutor::new(config.agent.fanout),
    )
    .with_context(context)
    .with_cancellation(cancel);

    match runtime.run(question).await {
        Ok(outcome) => {
            if args.show_conversation {
                eprintln!("{}", serde_json::to_string_pretty(&outcome.conversation)?);
            }
            println!("{}", outcome.answer);
            Ok(())
        }
        Err(e) => {
            if let (true, Some(conversation)) = (args.show_conversation, e.conversation()) {
                eprintln!("{}", serde_json::to_string_pretty(conversation)?);
            }
            if matches!(e, AgentError::Cancelled) {
                tracing::info!("Run cancelled");
            }
            Err(e.into())
        }
    }
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter().into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn read_question(words: &[String]) -> std::io::Result<String> {
    if !words.is_empty() {
        return Ok(words.join(" ").trim().to_string());
    }
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    Ok(input.trim().to_string())
}
