//! # ThoughtChain CLI
//!
//! Command-line interface for iterative LLM reasoning.
//!
//! Usage:
//!   thoughtchain [chat]
//!   thoughtchain ask <request>...
//!   thoughtchain setup
//!   thoughtchain config [--init]
//!
//! Examples:
//!   thoughtchain --max-iterations 3 --threshold 0.7
//!   thoughtchain --no-feedback ask "Outline a launch plan for a note-taking app"
//!   thoughtchain --base-url http://localhost:11434/v1 --model llama3 chat

mod setup;
mod ui;

use crate::ui::{ConsoleDisplay, ConsoleInput};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::Path;
use std::sync::Arc;
use thoughtchain_core::{
    config_path, AutoContinue, ClassifierStrategy, Config, ConfidenceMode, FeedbackSource,
    Outcome, ReasoningResult, ThoughtChain,
};
use thoughtchain_provider::OpenAIProvider;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "thoughtchain")]
#[command(author, version, about = "ThoughtChain - iterative reasoning with an LLM")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Maximum number of thought iterations
    #[arg(long, global = true)]
    max_iterations: Option<u32>,

    /// Confidence above which iterating stops (0 to 1)
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Never ask for feedback between iterations
    #[arg(long, global = true)]
    no_feedback: bool,

    /// Let the model classify the request instead of keyword matching
    #[arg(long, global = true)]
    delegated: bool,

    /// Weigh confidence by iteration budget, verdicts and self-evaluation
    #[arg(long, global = true)]
    extended: bool,

    /// Model name
    #[arg(long, global = true, env = "THOUGHTCHAIN_MODEL")]
    model: Option<String>,

    /// OpenAI-compatible endpoint
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// API key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Answer one request and exit
    Ask {
        /// The request
        #[arg(trailing_var_arg = true, required = true)]
        request: Vec<String>,
    },
    /// Store API key and base URL in .env
    Setup,
    /// Show the effective configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

impl Cli {
    /// Flags and environment win over the config file
    fn apply(&self, config: &mut Config) {
        let reasoning = &mut config.reasoning;
        if let Some(max) = self.max_iterations {
            reasoning.max_iterations = max;
        }
        if let Some(threshold) = self.threshold {
            reasoning.confidence_threshold = threshold;
        }
        if self.no_feedback {
            reasoning.human_feedback = false;
        }
        if self.delegated {
            reasoning.classifier = ClassifierStrategy::Delegated;
        }
        if self.extended {
            reasoning.confidence = ConfidenceMode::Extended;
        }

        let provider = &mut config.provider;
        if let Some(model) = &self.model {
            provider.model = Some(model.clone());
        }
        if let Some(base_url) = &self.base_url {
            provider.base_url = base_url.clone();
        }
        if let Some(api_key) = &self.api_key {
            provider.api_key = api_key.clone();
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_chain(cli: &Cli) -> Result<ThoughtChain> {
    let mut config = Config::load()?;
    cli.apply(&mut config);
    debug!(
        reasoning = ?config.reasoning,
        base_url = %config.provider.base_url,
        model = ?config.provider.model,
        "effective configuration"
    );

    let provider = OpenAIProvider::new(config.provider.to_provider_config())
        .map_err(|e| e.into_error("cli::provider"))?;
    Ok(ThoughtChain::new(Arc::new(provider), config.reasoning)?)
}

/// Cancel `cancel` on Ctrl-C until the returned handle is aborted
fn cancel_on_interrupt(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

fn print_summary(result: &ReasoningResult) {
    println!(
        "{}",
        style(format!(
            "[{} iteration(s), stopped: {}, {} tokens]",
            result.transcript.len(),
            result.stop_reason.as_str(),
            result.usage.total_tokens()
        ))
        .dim()
    );
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Completed(result) => print_summary(result),
        Outcome::Cancelled {
            iterations_completed,
        } => println!(
            "\n{}",
            style(format!(
                "Request cancelled after {} iteration(s).",
                iterations_completed
            ))
            .red()
            .bold()
        ),
    }
}

async fn chat(chain: ThoughtChain) -> Result<()> {
    let mut input = ConsoleInput::new();
    let mut display = ConsoleDisplay::stdout();

    println!("{}", style("Welcome to ThoughtChain.").green().bold());
    println!("Type your messages below. Type 'exit' to quit.");
    if chain.config().human_feedback {
        println!("After each iteration, press Enter to continue, give feedback, or type 'finalize'.");
    }
    println!("Rate the last answer with /correct or /wrong.\n");

    loop {
        let prompt = style("You: ").cyan().bold();
        let line = tokio::select! {
            line = input.read_line(&prompt) => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}", style("Chat interrupted. Exiting...").red().bold());
                // The pending stdin read would keep the runtime from shutting down
                std::process::exit(130);
            }
        };
        let Some(line) = line else { break };
        let request = line.trim();

        if request.eq_ignore_ascii_case("exit") {
            println!("{}", style("Exiting chat...").green().bold());
            break;
        }
        if request.is_empty() {
            println!("{}", style("Error: Empty message.").red().bold());
            continue;
        }
        if request == "/correct" || request == "/wrong" {
            chain.record_verdict(request == "/correct");
            let tally = chain.tally();
            println!(
                "{}",
                style(format!("Recorded. {}/{} answers correct.", tally.correct, tally.total)).dim()
            );
            continue;
        }

        let cancel = CancellationToken::new();
        let watcher = cancel_on_interrupt(cancel.clone());
        let result = if chain.config().human_feedback {
            chain.process(request, &mut input, &mut display, &cancel).await
        } else {
            chain.process(request, &mut AutoContinue, &mut display, &cancel).await
        };
        watcher.abort();

        match result {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => println!("{}", style(format!("Error: {}", e)).red().bold()),
        }
        println!();
    }

    Ok(())
}

async fn ask(chain: ThoughtChain, request: String) -> Result<()> {
    let chain = Arc::new(chain);
    let feedback: Box<dyn FeedbackSource> = if chain.config().human_feedback {
        Box::new(ConsoleInput::new())
    } else {
        Box::new(AutoContinue)
    };

    let cancel = CancellationToken::new();
    let watcher = cancel_on_interrupt(cancel.clone());
    let handle = chain.spawn(request, feedback, Box::new(ConsoleDisplay::stdout()), cancel);
    let outcome = handle.await.context("reasoning worker panicked")?;
    watcher.abort();

    let outcome = outcome?;
    print_outcome(&outcome);
    if outcome.is_cancelled() {
        std::process::exit(130);
    }
    Ok(())
}

fn show_config(init: bool) -> Result<()> {
    let path = config_path();
    if init {
        if path.exists() {
            println!("{} already exists, leaving it untouched.", path.display());
        } else {
            Config::default().save_to(&path)?;
            println!("{} Wrote {}", style("✓").green(), path.display());
        }
    }

    let config = Config::load_from(&path)?;
    println!("{}", style(format!("# {}", path.display())).dim());
    print!("{}", config.to_toml()?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env has to be loaded before clap reads the environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Some(Commands::Setup) => setup::run(Path::new(".env")),
        Some(Commands::Config { init }) => show_config(*init),
        Some(Commands::Ask { request }) => {
            let request = request.join(" ");
            ask(build_chain(&cli)?, request).await
        }
        Some(Commands::Chat) | None => chat(build_chain(&cli)?).await,
    }
}
