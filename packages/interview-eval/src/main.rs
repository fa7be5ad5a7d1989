//! Interview transcript evaluation CLI

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use interview_eval::config::{MODEL_ENV, PROMPT_MODE_ENV, PROVIDER_ENV};
use interview_eval::scores::{self, ScoreSummary};
use interview_eval::{
    app, Config, EvalError, EvaluationReport, PromptMode, Provider, RunOptions,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "interview-eval")]
#[command(about = "Grade interview answers with an LLM")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every transcript in a CSV file
    Evaluate(EvaluateArgs),

    /// Count expertise scores in a results file
    Scores {
        /// Results file written by `evaluate`
        #[arg(default_value = "evaluation_results.json")]
        path: PathBuf,
    },
}

#[derive(Args)]
struct EvaluateArgs {
    /// CSV file with one transcript per row
    input: PathBuf,

    /// Where to write the JSON results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// LLM provider
    #[arg(long, value_enum, env = PROVIDER_ENV)]
    provider: Option<Provider>,

    /// Model name (defaults per provider)
    #[arg(short, long, env = MODEL_ENV)]
    model: Option<String>,

    /// Prompt set to use
    #[arg(long, value_enum, env = PROMPT_MODE_ENV)]
    prompt_mode: Option<PromptMode>,

    /// CSV column holding the transcript
    #[arg(long)]
    column: Option<String>,

    /// Rows evaluated at once
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Attempts per model call, including the first
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl From<EvaluateArgs> for RunOptions {
    fn from(args: EvaluateArgs) -> Self {
        Self {
            input: args.input,
            output: args.output,
            provider: args.provider,
            model: args.model,
            prompt_mode: args.prompt_mode,
            column: args.column,
            concurrency: args.concurrency,
            max_attempts: args.max_attempts,
            timeout_secs: args.timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays clean for the results fallback
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,interview_eval=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Evaluate(args) => evaluate(args.into()).await,
        Commands::Scores { path } => count_scores(&path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_cancelled(&e) => {
            eprintln!("{}", "Cancelled, no results written".yellow());
            ExitCode::from(130)
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Run failed");
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

async fn evaluate(options: RunOptions) -> Result<()> {
    let config = Config::from_env(options).context("Failed to load configuration")?;
    let client = app::build_client(&config).context("Failed to build model client")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping evaluation");
            on_interrupt.cancel();
        }
    });

    // Results go to stdout if the output file cannot be written
    let report = app::run(&config, client, &cancel, std::io::stdout())
        .await
        .context("Evaluation failed")?;

    print_report(&config, &report);
    Ok(())
}

fn count_scores(path: &Path) -> Result<()> {
    let summary = scores::count_scores(path)
        .with_context(|| format!("Failed to count scores in {}", path.display()))?;
    print_scores(&summary);
    Ok(())
}

fn print_report(config: &Config, report: &EvaluationReport) {
    println!(
        "{} Evaluated {} of {} rows → {}",
        "✓".green(),
        report.results.len(),
        report.total_rows,
        config.output_path.display().to_string().cyan()
    );

    if !report.skipped.is_empty() {
        println!("{} Skipped {} rows:", "⚠".yellow(), report.skipped.len());
        for skipped in &report.skipped {
            println!("  row {}: {}", skipped.row, skipped.reason.dimmed());
        }
    }
}

fn print_scores(summary: &ScoreSummary) {
    println!("{}", "Score occurrences:".bold());
    for (score, count) in &summary.counts {
        println!("  {:>4}  {}", score.to_string().cyan(), count);
    }
    println!("Number of unique scores: {}", summary.unique().to_string().green());

    if summary.unreadable > 0 {
        println!(
            "{} {} evaluations had no readable score",
            "⚠".yellow(),
            summary.unreadable
        );
    }
}

fn is_cancelled(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<EvalError>(), Some(EvalError::Cancelled))
}
