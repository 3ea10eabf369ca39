use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use playmaker::config::{validate_threshold, AppConfig};
use playmaker::judge::claude::ClaudeClient;
use playmaker::judge::ClaudeEvaluator;
use playmaker::stage::{CommandStageRunner, StageRequest, StageRunner};
use playmaker::summary;
use playmaker::workflow::{Orchestrator, OrchestratorConfig};

#[derive(Parser)]
#[command(
    name = "playmaker",
    about = "Playwright test agent orchestrator with an AI judge"
)]
struct Cli {
    /// Project directory the stages run in
    #[arg(short, long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a test plan from a description
    Plan {
        /// Test description (e.g. "Homepage contains a URL")
        request: String,
    },
    /// Generate tests from the plan
    Generate,
    /// Heal failing tests
    Heal,
    /// Judge test quality with AI
    Judge {
        /// Single test file to judge
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Judge pass threshold (0-100)
        #[arg(long)]
        threshold: Option<u32>,
        /// Print verdicts as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the agent workflow: plan, generate, judge
    Workflow {
        /// Test request/description
        request: String,
        /// Heal and re-judge once if the judge fails
        #[arg(long)]
        full: bool,
        /// Judge pass threshold (0-100)
        #[arg(long)]
        threshold: Option<u32>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_json);

    let config = AppConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "Loaded configuration");

    match cli.command {
        Command::Plan { request } => {
            println!("🎯 Planning: {request}");
            run_stage(&config, &cli.dir, StageRequest::plan(request)).await
        }
        Command::Generate => {
            println!("⚙️ Generating tests...");
            run_stage(&config, &cli.dir, StageRequest::Generate).await
        }
        Command::Heal => {
            println!("🩹 Healing tests...");
            run_stage(&config, &cli.dir, StageRequest::Heal).await
        }
        Command::Judge {
            file,
            threshold,
            json,
        } => {
            let orchestrator = build_orchestrator(&config, cli.dir, threshold)?;
            let verdicts = match file {
                Some(file) => vec![orchestrator.judge_file(&file).await?],
                None => orchestrator.judge_existing_tests().await?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&verdicts)?);
            } else {
                print!("{}", summary::render_verdicts(&verdicts));
            }
            Ok(())
        }
        Command::Workflow {
            request,
            full,
            threshold,
            json,
        } => {
            let orchestrator = build_orchestrator(&config, cli.dir, threshold)?;
            let report = if full {
                orchestrator.workflow_full(&request).await?
            } else {
                orchestrator.workflow_plan_generate_judge(&request).await?
            };

            // A failing verdict is reported, not turned into a non-zero exit
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", summary::render_report(&report));
            }
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    // stderr keeps stdout free for the summary
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Run one stage and exit with its exit code.
async fn run_stage(
    config: &AppConfig,
    dir: &std::path::Path,
    request: StageRequest,
) -> anyhow::Result<()> {
    let runner = CommandStageRunner::new(&config.stages);
    let outcome = runner.run_stage(&request, dir).await?;

    let code = match outcome.exit_code {
        Some(code) => code,
        None if outcome.success => 0,
        // killed by a signal
        None => 1,
    };
    std::process::exit(code);
}

fn build_orchestrator(
    config: &AppConfig,
    project_dir: PathBuf,
    threshold: Option<u32>,
) -> anyhow::Result<Orchestrator> {
    let judge_threshold = threshold.unwrap_or(config.judge.threshold);
    validate_threshold(judge_threshold)?;

    let client = ClaudeClient::new(&config.claude, config.claude_api_key()?);
    let evaluator = ClaudeEvaluator::new(client, &config.judge);
    let runner = CommandStageRunner::new(&config.stages);

    Ok(Orchestrator::new(
        OrchestratorConfig {
            project_dir,
            judge_threshold,
        },
        Box::new(runner),
        Box::new(evaluator),
    ))
}
