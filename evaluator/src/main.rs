use chrono::Local;
use clap::Parser;
use qanary_client::{HttpStoreConnector, QanaryProvider};
use qanary_evaluator::{
    execute, report_prefix, with_suffix, RunOptions, ScorerRegistry, TestDefinition, TracingSink,
    DEFAULT_SHEET_NAME,
};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qanary-eval")]
#[command(
    about = "Executes the tests for your Qanary-based question answering system and writes JSON, CSV and chart reports"
)]
struct Cli {
    /// Directory containing qanary-test-definition.json and the SPARQL templates
    #[arg(short, long, required_unless_present = "list_scorers")]
    directory: Option<PathBuf>,
    /// Where reports and the run log are written (default: <directory>/output)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Name used for report file names and the chart title
    #[arg(long, default_value = DEFAULT_SHEET_NAME)]
    sheet_name: String,
    /// Print available custom scorers and exit
    #[arg(long)]
    list_scorers: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let registry = ScorerRegistry::with_builtins();

    if cli.list_scorers {
        println!("Available custom scorers:");
        for name in registry.list_scorers() {
            println!("  - {}", name);
        }
        return Ok(());
    }

    let directory = cli.directory.clone().ok_or("--directory is required")?;
    if !directory.is_dir() {
        return Err(format!("Directory '{}' not available.", directory.display()).into());
    }

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| directory.join("output"));
    fs::create_dir_all(&output_dir)?;

    let prefix = report_prefix(&output_dir, &cli.sheet_name, Local::now());
    let log_path = with_suffix(&prefix, ".log");
    init_tracing(&log_path)?;

    match run(&cli, &directory, &registry, prefix).await {
        Ok(()) => {
            println!("LOG file written to '{}'.", log_path.display());
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "evaluation failed");
            eprintln!("evaluation failed: {}", e);
            eprintln!("see '{}' for details", log_path.display());
            Err(e)
        }
    }
}

fn init_tracing(log_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let log_file = File::create(log_path)?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();
    Ok(())
}

async fn run(
    cli: &Cli,
    directory: &Path,
    registry: &ScorerRegistry,
    prefix: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let definition = TestDefinition::load(directory)?;
    let description = definition.describe();
    println!("{}", description);
    info!("{}", description);

    let answering = QanaryProvider::new(&definition.qanary)?;
    let connector = HttpStoreConnector::new(definition.qanary.timeout());

    let options = RunOptions {
        directory: directory.to_path_buf(),
        prefix,
        sheet_name: cli.sheet_name.clone(),
    };

    let summary = execute(
        &options,
        &definition,
        registry,
        Box::new(answering),
        Box::new(connector),
        Arc::new(TracingSink::new().with_console(true)),
    )
    .await?;

    info!(
        run_id = %summary.run_id,
        runtime_secs = summary.runtime_secs,
        questions = summary.questions,
        validators = summary.validators,
        custom_scorer = %summary.custom_scorer,
        "run summary"
    );
    Ok(())
}
