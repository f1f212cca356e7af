use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use match_api::analysis::retrieval::RetrievalResponse;
use match_api::demo::report::generate_text_report;
use match_api::demo::samples::{SAMPLE_JOB_DESCRIPTION, SAMPLE_RESUME};
use match_api::demo::session::HISTORY_LIMIT;
use match_api::demo::{poll_for_results, ApiClient, PollConfig, PollOutcome, Session};

#[derive(Parser)]
#[command(name = "match-demo")]
#[command(about = "Submit a resume and job description to the match API and wait for the result", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the match API
    #[arg(long, env = "MATCH_API_URL", default_value = "http://localhost:8080", global = true)]
    api_url: String,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an analysis, poll until it finishes and print the report
    Analyze {
        /// Resume text file
        #[arg(long, required_unless_present = "sample")]
        resume: Option<PathBuf>,

        /// Job description text file
        #[arg(long, required_unless_present = "sample")]
        job: Option<PathBuf>,

        /// Use the built-in sample resume and job description
        #[arg(long, conflicts_with_all = ["resume", "job"])]
        sample: bool,

        /// Number of polling attempts
        #[arg(long, default_value = "30")]
        max_attempts: u32,

        /// Seconds between polling attempts
        #[arg(long, default_value = "2")]
        interval: u64,

        /// Submit the same inputs this many times, one after another
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=HISTORY_LIMIT as i64))]
        runs: u32,

        /// Also write the latest text report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the session history as JSON to this file
        #[arg(long)]
        output_json: Option<PathBuf>,
    },

    /// Show the current state of one or more analyses
    Status {
        #[arg(required = true)]
        analysis_ids: Vec<String>,

        /// Write the completed analyses as JSON to this file
        #[arg(long)]
        output_json: Option<PathBuf>,
    },

    /// Query the API health check
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::new(format!("match_api={level},match_demo={level}")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = ApiClient::new(cli.api_url)?;

    match cli.command {
        Commands::Analyze {
            resume,
            job,
            sample,
            max_attempts,
            interval,
            runs,
            output,
            output_json,
        } => {
            let (resume_text, job_description) = if sample {
                (SAMPLE_RESUME.to_string(), SAMPLE_JOB_DESCRIPTION.to_string())
            } else {
                (read_input(resume)?, read_input(job)?)
            };
            let config = PollConfig {
                max_attempts,
                interval: Duration::from_secs(interval),
            };
            let mut session = Session::new();
            for round in 1..=runs {
                if runs > 1 {
                    println!("Run {round}/{runs}");
                }
                analyze(&client, &mut session, &resume_text, &job_description, config).await?;
            }
            if let (Some(path), Some(latest)) = (output, session.latest()) {
                let report = generate_text_report(&latest.results, latest.recorded_at);
                std::fs::write(&path, report)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Report written to {}", path.display());
            }
            finish_session(&session, output_json)
        }
        Commands::Status {
            analysis_ids,
            output_json,
        } => {
            let mut session = Session::new();
            for analysis_id in &analysis_ids {
                status(&client, &mut session, analysis_id).await?;
            }
            finish_session(&session, output_json)
        }
        Commands::Health => health(&client).await,
    }
}

fn read_input(path: Option<PathBuf>) -> Result<String> {
    let path = path.context("an input file is required unless --sample is given")?;
    std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
}

async fn analyze(
    client: &ApiClient,
    session: &mut Session,
    resume_text: &str,
    job_description: &str,
    config: PollConfig,
) -> Result<()> {
    let analysis_id = Uuid::new_v4().to_string();

    let submitted = client
        .submit(&analysis_id, resume_text, job_description)
        .await
        .context("failed to submit analysis")?;
    println!("Analysis submitted: {}", submitted.analysis_id);
    println!("Estimated completion: {}", submitted.estimated_completion);

    match poll_for_results(client, &analysis_id, config).await {
        PollOutcome::Completed(results) => {
            let now = Utc::now();
            println!("{}", generate_text_report(&results, now));
            session.record(&analysis_id, results, now);
            Ok(())
        }
        PollOutcome::Failed(error) => bail!("analysis failed: {error}"),
        PollOutcome::Error(error) => bail!("polling stopped: {error}"),
        PollOutcome::TimedOut { attempts } => {
            bail!("analysis timeout after {attempts} attempts; try `match-demo status {analysis_id}` later")
        }
    }
}

async fn status(client: &ApiClient, session: &mut Session, analysis_id: &str) -> Result<()> {
    match client.get_results(analysis_id).await? {
        RetrievalResponse::Completed { results } => {
            let now = Utc::now();
            println!("{}", generate_text_report(&results, now));
            session.record(analysis_id, results, now);
        }
        RetrievalResponse::Processing { message } => println!("{analysis_id} processing: {message}"),
        RetrievalResponse::Failed { error, timestamp } => {
            println!("{analysis_id} failed at {timestamp}: {error}")
        }
        RetrievalResponse::Unknown { message } => println!("{analysis_id} unknown: {message}"),
    }
    Ok(())
}

/// Prints the history when there is more than one entry and writes it as JSON if asked.
fn finish_session(session: &Session, output_json: Option<PathBuf>) -> Result<()> {
    if session.len() > 1 {
        for entry in session.history() {
            println!(
                "History: {} | match {}% | confidence {}% | {}",
                entry.analysis_id,
                entry.results.match_score,
                entry.results.confidence_score,
                entry.recorded_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    if let Some(path) = output_json {
        let json = session.to_json_pretty().context("failed to encode session history")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Session history written to {}", path.display());
    }
    Ok(())
}

async fn health(client: &ApiClient) -> Result<()> {
    let (code, report) = client.health().await?;
    println!("{} (HTTP {code}) at {}", report.status, report.timestamp);
    for (name, check) in [
        ("tracking_store", &report.checks.tracking_store),
        ("blob_store", &report.checks.blob_store),
        ("environment", &report.checks.environment),
    ] {
        println!("  {name}: {} - {}", check.status, check.message);
    }
    if code != 200 {
        bail!("API at {} is unhealthy", client.base_url());
    }
    Ok(())
}
