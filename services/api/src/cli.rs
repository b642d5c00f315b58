use crate::commands::{run_audit, run_score, run_trend, AuditArgs, ScoreArgs, TrendArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tmcq::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "T-MCQ Competency Service",
    about = "Score doctor competency, review consultation audits, and serve the assessment API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute a T-MCQ composite and tier from three sub-scores
    Score(ScoreArgs),
    /// Score an audit document and show the alert it would raise
    Audit(AuditArgs),
    /// Summarize an exported evaluation history
    Trend(TrendArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// JSON file with QCM and clinical case answer keys
    #[arg(long)]
    pub(crate) answer_keys: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Audit(args) => run_audit(args),
        Command::Trend(args) => run_trend(args),
    }
}
