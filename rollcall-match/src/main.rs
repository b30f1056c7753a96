//! rollcall - roster/attendance reconciliation
//!
//! Reads an enrolled roster and a session-call attendance export, decides
//! which attendee belongs to each mentee and prints per-mentee attendance.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rollcall_common::config::{self, TomlConfig};
use rollcall_match::adjudication::{GeminiClient, OracleAdjudicator, RetryPolicy};
use rollcall_match::embedding::{cache::DEFAULT_MAX_AGE, EmbeddingCache, EmbeddingSelector};
use rollcall_match::ingest::{CsvAttendeeSource, CsvRosterSource};
use rollcall_match::matching::{CandidateSelector, RuleSelector};
use rollcall_match::reconcile::{MatchSettings, Reconciler};
use rollcall_match::report::{self, ReportFormat};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SelectorKind {
    /// Variation-expanded rule similarity
    Rule,
    /// Cosine similarity over name embeddings
    Embedding,
}

#[derive(Debug, Parser)]
#[command(name = "rollcall", version, about = "Reconcile a mentee roster against call attendance")]
struct Args {
    /// Roster CSV (Nama, Program, Mentor)
    #[arg(long)]
    roster: PathBuf,

    /// Attendance CSV export (Nama (nama asli), Email, Total durasi (menit), Tamu)
    #[arg(long)]
    attendees: PathBuf,

    /// TOML config file (defaults to the user config directory)
    #[arg(long, env = "ROLLCALL_CONFIG")]
    config: Option<PathBuf>,

    /// Candidate selector
    #[arg(long, value_enum, default_value_t = SelectorKind::Rule)]
    selector: SelectorKind,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
    format: ReportFormat,

    /// Gemini API key (overrides environment and TOML)
    #[arg(long)]
    api_key: Option<String>,

    /// Log level (overrides TOML; RUST_LOG overrides both)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut toml_config = match args.config.clone().or_else(config::default_config_path) {
        Some(path) => config::load_toml_config(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::default(),
    };
    if let Some(level) = &args.log_level {
        toml_config.logging.level = level.clone();
    }

    rollcall_common::logging::init(&toml_config.logging).context("Failed to initialize logging")?;
    info!("Starting rollcall {}", env!("CARGO_PKG_VERSION"));

    let api_key = config::resolve_api_key(args.api_key.as_deref(), &toml_config)
        .context("Gemini credential is required")?;

    let adjudicator = OracleAdjudicator::new(GeminiClient::new(api_key.clone(), &toml_config.oracle)?)
        .with_retry(RetryPolicy::from_config(&toml_config.oracle));
    info!(model = adjudicator.oracle().model(), "Adjudicating with Gemini");
    let settings = MatchSettings::from(&toml_config.matching);

    match args.selector {
        SelectorKind::Rule => execute(&args, RuleSelector, adjudicator, settings).await,
        SelectorKind::Embedding => {
            let mut selector =
                EmbeddingSelector::new(GeminiClient::new(api_key, &toml_config.oracle)?);
            if let Some(path) = &toml_config.matching.embedding_cache {
                let cache = EmbeddingCache::open(path)
                    .await
                    .with_context(|| format!("Failed to open embedding cache {}", path.display()))?;
                if let Err(e) = cache.sweep_older_than(DEFAULT_MAX_AGE).await {
                    warn!(error = %e, "Embedding cache sweep failed");
                }
                selector = selector.with_cache(cache);
            }
            execute(&args, selector, adjudicator, settings).await
        }
    }
}

async fn execute<S: CandidateSelector>(
    args: &Args,
    selector: S,
    adjudicator: OracleAdjudicator<GeminiClient>,
    settings: MatchSettings,
) -> Result<()> {
    let reconciler = Reconciler::new(selector, adjudicator, settings);
    let report = reconciler
        .run(
            &CsvRosterSource::new(&args.roster),
            &CsvAttendeeSource::new(&args.attendees),
        )
        .await
        .context("Reconciliation failed")?;

    println!("{}", report::render(&report, args.format)?);
    Ok(())
}
