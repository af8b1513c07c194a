use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use command::{CommandRequest, CommandResponse, SessionHandler};
use config::AppConfig;
use evidence_corpus::Corpus;
use evidence_ledger::LedgerStore;
use evidence_protocol::{ErrorEnvelope, ParticipantId};
use evidence_search::{page, page_count, search, MatchOptions};
use evidence_session::{KeywordSet, Session, SystemClock};
use serde_json::json;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub mod command;
pub mod config;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "evidence-finder")]
#[command(about = "Timed keyword search and evidence marking over a filename corpus", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger root directory (overrides session.log_dir)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive session: one JSON request per stdin line, one JSON response per
    /// stdout line
    Session(SessionArgs),

    /// One-shot keyword search over a corpus
    Search(SearchArgs),

    /// Print the evidence recovered from a participant's ledger
    Replay(ReplayArgs),

    /// Copy a participant's ledger to a destination file
    Export(ExportArgs),

    /// One-shot keyword expansion through the suggestion service
    Suggest(SuggestArgs),
}

#[derive(Args)]
struct SessionArgs {
    /// Corpus file (overrides corpus.path)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Time limit in minutes
    #[arg(long, conflicts_with = "limit_seconds")]
    minutes: Option<u64>,

    /// Time limit in seconds
    #[arg(long)]
    limit_seconds: Option<u64>,

    /// Results per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Minimum match score
    #[arg(long)]
    threshold: Option<f32>,

    /// Continue the clock from the participant's first recorded start
    #[arg(long)]
    resume_clock: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Keywords, comma or whitespace separated
    #[arg(required = true)]
    keywords: Vec<String>,

    /// Corpus file (overrides corpus.path)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Minimum match score
    #[arg(long)]
    threshold: Option<f32>,

    /// 1-indexed page to print
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Results per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReplayArgs {
    /// Participant identity
    participant: String,
}

#[derive(Args)]
struct ExportArgs {
    /// Participant identity
    participant: String,

    /// Destination file
    dest: PathBuf,
}

#[derive(Args)]
struct SuggestArgs {
    /// Seed keywords, comma or whitespace separated
    #[arg(required = true)]
    keywords: Vec<String>,

    /// Number of suggestions to request
    #[arg(long)]
    count: Option<usize>,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.log_dir {
        config.session.log_dir = dir;
    }

    match cli.command {
        Commands::Session(args) => run_session(args, config).await?,
        Commands::Search(args) => run_search(args, config).await?,
        Commands::Replay(args) => run_replay(args, config)?,
        Commands::Export(args) => run_export(args, config)?,
        Commands::Suggest(args) => run_suggest(args, config).await?,
    }

    Ok(())
}

async fn load_corpus(arg: Option<PathBuf>, config: &AppConfig) -> Result<Corpus> {
    let path = arg
        .or_else(|| config.corpus.path.clone())
        .context("No corpus file given. Pass --corpus or set corpus.path in the config")?;
    Corpus::load_with(&path, &config.corpus.options)
        .await
        .with_context(|| format!("Failed to load corpus {}", path.display()))
}

fn parse_participant(raw: &str) -> Result<ParticipantId> {
    ParticipantId::parse(raw).with_context(|| format!("Invalid participant identity {raw:?}"))
}

/// Read requests line by line until stdin closes. Startup failures are fatal; failures of
/// individual requests become error responses and the loop continues.
async fn run_session(args: SessionArgs, mut config: AppConfig) -> Result<()> {
    if let Some(minutes) = args.minutes {
        config.session.time_limit_minutes = minutes;
        config.session.limit_seconds = None;
    }
    if let Some(seconds) = args.limit_seconds {
        config.session.limit_seconds = Some(seconds);
    }
    if let Some(size) = args.page_size {
        config.session.page_size = size;
    }
    if let Some(threshold) = args.threshold {
        config.session.matching.threshold = threshold;
    }
    config.session.resume_clock |= args.resume_clock;

    let corpus = load_corpus(args.corpus, &config).await?;
    let session = Session::new(config.session.clone(), Arc::new(corpus), Arc::new(SystemClock))
        .context("Invalid session configuration")?;
    let gateway = config.suggest.build_gateway()?;
    let mut handler = SessionHandler::new(session, gateway, config.suggest.count);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<CommandRequest>(&line) {
            Ok(request) => handler.execute(request).await,
            Err(err) => CommandResponse::error(
                ErrorEnvelope::new("invalid_request", err.to_string())
                    .with_hint("Each line must be {\"action\": ..., \"payload\": {...}}"),
            ),
        };
        print_stdout(&serde_json::to_string(&response)?)?;
    }

    let status = handler.session().status();
    log::info!(
        "Session closed in phase {} with {} evidence item(s)",
        status.phase.as_str(),
        status.evidence
    );
    Ok(())
}

async fn run_search(args: SearchArgs, config: AppConfig) -> Result<()> {
    let corpus = load_corpus(args.corpus, &config).await?;
    let mut keywords = KeywordSet::new();
    keywords.set_base(&args.keywords.join(" "));

    let options = MatchOptions {
        threshold: args.threshold.unwrap_or(config.session.matching.threshold),
        ..config.session.matching.clone()
    };
    let page_size = args.page_size.unwrap_or(config.session.page_size);
    let results = search(corpus.entries(), keywords.base(), &options);
    let pages = page_count(results.len(), page_size);
    let shown = if results.is_empty() {
        &results[..]
    } else {
        page(&results, page_size, args.page)?
    };

    if args.json {
        let body = json!({
            "keywords": keywords.base(),
            "total": results.len(),
            "page": args.page,
            "page_count": pages,
            "results": shown,
        });
        print_stdout(&serde_json::to_string_pretty(&body)?)?;
    } else {
        let offset = (args.page.saturating_sub(1)) * page_size;
        for (i, result) in shown.iter().enumerate() {
            print_stdout(&format!(
                "{}. {} (score: {:.1})",
                offset + i + 1,
                result.filename(),
                result.score
            ))?;
        }
        eprintln!(
            "{} match(es), page {}/{}",
            results.len(),
            args.page,
            pages.max(1)
        );
    }
    Ok(())
}

fn run_replay(args: ReplayArgs, config: AppConfig) -> Result<()> {
    let participant = parse_participant(&args.participant)?;
    let store = LedgerStore::new(&config.session.log_dir);
    let report = store
        .replay(&participant)
        .with_context(|| format!("Failed to replay ledger for {participant}"))?;
    print_stdout(&serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

fn run_export(args: ExportArgs, config: AppConfig) -> Result<()> {
    let participant = parse_participant(&args.participant)?;
    let store = LedgerStore::new(&config.session.log_dir);
    let bytes = store
        .export(&participant, &args.dest)
        .with_context(|| format!("Failed to export ledger for {participant}"))?;
    print_stdout(&serde_json::to_string(
        &json!({ "path": args.dest, "bytes": bytes }),
    )?)?;
    Ok(())
}

async fn run_suggest(args: SuggestArgs, config: AppConfig) -> Result<()> {
    let mut seeds = KeywordSet::new();
    seeds.set_base(&args.keywords.join(" "));
    let count = args.count.unwrap_or(config.suggest.count);

    let gateway = config.suggest.build_gateway()?;
    if !gateway.is_enabled() {
        log::warn!("Set EVIDENCE_API_KEY or OPENAI_API_KEY to enable suggestions");
    }
    let keywords = gateway.expand(seeds.base(), count).await;
    print_stdout(&serde_json::to_string_pretty(
        &json!({ "seeds": seeds.base(), "keywords": keywords }),
    )?)?;
    Ok(())
}
