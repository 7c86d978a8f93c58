//! promptgate - versioned prompts with evaluation-gated promotion
//!
//! The `promptgate` command manages prompt versions, runs evaluations
//! through a remote scorer and promotes staging to production.
//!
//! ## Commands
//!
//! - `version`: create, update, list and show prompt versions
//! - `slots`: show the staging / production pointers or set staging
//! - `eval`: run evaluations and list stored scores
//! - `publish`: promote staging to production through the publish gate
//!
//! State lives in a JSON snapshot file (`--state`). Every command loads it;
//! commands that change state hold an exclusive lock on it until they have
//! saved.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

use promptgate_core::metrics::METRICS;
use promptgate_core::reporting::write_report_bundle;
use promptgate_core::telemetry::{init_tracing, LogFormat};
use promptgate_core::{
    score_delta, EngineConfig, EvaluationRecord, HttpScorer, PromptGate, PromptVersion,
    ScoreBand, Scorer, ScriptedScorer, VersionId,
};
use promptgate_state::{
    MemoryPromptStore, MemoryScoreStore, MemorySlotStore, StateLock, StateSnapshot,
};

#[derive(Parser)]
#[command(name = "promptgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Versioned prompts with evaluation-gated promotion", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// State snapshot file
    #[arg(
        long,
        global = true,
        env = "PROMPTGATE_STATE",
        default_value = ".promptgate/state.json"
    )]
    state: PathBuf,

    /// Evaluation service endpoint
    #[arg(long, global = true, env = "PROMPTGATE_SCORER_URL")]
    scorer_url: Option<String>,

    /// Upper bound on one scorer call, in seconds (defaults to
    /// PROMPTGATE_SCORER_TIMEOUT_SECS, then 120)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    scorer_timeout_secs: Option<u64>,

    /// How long a mutating command waits for another one to release the state
    #[arg(long, global = true, default_value = "30")]
    lock_wait_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage prompt versions
    Version {
        #[command(subcommand)]
        action: VersionAction,
    },

    /// Show or set environment slots
    Slots {
        #[command(subcommand)]
        action: SlotsAction,
    },

    /// Run evaluations and inspect scores
    Eval {
        #[command(subcommand)]
        action: EvalAction,
    },

    /// Promote staging to production if it beats the current production score
    Publish {
        /// Only publish if staging still points at this version
        #[arg(long)]
        expect: Option<String>,
    },
}

#[derive(Subcommand)]
enum VersionAction {
    /// Create a new version
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Prompt content
        #[arg(short, long, conflicts_with = "file")]
        content: Option<String>,

        /// Read prompt content from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Explicit version label (derived as v<N> when omitted)
        #[arg(long = "label")]
        label: Option<String>,
    },

    /// Replace name and content of an existing version
    Update {
        version: String,

        #[arg(short, long)]
        name: String,

        #[arg(short, long, conflicts_with = "file")]
        content: Option<String>,

        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List versions in creation order
    List,

    /// Show one version with its latest evaluation
    Show { version: String },
}

#[derive(Subcommand)]
enum SlotsAction {
    /// Show staging and production
    Show,

    /// Point an environment at a version (only staging is settable)
    Set { environment: String, version: String },
}

#[derive(Subcommand)]
enum EvalAction {
    /// Evaluate one version, or every version with --all
    Run {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        version: Option<String>,

        #[arg(long)]
        all: bool,

        /// Write <version>.json/.md/.html reports into this directory
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// List the latest average score of every evaluated version
    Scores,
}

impl Commands {
    /// Whether the command can change the state file. Only these take the
    /// state lock and write the snapshot back.
    fn writes_state(&self) -> bool {
        match self {
            Commands::Version { action } => matches!(
                action,
                VersionAction::Create { .. } | VersionAction::Update { .. }
            ),
            Commands::Slots { action } => matches!(action, SlotsAction::Set { .. }),
            Commands::Eval { action } => matches!(action, EvalAction::Run { .. }),
            Commands::Publish { .. } => true,
        }
    }
}

/// Engine plus the memory stores behind it, so state can be written back.
struct Session {
    gate: PromptGate,
    prompts: Arc<MemoryPromptStore>,
    scores: Arc<MemoryScoreStore>,
    slots: Arc<MemorySlotStore>,
}

impl Session {
    fn open(path: &Path, scorer: Arc<dyn Scorer>, config: &EngineConfig) -> Result<Self> {
        let snapshot = StateSnapshot::load(path)
            .with_context(|| format!("failed to load state from {:?}", path))?;
        let (prompts, scores, slots) = snapshot.into_stores();
        let prompts = Arc::new(prompts);
        let scores = Arc::new(scores);
        let slots = Arc::new(slots);
        let gate = PromptGate::new(
            prompts.clone(),
            scores.clone(),
            slots.clone(),
            scorer,
            config,
        );
        Ok(Self {
            gate,
            prompts,
            scores,
            slots,
        })
    }

    async fn save(&self, path: &Path) -> Result<()> {
        let snapshot =
            StateSnapshot::capture(self.prompts.as_ref(), self.scores.as_ref(), self.slots.as_ref())
                .await
                .context("failed to capture state")?;
        snapshot
            .save(path)
            .with_context(|| format!("failed to save state to {:?}", path))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(LogFormat::resolve(cli.json), level);

    let config = engine_config(&cli);
    let scorer = scorer_for(&cli.command, &config)?;
    let lock_wait = Duration::from_secs(cli.lock_wait_secs);

    let outcome = execute(&cli.state, cli.command, scorer, &config, lock_wait).await;
    METRICS.flush();
    outcome
}

/// Run one command against the state file.
///
/// Mutating commands hold the state lock from load to save, so concurrent
/// invocations apply one after the other and never write back a stale
/// snapshot. Read-only commands load without locking and never save.
async fn execute(
    state: &Path,
    command: Commands,
    scorer: Arc<dyn Scorer>,
    config: &EngineConfig,
    lock_wait: Duration,
) -> Result<()> {
    let writes = command.writes_state();
    let _lock = if writes {
        Some(StateLock::acquire(state, lock_wait).context("failed to lock state")?)
    } else {
        None
    };

    let session = Session::open(state, scorer, config)?;
    let outcome = dispatch(&session.gate, command).await;

    // Failed operations leave state untouched, and partial `eval run --all`
    // results must be kept, so a mutating command always saves.
    if writes {
        session.save(state).await?;
    }
    outcome
}

fn engine_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(url) = &cli.scorer_url {
        config = config.with_scorer_url(url.clone());
    }
    if let Some(secs) = cli.scorer_timeout_secs {
        config = config.with_scorer_timeout(Duration::from_secs(secs));
    }
    config
}

/// Only `eval run` talks to the scorer; other commands get one that is
/// never called.
fn scorer_for(command: &Commands, config: &EngineConfig) -> Result<Arc<dyn Scorer>> {
    match command {
        Commands::Eval {
            action: EvalAction::Run { .. },
        } => {
            let scorer = HttpScorer::from_config(config)
                .context("set --scorer-url or PROMPTGATE_SCORER_URL to run evaluations")?;
            info!(url = %scorer.url(), "using HTTP scorer");
            Ok(Arc::new(scorer))
        }
        _ => Ok(Arc::new(ScriptedScorer::new())),
    }
}

async fn dispatch(gate: &PromptGate, command: Commands) -> Result<()> {
    match command {
        Commands::Version { action } => match action {
            VersionAction::Create {
                name,
                content,
                file,
                label,
            } => {
                let content = read_content(content, file.as_deref())?;
                cmd_version_create(gate, &name, &content, label.as_deref()).await
            }
            VersionAction::Update {
                version,
                name,
                content,
                file,
            } => {
                let content = read_content(content, file.as_deref())?;
                cmd_version_update(gate, &version, &name, &content).await
            }
            VersionAction::List => cmd_version_list(gate).await,
            VersionAction::Show { version } => cmd_version_show(gate, &version).await,
        },
        Commands::Slots { action } => match action {
            SlotsAction::Show => cmd_slots_show(gate).await,
            SlotsAction::Set {
                environment,
                version,
            } => cmd_slots_set(gate, &environment, &version).await,
        },
        Commands::Eval { action } => match action {
            EvalAction::Run {
                version,
                all,
                report_dir,
            } => cmd_eval_run(gate, version.as_deref(), all, report_dir.as_deref()).await,
            EvalAction::Scores => cmd_eval_scores(gate).await,
        },
        Commands::Publish { expect } => cmd_publish(gate, expect.as_deref()).await,
    }
}

fn read_content(content: Option<String>, file: Option<&Path>) -> Result<String> {
    match (content, file) {
        (Some(content), _) => Ok(content),
        (None, Some(path)) => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))
        }
        (None, None) => anyhow::bail!("provide prompt content with --content or --file"),
    }
}

fn score_line(score: Option<f64>) -> String {
    match score {
        Some(avg) => format!("{:.1} ({})", avg, ScoreBand::classify(avg).label()),
        None => "not evaluated".to_string(),
    }
}

// ========== Version Commands ==========

async fn cmd_version_create(
    gate: &PromptGate,
    name: &str,
    content: &str,
    label: Option<&str>,
) -> Result<()> {
    let created = gate
        .create_version(name, content, label)
        .await
        .context("create failed")?;
    println!("Created {} ({})", created.version, created.name);
    Ok(())
}

async fn cmd_version_update(
    gate: &PromptGate,
    version: &str,
    name: &str,
    content: &str,
) -> Result<()> {
    let updated = gate
        .update_version(&VersionId::from(version), name, content)
        .await
        .context("update failed")?;
    println!("Updated {} ({})", updated.version, updated.name);
    Ok(())
}

async fn cmd_version_list(gate: &PromptGate) -> Result<()> {
    let versions = gate.list_versions().await?;
    if versions.is_empty() {
        println!("No versions yet");
        return Ok(());
    }

    let scores = gate.scores().await?;
    let slots = gate.active_slots().await?;
    for v in versions {
        let mut marks = Vec::new();
        if slots.staging.as_ref() == Some(&v.version) {
            marks.push("staging");
        }
        if slots.production.as_ref() == Some(&v.version) {
            marks.push("production");
        }
        let marks = if marks.is_empty() {
            String::new()
        } else {
            format!(" [{}]", marks.join(", "))
        };
        println!(
            "{} {} {} {}{}",
            v.created_at.to_rfc3339(),
            v.version,
            v.name,
            score_line(scores.get(&v.version).copied()),
            marks
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct VersionView {
    #[serde(flatten)]
    version: PromptVersion,
    content_digest: String,
    evaluation: Option<EvaluationRecord>,
    evaluation_is_current: bool,
}

async fn cmd_version_show(gate: &PromptGate, version: &str) -> Result<()> {
    let id = VersionId::from(version);
    let prompt = gate.get_version(&id).await?;
    let evaluation = gate.score_of(&id).await?;
    let view = VersionView {
        content_digest: prompt.content_digest().to_string(),
        evaluation_is_current: evaluation
            .as_ref()
            .is_some_and(|record| record.is_current_for(&prompt)),
        evaluation,
        version: prompt,
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

// ========== Slot Commands ==========

async fn cmd_slots_show(gate: &PromptGate) -> Result<()> {
    let slots = gate.active_slots().await?;
    let scores = gate.scores().await?;
    let score_of = |slot: &Option<VersionId>| slot.as_ref().and_then(|v| scores.get(v).copied());

    for (label, slot) in [("staging", &slots.staging), ("production", &slots.production)] {
        match slot {
            Some(version) => println!("{:<11} {} {}", label, version, score_line(score_of(slot))),
            None => println!("{:<11} (unset)", label),
        }
    }
    if let Some(delta) = score_delta(score_of(&slots.staging), score_of(&slots.production)) {
        println!("staging vs production: {:+.1} points", delta);
    }
    Ok(())
}

async fn cmd_slots_set(gate: &PromptGate, environment: &str, version: &str) -> Result<()> {
    gate.set_active_slot(environment, &VersionId::from(version))
        .await
        .context("set slot failed")?;
    println!("{} -> {}", environment, version);
    Ok(())
}

// ========== Evaluation Commands ==========

async fn cmd_eval_run(
    gate: &PromptGate,
    version: Option<&str>,
    all: bool,
    report_dir: Option<&Path>,
) -> Result<()> {
    let runs = match (all, version) {
        (true, _) => gate.run_all().await?,
        (false, Some(version)) => gate.run_many(&[VersionId::from(version)]).await,
        (false, None) => anyhow::bail!("name a version or pass --all"),
    };
    if runs.is_empty() {
        println!("No versions to evaluate");
        return Ok(());
    }

    let mut failed = 0;
    for (version, outcome) in runs {
        match outcome {
            Ok(record) => {
                println!(
                    "{} {} over {} fixtures",
                    version,
                    score_line(record.average_score()),
                    record.summary.total_fixtures
                );
                if let Some(dir) = report_dir {
                    write_report_bundle(dir, &record)?;
                }
            }
            Err(err) => {
                failed += 1;
                eprintln!("{} failed: {}", version, err);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} evaluation(s) failed", failed);
    }
    Ok(())
}

async fn cmd_eval_scores(gate: &PromptGate) -> Result<()> {
    let scores = gate.scores().await?;
    if scores.is_empty() {
        println!("No evaluations yet");
        return Ok(());
    }
    for (version, score) in scores {
        println!("{} {}", version, score_line(Some(score)));
    }
    Ok(())
}

// ========== Publish ==========

async fn cmd_publish(gate: &PromptGate, expect: Option<&str>) -> Result<()> {
    let expected = expect.map(VersionId::from);
    match gate.publish(expected.as_ref()).await {
        Ok(outcome) => {
            match &outcome.previous {
                Some(previous) => println!(
                    "Published {} ({:.1}), replacing {}",
                    outcome.production, outcome.score, previous
                ),
                None => println!("Published {} ({:.1})", outcome.production, outcome.score),
            }
            Ok(())
        }
        Err(err) => {
            if let Some(rejection) = err.rejection() {
                anyhow::bail!(
                    "publish rejected [{}]: {}",
                    rejection.reason_code(),
                    rejection
                );
            }
            Err(err).context("publish failed")
        }
    }
}
