use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use mass_intent::config::{load_handler_config, HandlerConfig};
use mass_intent::replay::{load_replay_fixture, run_replay_fixture, ReplaySummary};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "mass_intent_replay_harness",
    about = "Replay play-media intent fixtures against in-memory collaborators"
)]
struct HarnessCli {
    /// Replay fixture (JSON) to run.
    #[arg(long)]
    fixture: PathBuf,

    /// Handler config (TOML) applied to cases without their own override.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    summary_json_out: Option<PathBuf>,
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

fn write_summary_json(path: &Path, summary: &ReplaySummary) -> Result<()> {
    ensure_parent_dir(path)?;
    let rendered = serde_json::to_string_pretty(summary).context("serialize replay summary json")?;
    std::fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))
}

async fn run() -> Result<()> {
    let cli = HarnessCli::parse();
    if !cli.fixture.is_file() {
        bail!("fixture '{}' must point to a file", cli.fixture.display());
    }

    let config = match &cli.config {
        Some(path) => load_handler_config(path)?,
        None => HandlerConfig::default(),
    };
    let fixture = load_replay_fixture(&cli.fixture)
        .with_context(|| format!("failed to load fixture '{}'", cli.fixture.display()))?;
    let summary = run_replay_fixture(&fixture, &config).await?;

    println!(
        "mass intent replay summary: fixture={} discovered={} success={} error={} played={}",
        summary.fixture,
        summary.discovered_cases,
        summary.success_cases,
        summary.error_cases,
        summary.played_commands,
    );
    if let Some(path) = &cli.summary_json_out {
        write_summary_json(path, &summary)?;
        println!("summary_json={}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(error) = run().await {
        eprintln!("mass intent replay harness failed: {error:#}");
        std::process::exit(1);
    }
}
