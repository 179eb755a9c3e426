//! Collision Sense - detection replay entry point
//!
//! Usage: `collision-sense <detections.jsonl> [config.toml]`

use anyhow::Context;
use collision_sense::{init_logging, run_replay, AppConfig, CollisionPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .map(PathBuf::from)
        .context("usage: collision-sense <detections.jsonl> [config.toml]")?;
    let config_path = args.next().map(PathBuf::from);

    let config = AppConfig::load(config_path.as_deref()).context("failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("=== Collision Sense v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "focal_length={}px, min_confidence={}, max_deceleration={}m/s²",
        config.camera.focal_length, config.pipeline.min_confidence, config.risk.max_deceleration
    );

    let pipeline = Arc::new(CollisionPipeline::new(&config)?);
    let file = tokio::fs::File::open(&input)
        .await
        .with_context(|| format!("failed to open {}", input.display()))?;

    let summary = run_replay(BufReader::new(file), pipeline, config.replay.fps, tokio::io::stdout()).await?;

    if summary.malformed_lines > 0 {
        info!("{} malformed lines were skipped", summary.malformed_lines);
    }

    Ok(())
}
