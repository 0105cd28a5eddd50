use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use log::info;
use readmit::synthetic::SyntheticDataset;
use readmit::{Pipeline, PipelineConfig};

const USAGE: &str = "usage:
  readmit run <config.json>
  readmit synth <dir> [admissions] [seed]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("run") => {
            let path = args.get(1).context(USAGE)?;
            run(Path::new(path)).await
        }
        Some("synth") => {
            let dir = PathBuf::from(args.get(1).context(USAGE)?);
            let admissions = match args.get(2) {
                Some(n) => n.parse().with_context(|| format!("invalid admission count {n:?}"))?,
                None => 2_000,
            };
            let seed = match args.get(3) {
                Some(s) => s.parse().with_context(|| format!("invalid seed {s:?}"))?,
                None => 2025,
            };
            synth(&dir, admissions, seed)
        }
        _ => bail!(USAGE),
    }
}

async fn run(path: &Path) -> anyhow::Result<()> {
    let mut config = PipelineConfig::from_file(path)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    config.apply_env_overrides()?;
    info!("{config}");

    let pipeline = Pipeline::new(config)?;
    let output = pipeline.run().await?;

    let summary = &output.summary;
    info!(
        "Feature table v{}: {} admissions, {} readmissions",
        summary.feature_schema_version, summary.cohort_size, summary.readmissions
    );
    if let Some(model) = &summary.model {
        let cv = &model.cross_validation;
        info!(
            "Cross-validated AUROC {}, Brier {:.4}, accuracy {:.3}",
            cv.mean_auroc.map_or_else(|| "n/a".to_string(), |a| format!("{a:.3}")),
            cv.mean_brier,
            cv.mean_accuracy
        );
    }
    for artifact in &summary.artifacts {
        info!("  wrote {}", artifact.display());
    }
    Ok(())
}

fn synth(dir: &Path, admissions: usize, seed: u64) -> anyhow::Result<()> {
    let start = Instant::now();
    let dataset = SyntheticDataset::generate(admissions, seed)?;
    let config = dataset.write(dir)?;
    info!(
        "Wrote synthetic tables to {} in {:?}; run with `readmit run {}`",
        dir.display(),
        start.elapsed(),
        config.display()
    );
    Ok(())
}
