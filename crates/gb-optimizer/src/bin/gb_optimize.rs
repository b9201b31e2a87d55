use anyhow::{Context, Result};
use clap::Parser;
use gb_optimizer::{
    derive_ranges, rank, ConfigField, ConfigModel, OptimizationConfig, ReplaySearchProvider,
    ResultApplier, RunOrchestrator,
};
use gb_types::StrategySnapshot;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Score recorded optimizer output against a strategy and apply the winner.
#[derive(Debug, Parser)]
#[command(name = "gb-optimize", version)]
struct Cli {
    /// Strategy snapshot (JSON).
    #[arg(long)]
    strategy: PathBuf,

    /// Candidates evaluated by the external optimizer (JSON array).
    #[arg(long)]
    results: PathBuf,

    /// Optimization config (JSON). Defaults to the evolutionary preset.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the strategy snapshot after the best result is applied.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Override a config field, e.g. `--set mutationRate=0.2`. Repeatable.
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_override)]
    overrides: Vec<(String, f64)>,

    /// Number of ranked results to print.
    #[arg(long, default_value_t = 10)]
    top: usize,
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn parse_override(arg: &str) -> Result<(String, f64), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{arg}`"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for {key}: {e}"))?;
    Ok((key.trim().to_string(), value))
}

/// Load the config file (or the default preset) and apply command-line edits.
fn load_config(cli: &Cli) -> Result<OptimizationConfig> {
    let mut model = match &cli.config {
        Some(path) => ConfigModel::from_config(OptimizationConfig::from_json(&read(path)?)?)?,
        None => ConfigModel::default(),
    };
    for (key, value) in &cli.overrides {
        let field: ConfigField = key.parse()?;
        if !field.applies_to(model.method()) {
            warn!(%field, method = %model.method(), "field has no effect on this method");
        }
        model.set_field(field, *value)?;
    }
    for (field, value) in model.active_fields() {
        debug!(%field, value, "optimization setting");
    }
    Ok(model.config())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let snapshot = StrategySnapshot::from_json(&read(&cli.strategy)?)?;
    let config = load_config(&cli)?;
    let provider = ReplaySearchProvider::from_path(&cli.results)
        .with_context(|| format!("loading results from {}", cli.results.display()))?;

    let ranges: Vec<_> = derive_ranges(&snapshot)
        .into_iter()
        .filter(|range| {
            if range.is_degenerate() {
                warn!(parameter = %range.name, "skipping parameter with zero-width range");
                return false;
            }
            true
        })
        .collect();
    info!(
        strategy = %snapshot.name,
        ranges = ranges.len(),
        candidates = provider.len(),
        method = %config.method(),
        "loaded optimization inputs"
    );

    let strategy = Arc::new(Mutex::new(snapshot));
    let owner = strategy.clone();
    let sink = move |parameters: &HashMap<String, f64>| {
        match owner.lock().apply_parameters(parameters) {
            Ok(update) if !update.is_complete() => warn!(
                written = update.written,
                skipped = ?update.skipped,
                "strategy has no field for some optimized parameters"
            ),
            Ok(update) => debug!(written = update.written, "strategy updated"),
            Err(e) => warn!(error = %e, "strategy rejected optimized parameters"),
        }
    };

    let orchestrator = RunOrchestrator::new(provider, ResultApplier::with_sink(Arc::new(sink)));
    let best = orchestrator.start(ranges, config).await?;

    let state = orchestrator.state();
    let results = state.results();
    println!("{:>4}  {:>10}  parameters", "rank", "score");
    for (position, (index, score)) in rank(results).into_iter().take(cli.top).enumerate() {
        let mut parameters: Vec<_> = results[index].parameters.iter().collect();
        parameters.sort_by(|a, b| a.0.cmp(b.0));
        let rendered: Vec<String> = parameters
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        println!("{:>4}  {:>10.4}  {}", position + 1, score, rendered.join(", "));
    }

    if best.is_none() {
        warn!("optimizer returned no candidates; strategy left unchanged");
    }

    if let Some(path) = &cli.output {
        let json = strategy.lock().to_json()?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "wrote updated strategy");
    }

    Ok(())
}
