use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use configuration::{LogFormat, Settings};
use core_types::{
    BlendResult, CorrelationReport, ForecastMethod, Priority, SimulationReport, TimeSeriesPoint,
};
use engine::TaskRunner;
use events::{
    CausalRecomputePayload, ForecastBlendPayload, SimulationProjectionPayload, Task, TaskEnvelope,
    TaskOutput, TaskPayload, TaskResult,
};
use experiments::{ArmMetadata, ArmSummary, BanditRegistry};
use forecasting::{ForecastEngine, ForecastOptions, ForecastReport};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// The main entry point for the Vantage analytics CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; VANTAGE_* variables may come from the shell.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut settings = configuration::load_config_from(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    let _log_guard = configuration::init_tracing(&settings.logging)?;

    let output = Output { json: cli.json };
    match cli.command {
        Commands::Forecast(args) => handle_forecast(args, &settings, output),
        Commands::Blend { input } => {
            let payload: ForecastBlendPayload = read_json(&input)?;
            run_single(TaskPayload::ForecastBlend(payload), settings, output).await
        }
        Commands::Correlate { input } => {
            let payload: CausalRecomputePayload = read_json(&input)?;
            run_single(TaskPayload::CausalRecompute(payload), settings, output).await
        }
        Commands::Simulate { input } => {
            let payload: SimulationProjectionPayload = read_json(&input)?;
            run_single(TaskPayload::SimulationProjection(payload), settings, output).await
        }
        Commands::RunEnvelope { input } => handle_envelopes(&input, settings, output).await,
        Commands::Bandit { input } => handle_bandit(&input, &settings, output),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Forecasting, correlation, scenario simulation and bandit experiments over
/// metric time series.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = configuration::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Print results as JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    /// Overrides `logging.level` (e.g. "debug" or "info,engine=trace").
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast a single series and report how well the model fit it.
    Forecast(ForecastArgs),
    /// Blend several model forecasts for one metric.
    Blend {
        /// JSON file holding a forecast blend payload.
        input: PathBuf,
    },
    /// Compute the pairwise correlation graph for a set of observations.
    Correlate {
        /// JSON file holding `{ "observations": [...] }`.
        input: PathBuf,
    },
    /// Project baseline metrics through a list of interventions.
    Simulate {
        /// JSON file holding a simulation projection payload.
        input: PathBuf,
    },
    /// Submit raw task envelopes and print every result.
    RunEnvelope {
        /// JSON file holding an array of `{kind, payload, priority}` envelopes.
        input: PathBuf,
    },
    /// Replay a reward log into a bandit registry and print the leaderboard.
    Bandit {
        /// JSON file holding `{ "arms": [...], "rewards": [...] }`.
        input: PathBuf,
    },
}

#[derive(Parser)]
struct ForecastArgs {
    /// JSON file holding an array of `{timestamp, value}` points.
    input: PathBuf,

    /// Number of future points to project.
    #[arg(long, default_value_t = 14)]
    horizon: usize,

    #[arg(long, value_enum, default_value_t = MethodArg::Simple)]
    method: MethodArg,

    /// Season length for Holt-Winters.
    #[arg(long)]
    season_length: Option<usize>,

    #[arg(long)]
    alpha: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Simple,
    HoltWinters,
}

impl From<MethodArg> for ForecastMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Simple => ForecastMethod::Simple,
            MethodArg::HoltWinters => ForecastMethod::HoltWinters,
        }
    }
}

#[derive(Clone, Copy)]
struct Output {
    json: bool,
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn handle_forecast(args: ForecastArgs, settings: &Settings, output: Output) -> anyhow::Result<()> {
    let series: Vec<TimeSeriesPoint> = read_json(&args.input)?;
    let limits = &settings.forecast;
    let engine = ForecastEngine::with_defaults(limits.alpha, limits.beta, limits.gamma)
        .with_floor(limits.value_floor);
    let options = ForecastOptions {
        method: args.method.into(),
        alpha: args.alpha,
        season_length: args.season_length,
        ..ForecastOptions::default()
    };

    let report = engine.forecast_with_fit(&series, args.horizon.min(limits.max_horizon), &options)?;
    if output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_forecast(&report);
    }
    Ok(())
}

/// Runs one payload through a fresh task runner and prints its result.
async fn run_single(
    payload: TaskPayload,
    settings: Settings,
    output: Output,
) -> anyhow::Result<()> {
    let (runner, mut results) = TaskRunner::start(settings)?;
    let pending = runner.submit(Task::new(payload, Priority::High))?;
    tracing::info!(task_id = %pending.task_id, kind = %pending.kind, "Task submitted.");

    let result = results
        .recv()
        .await
        .context("task runner closed before returning a result")?;
    runner.shutdown().await?;

    if !pending.matches(&result) {
        bail!("received a result for unexpected task {}", result.task_id);
    }
    print_result(&result, output)
}

async fn handle_envelopes(path: &Path, settings: Settings, output: Output) -> anyhow::Result<()> {
    let envelopes: Vec<TaskEnvelope> = read_json(path)?;
    let (runner, results) = TaskRunner::start(settings)?;

    let mut submitted = 0;
    for (index, envelope) in envelopes.into_iter().enumerate() {
        match runner.submit_envelope(envelope) {
            Ok(pending) => {
                submitted += 1;
                tracing::info!(
                    index,
                    task_id = %pending.task_id,
                    kind = %pending.kind,
                    "Envelope submitted."
                );
            }
            Err(e) => tracing::error!(index, error = %e, "Rejected envelope."),
        }
    }
    let delivered = runner.shutdown_and_collect(results).await?;
    for result in &delivered {
        print_result(result, output)?;
    }
    tracing::info!(submitted, received = delivered.len(), "All envelopes processed.");
    Ok(())
}

#[derive(Deserialize)]
struct RewardLog {
    #[serde(default)]
    arms: Vec<ArmEntry>,
    #[serde(default)]
    rewards: Vec<RewardEntry>,
}

#[derive(Deserialize)]
struct ArmEntry {
    id: String,
    #[serde(default)]
    metadata: ArmMetadata,
}

#[derive(Deserialize)]
struct RewardEntry {
    arm_id: String,
    reward: f64,
}

fn handle_bandit(path: &Path, settings: &Settings, output: Output) -> anyhow::Result<()> {
    let log: RewardLog = read_json(path)?;
    let registry =
        BanditRegistry::with_settings(settings.bandit.exploration, settings.bandit.confidence_z);

    for arm in log.arms {
        registry.register_arm(&arm.id, arm.metadata)?;
    }
    for entry in &log.rewards {
        registry.record_reward(&entry.arm_id, entry.reward)?;
    }

    let leaderboard = registry.list_arms();
    let next_arm = registry.select_arm();
    if output.json {
        let body = serde_json::json!({
            "arms": leaderboard,
            "best_arm": registry.best_arm().map(|arm| arm.id),
            "next_arm": next_arm,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_leaderboard(&leaderboard);
        if let Some(id) = next_arm {
            println!("Next arm to play: {id}");
        }
    }
    Ok(())
}

// ==============================================================================
// Output Formatting
// ==============================================================================

fn print_result(result: &TaskResult, output: Output) -> anyhow::Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!(
        "Task {} finished in {:.2} ms",
        result.task_id, result.processing_time_ms
    );
    match &result.result {
        Some(TaskOutput::ForecastBlend(blend)) => print_blend(blend),
        Some(TaskOutput::CausalRecompute(report)) => print_correlations(report),
        Some(TaskOutput::SimulationProjection(report)) => print_simulation(report),
        None => println!(
            "Task failed: {}",
            result.error.as_deref().unwrap_or("no error message")
        ),
    }
    Ok(())
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

fn print_forecast(report: &ForecastReport) {
    if report.is_empty() {
        println!("Not enough history to forecast.");
        return;
    }
    println!(
        "Method: {:?} | residual std dev: {:.4} | MAE: {:.4}",
        report.method, report.residual_std_dev, report.mean_absolute_error
    );
    let mut table = new_table(vec!["Timestamp", "Value", "Lower", "Upper"]);
    for point in &report.points {
        table.add_row(vec![
            Cell::new(point.timestamp),
            Cell::new(format!("{:.4}", point.value)),
            Cell::new(format!("{:.4}", point.lower_bound)),
            Cell::new(format!("{:.4}", point.upper_bound)),
        ]);
    }
    println!("{table}");
}

fn print_blend(blend: &BlendResult) {
    println!("Blend for '{}' from {} model(s)", blend.metric_key, blend.model_count);
    for (model_id, weight) in &blend.weights {
        println!("  {model_id}: {:.1}%", weight * 100.0);
    }
    let bound = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
    let mut table = new_table(vec!["Timestamp", "Value", "Lower", "Upper"]);
    for point in &blend.points {
        table.add_row(vec![
            Cell::new(point.timestamp),
            Cell::new(format!("{:.4}", point.value)),
            Cell::new(bound(point.lower_bound)),
            Cell::new(bound(point.upper_bound)),
        ]);
    }
    println!("{table}");
}

fn print_correlations(report: &CorrelationReport) {
    println!(
        "{} metrics, {} significant edge(s), computed at {}",
        report.node_count,
        report.edge_count,
        report.computed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let mut table = new_table(vec!["Metric A", "Metric B", "Correlation", "Confidence"]);
    for edge in &report.correlations {
        table.add_row(vec![
            Cell::new(&edge.metric_a),
            Cell::new(&edge.metric_b),
            Cell::new(format!("{:+.4}", edge.correlation)),
            Cell::new(format!("{:.2}", edge.confidence)),
        ]);
    }
    println!("{table}");
}

fn print_simulation(report: &SimulationReport) {
    println!(
        "Seed '{}' with {} intervention(s)",
        report.seed, report.intervention_count
    );
    let mut table = new_table(vec!["Metric", "Baseline", "Projected", "Change", "Confidence"]);
    for (metric, projection) in &report.projected_metrics {
        table.add_row(vec![
            Cell::new(metric),
            Cell::new(format!("{:.4}", projection.baseline)),
            Cell::new(format!("{:.4}", projection.projected)),
            Cell::new(format!("{:+.4}", projection.projected - projection.baseline)),
            Cell::new(format!("{:.3}", projection.confidence)),
        ]);
    }
    println!("{table}");
}

fn print_leaderboard(leaderboard: &[ArmSummary]) {
    let mut table = new_table(vec!["Rank", "Arm", "Pulls", "Average", "±", "Status"]);
    for summary in leaderboard {
        let stats = &summary.arm.stats;
        table.add_row(vec![
            Cell::new(summary.rank.map_or_else(|| "-".to_string(), |r| r.to_string())),
            Cell::new(&summary.arm.id),
            Cell::new(stats.pulls),
            Cell::new(format!("{:.4}", stats.average_reward)),
            Cell::new(summary.confidence.map_or_else(|| "-".to_string(), |c| format!("{c:.4}"))),
            Cell::new(summary.status),
        ]);
    }
    println!("{table}");
}
