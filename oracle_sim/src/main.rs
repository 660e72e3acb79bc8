//! Oracle Calibration CLI
//!
//! Run the self-calibration scenarios, optionally sweeping many seeds.

use clap::Parser;
use oracle_sim::cli::{summary_json, Args};
use oracle_sim::scenarios::ScenarioId;
use oracle_sim::{CalibrationExport, ExperimentConfig, ScenarioResult, ScenarioRunner, SimError};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Runs every scenario for one seed.
fn run_seed(config: ExperimentConfig, scenarios: &[ScenarioId]) -> Result<Vec<ScenarioResult>, SimError> {
    let runner = ScenarioRunner::new(config)?;
    scenarios.iter().map(|scenario| runner.run(*scenario)).collect()
}

fn report_result(result: &ScenarioResult) {
    if result.passed {
        info!("✓ {} (seed={}) PASSED", result.scenario.name(), result.seed);
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for the --json summary
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Causal Oracle Calibration v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let config = match args.build_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let scenarios = match args.scenarios() {
        Ok(scenarios) => scenarios,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: divergence, bisection, hill_climb, noisy_truth, trajectory_fit, gentle_push, all");
            std::process::exit(1);
        }
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        let result = match ScenarioRunner::new(config).and_then(|runner| runner.run(scenarios[0])) {
            Ok(result) => result,
            Err(e) => {
                error!("Scenario {} errored: {}", scenarios[0].name(), e);
                std::process::exit(1);
            }
        };
        report_result(&result);

        let export = CalibrationExport::from_result(&result);
        match export.write_to_file(export_path) {
            Ok(()) => info!(
                "Exported {} iterations to {}",
                export.iterations.len(),
                export_path.display()
            ),
            Err(e) => {
                error!("Failed to write export: {}", e);
                std::process::exit(1);
            }
        }

        if !result.passed {
            std::process::exit(1);
        }
        return;
    }

    // Run every seed on its own blocking task
    let mut handles = Vec::with_capacity(args.seeds);
    for seed_offset in 0..args.seeds.max(1) {
        let seed_config = config.clone().with_seed(config.seed.wrapping_add(seed_offset as u64));
        let seed_scenarios = scenarios.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            run_seed(seed_config, &seed_scenarios)
        }));
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut errored = 0usize;
    for handle in handles {
        match handle.await {
            Ok(Ok(results)) => all_results.extend(results),
            Ok(Err(e)) => {
                error!("Run errored: {}", e);
                errored += 1;
            }
            Err(e) => {
                error!("Run task panicked: {}", e);
                errored += 1;
            }
        }
    }

    if !args.json {
        for result in &all_results {
            report_result(result);
        }
    }

    // Summary
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();

    if args.json {
        match serde_json::to_string_pretty(&summary_json(&all_results, errored)) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 && errored == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed, {} errored", failed_count, total, errored);

            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 || errored > 0 {
        std::process::exit(1);
    }
}
