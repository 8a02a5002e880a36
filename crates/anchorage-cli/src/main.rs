use std::env;
use std::process;

use anchorage_cli::ScenarioRunner;
use anchorage_cli::errors::Result;
use anchorage_cli::output::ReplayReport;
use anchorage_cli::types::ReplayScenario;
use log::{error, info};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args();
    let _bin = args.next();
    let Some(scenario_path) = args.next() else {
        eprintln!("usage: anchorage <scenario.yaml> [--output <report.json>]");
        process::exit(2);
    };
    let output_path = match (args.next().as_deref(), args.next()) {
        (Some("--output"), Some(path)) => Some(path),
        (None, _) => None,
        _ => {
            eprintln!("usage: anchorage <scenario.yaml> [--output <report.json>]");
            process::exit(2);
        }
    };

    match run(&scenario_path, output_path.as_deref()) {
        Ok(report) => {
            println!("scenario: {}", report.scenario);
            println!("frames: {}", report.summary.total_frames);
            println!("failed frames: {}", report.summary.failed_frames);
            println!("planes seen: {}", report.summary.planes_seen);
            println!("named anchors: {}", report.summary.named_anchors);
            println!(
                "references: {} acquired, {} leaked, {} invalid releases",
                report.summary.references_acquired,
                report.summary.references_leaked,
                report.summary.invalid_releases
            );
            if report.summary.is_clean() {
                println!("status: CLEAN");
                process::exit(0);
            }
            println!("status: LEAKED");
            process::exit(1);
        }
        Err(err) => {
            error!("replay failed: {err}");
            process::exit(1);
        }
    }
}

fn run(scenario_path: &str, output_path: Option<&str>) -> Result<ReplayReport> {
    let scenario = ReplayScenario::load(scenario_path)?;
    let report = ScenarioRunner::new(scenario).run()?;

    let json = serde_json::to_string_pretty(&report)?;
    match output_path {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("Report written to {path}");
        }
        None => println!("{json}"),
    }
    Ok(report)
}
