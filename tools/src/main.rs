//! report-runner: headless driver for the onboarding report.
//!
//! Usage:
//!   report-runner                      text summary
//!   report-runner --json               full dashboard snapshot as JSON
//!   report-runner --view erp           one view as JSON
//!   report-runner --config report.json
//!   report-runner --ipc-mode           JSON lines on stdin/stdout

use anyhow::Result;
use onboarding_core::{
    config::ReportConfig,
    dataset::ReportDataset,
    format,
    snapshot::{view_json, DashboardSnapshot, ViewName},
    views::bucket_counts,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetSnapshot,
    GetView { view: String },
    Bucket { days: Vec<f64> },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let json = args.iter().any(|a| a == "--json");
    let view = find_arg(&args, "--view");

    let config = match find_arg(&args, "--config") {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };

    let dataset = ReportDataset::builtin()?;

    if ipc_mode {
        run_ipc_loop(&dataset, &config)?;
    } else if let Some(name) = view {
        let view: ViewName = name.parse()?;
        let value = view_json(&dataset, &config, view)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if json {
        let snapshot = DashboardSnapshot::build(&dataset, &config)?;
        println!("{}", snapshot.to_json()?);
    } else {
        let snapshot = DashboardSnapshot::build(&dataset, &config)?;
        print_summary(&snapshot, &config);
    }

    Ok(())
}

fn run_ipc_loop(dataset: &ReportDataset, config: &ReportConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetSnapshot => DashboardSnapshot::build(dataset, config)
                .and_then(|s| Ok(serde_json::to_value(s)?)),
            IpcCommand::GetView { view } => view
                .parse::<ViewName>()
                .and_then(|v| view_json(dataset, config, v)),
            IpcCommand::Bucket { days } => {
                bucket_counts(&days).and_then(|t| Ok(serde_json::to_value(t)?))
            }
        };

        match reply {
            Ok(value) => writeln!(stdout, "{value}")?,
            Err(e) => {
                log::warn!("ipc: request failed: {e}");
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{err_json}")?;
    stdout.flush()?;
    Ok(())
}

fn print_summary(snapshot: &DashboardSnapshot, config: &ReportConfig) {
    let policy = &config.labels;

    println!("=== {} ===", snapshot.title);
    println!("  {}", snapshot.subtitle);
    println!();
    for card in &snapshot.kpis {
        println!("  {:<26} {}", card.title, card.display);
    }

    println!();
    println!("=== SEGMENTATION ===");
    print_tree(&snapshot.segmentation, 1);

    println!();
    println!(
        "=== ONBOARDING DAYS BY ERP (N={} of {} live & active) ===",
        snapshot.erp.total, snapshot.erp.population
    );
    for bar in &snapshot.erp.bars {
        let median = bar
            .median_days
            .map(format::number)
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<24} avg {:>4}  median {:>4}",
            bar.label,
            format::number(bar.average_days),
            median
        );
    }

    println!();
    println!("=== COHORT TREND ===");
    for p in &snapshot.cohort.points {
        println!("  {:<8} {:>4} days", p.month, format::number(p.avg_days));
    }
    if let Some(change) = snapshot.cohort.change_pct {
        println!("  change: {change:+}%");
    }

    println!();
    println!("=== DISTRIBUTION (N={}) ===", snapshot.distribution.total);
    for bar in &snapshot.distribution.bars {
        println!("  {:<8} {:>3}  {}", bar.bin, bar.count, format::percent(bar.stored_pct));
    }

    println!();
    println!("=== ACV BANDS (N={}) ===", snapshot.acv_bands.total);
    for bar in &snapshot.acv_bands.bars {
        println!("  {:<10} {}", bar.band, bar.label);
    }
    if let Some(r) = snapshot.acv_bands.acv_days_correlation {
        println!("  ACV vs days: r = {r:.2}");
    }

    println!();
    println!("=== NON-LIVE PIPELINE ===");
    for bar in &snapshot.non_live.bars {
        println!("  {:<24} {}", bar.label, bar.acv_label);
    }
    println!(
        "  total N={} {} | stuck in {}: {}",
        snapshot.non_live.total_count,
        format::acv_millions(snapshot.non_live.total_acv_millions, policy),
        snapshot.non_live.stuck_categories.join(" + "),
        format::acv_millions(snapshot.non_live.stuck_acv_millions, policy)
    );

    println!();
    println!("=== AT RISK (N={}) ===", snapshot.at_risk.total);
    for r in &snapshot.at_risk.reasons {
        println!("  {:<28} {}", r.reason, r.label);
    }
}

fn print_tree(node: &onboarding_core::hierarchy::TreeNode, depth: usize) {
    println!("{}{}", "  ".repeat(depth), node.label);
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
