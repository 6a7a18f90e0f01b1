//! CLI entry point for Warrior Sim

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use warrior_sim_lib::{config::FightConfig, run_batch, AggregateResult, AttackKind};

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "warrior-sim")]
#[command(version = "0.1")]
#[command(about = "Monte-Carlo DPS simulator for a dual-wield fury warrior", long_about = None)]
struct Args {
    /// Fight configuration file (YAML or JSON); defaults are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of fights, overrides the config
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Fight length in seconds, overrides the config
    #[arg(short, long)]
    duration: Option<f64>,

    /// Master seed, overrides the config
    #[arg(short, long)]
    seed: Option<u64>,

    /// Worker threads (0 = one per CPU), overrides the config
    #[arg(long)]
    threads: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Show timing information
    #[arg(short, long, default_value = "false")]
    timing: bool,

    /// Print a total-DPS histogram with this many bins
    #[arg(long)]
    histogram: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warrior_sim_lib=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FightConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FightConfig::default(),
    };
    if let Some(n) = args.iterations {
        config.iterations = n;
    }
    if let Some(d) = args.duration {
        config.fight_duration = d;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(t) = args.threads {
        config.threads = t;
    }

    let start = Instant::now();
    let result = run_batch(&config).context("simulation failed")?;
    let elapsed = start.elapsed();

    match args.output {
        OutputFormat::Text => {
            print_text(&result);
            if let Some(bins) = args.histogram {
                print_histogram(&result, bins);
            }
            if args.timing {
                let secs = elapsed.as_secs_f64();
                println!();
                println!("--- Performance ---");
                println!("Total time: {:.3}s", secs);
                println!("Per fight: {:.3}ms", secs * 1000.0 / result.iterations.max(1) as f64);
                println!("Fights/sec: {:.0}", result.iterations as f64 / secs.max(f64::EPSILON));
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "elapsed_seconds": elapsed.as_secs_f64(),
                "result": result,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_text(result: &AggregateResult) {
    println!("=== Warrior Simulation Results ===");
    println!("Fights: {} ({} workers, seed {})", result.iterations, result.workers, result.seed);
    println!("Fight length: {:.1}s", result.fight_duration);
    println!();
    println!("Mean DPS: {:.2} ± {:.2}", result.mean_total_dps, result.std_total_dps);
    println!("DPS range: {:.2} - {:.2}", result.min_total_dps, result.max_total_dps);
    println!();
    println!("--- DPS by source ---");
    for (name, dps) in result.mean_dps.sources() {
        println!("{:<14} {:>9.2}", name, dps);
    }
    println!();
    println!("--- Uptimes ---");
    for (name, uptime) in &result.mean_uptimes {
        println!("{:<20} {:>6.1}%", name, uptime * 100.0);
    }
    println!("{:<20} {:>6.2}", "ambidextrous stacks", result.mean_ambidextrous_stacks);
    println!();
    println!("--- Attacks per fight (hits / crits / misses) ---");
    for kind in AttackKind::ALL {
        let (hits, crits, misses) = result.mean_attacks(kind);
        if hits + misses > 0.0 {
            println!("{:<8} {:>7.1} {:>7.1} {:>7.1}", kind.label(), hits, crits, misses);
        }
    }
    println!();
    println!("Avg white hit: MH {:.0}, OH {:.0}", result.mean_avg_main_hand_hit, result.mean_avg_off_hand_hit);
    println!(
        "Rage per fight: generated {:.0}, spent {:.0}, overcapped {:.0}",
        result.mean_rage.generated, result.mean_rage.spent, result.mean_rage.overcapped
    );
}

fn print_histogram(result: &AggregateResult, bins: usize) {
    let bars = result.histogram(bins);
    let peak = bars.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    println!();
    println!("--- DPS distribution ---");
    for bar in bars {
        let width = bar.count * 50 / peak;
        println!("{:>8.1} - {:>8.1} | {:<50} {}", bar.lower, bar.upper, "#".repeat(width), bar.count);
    }
}
