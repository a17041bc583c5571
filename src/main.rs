mod config;
mod error;
mod fetch;
mod ledger;
mod parser;
mod pipeline;
mod report;
mod store;

use std::time::Instant;

use anyhow::bail;
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::ledger::PointSet;

#[derive(Parser)]
#[command(name = "rank_tracker", about = "Track ranking page scores over time")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the ranking page and merge it into the ledger (the default)
    Run {
        /// Merge and report without writing the ledger
        #[arg(long)]
        dry_run: bool,
    },
    /// Show ledger statistics
    Stats,
    /// Entities table, most recently seen first
    Overview {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Every stored point for one entity (exact name)
    Show { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command.unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run } => {
            let outcome = pipeline::run_cycle(&settings, dry_run).await?;
            println!(
                "Observed {} entries: {} new, {} updated ({} series, {} points).",
                outcome.observed,
                outcome.merge.created,
                outcome.merge.updated,
                outcome.ledger.len(),
                outcome.ledger.total_points()
            );
            if outcome.saved {
                println!("Ledger written to {}", settings.ledger_path.display());
            }
            Ok(())
        }
        Commands::Stats => {
            let ledger = store::load(&settings.ledger_path, settings.policy)?;
            println!("Ledger:   {}", settings.ledger_path.display());
            println!("Policy:   {}", settings.policy);
            println!("Entities: {}", ledger.len());
            println!("Points:   {}", ledger.total_points());
            if let Some((oldest, newest)) = report::span(&ledger) {
                println!("Oldest:   {}", oldest.format("%Y-%m-%d %H:%M:%S UTC"));
                println!("Newest:   {}", newest.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            Ok(())
        }
        Commands::Overview { limit } => {
            let ledger = store::load(&settings.ledger_path, settings.policy)?;
            if ledger.is_empty() {
                println!("Ledger is empty. Run a scrape first.");
                return Ok(());
            }
            let rows = report::overview(&ledger, limit);

            println!(
                "{:>3} | {:<40} | {:>6} | {:>6} | {:>6} | {:>7} | {:<16}",
                "#", "Name", "Points", "First", "Latest", "Change", "Last seen"
            );
            println!("{}", "-".repeat(104));
            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<40} | {:>6} | {:>6.2} | {:>6.2} | {:>+7.2} | {:<16}",
                    i + 1,
                    truncate(&r.name, 40),
                    r.points,
                    r.first_score,
                    r.latest_score,
                    r.change,
                    r.last_seen.format("%Y-%m-%d %H:%M")
                );
            }
            println!("\n{} of {} entities", rows.len(), ledger.len());
            Ok(())
        }
        Commands::Show { name } => {
            let ledger = store::load(&settings.ledger_path, settings.policy)?;
            let Some(series) = ledger.get(&name) else {
                bail!("No entity named {:?} in {}", name, settings.ledger_path.display());
            };
            println!("{} ({} points)", series.name, series.points.len());
            match &series.points {
                PointSet::History(points) => {
                    for p in points {
                        println!("  {}  {:.2}", p.timestamp.format("%Y-%m-%d %H:%M:%S"), p.score);
                    }
                }
                PointSet::Snapshot(days) => {
                    for (day, score) in days.iter() {
                        println!("  {}  {:.2}", day, score);
                    }
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}
