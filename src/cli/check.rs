use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::matching::collision::{check_lanes, CollisionConfig, CollisionWarning, DEFAULT_DISTANCE_THRESHOLD};
use crate::parsing::local::read_index_sheet;
use crate::report::{EXIT_OK, EXIT_WARNINGS};

#[derive(Args)]
pub struct CheckArgs {
    /// CSV with columns SampleName,Index1[,Index2][,Lane]
    #[arg(required = true)]
    pub input: PathBuf,

    /// Report index pairs at or below this distance
    #[arg(long, default_value_t = DEFAULT_DISTANCE_THRESHOLD)]
    pub threshold: usize,

    /// Also compare reverse-complement orientations of every index
    #[arg(long)]
    pub check_flips: bool,
}

pub fn run(args: CheckArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<i32> {
    let rows = read_index_sheet(&args.input)?;
    let lanes: BTreeSet<&str> = rows.iter().map(|r| r.lane.as_str()).collect();

    if verbose {
        eprintln!(
            "Checking {} index pairs in {} lane(s) from {}",
            rows.len(),
            lanes.len(),
            args.input.display()
        );
    }

    let config = CollisionConfig {
        threshold: args.threshold,
        check_flips: args.check_flips,
    };
    let warnings = check_lanes(&rows, &config)?;

    match format {
        OutputFormat::Text => print_text(&args, rows.len(), &warnings),
        OutputFormat::Json => print_json(&args, rows.len(), &warnings)?,
        OutputFormat::Tsv => print_tsv(&warnings),
    }

    Ok(if warnings.is_empty() {
        EXIT_OK
    } else {
        EXIT_WARNINGS
    })
}

fn print_text(args: &CheckArgs, rows: usize, warnings: &[CollisionWarning]) {
    println!("Index Check Results");
    println!("{}", "=".repeat(60));
    println!("\nInput: {}", args.input.display());
    println!("  Index pairs: {rows}");
    println!("  Threshold: {}", args.threshold);
    println!("  Flip checks: {}", args.check_flips);

    if warnings.is_empty() {
        println!("\nNo index collisions found.");
        return;
    }

    println!("\n{} near-collision(s):", warnings.len());
    for warning in warnings {
        println!("\n{}", warning.message);
    }
}

fn print_json(args: &CheckArgs, rows: usize, warnings: &[CollisionWarning]) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "input": args.input.display().to_string(),
        "index_pairs": rows,
        "threshold": args.threshold,
        "check_flips": args.check_flips,
        "collisions": warnings,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(warnings: &[CollisionWarning]) {
    println!("sample_a\tsample_b\tdistance");
    for warning in warnings {
        println!("{}\t{}\t{}", warning.sample_a, warning.sample_b, warning.distance);
    }
}
