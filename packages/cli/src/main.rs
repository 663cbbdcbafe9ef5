#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `lusaka_waste`: batch population, waste and collection analysis for
//! Lusaka zones.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lusaka_waste_analysis::config::AnalysisConfig;
use lusaka_waste_analysis::insights::{InsightProvider, RuleBasedInsights};
use lusaka_waste_analysis::{BatchOutcome, compare, export, input, run_batch};
use lusaka_waste_cli_utils::{ZoneProgress, init_logger};

#[derive(Parser)]
#[command(
    name = "lusaka_waste",
    about = "Population, waste generation and collection analysis for Lusaka zones"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse every zone in a GeoJSON file or directory and write
    /// results.csv, results.json, comparison.json and failures.json
    Analyze {
        /// GeoJSON file, or a directory of `.geojson` files
        #[arg(long)]
        input: PathBuf,
        /// Directory to write results into (created if missing)
        #[arg(long)]
        output: PathBuf,
        /// Comma-separated gridded population years for temporal analysis
        /// (e.g., "2015,2020")
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,
        /// Gridded population year for the main estimate (overrides config)
        #[arg(long)]
        year: Option<i32>,
        /// Analysis date selecting the waste season, `YYYY-MM-DD`.
        /// Without it waste figures are annual averages.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// TOML config file (falls back to `LUSAKA_WASTE_CONFIG`)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Zones analysed at once (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,
        /// Skip advisory insights
        #[arg(long)]
        no_insights: bool,
    },
    /// Price one collection by weight
    Price {
        /// Collected weight in kilograms
        #[arg(long)]
        weight_kg: f64,
        /// Company type code (8 free, 7 flat, 6 tiered, others standard)
        #[arg(long, default_value = "6")]
        company_type: u8,
        /// Recycling collection (always free)
        #[arg(long)]
        recycle: bool,
    },
    /// Print the default configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            years,
            year,
            date,
            config,
            concurrency,
            no_insights,
        } => {
            let mut config = AnalysisConfig::load(config.as_deref())?;
            if !years.is_empty() {
                config.analysis.years = years;
            }
            if let Some(year) = year {
                config.analysis.year = year;
            }
            if date.is_some() {
                config.analysis.date = date;
            }
            if let Some(concurrency) = concurrency {
                config.analysis.concurrency = concurrency.max(1);
            }
            analyze(&input, &output, &config, !no_insights, &multi).await?;
        }
        Commands::Price {
            weight_kg,
            company_type,
            recycle,
        } => {
            let charge =
                lusaka_waste_billing::calculate_tiered_pricing(weight_kg, company_type, recycle)?;
            println!(
                "{} t x K{:.2} = K{:.2} ({})",
                charge.tonnes, charge.rate_per_tonne, charge.amount, charge.label
            );
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&AnalysisConfig::default())?);
        }
    }

    Ok(())
}

async fn analyze(
    input_path: &Path,
    output: &Path,
    config: &AnalysisConfig,
    with_insights: bool,
    multi: &lusaka_waste_cli_utils::MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let zones = input::load_zones(input_path)?;
    let provider = input::provider_for(&zones);
    log::info!(
        "Loaded {} zone(s), year {}, {} extra year(s)",
        zones.len(),
        config.analysis.year,
        config.analysis.years.len()
    );

    let rules = RuleBasedInsights;
    let insights: Option<&dyn InsightProvider> = if with_insights { Some(&rules) } else { None };

    let progress = ZoneProgress::new(multi, "Analysing zones");
    let outcome = run_batch(&provider, &zones, config, insights, progress.as_ref()).await?;

    let comparison = compare::compare(&outcome.analyses);
    export::write_all(output, &outcome, comparison.as_ref())?;

    print_summary(&outcome);
    log::info!("Finished in {:.1}s", start.elapsed().as_secs_f64());

    if outcome.analyses.is_empty() && !outcome.failures.is_empty() {
        return Err(format!("all {} zone(s) failed", outcome.failures.len()).into());
    }
    Ok(())
}

fn print_summary(outcome: &BatchOutcome) {
    println!(
        "{:<20} {:>10} {:>8} {:>10} {:>5} {:>5} {:>12} {:>10}",
        "zone", "population", "conf", "kg/day", "10t", "20t", "K/month", "quality"
    );
    for a in &outcome.analyses {
        println!(
            "{:<20} {:>10} {:>8} {:>10.0} {:>5} {:>5} {:>12.0} {:>10}",
            a.zone.display_name(),
            a.population.consensus_value,
            a.population.confidence_level.to_string(),
            a.waste.daily_kg,
            a.collection.trucks_10t,
            a.collection.trucks_20t,
            a.logistics.monthly_cost,
            a.validation.quality_level.to_string(),
        );
    }
    for failure in &outcome.failures {
        println!("{:<20} FAILED: {}", failure.zone_id, failure.error);
    }
}
