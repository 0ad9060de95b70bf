use std::env;
use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::anyhow;
use clap::Parser;
use serde::{Deserialize, Serialize};
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};
use tracing::{debug, info};

use roughie::boot::{bootstrap, BootstrapConfig, Report};
use roughie::csv::{CsvWriter, Record};
use roughie::data;
use roughie::edge::assess_all;
use roughie::opt::{optimise, sweep, Optimisation, SweepConfig};
use roughie::sim::{Performance, SimConfig, Staking, StakingMethod, Stat};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// dataset to backtest
    file: Option<PathBuf>,

    /// JSON profile supplying defaults for the remaining flags
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// staking method: flat, edge or kelly
    #[clap(short = 's', long, value_parser = parse_staking)]
    staking: Option<StakingMethod>,

    /// multiplier applied to every stake
    #[clap(long)]
    scale: Option<f64>,

    /// lower bound of the threshold grid
    #[clap(long)]
    min: Option<f64>,

    /// upper bound of the threshold grid
    #[clap(long)]
    max: Option<f64>,

    /// spacing of the threshold grid
    #[clap(long)]
    step: Option<f64>,

    /// number of bootstrap resamples; 0 skips the bootstrap
    #[clap(short = 'b', long)]
    resamples: Option<usize>,

    /// seed for the bootstrap resampler
    #[clap(long)]
    seed: Option<u64>,

    /// confidence level for the bootstrap intervals
    #[clap(long)]
    confidence: Option<f64>,

    /// where to export the threshold sweep as CSV
    #[clap(short = 'e', long)]
    export: Option<PathBuf>,

    /// print the findings as JSON
    #[clap(short = 'j', long)]
    json: bool,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.file
            .as_ref()
            .ok_or(anyhow!("input file must be specified"))?;
        Ok(())
    }
}
fn parse_staking(s: &str) -> anyhow::Result<StakingMethod> {
    StakingMethod::from_str(&s.to_lowercase()).map_err(|_| anyhow!("unsupported staking method {s}"))
}

/// Defaults for the knobs not given on the command line. Flags always win over the
/// profile; absent sections fall back to the crate defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Profile {
    sweep: SweepConfig,
    sim: SimConfig,
    bootstrap: BootstrapConfig,
}

#[derive(Debug, Serialize)]
struct Findings<'a> {
    optimisation: &'a Optimisation,
    bootstrap: Option<&'a Report>,
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");
    let profile: Profile = match &args.config {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => Profile::default(),
    };
    debug!("profile: {profile:?}");

    let start_time = Instant::now();
    let races = data::read_from_csv(args.file.unwrap())?;
    let runners: usize = races.iter().map(|race| race.runners.len()).sum();
    info!("read {} races with {runners} runners", races.len());
    if races.is_empty() {
        Err(anyhow!("the table contains no races"))?;
    }
    if races.iter().any(|race| !race.settled()) {
        Err(anyhow!("the table lacks results and cannot be backtested"))?;
    }
    let assessments = assess_all(&races)?;

    let sweep_config = SweepConfig {
        min: args.min.unwrap_or(profile.sweep.min),
        max: args.max.unwrap_or(profile.sweep.max),
        step: args.step.unwrap_or(profile.sweep.step),
    };
    let sim_config = SimConfig {
        staking: Staking {
            method: args.staking.unwrap_or(profile.sim.staking.method),
            scale: args.scale.unwrap_or(profile.sim.staking.scale),
        },
        sharpe_scale: profile.sim.sharpe_scale,
    };

    let performances = sweep(&sweep_config, &assessments, &sim_config)?;
    let sweep_table = tabulate_performances(&performances);
    info!(
        "threshold sweep:\n{}",
        Console::default().render(&sweep_table)
    );
    if let Some(export) = &args.export {
        export_sweep(&performances, export)?;
        info!("exported sweep to {}", export.display());
    }

    let optimisation = optimise(&sweep_config, &assessments, &sim_config)?;
    match &optimisation {
        Optimisation::Optimal(optimum) => {
            let optimum_table = tabulate_performances(std::slice::from_ref(&optimum.performance));
            info!(
                "optimal threshold ({} candidates, {:.3}s):\n{}",
                optimum.steps,
                optimum.elapsed.as_millis() as f64 / 1_000.,
                Console::default().render(&optimum_table)
            );
        }
        Optimisation::NoViableThreshold { steps } => {
            info!("no viable threshold among {steps} candidates");
        }
    }

    let resamples = args.resamples.unwrap_or(profile.bootstrap.resamples);
    let report = if resamples > 0 && optimisation.optimum().is_some() {
        let boot_config = BootstrapConfig {
            resamples,
            seed: args.seed.unwrap_or(profile.bootstrap.seed),
            confidence: args.confidence.unwrap_or(profile.bootstrap.confidence),
        };
        let report = bootstrap(&boot_config, &assessments, &sweep_config, &sim_config)?;
        let boot_table = tabulate_bootstrap(&report, boot_config.confidence);
        info!("bootstrap:\n{}", Console::default().render(&boot_table));
        if report.partial {
            info!(
                "{} of {} resamples produced no viable threshold and were left out of the intervals",
                report.non_viable, report.requested
            );
        }
        Some(report)
    } else {
        None
    };

    let elapsed = start_time.elapsed();
    info!(
        "backtested {} races in {:.3}s",
        races.len(),
        elapsed.as_millis() as f64 / 1_000.
    );

    if args.json {
        let findings = Findings {
            optimisation: &optimisation,
            bootstrap: report.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&findings)?);
    }

    Ok(())
}

fn tabulate_performances(performances: &[Performance]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(6))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(12))),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Threshold".into(),
                "Bets".into(),
                "Staked".into(),
                "Return".into(),
                "ROI".into(),
                "Mean".into(),
                "Stdev".into(),
                "Sharpe".into(),
            ],
        ));
    table.push_rows(performances.iter().map(|performance| {
        Row::new(
            Styles::default().with(HAlign::Right),
            vec![
                format!("{:.3}", performance.threshold).into(),
                format!("{}", performance.bets).into(),
                format!("{:.2}", performance.total_staked).into(),
                format!("{:.2}", performance.total_return).into(),
                format_stat(&performance.roi).into(),
                format_stat(&performance.mean).into(),
                format_stat(&performance.stdev).into(),
                format_stat(&performance.sharpe).into(),
            ],
        )
    }));
    table
}

fn tabulate_bootstrap(report: &Report, confidence: f64) -> Table {
    let mut table = Table::default().with_cols(vec![
        Col::new(Styles::default().with(MinWidth(26))),
        Col::new(Styles::default().with(MinWidth(16)).with(HAlign::Right)),
    ]);
    table.push_rows(vec![
        Row::new(
            Styles::default(),
            vec![
                "Resamples requested".into(),
                format!("{}", report.requested).into(),
            ],
        ),
        Row::new(
            Styles::default(),
            vec![
                "Resamples completed".into(),
                format!("{}", report.completed).into(),
            ],
        ),
        Row::new(
            Styles::default(),
            vec![
                "Resamples non-viable".into(),
                format!("{}", report.non_viable).into(),
            ],
        ),
        Row::new(
            Styles::default(),
            vec![
                format!("Threshold {:.0}% CI", confidence * 100.).into(),
                format!(
                    "[{:.4}, {:.4}]",
                    report.threshold_ci.lower, report.threshold_ci.upper
                )
                .into(),
            ],
        ),
        Row::new(
            Styles::default(),
            vec![
                format!("Sharpe {:.0}% CI", confidence * 100.).into(),
                format!(
                    "[{:.4}, {:.4}]",
                    report.sharpe_ci.lower, report.sharpe_ci.upper
                )
                .into(),
            ],
        ),
    ]);
    table
}

fn format_stat(stat: &Stat) -> String {
    match stat.value() {
        Some(value) => format!("{value:.4}"),
        None => stat.to_string(),
    }
}

fn export_sweep(performances: &[Performance], path: &Path) -> Result<(), anyhow::Error> {
    let mut csv = CsvWriter::create(path)?;
    csv.append(Record::with_values([
        "Threshold", "Bets", "Staked", "Return", "ROI", "Mean", "Stdev", "Sharpe",
    ]))?;
    for performance in performances {
        csv.append(Record::with_values([
            format!("{}", performance.threshold),
            format!("{}", performance.bets),
            format!("{}", performance.total_staked),
            format!("{}", performance.total_return),
            csv_stat(&performance.roi),
            csv_stat(&performance.mean),
            csv_stat(&performance.stdev),
            csv_stat(&performance.sharpe),
        ]))?;
    }
    csv.flush()?;
    Ok(())
}

fn csv_stat(stat: &Stat) -> String {
    stat.value().map(|value| value.to_string()).unwrap_or_default()
}
