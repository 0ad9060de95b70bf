use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::anyhow;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};
use tracing::{debug, info};

use roughie::data;
use roughie::edge::{assess_all, RunnerAssessment};

const TOP_SUBSET: usize = 25;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// dataset to assess
    file: Option<PathBuf>,

    /// how many runners to list
    #[clap(short = 't', long)]
    top: Option<usize>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.file
            .as_ref()
            .ok_or(anyhow!("input file must be specified"))?;
        Ok(())
    }
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

    let start_time = Instant::now();
    let races = data::read_from_csv(args.file.unwrap())?;
    if races.is_empty() {
        Err(anyhow!("the table contains no races"))?;
    }
    let assessments = assess_all(&races)?;

    let mut entries: Vec<_> = assessments
        .iter()
        .flat_map(|race| race.runners.iter().map(move |runner| (race.id.as_str(), runner)))
        .collect();
    entries.sort_by(|a, b| b.1.edge.total_cmp(&a.1.edge));
    let elapsed = start_time.elapsed();
    info!(
        "assessed {} races with {} runners in {:.3}s",
        races.len(),
        entries.len(),
        elapsed.as_millis() as f64 / 1_000.
    );

    let top = args.top.unwrap_or(TOP_SUBSET);
    let top_subset = &entries[..usize::min(top, entries.len())];
    let top_table = tabulate_subset(top_subset);
    info!("best edges:\n{}", Console::default().render(&top_table));

    let mut edges: Vec<_> = entries.iter().map(|(_, runner)| runner.edge).collect();
    edges.sort_by(|a, b| a.total_cmp(b));
    let quantiles = find_quantiles(
        &edges,
        &[0.0, 0.01, 0.05, 0.1, 0.25, 0.5, 0.75, 0.9, 0.95, 0.99, 1.0],
    );
    let quantiles_table = tabulate_quantiles(&quantiles);
    info!(
        "edge quantiles:\n{}",
        Console::default().render(&quantiles_table)
    );

    Ok(())
}

fn find_quantiles(edges: &[f64], quantiles: &[f64]) -> Vec<(f64, f64)> {
    let mut quantile_values = Vec::with_capacity(quantiles.len());
    for quantile in quantiles {
        let index = f64::ceil(quantile * edges.len() as f64 - 1.).max(0.) as usize;
        quantile_values.push((*quantile, edges[index]));
    }
    quantile_values
}

fn tabulate_subset(entries: &[(&str, &RunnerAssessment)]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(6))),
            Col::new(Styles::default().with(MinWidth(12))),
            Col::new(Styles::default().with(MinWidth(20))),
            Col::new(Styles::default().with(MinWidth(8))),
            Col::new(Styles::default().with(MinWidth(8))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(12))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(10))),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Rank".into(),
                "Race".into(),
                "Runner".into(),
                "Price".into(),
                "Fair".into(),
                "Win prob".into(),
                "Market prob".into(),
                "Edge".into(),
                "EV".into(),
            ],
        ));
    table.push_rows(entries.iter().enumerate().map(|(index, (race, runner))| {
        Row::new(
            Styles::default().with(HAlign::Right),
            vec![
                format!("{}", index + 1).into(),
                format!("{race}").into(),
                format!("{}", runner.name).into(),
                format!("{:.2}", runner.price).into(),
                format!("{:.2}", 1. / runner.win_prob).into(),
                format!("{:.4}", runner.win_prob).into(),
                format!("{:.4}", runner.market_prob).into(),
                format!("{:.4}", runner.edge).into(),
                format!("{:.4}", runner.expected_value).into(),
            ],
        )
    }));
    table
}

fn tabulate_quantiles(quantiles: &[(f64, f64)]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(12))),
            Col::new(Styles::default().with(MinWidth(12))),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Quantile".into(), "Edge".into()],
        ));
    table.push_rows(quantiles.iter().map(|(quantile, edge)| {
        Row::new(
            Styles::default().with(HAlign::Right),
            vec![
                format!("{quantile:.3}").into(),
                format!("{edge:.4}").into(),
            ],
        )
    }));
    table
}
