//! Input tables of model scores, starting prices and results, keyed by race.
//!
//! Tables arrive as CSV with one record per runner. The header must name a `Race_ID`
//! and a `Horse` column, a score column (`Predicted_Probability` or `Model_Score`) and
//! a `Market_Odds` column. Results are optional: either a `True_Label` column (1 for
//! the winner, 0 otherwise) or a `Position` column (1 for the winner). Tables lacking
//! both are treated as unsettled; they can be assessed but not backtested.

use std::collections::hash_map::Entry;
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use rustc_hash::FxHashMap;

use crate::csv::{CsvReader, Record};
use crate::error::InvalidRace;
use crate::probs::Fraction;

#[derive(Debug, Clone, PartialEq)]
pub struct Runner {
    pub name: String,
    pub score: f64,
    pub price: f64,
    pub winner: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Race {
    pub id: String,
    pub runners: Vec<Runner>,
}
impl Race {
    pub fn validate(&self) -> Result<(), InvalidRace> {
        if self.runners.is_empty() {
            return Err(InvalidRace::NoRunners {
                race: self.id.clone(),
            });
        }
        let settled = self
            .runners
            .iter()
            .filter(|runner| runner.winner.is_some())
            .count();
        if settled != 0 && settled != self.runners.len() {
            return Err(InvalidRace::MixedOutcomes {
                race: self.id.clone(),
            });
        }
        if settled == self.runners.len() {
            let winners = self
                .runners
                .iter()
                .filter(|runner| runner.winner == Some(true))
                .count();
            if winners != 1 {
                return Err(InvalidRace::WinnerCount {
                    race: self.id.clone(),
                    winners,
                });
            }
        }
        Ok(())
    }

    pub fn settled(&self) -> bool {
        self.runners.iter().all(|runner| runner.winner.is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ResultColumn {
    Label(usize),
    Position(usize),
}

#[derive(Debug, Clone, PartialEq)]
struct Schema {
    race: usize,
    runner: usize,
    score: usize,
    price: usize,
    result: Option<ResultColumn>,
}
impl Schema {
    fn resolve(header: &Record) -> Result<Schema, anyhow::Error> {
        let race = position_of(header, &["Race_ID"])?;
        let runner = position_of(header, &["Horse"])?;
        let score = position_of(header, &["Predicted_Probability", "Model_Score"])?;
        let price = position_of(header, &["Market_Odds"])?;
        let result = header
            .position("True_Label")
            .map(ResultColumn::Label)
            .or_else(|| header.position("Position").map(ResultColumn::Position));
        Ok(Schema {
            race,
            runner,
            score,
            price,
            result,
        })
    }
}

fn position_of(header: &Record, names: &[&str]) -> Result<usize, anyhow::Error> {
    names
        .iter()
        .find_map(|name| header.position(name))
        .ok_or(anyhow!("header lacks a {} column", names.join(" or ")))
}

/// Reads a table of runners from the given CSV file, grouping records into races by
/// `Race_ID`. Records of one race need not be contiguous; races are returned in order
/// of first appearance with their runners in record order.
pub fn read_from_csv(path: impl AsRef<Path>) -> Result<Vec<Race>, anyhow::Error> {
    let mut reader = CsvReader::open(path.as_ref())
        .context(format!("cannot open {}", path.as_ref().display()))?;
    let header = match reader.read() {
        None => bail!("no header record"),
        Some(header) => header?,
    };
    let schema = Schema::resolve(&header)?;

    let mut races: Vec<Race> = vec![];
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    for (offset, record) in reader.enumerate() {
        let record = record?;
        if record.is_blank() {
            continue;
        }
        let line = offset + 2;
        let (race_id, runner) = read_runner(&record, &schema, line)?;
        let slot = match index.entry(race_id) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                races.push(Race {
                    id: entry.key().clone(),
                    runners: vec![],
                });
                entry.insert(races.len() - 1);
                races.len() - 1
            }
        };
        races[slot].runners.push(runner);
    }
    for race in &races {
        race.validate()?;
    }
    Ok(races)
}

fn read_runner(
    record: &Record,
    schema: &Schema,
    line: usize,
) -> Result<(String, Runner), anyhow::Error> {
    let race_id = require(record, schema.race, line)?.to_string();
    let name = require(record, schema.runner, line)?.to_string();
    let score = parse_f64(record, schema.score, line)?;
    let price = parse_price(record, schema.price, line)?;
    let winner = match &schema.result {
        None => None,
        Some(ResultColumn::Label(ordinal)) => {
            let label = require(record, *ordinal, line)?;
            match label {
                "0" => Some(false),
                "1" => Some(true),
                other => bail!("label '{other}' on line {line} is neither 0 nor 1"),
            }
        }
        Some(ResultColumn::Position(ordinal)) => {
            let position: u64 = parse(record, *ordinal, line)?;
            if position == 0 {
                bail!("invalid finishing position 0 on line {line}");
            }
            Some(position == 1)
        }
    };
    Ok((
        race_id,
        Runner {
            name,
            score,
            price,
            winner,
        },
    ))
}

/// Prices may be quoted as decimal odds (`3.5`) or as fractional odds (`5/2`), the
/// latter excluding the stake.
fn parse_price(record: &Record, ordinal: usize, line: usize) -> Result<f64, anyhow::Error> {
    let field = require(record, ordinal, line)?;
    if field.contains('/') {
        let fraction: Fraction = field
            .parse()
            .context(format!("cannot parse price on line {line}"))?;
        Ok(fraction.quotient() + 1.0)
    } else {
        parse_f64(record, ordinal, line)
    }
}

fn require(record: &Record, ordinal: usize, line: usize) -> Result<&str, anyhow::Error> {
    let field = record
        .get(ordinal)
        .ok_or(anyhow!("no field {ordinal} on line {line}"))?;
    if field.is_empty() {
        bail!("empty field {ordinal} on line {line}");
    }
    Ok(field)
}

fn parse_f64(record: &Record, ordinal: usize, line: usize) -> Result<f64, anyhow::Error> {
    parse(record, ordinal, line)
}

fn parse<T>(record: &Record, ordinal: usize, line: usize) -> Result<T, anyhow::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let field = require(record, ordinal, line)?;
    field
        .parse()
        .context(format!("cannot parse '{field}' on line {line}"))
}
