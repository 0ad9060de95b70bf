//! Utilities for working with CSV files. Fields are comma-separated and trimmed on
//! read; quoting and embedded commas are not supported.

use std::borrow::Cow;
use std::fs::File;
use std::io;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

pub struct CsvWriter {
    writer: BufWriter<File>,
}
impl CsvWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    pub fn append<R>(&mut self, record: R) -> Result<(), io::Error>
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let mut first = true;
        for datum in record.into_iter() {
            if first {
                first = false;
            } else {
                self.writer.write_all(",".as_bytes())?;
            }
            let str: &str = datum.as_ref();
            self.writer.write_all(str.as_bytes())?;
        }
        self.writer.write_all("\n".as_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), io::Error> {
        self.writer.flush()
    }
}

pub struct CsvReader {
    lines: Lines<BufReader<File>>,
}
impl CsvReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::open(path)?;
        let lines = BufReader::new(file).lines();
        Ok(Self { lines })
    }

    pub fn read(&mut self) -> Option<Result<Record, io::Error>> {
        self.lines
            .next()
            .map(|line| line.map(|line| Record::with_values(line.split(',').map(str::trim))))
    }
}

impl Iterator for CsvReader {
    type Item = Result<Record, io::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    items: Vec<Cow<'static, str>>,
}
impl Record {
    pub fn with_values<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let items = values
            .into_iter()
            .map(|value| Cow::Owned(value.to_string()))
            .collect();
        Self { items }
    }

    pub fn get(&self, ordinal: usize) -> Option<&str> {
        self.items.get(ordinal).map(Cow::as_ref)
    }

    /// Ordinal of the first column matching the given name, ignoring case.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.as_ref().eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.items.iter().all(|item| item.is_empty())
    }
}

impl IntoIterator for Record {
    type Item = Cow<'static, str>;
    type IntoIter = std::vec::IntoIter<Cow<'static, str>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_get() {
        let record = Record::with_values(["a", "b", "c"]);
        assert_eq!(Some("b"), record.get(1));
        assert_eq!(None, record.get(3));
        assert_eq!(3, record.len());
    }

    #[test]
    fn record_position_ignores_case() {
        let record = Record::with_values(["Race_ID", "Horse", "Market_Odds"]);
        assert_eq!(Some(0), record.position("race_id"));
        assert_eq!(Some(2), record.position("MARKET_ODDS"));
        assert_eq!(None, record.position("position"));
    }

    #[test]
    fn record_blankness() {
        assert!(Record::with_values([""]).is_blank());
        assert!(Record::with_values(["", ""]).is_blank());
        assert!(!Record::with_values(["", "x"]).is_blank());
    }
}
