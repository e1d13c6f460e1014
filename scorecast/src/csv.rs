//! Utilities for reading simple (unquoted, comma-separated) CSV files.
//!
//! Quoted fields are not supported: every comma separates fields, so a value such as
//! `"Brighton, Hove"` splits in two and yields a record with one field too many.

use std::fs::File;
use std::io;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

pub struct CsvReader<R> {
    lines: Lines<R>,
}
impl CsvReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::open(path)?;
        Ok(Self::from(BufReader::new(file)))
    }
}

impl<R: BufRead> CsvReader<R> {
    /// Reads the next non-blank record, trimming whitespace around each field.
    pub fn read(&mut self) -> Option<Result<Vec<String>, io::Error>> {
        loop {
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    return Some(Ok(line
                        .split(',')
                        .map(|datum| datum.trim().to_string())
                        .collect()))
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<R: BufRead> From<R> for CsvReader<R> {
    fn from(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead> Iterator for CsvReader<R> {
    type Item = Result<Vec<String>, io::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_are_not_interpreted() {
        let data = "\"Brighton, Hove\",Leeds\n";
        let record = CsvReader::from(data.as_bytes()).read().unwrap().unwrap();
        assert_eq!(vec!["\"Brighton", "Hove\"", "Leeds"], record);
    }

    #[test]
    fn read_records() {
        let data = "a, b ,c\n\n1,2,3\n";
        let records = CsvReader::from(data.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            vec![vec!["a", "b", "c"], vec!["1", "2", "3"]],
            records
        );
    }
}
