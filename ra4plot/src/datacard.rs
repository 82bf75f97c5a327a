//! Reading the observation and process blocks of a datacard.
//!
//! A datacard is a whitespace-separated text file. The parts that matter here are
//!
//! ```text
//! bin          a  b  c
//! observation  3  0  12
//! ------------
//! bin          a    a    b    b    c    c
//! process      sig  bkg  sig  bkg  sig  bkg
//! process      0    1    0    1    0    1
//! rate         1.4  2.0  0.6  1.0  0.1  9.5
//! ```
//!
//! Both blocks are found by their keywords. Lines starting with `#` are comments.

use super::error::{Error, Result};
use itertools::Itertools;
use std::fs;
use std::path::Path;

/// One column of the process block.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessRate {
    /// Name of the bin the rate belongs to.
    pub bin: String,
    /// Name of the process.
    pub process: String,
    /// Process index; signal processes have indices `<= 0`.
    pub index: i32,
    /// Expected yield.
    pub rate: f64,
}

/// The parsed content of a datacard.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Datacard {
    bins: Vec<String>,
    observations: Vec<f64>,
    observation_line: usize,
    processes: Vec<ProcessRate>,
}

type Line<'a> = (usize, Vec<&'a str>);

fn error(line: usize, message: impl Into<String>) -> Error {
    Error::Datacard {
        line,
        message: message.into(),
    }
}

fn keyword<'a>(line: &'a Line) -> Option<&'a str> {
    line.1.first().copied()
}

fn values<'a>(line: &'a Line) -> &'a [&'a str] {
    &line.1[1..]
}

fn parse_numbers<T: std::str::FromStr>(line: &Line) -> Result<Vec<T>> {
    values(line)
        .iter()
        .map(|token| {
            token
                .parse()
                .map_err(|_| error(line.0, format!("`{token}` is not a number")))
        })
        .collect()
}

fn check_columns(expected: &Line, line: &Line) -> Result<()> {
    let (left, right) = (values(expected).len(), values(line).len());

    if left == right {
        Ok(())
    } else {
        Err(error(
            line.0,
            format!(
                "expected {left} columns as in line {}, found {right}",
                expected.0
            ),
        ))
    }
}

impl Datacard {
    /// Reads and parses the datacard at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be read or parsed, see [`Datacard::parse`].
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(Error::io(path))?;

        Self::parse(&contents)
    }

    /// Parses the contents of a datacard.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Datacard`] if there is no `bin` line directly followed by an
    /// `observation` line, if the number of columns of a block differs between its lines or if
    /// a yield is not a number. A missing process block is not an error.
    pub fn parse(contents: &str) -> Result<Self> {
        let lines: Vec<Line> = contents
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.split_whitespace().collect::<Vec<_>>()))
            .filter(|(_, tokens)| tokens.first().is_some_and(|token| !token.starts_with('#')))
            .collect();

        let position = lines
            .iter()
            .tuple_windows()
            .position(|(first, second)| {
                keyword(first) == Some("bin") && keyword(second) == Some("observation")
            })
            .ok_or_else(|| error(0, "no `bin` line followed by an `observation` line"))?;

        let (bin_line, observation_line) = (&lines[position], &lines[position + 1]);
        check_columns(bin_line, observation_line)?;

        let bins = values(bin_line).iter().map(|&bin| bin.to_owned()).collect();
        let observations: Vec<f64> = parse_numbers(observation_line)?;

        if observations.iter().any(|&count| count < 0.0) {
            return Err(error(
                observation_line.0,
                "observed counts must not be negative",
            ));
        }

        let processes = Self::parse_processes(&lines[position + 2..])?;

        Ok(Self {
            bins,
            observations,
            observation_line: observation_line.0,
            processes,
        })
    }

    fn parse_processes(lines: &[Line]) -> Result<Vec<ProcessRate>> {
        let Some((bin, first, second, rate)) = lines.iter().tuple_windows().find(|(a, b, c, d)| {
            keyword(a) == Some("bin")
                && keyword(b) == Some("process")
                && keyword(c) == Some("process")
                && keyword(d) == Some("rate")
        }) else {
            return Ok(Vec::new());
        };

        for line in [first, second, rate] {
            check_columns(bin, line)?;
        }

        // either of the two `process` lines may hold the indices
        let (names, indices) = match parse_numbers::<i32>(second) {
            Ok(indices) => (first, indices),
            Err(_) => (second, parse_numbers::<i32>(first)?),
        };
        let rates: Vec<f64> = parse_numbers(rate)?;

        Ok(values(bin)
            .iter()
            .zip(values(names))
            .zip(indices)
            .zip(rates)
            .map(|(((&bin, &process), index), rate)| ProcessRate {
                bin: bin.to_owned(),
                process: process.to_owned(),
                index,
                rate,
            })
            .collect())
    }

    /// Names of the bins of the observation block.
    #[must_use]
    pub fn bins(&self) -> &[String] {
        &self.bins
    }

    /// Observed counts, in the order of [`Datacard::bins`].
    #[must_use]
    pub fn observations(&self) -> &[f64] {
        &self.observations
    }

    /// Returns the bin name and observed count of the `column`th (zero-based) entry of the
    /// observation block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Datacard`] pointing to the `observation` line if `column` is out of
    /// range.
    pub fn observation(&self, column: usize) -> Result<(&str, f64)> {
        self.bins
            .get(column)
            .zip(self.observations.get(column))
            .map(|(bin, &count)| (bin.as_str(), count))
            .ok_or_else(|| {
                error(
                    self.observation_line,
                    format!(
                        "column {column} requested, but there are only {} bins",
                        self.bins.len()
                    ),
                )
            })
    }

    /// All columns of the process block.
    #[must_use]
    pub fn processes(&self) -> &[ProcessRate] {
        &self.processes
    }

    /// Returns the rate of `process` in `bin`.
    #[must_use]
    pub fn rate(&self, process: &str, bin: &str) -> Option<f64> {
        self.processes
            .iter()
            .find(|entry| entry.process == process && entry.bin == bin)
            .map(|entry| entry.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = "\
imax 3  number of channels
jmax 1  number of backgrounds
kmax *  number of nuisance parameters
------------
# observed data
bin          a    b    c
observation  3    0    12
------------
bin          a    a    b    b    c    c
process      sig  bkg  sig  bkg  sig  bkg
process      0    1    0    1    0    1
rate         1.4  2.0  0.6  1.0  0.1  9.5
------------
lumi  lnN    1.016 -    1.016 -    1.016 -
";

    #[test]
    fn parse_observation() {
        let card = Datacard::parse(CARD).unwrap();

        assert_eq!(card.bins(), ["a", "b", "c"]);
        assert_eq!(card.observations(), [3.0, 0.0, 12.0]);
        assert_eq!(card.observation(2).unwrap(), ("c", 12.0));
        assert_eq!(
            card.observation(3).unwrap_err().to_string(),
            "datacard line 7: column 3 requested, but there are only 3 bins"
        );
    }

    #[test]
    fn parse_processes() {
        let card = Datacard::parse(CARD).unwrap();

        assert_eq!(card.processes().len(), 6);
        assert_eq!(
            card.processes()[1],
            ProcessRate {
                bin: "a".to_owned(),
                process: "bkg".to_owned(),
                index: 1,
                rate: 2.0,
            }
        );
        assert_eq!(card.rate("sig", "b"), Some(0.6));
        assert_eq!(card.rate("sig", "d"), None);
    }

    #[test]
    fn swapped_process_lines() {
        let card = Datacard::parse(&CARD.replace(
            "process      sig  bkg  sig  bkg  sig  bkg\nprocess      0    1    0    1    0    1",
            "process      0    1    0    1    0    1\nprocess      sig  bkg  sig  bkg  sig  bkg",
        ))
        .unwrap();

        assert_eq!(card.rate("bkg", "c"), Some(9.5));
        assert_eq!(card.processes()[4].index, 0);
    }

    #[test]
    fn missing_process_block() {
        let card = Datacard::parse("bin x y\nobservation 1 2\n").unwrap();

        assert!(card.processes().is_empty());
        assert_eq!(card.observation(1).unwrap(), ("y", 2.0));
    }

    #[test]
    fn malformed_cards() {
        assert_eq!(
            Datacard::parse("imax 1\nbin a\n\nrate 1\n")
                .unwrap_err()
                .to_string(),
            "datacard line 0: no `bin` line followed by an `observation` line"
        );
        assert_eq!(
            Datacard::parse("bin a b\nobservation 1\n")
                .unwrap_err()
                .to_string(),
            "datacard line 2: expected 2 columns as in line 1, found 1"
        );
        assert_eq!(
            Datacard::parse("\n\nbin a b\nobservation 1 x\n")
                .unwrap_err()
                .to_string(),
            "datacard line 4: `x` is not a number"
        );
        assert!(matches!(
            Datacard::parse("bin a\nobservation -1\n"),
            Err(Error::Datacard { line: 2, .. })
        ));
        assert!(matches!(
            Datacard::parse(&CARD.replace("rate         1.4", "rate         1.4 7.0")),
            Err(Error::Datacard { line: 12, .. })
        ));
    }
}
