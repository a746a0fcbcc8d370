//! Statistics writers.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use linefit_core::statistics::{series, FitStatistics};

use crate::{Error, Result};

/// Output format of a statistics file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsFormat {
    /// Counters, constants and all series as one JSON document.
    Json,
    /// One row per valid fit with the per-event series as columns.
    Csv,
}

impl StatisticsFormat {
    /// Picks the format from the file extension; JSON unless `.csv`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// Writer for run statistics.
pub struct StatisticsWriter {
    writer: BufWriter<File>,
}

impl StatisticsWriter {
    /// Creates a new statistics file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes statistics in the given format and flushes.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write(&mut self, statistics: &FitStatistics, format: StatisticsFormat) -> Result<()> {
        match format {
            StatisticsFormat::Json => self.write_json(statistics),
            StatisticsFormat::Csv => self.write_csv(statistics),
        }
    }

    /// Writes the full statistics as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_json(&mut self, statistics: &FitStatistics) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, statistics)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes the per-event series as CSV.
    ///
    /// `event_id` comes first, followed by every other series with one
    /// value per valid fit, in name order. Truth series recorded for only
    /// part of the events cannot be aligned and are left out.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_csv(&mut self, statistics: &FitStatistics) -> Result<()> {
        let rows = statistics.values(series::EVENT_ID).len();
        let mut columns = vec![series::EVENT_ID];
        columns.extend(
            statistics
                .series
                .iter()
                .filter(|(name, values)| name.as_str() != series::EVENT_ID && values.len() == rows)
                .map(|(name, _)| name.as_str()),
        );

        writeln!(self.writer, "{}", columns.join(","))?;
        for row in 0..rows {
            let line: Vec<String> = columns
                .iter()
                .map(|name| statistics.values(name)[row].to_string())
                .collect();
            writeln!(self.writer, "{}", line.join(","))?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads statistics written with [`StatisticsWriter::write_json`].
///
/// # Errors
/// Returns an error if the file is unreadable or not a statistics document.
pub fn read_statistics<P: AsRef<Path>>(path: P) -> Result<FitStatistics> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(Error::from)
}
