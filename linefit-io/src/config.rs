//! Run configuration files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use linefit_core::config::{FitConfig, ReductionConfig};

use crate::Result;

/// Complete configuration of a reconstruction run.
///
/// Missing sections or fields fall back to their defaults, so an empty
/// object `{}` is a valid configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Hit reduction settings.
    pub reduction: ReductionConfig,
    /// Track fit settings.
    pub fit: FitConfig,
}

impl RunConfig {
    /// Reads and validates a JSON configuration file.
    ///
    /// # Errors
    /// Returns an error if the file is unreadable, malformed or out of range.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Validates both sections.
    ///
    /// # Errors
    /// Returns the first configuration error found.
    pub fn validate(&self) -> Result<()> {
        self.reduction.validate()?;
        self.fit.validate()?;
        Ok(())
    }
}
