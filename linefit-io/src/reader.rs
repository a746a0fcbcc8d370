//! Event readers and writers for JSON Lines files.
//!
//! Each non-blank line holds one [`Event`] object:
//!
//! ```text
//! {"id":1,"hits":[{"sensor_id":10001,"time":1021.4,"tot":26.0}],"truth":{"direction":[0.0,0.6,-0.8]}}
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use linefit_core::event::Event;

use crate::{Error, Result};

/// Streaming reader of events, one per line.
pub struct EventReader<R = BufReader<File>> {
    lines: Lines<R>,
    line: usize,
}

impl EventReader {
    /// Opens a JSON Lines event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    /// Reads all remaining events.
    ///
    /// # Errors
    /// Stops at the first unreadable or malformed line.
    pub fn read_all(self) -> Result<Vec<Event>> {
        self.collect()
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(err) => return Some(Err(err.into())),
            };
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            let line = self.line;
            return Some(
                serde_json::from_str(&text).map_err(|source| Error::Record { line, source }),
            );
        }
    }
}

/// Writes events as JSON Lines.
pub struct EventWriter {
    writer: BufWriter<File>,
}

impl EventWriter {
    /// Creates a new event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Appends one event.
    ///
    /// # Errors
    /// Returns an error on serialization or write failure.
    pub fn write(&mut self, event: &Event) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
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
