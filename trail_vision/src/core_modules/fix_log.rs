// THEORY:
// The `fix_log` module owns the on-disk trace format. One confirmed fix becomes
// one line of `elapsed_seconds,x,y`, appended and flushed immediately. The trace
// is append-only and chronological; the renderer consumes it later in file
// order. Write failures propagate to the caller rather than being dropped: a
// trace with silent holes is worse than a loud failure.

use crate::error::{Result, TrailError};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// A confirmed player position: seconds since session start and the player's
/// tile on the map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixRecord {
    pub elapsed_secs: u64,
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for FixRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.elapsed_secs, self.x, self.y)
    }
}

impl FromStr for FixRecord {
    type Err = TrailError;

    fn from_str(line: &str) -> Result<Self> {
        let mut fields = line.trim().split(',');
        let mut next = |name: &str| {
            fields
                .next()
                .ok_or_else(|| TrailError::Config(format!("fix line missing {name}: {line:?}")))
        };

        let elapsed_secs = next("elapsed seconds")?
            .parse::<u64>()
            .map_err(|_| TrailError::Config(format!("bad elapsed seconds in fix line {line:?}")))?;
        let x = next("x")?
            .parse::<i32>()
            .map_err(|_| TrailError::Config(format!("bad x in fix line {line:?}")))?;
        let y = next("y")?
            .parse::<i32>()
            .map_err(|_| TrailError::Config(format!("bad y in fix line {line:?}")))?;

        if fields.next().is_some() {
            return Err(TrailError::Config(format!(
                "trailing fields in fix line {line:?}"
            )));
        }

        Ok(Self { elapsed_secs, x, y })
    }
}

/// Append-only writer for the fix trace.
pub struct FixLog {
    file: File,
}

impl FixLog {
    /// Opens (or creates) the trace file for appending. Existing lines are
    /// never touched.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        Ok(Self { file })
    }

    pub fn append(&mut self, record: &FixRecord) -> Result<()> {
        writeln!(self.file, "{record}")?;
        self.file.flush()?;
        Ok(())
    }
}
