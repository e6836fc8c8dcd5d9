//! Scalar event stream, one JSON object per line

use crate::error::Result;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const EVENTS_FILE: &str = "events.jsonl";

#[derive(Debug, Serialize)]
struct ScalarEvent<'a> {
    tag: &'a str,
    step: usize,
    value: f32,
    wall_time: f64,
}

/// Appends `{"tag", "step", "value", "wall_time"}` records to
/// `<dir>/events.jsonl`. The file is truncated when the writer is created.
#[derive(Debug)]
pub struct SummaryWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl SummaryWriter {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(EVENTS_FILE);
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_scalar(&mut self, tag: &str, step: usize, value: f32) -> Result<()> {
        let wall_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let event = ScalarEvent {
            tag,
            step,
            value,
            wall_time,
        };
        serde_json::to_writer(&mut self.writer, &event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_one_line_per_scalar() {
        let dir = tempdir().unwrap();
        let mut writer = SummaryWriter::create(dir.path()).unwrap();
        writer.add_scalar("cost", 0, 0.69).unwrap();
        writer.add_scalar("cost", 1, 0.5).unwrap();
        writer.flush().unwrap();

        let contents = fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["tag"], "cost");
        assert_eq!(lines[1]["step"], 1);
    }
}
