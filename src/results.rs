use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Append-only text log of a training run.
///
/// Episode rows are `reward, timesteps, tree_count`; evaluations are written
/// as `Evaluation: <mean reward>` lines in between.
pub struct ResultsLog {
    path: PathBuf,
}

impl ResultsLog {
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(ResultsLog {
            path: dir.join(format!("{name}.txt")),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn episode(&self, reward: f32, timesteps: usize, tree_count: Option<usize>) -> Result<()> {
        let trees = tree_count.map_or_else(|| "None".to_string(), |n| n.to_string());
        self.append(&format!("{reward}, {timesteps}, {trees}"))
    }

    pub fn evaluation(&self, value: f32) -> Result<()> {
        self.append(&format!("Evaluation: {value}"))
    }

    fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}
