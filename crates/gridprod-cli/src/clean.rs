//! Housekeeping: delete leftover checkpoints and outputs from the data
//! directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub fn run(data_dir: &Path, checkpoints: bool, outputs: bool) -> Result<()> {
    if checkpoints {
        let dir = data_dir.join("workers");
        let removed = remove_matching(&dir, |name| {
            name.starts_with("worker_") && name.ends_with(".txt")
        })?;
        match removed {
            0 => println!("No worker checkpoints to delete"),
            k => println!("Deleted {k} worker checkpoint(s)"),
        }
    }
    if outputs {
        let removed = remove_matching(data_dir, |name| name.ends_with("-output.json"))?;
        match removed {
            0 => println!("No output files to delete"),
            k => println!("Deleted {k} output file(s)"),
        }
    }
    Ok(())
}

fn remove_matching(dir: &Path, matches: impl Fn(&str) -> bool) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if matches(name) && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())
                .with_context(|| format!("deleting {}", entry.path().display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}
