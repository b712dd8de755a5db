//! The read-eval-print loop shared by the scorer and the tagger.
//!
//! A task is anything implementing [`ImageTask`]. In [`Mode::Persistent`] the
//! runner reads one image path per line until end-of-stream or an empty line,
//! and writes exactly one result line per path, flushing after each so a
//! parent process can consume results as they arrive. A failed image produces
//! the task's sentinel line instead of stopping the loop. [`Mode::OneShot`]
//! runs the same task on a single path and reports failure as an error.

use anyhow::Result;
use std::{
    fmt,
    io::{BufRead, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, error, info};

use crate::{
    aesthetic::{AestheticScore, AestheticScorer},
    error::ProcessError,
    model::Classifier,
    tagger::{AutoTagger, TagSet},
};

/// One image in, one printable result out.
pub trait ImageTask {
    type Output: fmt::Display;

    /// Printed in place of a result when an image fails.
    const SENTINEL: &'static str;

    fn process(&mut self, path: &Path) -> Result<Self::Output, ProcessError>;
}

impl<C: Classifier> ImageTask for AestheticScorer<C> {
    type Output = AestheticScore;
    const SENTINEL: &'static str = "0";

    fn process(&mut self, path: &Path) -> Result<AestheticScore, ProcessError> {
        self.score(path)
    }
}

impl<C: Classifier> ImageTask for AutoTagger<C> {
    type Output = TagSet;
    const SENTINEL: &'static str = "";

    fn process(&mut self, path: &Path) -> Result<TagSet, ProcessError> {
        self.tag(path)
    }
}

/// Whether the task serves a stream of paths or a single one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Persistent,
    OneShot(PathBuf),
}

/// Counts of handled and failed images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub failed: usize,
}

/// Runs `task` in the given mode.
///
/// Only a one-shot failure is returned as an error; the persistent loop
/// always ends gracefully.
pub fn run<T, R, W>(task: &mut T, mode: Mode, input: R, output: W) -> Result<Summary>
where
    T: ImageTask,
    R: BufRead,
    W: Write,
{
    match mode {
        Mode::Persistent => Ok(run_loop(task, input, output)),
        Mode::OneShot(path) => {
            run_once(task, &path, output)?;
            Ok(Summary {
                processed: 1,
                failed: 0,
            })
        }
    }
}

/// Serves image paths from `input` until end-of-stream or an empty line.
pub fn run_loop<T, R, W>(task: &mut T, input: R, mut output: W) -> Summary
where
    T: ImageTask,
    R: BufRead,
    W: Write,
{
    let mut summary = Summary::default();

    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Unhandled error in main loop: {}", e);
                break;
            }
        };

        let path = line.trim();
        if path.is_empty() {
            break;
        }

        debug!("Processing image: {}", path);
        let result = match task.process(Path::new(path)) {
            Ok(result) => result.to_string(),
            Err(e) => {
                error!("Error processing image {}: {}", path, e);
                summary.failed += 1;
                T::SENTINEL.to_string()
            }
        };

        if let Err(e) = writeln!(output, "{}", result).and_then(|_| output.flush()) {
            error!("Unhandled error in main loop: {}", e);
            break;
        }
        summary.processed += 1;
    }

    info!(
        "Input finished: {} images processed, {} failed",
        summary.processed, summary.failed
    );
    summary
}

/// Processes a single image and prints its result.
pub fn run_once<T, W>(task: &mut T, path: &Path, mut output: W) -> Result<T::Output>
where
    T: ImageTask,
    W: Write,
{
    let result = task.process(path)?;
    writeln!(output, "{}", result)?;
    output.flush()?;
    Ok(result)
}
