//! # Psyche
//!
//! Command-line front end. The `score` and `tag` commands serve a line protocol
//! over stdin/stdout for a parent process; `score-image` and `tag-image` handle
//! one image and exit; `caption`, `tags` and `remove-tag` work on a directory of
//! caption files.

mod args;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use psyche::{
    aesthetic::AestheticScorer,
    caption::{self, CaptionOptions, MergeMode, ProgressCallback},
    config::Settings,
    logging,
    runner::{self, Mode},
    tagger::AutoTagger,
};
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing::error;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose, args.json_logs);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match args.command {
        Commands::Score => run_scorer(&settings, Mode::Persistent),
        Commands::ScoreImage { image_path } => run_scorer(&settings, Mode::OneShot(image_path)),
        Commands::Tag { threshold } => run_tagger(&settings, threshold, Mode::Persistent),
        Commands::TagImage {
            image_path,
            threshold,
        } => run_tagger(&settings, threshold, Mode::OneShot(image_path)),
        Commands::Caption {
            dir,
            threshold,
            mode,
            custom_tag,
        } => run_caption(&settings, dir, threshold, mode, custom_tag),
        Commands::Tags { dir } => print_tag_counts(&dir),
        Commands::RemoveTag { dir, tag } => {
            caption::remove_tag(&dir, &tag)?;
            Ok(())
        }
    }
}

/// Runs the aesthetic scorer in the given mode.
fn run_scorer(settings: &Settings, mode: Mode) -> Result<()> {
    let mut scorer =
        AestheticScorer::from_pretrained(&settings.scorer, &settings.hub, &settings.runtime)
            .context("Error during aesthetic scorer initialization")?;
    runner::run(&mut scorer, mode, io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}

fn load_tagger(settings: &Settings, threshold: Option<f32>) -> Result<AutoTagger> {
    let config = settings.tagger.clone().with_threshold(threshold);
    AutoTagger::from_pretrained(&config, &settings.hub, &settings.runtime)
        .context("Error during auto-tagger initialization")
}

/// Runs the auto-tagger in the given mode.
fn run_tagger(settings: &Settings, threshold: Option<f32>, mode: Mode) -> Result<()> {
    let mut tagger = load_tagger(settings, threshold)?;
    runner::run(&mut tagger, mode, io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}

/// Tags a directory into caption files, drawing progress on stderr.
fn run_caption(
    settings: &Settings,
    dir: PathBuf,
    threshold: Option<f32>,
    mode: MergeMode,
    custom_tag: Option<String>,
) -> Result<()> {
    let mut tagger = load_tagger(settings, threshold)?;

    let bar = ProgressBar::new(0).with_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} {wide_msg}",
    )?);
    let progress_bar = bar.clone();
    let progress: ProgressCallback = Box::new(move |done: usize, total: usize, image: &Path| {
        progress_bar.set_length(total as u64);
        progress_bar.set_position(done as u64);
        if let Some(name) = image.file_name() {
            progress_bar.set_message(name.to_string_lossy().into_owned());
        }
    });

    let options = CaptionOptions { mode, custom_tag };
    caption::caption_directory(&mut tagger, &dir, &options, Some(&progress))?;
    bar.finish_and_clear();
    Ok(())
}

/// Prints `<tag>\t<files>` for every tag used in the directory's captions.
fn print_tag_counts(dir: &Path) -> Result<()> {
    let counts = caption::tag_counts(dir)?;
    let mut out = io::stdout().lock();
    for (tag, count) in &counts {
        writeln!(out, "{}\t{}", tag, count)?;
    }
    out.flush()?;
    Ok(())
}
