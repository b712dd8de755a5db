//! Sidecar caption files.
//!
//! Tags an entire directory and merges the generated tags into a `<stem>.txt`
//! file next to each image, the format most training tools read captions from.
//! The same files can be summarized by tag frequency or purged of a tag.

use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::{model::Classifier, runner::Summary, tagger::AutoTagger};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Called after each image with `(done, total, current image)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize, &Path)>;

/// How generated tags combine with an existing caption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Existing tags, then the custom tag, then generated tags.
    #[default]
    Append,
    /// Generated tags, then the custom tag, then existing tags.
    Prepend,
    /// Generated tags and the custom tag only.
    Replace,
}

#[derive(Debug, Clone, Default)]
pub struct CaptionOptions {
    pub mode: MergeMode,
    /// An extra tag added to every caption.
    pub custom_tag: Option<String>,
}

/// Splits a caption on commas, trimming entries and dropping empty ones.
pub fn split_tags(content: &str) -> Vec<String> {
    content
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Merges tag lists according to `mode`, keeping the first occurrence of each tag.
pub fn merge_tags(
    existing: &[String],
    generated: &[String],
    custom_tag: Option<&str>,
    mode: MergeMode,
) -> Vec<String> {
    let custom: Vec<String> = custom_tag
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .into_iter()
        .collect();

    let custom = custom.as_slice();
    let none: &[String] = &[];
    let order: [&[String]; 3] = match mode {
        MergeMode::Append => [existing, custom, generated],
        MergeMode::Prepend => [generated, custom, existing],
        MergeMode::Replace => [generated, custom, none],
    };

    let merged: IndexSet<&String> = order.iter().flat_map(|tags| tags.iter()).collect();
    merged.into_iter().cloned().collect()
}

/// The caption file belonging to `image`.
pub fn caption_path(image: &Path) -> PathBuf {
    image.with_extension("txt")
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&e.to_lowercase().as_str()))
}

/// Regular files directly inside `dir` whose extension is in `extensions`,
/// sorted by file name.
fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    anyhow::ensure!(dir.is_dir(), "{:?} is not a directory", dir);
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list {:?}", dir))?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Images directly inside `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    list_files(dir, IMAGE_EXTENSIONS)
}

/// Caption files directly inside `dir`, sorted by file name.
pub fn list_captions(dir: &Path) -> Result<Vec<PathBuf>> {
    list_files(dir, &["txt"])
}

fn read_caption(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        other => other,
    }
}

fn caption_image<C: Classifier>(
    tagger: &mut AutoTagger<C>,
    image: &Path,
    options: &CaptionOptions,
) -> Result<()> {
    let generated: Vec<String> = tagger.tag(image)?.names().map(str::to_string).collect();
    let txt_path = caption_path(image);
    let existing = split_tags(&read_caption(&txt_path)?);
    let merged = merge_tags(
        &existing,
        &generated,
        options.custom_tag.as_deref(),
        options.mode,
    );
    fs::write(&txt_path, merged.join(", "))
        .with_context(|| format!("Failed to write caption {:?}", txt_path))
}

/// Tags every image in `dir` and updates its caption file.
///
/// A failing image is logged and counted; the batch carries on.
pub fn caption_directory<C: Classifier>(
    tagger: &mut AutoTagger<C>,
    dir: &Path,
    options: &CaptionOptions,
    progress: Option<&ProgressCallback>,
) -> Result<Summary> {
    let images = list_images(dir)?;
    let total = images.len();
    info!("Found {} images to tag in {:?}", total, dir);

    let mut summary = Summary::default();
    for (i, image) in images.iter().enumerate() {
        if let Err(e) = caption_image(tagger, image, options) {
            error!("Failed to tag {:?}: {:#}", image, e);
            summary.failed += 1;
        }
        summary.processed += 1;
        if let Some(cb) = progress {
            cb(i + 1, total, image);
        }
    }

    info!(
        "Batch tagging finished: {} images, {} failed",
        summary.processed, summary.failed
    );
    Ok(summary)
}

/// Counts, for every tag, the caption files in `dir` that contain it.
///
/// A tag repeated within one file counts once. Tags appear in the order they
/// are first met, walking the files by name.
pub fn tag_counts(dir: &Path) -> Result<IndexMap<String, usize>> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for path in list_captions(dir)? {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read caption {:?}", path))?;
        let unique: IndexSet<String> = split_tags(&content).into_iter().collect();
        for tag in unique {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Removes `tag` from every caption file in `dir`, ignoring case.
///
/// Only files that contained the tag are rewritten. Returns how many were.
pub fn remove_tag(dir: &Path, tag: &str) -> Result<usize> {
    let target = tag.trim().to_lowercase();
    anyhow::ensure!(!target.is_empty(), "Tag to remove must not be empty");

    let mut changed = 0;
    for path in list_captions(dir)? {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read caption {:?}", path))?;
        let tags = split_tags(&content);
        let kept: Vec<&String> = tags
            .iter()
            .filter(|t| t.to_lowercase() != target)
            .collect();
        if kept.len() == tags.len() {
            continue;
        }

        let rewritten = kept.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ");
        fs::write(&path, rewritten)
            .with_context(|| format!("Failed to write caption {:?}", path))?;
        debug!("Removed {:?} from {:?}", tag, path);
        changed += 1;
    }

    info!("Removed tag {:?} from {} caption files", tag, changed);
    Ok(changed)
}
