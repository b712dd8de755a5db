//! This module provides the `AutoTagger`, a multi-label image tagger.
//!
//! The tagger combines a `Classifier` with a `Vocabulary`. Every output logit is
//! passed through a sigmoid, and each tag whose probability is strictly above the
//! threshold is kept. Tags come out in ascending vocabulary index order, not
//! sorted by confidence.

use anyhow::Result;
use image::DynamicImage;
use itertools::Itertools;
use std::{fmt, path::Path};
use tracing::info;

use crate::{
    config::{validate_threshold, HubConfig, RuntimeConfig, TaggerConfig},
    error::ProcessError,
    file::{hub_api, ModelFile},
    model::{Classifier, OnnxClassifier},
    processor::{open_image, ImagePreprocessor},
    tags::Vocabulary,
};

/// A selected tag and its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub probability: f32,
}

/// The tags selected for one image, in vocabulary order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    pub fn tags(&self) -> &[Tag] {
        &self.0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(","))
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Tags images with a multi-label classifier.
#[derive(Debug)]
pub struct AutoTagger<C = OnnxClassifier> {
    classifier: C,
    vocabulary: Vocabulary,
    threshold: f32,
}

impl<C: Classifier> AutoTagger<C> {
    /// Creates a new `AutoTagger`. The threshold must lie in `[0, 1]`.
    pub fn new(classifier: C, vocabulary: Vocabulary, threshold: f32) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            classifier,
            vocabulary,
            threshold,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) -> Result<()> {
        validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(())
    }

    /// Turns raw logits into the tags whose probability exceeds the threshold.
    pub fn select(&self, logits: &[f32]) -> Result<TagSet> {
        anyhow::ensure!(
            logits.len() == self.vocabulary.len(),
            "Model returned {} logits but the vocabulary has {} tags",
            logits.len(),
            self.vocabulary.len()
        );

        let tags = logits
            .iter()
            .enumerate()
            .filter_map(|(idx, &logit)| {
                let probability = sigmoid(logit);
                (probability > self.threshold).then(|| Tag {
                    name: self.vocabulary.display_name(idx).unwrap_or_default(),
                    probability,
                })
            })
            .collect();

        Ok(TagSet(tags))
    }

    /// Tags an already decoded image.
    pub fn tag_image(&mut self, image: &DynamicImage) -> Result<TagSet> {
        let logits = self.classifier.infer(image)?;
        self.select(&logits)
    }

    /// Opens and tags the image at `path`.
    pub fn tag(&mut self, path: &Path) -> Result<TagSet, ProcessError> {
        let image = open_image(path)?;
        self.tag_image(&image)
            .map_err(|e| ProcessError::inference(path, e))
    }
}

impl AutoTagger<OnnxClassifier> {
    /// Downloads (or locates) the tagging model and tag list and loads them.
    pub fn from_pretrained(
        config: &TaggerConfig,
        hub: &HubConfig,
        runtime: &RuntimeConfig,
    ) -> Result<Self> {
        config.validate()?;
        info!("Initializing auto-tagger (one-time setup)...");
        let api = hub_api(hub)?;

        let tags_path = ModelFile::new(&config.repo_id, &config.tags_file)
            .with_local_path(config.tags_path.as_deref())
            .get(&api)?;
        let vocabulary = Vocabulary::load(tags_path)?;
        info!("Loaded {} tags", vocabulary.len());

        let [height, width] = config.input_size;
        let preprocessor =
            ImagePreprocessor::new(height, width, config.mean.clone(), config.std.clone())
                .with_layout(config.layout)
                .with_resize(config.resize);

        let model_file = ModelFile::new(&config.repo_id, &config.model_file)
            .with_local_path(config.model_path.as_deref());
        let classifier = OnnxClassifier::from_pretrained(&model_file, &api, preprocessor, runtime)?;

        info!("Tagger initialized and ready (threshold {}).", config.threshold);
        Self::new(classifier, vocabulary, config.threshold)
    }
}
