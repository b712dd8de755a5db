//! # Aesthetic Module
//!
//! This module provides the `AestheticScorer` for rating the visual quality of images.
//!
//! The scorer runs a pretrained two-class image classifier and turns the logit of
//! the "aesthetic" class into a score between 1 and 10: the logit is squashed with
//! `tanh` into `(-1, 1)` and then rescaled affinely.
//!
//! The main components are `AestheticScorer` for managing the scoring process and
//! `AestheticScore` for representing the result.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::{fmt, path::Path};
use tracing::info;

use crate::{
    config::{HubConfig, PreprocessorConfig, RuntimeConfig, ScorerConfig},
    error::ProcessError,
    file::{hub_api, ModelFile},
    model::{Classifier, OnnxClassifier},
    processor::{open_image, ImagePreprocessor},
};

/// A score in `[1, 10]`, printed with two decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct AestheticScore(f64);

impl AestheticScore {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 10.0;

    /// `((tanh(raw) + 1) / 2) * 9 + 1`
    pub fn from_logit(raw: f32) -> Self {
        let squashed = raw.tanh() as f64;
        let score = ((squashed + 1.0) / 2.0) * 9.0 + 1.0;
        Self(score.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for AestheticScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Scores images with a two-class aesthetic classifier.
#[derive(Debug)]
pub struct AestheticScorer<C = OnnxClassifier> {
    classifier: C,
    logit_index: usize,
}

impl<C: Classifier> AestheticScorer<C> {
    /// Creates a new `AestheticScorer` reading the logit at `logit_index`.
    pub fn new(classifier: C, logit_index: usize) -> Self {
        Self {
            classifier,
            logit_index,
        }
    }

    /// Scores an already decoded image.
    pub fn score_image(&mut self, image: &DynamicImage) -> Result<AestheticScore> {
        let logits = self.classifier.infer(image)?;
        let raw = *logits.get(self.logit_index).with_context(|| {
            format!(
                "Model returned {} logits, expected at least {}",
                logits.len(),
                self.logit_index + 1
            )
        })?;
        anyhow::ensure!(raw.is_finite(), "Model returned a non-finite logit: {}", raw);
        Ok(AestheticScore::from_logit(raw))
    }

    /// Opens and scores the image at `path`.
    pub fn score(&mut self, path: &Path) -> Result<AestheticScore, ProcessError> {
        let image = open_image(path)?;
        self.score_image(&image)
            .map_err(|e| ProcessError::inference(path, e))
    }
}

impl AestheticScorer<OnnxClassifier> {
    /// Downloads (or locates) the classifier and its preprocessor config and loads them.
    pub fn from_pretrained(
        config: &ScorerConfig,
        hub: &HubConfig,
        runtime: &RuntimeConfig,
    ) -> Result<Self> {
        info!("Initializing aesthetic scorer (one-time setup)...");
        let api = hub_api(hub)?;

        let preprocessor_path = ModelFile::new(&config.repo_id, &config.preprocessor_file)
            .with_local_path(config.preprocessor_path.as_deref())
            .get(&api)?;
        let preprocessor =
            ImagePreprocessor::from_hf_config(&PreprocessorConfig::load(preprocessor_path)?)?;

        let model_file = ModelFile::new(&config.repo_id, &config.model_file)
            .with_local_path(config.model_path.as_deref());
        let classifier = OnnxClassifier::from_pretrained(&model_file, &api, preprocessor, runtime)?;

        info!("Aesthetic scorer initialized and ready.");
        Ok(Self::new(classifier, config.logit_index))
    }
}
